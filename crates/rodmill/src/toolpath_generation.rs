use crate::config::MillConfig;
use crate::grip::generate_grip_program;
use crate::hollow::generate_hollow_program;
use crate::postprocessor::{post_process_linuxcnc, Program};
use crate::taper::generate_taper_program;
use crate::types::GCode;
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;

/// The three independent generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Taper,
    Hollow,
    Grip,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [
        GeneratorKind::Taper,
        GeneratorKind::Hollow,
        GeneratorKind::Grip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Taper => "taper",
            GeneratorKind::Hollow => "hollow",
            GeneratorKind::Grip => "grip",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        GeneratorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| anyhow!("unknown generator '{s}' (expected taper, hollow or grip)"))
    }
}

/// Build the motion program for `kind` without emitting it.
pub fn build_program(kind: GeneratorKind, config: &MillConfig) -> Result<Program> {
    let program = match kind {
        GeneratorKind::Taper => generate_taper_program(config),
        GeneratorKind::Hollow => generate_hollow_program(config),
        GeneratorKind::Grip => generate_grip_program(config),
    };
    program.with_context(|| format!("generate {kind} toolpath"))
}

/// Run one generator end to end: toolpath, travel check, G-code text.
///
/// The whole program is assembled in memory, so an error leaves nothing
/// half-written for the caller.
pub fn generate_program(kind: GeneratorKind, config: &MillConfig) -> Result<GCode> {
    let span = tracing::info_span!("generate", generator = %kind);
    let _guard = span.enter();

    let program = build_program(kind, config)?;
    let gcode = post_process_linuxcnc(&program, &config.machine.travel)
        .with_context(|| format!("post-process {kind} program"))?;

    tracing::info!(
        passes = program.passes.len(),
        lines = gcode.lines.len(),
        "program ready"
    );
    Ok(gcode)
}
