use crate::config::{MachineConfig, MillConfig};
use crate::error::Result;
use crate::postprocessor::Program;
use crate::taper_profile::{sample_positions, strip_height, TaperProfile};
use crate::types::{AxisTarget, Motion, PassKind, ToolpathPass};

/// One sampled cut along the strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaperStep {
    pub position: f64,
    /// Interpolated flat-to-flat dimension (mm).
    pub dimension: f64,
    /// Machine Z for this dimension, zero-point corrected.
    pub z: f64,
}

/// Convert a flat-to-flat dimension into the taper cut Z.
pub fn dimension_to_z(dimension: f64, zero_offset: f64) -> f64 {
    -strip_height(dimension) + zero_offset
}

/// Walk the profile from tip to the end of the overshoot at `step_resolution`.
pub fn plan_taper(profile: &TaperProfile, machine: &MachineConfig) -> Result<Vec<TaperStep>> {
    machine.validate()?;

    sample_positions(profile.start(), profile.cut_end(), machine.step_resolution)
        .into_iter()
        .map(|position| {
            let dimension = profile.depth_at(position)?;
            Ok(TaperStep {
                position,
                dimension,
                z: dimension_to_z(dimension, machine.zero_offset),
            })
        })
        .collect()
}

/// Build the taper program: rapid approach, one feed move per step, rapid retract.
pub fn generate_taper_program(config: &MillConfig) -> Result<Program> {
    let machine = &config.machine;
    let profile = config.taper_profile()?;
    let steps = plan_taper(&profile, machine)?;

    let stations = profile.stations();
    let tip = stations[0];
    let butt = stations[stations.len() - 1];

    let mut pass = ToolpathPass::new(PassKind::Finish, "Taper pass");
    for step in &steps {
        pass.push(Motion::feed(
            AxisTarget::xz(step.position, step.z),
            machine.feed_rate,
        ));
    }

    tracing::info!(
        steps = steps.len(),
        length_mm = profile.cut_end() - profile.start(),
        "generated taper toolpath"
    );

    Ok(Program {
        title: "Hexrod Taper G-Code".to_string(),
        notes: vec![
            format!(
                "Taper: {:.2}mm (tip) -> {:.2}mm (butt)",
                tip.dimension, butt.dimension
            ),
            format!(
                "Length: {:.1}mm + {:.1}mm overshoot, step {:.3}mm",
                profile.length(),
                profile.overshoot(),
                machine.step_resolution
            ),
            "Axes: X=length, Z=depth".to_string(),
        ],
        rotary_mode: None,
        default_feed: machine.feed_rate,
        start: vec![
            Motion::rapid(AxisTarget::z(machine.rapid_height)),
            Motion::rapid(AxisTarget::x(profile.start())),
        ],
        passes: vec![pass],
        end: vec![
            Motion::rapid(AxisTarget::z(machine.rapid_height)),
            Motion::rapid(AxisTarget::x(0.0)),
        ],
    })
}
