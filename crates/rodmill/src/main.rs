use rodmill::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str());
    let path = args.get(2).map(PathBuf::from);
    if args.len() > 3 {
        return usage();
    }

    let result = match command {
        Some("init-config") => init_config(path),
        Some(name) => match name.parse::<GeneratorKind>() {
            Ok(kind) => run_generator(kind, path.as_deref()),
            Err(_) => return usage(),
        },
        None => return usage(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run_generator(kind: GeneratorKind, path: Option<&Path>) -> anyhow::Result<()> {
    let config = MillConfig::load_or_default(path)?;
    let gcode = generate_program(kind, &config)?;
    gcode.write_to(io::stdout().lock()).map_err(MillError::from)?;
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => MillConfig::default_config_path()?,
    };
    MillConfig::default().save_to_path(&path)?;
    eprintln!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn usage() -> ExitCode {
    eprintln!("Usage: rodmill <taper|hollow|grip> [CONFIG]");
    eprintln!("       rodmill init-config [PATH]");
    eprintln!("  taper        - Mill the hex strip taper");
    eprintln!("  hollow       - Hollow the strip, leaving glue lands solid");
    eprintln!("  grip         - Turn or index-mill the grip on the A axis");
    eprintln!("  init-config  - Write the default configuration (~/.rodmill/config.json)");
    ExitCode::from(2)
}
