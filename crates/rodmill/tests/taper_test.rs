use rodmill::*;

fn inch_table() -> MillConfig {
    MillConfig {
        machine: MachineConfig {
            step_resolution: 5.0 * MM_PER_INCH,
            overshoot: 50.0,
            ..MachineConfig::default()
        },
        taper: StationTable {
            position_unit: LengthUnit::Inch,
            dimension_unit: LengthUnit::Millimeter,
            stations: vec![(0.0, 20.0), (10.0, 15.0), (20.0, 10.0)],
        },
        ..MillConfig::default()
    }
}

#[test]
fn test_linear_interpolation_between_stations() {
    let config = inch_table();
    let profile = config.taper_profile().unwrap();
    let steps = plan_taper(&profile, &config.machine).unwrap();

    let expected = [
        (0.0, 20.0),
        (127.0, 17.5),
        (254.0, 15.0),
        (381.0, 12.5),
        (508.0, 10.0),
        (558.0, 10.0),
    ];
    assert_eq!(steps.len(), expected.len());
    for (step, (position, dimension)) in steps.iter().zip(expected) {
        assert!((step.position - position).abs() < 1e-9, "{step:?}");
        assert!((step.dimension - dimension).abs() < 1e-9, "{step:?}");
        assert!((step.z + dimension / 2.0).abs() < 1e-9, "{step:?}");
    }
}

#[test]
fn test_overshoot_holds_butt_dimension() {
    let config = inch_table();
    let profile = config.taper_profile().unwrap();
    for x in [508.0, 520.0, 540.0, 558.0] {
        assert!((profile.depth_at(x).unwrap() - 10.0).abs() < 1e-12);
    }
    assert!(profile.depth_at(558.5).is_err());
    assert!(profile.depth_at(-0.5).is_err());
}

#[test]
fn test_taper_program_order() {
    let gcode = generate_program(GeneratorKind::Taper, &inch_table()).unwrap();
    let lines: Vec<&str> = gcode.lines.iter().map(String::as_str).collect();

    let preamble = lines.iter().position(|l| *l == "G21 G90 G94").unwrap();
    let approach = lines.iter().position(|l| *l == "G0 Z5.0000").unwrap();
    let first_cut = lines.iter().position(|l| *l == "G1 X0.000 Z-10.0000").unwrap();
    assert!(preamble < approach && approach < first_cut);
    assert_eq!(lines[approach + 1], "X0.000");

    let cuts = [
        "X127.000 Z-8.7500",
        "X254.000 Z-7.5000",
        "X381.000 Z-6.2500",
        "X508.000 Z-5.0000",
        "X558.000 Z-5.0000",
    ];
    for (i, cut) in cuts.iter().enumerate() {
        assert_eq!(lines[first_cut + 1 + i], *cut);
    }
    assert_eq!(lines[lines.len() - 3], "G0 Z5.0000");
    assert_eq!(lines[lines.len() - 2], "X0.000");
    assert_eq!(lines[lines.len() - 1], "M2");
}

#[test]
fn test_zero_offset_shifts_every_cut() {
    let mut config = inch_table();
    config.machine.zero_offset = 0.5;
    let profile = config.taper_profile().unwrap();
    let steps = plan_taper(&profile, &config.machine).unwrap();
    assert!((steps[0].z + 9.5).abs() < 1e-9);
    assert!((steps[4].z + 4.5).abs() < 1e-9);
}

#[test]
fn test_default_table_covers_rod() {
    let config = MillConfig::default();
    let profile = config.taper_profile().unwrap();
    let steps = plan_taper(&profile, &config.machine).unwrap();

    assert_eq!(steps.first().unwrap().position, 0.0);
    assert!((steps.last().unwrap().position - 1534.0).abs() < 1e-9);
    // Dimensions never shrink toward the butt.
    assert!(steps.windows(2).all(|w| w[1].dimension >= w[0].dimension));
}
