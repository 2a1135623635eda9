use rodmill::*;

fn polygon_spec() -> GripSpec {
    GripSpec {
        shape: GripShape::Polygon {
            face_count: 8,
            circumradius: 10.0,
        },
        tool_radius: 3.0,
        ..GripSpec::default()
    }
}

fn z_values(pass: &ToolpathPass) -> Vec<f64> {
    pass.cutting_moves().filter_map(|t| t.z).collect()
}

#[test]
fn test_polygon_faces_and_finish_depth() {
    let spec = polygon_spec();
    let plan = plan_grip(&spec).unwrap();
    assert_eq!(plan.rotary_mode, RotaryMode::Indexed);

    let angles: Vec<f64> = plan
        .passes
        .iter()
        .flat_map(|p| p.moves.iter())
        .filter_map(|m| match m {
            Motion::Rapid(target) => target.a,
            Motion::Feed { .. } => None,
        })
        .collect();
    let expected: Vec<f64> = (0..8).map(|i| i as f64 * 45.0).collect();
    assert_eq!(angles, expected);

    let finishes: Vec<&ToolpathPass> = plan
        .passes
        .iter()
        .filter(|p| p.kind == PassKind::Finish)
        .collect();
    assert_eq!(finishes.len(), 8);
    for (face, pass) in finishes.iter().enumerate() {
        assert_eq!(pass.face, Some(face));
        assert!((z_values(pass).last().unwrap() - 13.0).abs() < 1e-12);
        let x_end = pass.cutting_moves().filter_map(|t| t.x).last().unwrap();
        assert_eq!(x_end, spec.x_start + spec.length);
    }
}

#[test]
fn test_polygon_gcode() {
    let config = MillConfig {
        grip: polygon_spec(),
        ..MillConfig::default()
    };
    let gcode = generate_program(GeneratorKind::Grip, &config).unwrap();
    assert!(gcode
        .lines
        .iter()
        .any(|l| l == "; AXIS A MODE INDEXED (WRAPPED_ROTARY = 1)"));
    for angle in ["A45.000", "A90.000", "A315.000"] {
        assert!(gcode.lines.iter().any(|l| l.ends_with(angle)), "{angle}");
    }
    // finish depth is cut at a third of the feed
    assert!(gcode.lines.iter().any(|l| l == "Z13.0000 F50"));
}

#[test]
fn test_cylindrical_passes_step_down() {
    let spec = GripSpec {
        shape: GripShape::Cylindrical {
            target_radius: 10.0,
        },
        length: 50.0,
        ..GripSpec::default()
    };
    let plan = plan_grip(&spec).unwrap();
    assert_eq!(plan.rotary_mode, RotaryMode::Continuous);
    assert_eq!(plan.passes.len(), spec.rough_pass_count() + 1);

    let mut previous_z = vec![spec.z_for_radius(spec.blank_radius); 51];
    for pass in &plan.passes {
        let z = z_values(pass);
        assert_eq!(z.len(), 51);
        for (now, before) in z.iter().zip(&previous_z) {
            assert!(now < before);
            assert!(before - now <= spec.max_bite + 1e-9);
        }
        previous_z = z;
    }
    assert!(previous_z.iter().all(|z| (z - 13.0).abs() < 1e-12));
}

#[test]
fn test_conical_finish_follows_target() {
    let spec = GripSpec {
        shape: GripShape::Conical {
            tip_radius: 8.0,
            butt_radius: 12.0,
        },
        length: 100.0,
        ..GripSpec::default()
    };
    let plan = plan_grip(&spec).unwrap();
    let finish = plan.passes.last().unwrap();
    assert_eq!(finish.kind, PassKind::Finish);

    for target in finish.cutting_moves() {
        let (x, z) = (target.x.unwrap(), target.z.unwrap());
        let expected = spec.target_radius_at(x) + spec.tool_radius;
        assert!((z - expected).abs() < 1e-12);
    }

    // Rough passes never reach the target.
    for pass in &plan.passes[..plan.passes.len() - 1] {
        for target in pass.cutting_moves() {
            let radius = spec.target_radius_at(target.x.unwrap());
            assert!(target.z.unwrap() > spec.z_for_radius(radius));
        }
    }
}

#[test]
fn test_conical_end_near_blank_still_steps_down() {
    let spec = GripSpec {
        shape: GripShape::Conical {
            tip_radius: 14.8,
            butt_radius: 8.0,
        },
        length: 20.0,
        blank_radius: 15.0,
        finish_allowance: 0.5,
        ..GripSpec::default()
    };
    let plan = plan_grip(&spec).unwrap();
    let passes: Vec<Vec<f64>> = plan.passes.iter().map(z_values).collect();
    assert_eq!(passes.len(), spec.rough_pass_count() + 1);

    for column in 0..passes[0].len() {
        let mut z: Vec<f64> = vec![spec.z_for_radius(spec.blank_radius)];
        z.extend(passes.iter().map(|pass| pass[column]));
        for w in z.windows(2) {
            assert!(w[1] < w[0], "pass does not step down at sample {column}: {z:?}");
            assert!(w[0] - w[1] <= spec.max_bite + 1e-9);
        }
    }

    // tip end finishes on its target
    assert!((passes.last().unwrap()[0] - 17.8).abs() < 1e-12);
}

#[test]
fn test_turning_gcode_declares_continuous_axis() {
    let config = MillConfig {
        grip: GripSpec {
            shape: GripShape::Cylindrical {
                target_radius: 12.0,
            },
            length: 10.0,
            ..GripSpec::default()
        },
        ..MillConfig::default()
    };
    let gcode = generate_program(GeneratorKind::Grip, &config).unwrap();
    assert!(gcode
        .lines
        .iter()
        .any(|l| l == "; AXIS A MODE CONTINUOUS (WRAPPED_ROTARY = 0)"));
    assert!(gcode.lines.iter().any(|l| l == "G0 Z20.0000"));
}

#[test]
fn test_target_at_blank_rejected() {
    let config = MillConfig {
        grip: GripSpec {
            shape: GripShape::Cylindrical {
                target_radius: 15.0,
            },
            ..GripSpec::default()
        },
        ..MillConfig::default()
    };
    let err = generate_program(GeneratorKind::Grip, &config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MillError>(),
        Some(MillError::Config(ConfigError::TargetNotBelowBlank { .. }))
    ));
}
