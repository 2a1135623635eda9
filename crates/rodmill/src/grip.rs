//! Grip milling on the rotary A axis.
//!
//! Geometry: horizontal spindle cutting from below, X along the grip, Z the
//! distance from the grip axis to the tool center (Z0 on the dividing-head
//! axis), A the workpiece rotation. Round grips are turned with A rotating
//! while X/Z move; polygon grips index A to each face and mill it flat.

use crate::config::MillConfig;
use crate::error::{non_negative, positive, ConfigError, Result};
use crate::postprocessor::Program;
use crate::taper_profile::sample_positions;
use crate::types::{AxisTarget, Motion, PassKind, RotaryMode, ToolpathPass};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Finished grip cross-section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GripShape {
    /// Constant radius over the whole length.
    Cylindrical { target_radius: f64 },
    /// Radius changes linearly from the tip end (`x_start`) to the butt end.
    Conical { tip_radius: f64, butt_radius: f64 },
    /// Regular polygon milled face by face.
    Polygon { face_count: u32, circumradius: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GripSpec {
    pub shape: GripShape,
    /// Grip length along X (mm).
    pub length: f64,
    pub x_start: f64,
    /// Radius of the blank before milling (mm).
    pub blank_radius: f64,
    /// End mill radius (mm).
    pub tool_radius: f64,
    /// Most radius a single roughing pass removes (mm).
    pub max_bite: f64,
    /// Radius left for the finish pass (mm).
    pub finish_allowance: f64,
    /// Air gap between blank surface and tool at safe height (mm).
    pub clearance: f64,
    /// Cutting feed (mm/min).
    pub feed_rate: f64,
    /// X resolution of turning passes (mm).
    pub step_resolution: f64,
    /// Workpiece revolutions per mm of X travel while turning.
    pub revolutions_per_mm: f64,
}

impl Default for GripSpec {
    fn default() -> Self {
        Self {
            shape: GripShape::Polygon {
                face_count: 8,
                circumradius: 11.0,
            },
            length: 200.0,
            x_start: 0.0,
            blank_radius: 15.0,
            tool_radius: 3.0,
            max_bite: 1.0,
            finish_allowance: 0.5,
            clearance: 2.0,
            feed_rate: 150.0,
            step_resolution: 1.0,
            revolutions_per_mm: 3.0,
        }
    }
}

impl GripSpec {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        positive("grip.length", self.length)?;
        if !self.x_start.is_finite() {
            return Err(ConfigError::NotFinite { name: "x_start" });
        }
        positive("blank_radius", self.blank_radius)?;
        non_negative("tool_radius", self.tool_radius)?;
        positive("max_bite", self.max_bite)?;
        positive("finish_allowance", self.finish_allowance)?;
        non_negative("clearance", self.clearance)?;
        positive("grip.feed_rate", self.feed_rate)?;
        positive("grip.step_resolution", self.step_resolution)?;
        positive("revolutions_per_mm", self.revolutions_per_mm)?;
        if self.finish_allowance > self.max_bite {
            return Err(ConfigError::FinishAllowanceTooLarge {
                allowance: self.finish_allowance,
                max_bite: self.max_bite,
            });
        }

        match self.shape {
            GripShape::Cylindrical { target_radius } => {
                self.check_target("target_radius", target_radius)
            }
            GripShape::Conical {
                tip_radius,
                butt_radius,
            } => {
                self.check_target("tip_radius", tip_radius)?;
                self.check_target("butt_radius", butt_radius)
            }
            GripShape::Polygon {
                face_count,
                circumradius,
            } => {
                if face_count < 3 {
                    return Err(ConfigError::TooFewFaces { count: face_count });
                }
                self.check_target("circumradius", circumradius)
            }
        }
    }

    fn check_target(&self, name: &'static str, target: f64) -> std::result::Result<(), ConfigError> {
        non_negative(name, target)?;
        if target >= self.blank_radius {
            return Err(ConfigError::TargetNotBelowBlank {
                name,
                target,
                blank: self.blank_radius,
            });
        }
        Ok(())
    }

    pub fn x_end(&self) -> f64 {
        self.x_start + self.length
    }

    /// Finished radius at `x`. Polygons report the radius their faces are cut at.
    pub fn target_radius_at(&self, x: f64) -> f64 {
        match self.shape {
            GripShape::Cylindrical { target_radius } => target_radius,
            GripShape::Conical {
                tip_radius,
                butt_radius,
            } => {
                let t = ((x - self.x_start) / self.length).clamp(0.0, 1.0);
                tip_radius + t * (butt_radius - tip_radius)
            }
            GripShape::Polygon { circumradius, .. } => circumradius,
        }
    }

    fn min_target_radius(&self) -> f64 {
        match self.shape {
            GripShape::Conical {
                tip_radius,
                butt_radius,
            } => tip_radius.min(butt_radius),
            _ => self.target_radius_at(self.x_start),
        }
    }

    /// Tool center Z that leaves `radius` of material on the axis.
    pub fn z_for_radius(&self, radius: f64) -> f64 {
        radius + self.tool_radius
    }

    /// Tool clear of the blank, seen from below.
    pub fn safe_z(&self) -> f64 {
        self.blank_radius + self.tool_radius + self.clearance
    }

    /// Number of roughing passes so no pass removes more than `max_bite`.
    pub fn rough_pass_count(&self) -> usize {
        let depth = self.blank_radius - (self.min_target_radius() + self.finish_allowance);
        if depth <= 1e-9 {
            return 0;
        }
        (depth / self.max_bite - 1e-9).ceil().max(1.0) as usize
    }

    /// Radius a pass cuts at `x`.
    ///
    /// Roughing pass `k` of `n` leaves `(n-k)/n` of the stock above the
    /// roughing floor, so every position steps down evenly and strictly
    /// toward the target; the finish pass cuts the target itself. Where the
    /// stock is too thin to leave the full finish allowance, the floor sits
    /// one `n+1`-th of the stock above the target, strictly below the blank.
    pub fn pass_radius(&self, kind: PassKind, x: f64) -> f64 {
        let target = self.target_radius_at(x);
        match kind {
            PassKind::Finish => target,
            PassKind::Rough { index, count } => {
                let stock = self.blank_radius - target;
                let floor = target + self.finish_allowance.min(stock / (count + 1) as f64);
                let remaining = (count - index) as f64 / count as f64;
                floor + (self.blank_radius - floor) * remaining
            }
        }
    }

    fn pass_kinds(&self) -> Vec<PassKind> {
        let count = self.rough_pass_count();
        let mut kinds: Vec<PassKind> = (1..=count)
            .map(|index| PassKind::Rough { index, count })
            .collect();
        kinds.push(PassKind::Finish);
        kinds
    }
}

/// Planned grip passes, roughest first.
#[derive(Debug, Clone)]
pub struct GripPlan {
    pub rotary_mode: RotaryMode,
    pub passes: Vec<ToolpathPass>,
}

pub fn plan_grip(spec: &GripSpec) -> Result<GripPlan> {
    spec.validate()?;
    let plan = match spec.shape {
        GripShape::Cylindrical { .. } | GripShape::Conical { .. } => GripPlan {
            rotary_mode: RotaryMode::Continuous,
            passes: plan_turning(spec),
        },
        GripShape::Polygon { face_count, .. } => GripPlan {
            rotary_mode: RotaryMode::Indexed,
            passes: plan_polygon(spec, face_count),
        },
    };
    tracing::debug!(passes = plan.passes.len(), "planned grip passes");
    Ok(plan)
}

/// Lathe-style passes: A turns continuously while X advances and Z follows the radius.
fn plan_turning(spec: &GripSpec) -> Vec<ToolpathPass> {
    let positions = sample_positions(spec.x_start, spec.x_end(), spec.step_resolution);
    let degrees_per_mm = 360.0 * spec.revolutions_per_mm;
    let mut a_total = 0.0;

    spec.pass_kinds()
        .into_iter()
        .map(|kind| {
            let label = match kind {
                PassKind::Rough { index, count } => format!(
                    "Rough pass {index}/{count} r={:.3}mm",
                    spec.pass_radius(kind, spec.x_start)
                ),
                PassKind::Finish => "Finish pass (contour)".to_string(),
            };
            let mut pass = ToolpathPass::new(kind, label);
            pass.push(Motion::rapid(AxisTarget::x(spec.x_start)));

            let mut previous: Option<f64> = None;
            for &x in &positions {
                // The plunge at the start of a pass gets one step of rotation.
                let travel = previous.map_or(spec.step_resolution, |p| x - p);
                a_total += degrees_per_mm * travel;
                let z = spec.z_for_radius(spec.pass_radius(kind, x));
                pass.push(Motion::feed(
                    AxisTarget::xz(x, z).with_a(a_total),
                    spec.feed_rate,
                ));
                previous = Some(x);
            }

            pass.push(Motion::rapid(AxisTarget::z(spec.safe_z())));
            pass
        })
        .collect()
}

/// Index A to each face and mill it flat along X, roughing then finishing.
fn plan_polygon(spec: &GripSpec, face_count: u32) -> Vec<ToolpathPass> {
    let sector = 360.0 / face_count as f64;
    let z_entry = spec.z_for_radius(spec.blank_radius);
    let approach_feed = spec.feed_rate / 2.0;
    let plunge_feed = spec.feed_rate / 3.0;
    let kinds = spec.pass_kinds();

    let mut passes = Vec::with_capacity(face_count as usize * kinds.len());
    for face in 0..face_count as usize {
        let angle = face as f64 * sector;
        for (i, &kind) in kinds.iter().enumerate() {
            let label = match kind {
                PassKind::Rough { index, count } => format!(
                    "Face {}/{face_count} A={angle:.1} rough {index}/{count}",
                    face + 1
                ),
                PassKind::Finish => {
                    format!("Face {}/{face_count} A={angle:.1} finish", face + 1)
                }
            };
            let mut pass = ToolpathPass::new(kind, label).on_face(face);
            if i == 0 {
                // index while retracted
                pass.push(Motion::rapid(AxisTarget::a(angle)));
            }
            pass.push(Motion::rapid(AxisTarget::x(spec.x_start)));
            pass.push(Motion::feed(AxisTarget::z(z_entry), approach_feed));
            pass.push(Motion::feed(
                AxisTarget::z(spec.z_for_radius(spec.pass_radius(kind, spec.x_start))),
                plunge_feed,
            ));
            pass.push(Motion::feed(AxisTarget::x(spec.x_end()), spec.feed_rate));
            pass.push(Motion::rapid(AxisTarget::z(spec.safe_z())));
            passes.push(pass);
        }
    }
    passes
}

/// Build the grip program for the configured shape.
pub fn generate_grip_program(config: &MillConfig) -> Result<Program> {
    let spec = &config.grip;
    let plan = plan_grip(spec)?;

    let mut notes = vec![format!("Length: {:.1}mm", spec.length)];
    match spec.shape {
        GripShape::Cylindrical { target_radius } => {
            notes.push(format!("Cylindrical, radius {target_radius:.2}mm"));
        }
        GripShape::Conical {
            tip_radius,
            butt_radius,
        } => {
            notes.push(format!(
                "Conical, radius {tip_radius:.2}mm (tip) -> {butt_radius:.2}mm (butt)"
            ));
        }
        GripShape::Polygon {
            face_count,
            circumradius,
        } => {
            notes.push(format!(
                "Polygon, {face_count} faces {:.1} deg apart, face radius {circumradius:.2}mm, inradius {:.3}mm",
                360.0 / face_count as f64,
                circumradius * (PI / face_count as f64).cos()
            ));
        }
    }
    notes.push(format!(
        "Blank radius {:.2}mm, tool radius {:.2}mm, {} roughing pass(es)",
        spec.blank_radius,
        spec.tool_radius,
        spec.rough_pass_count()
    ));
    notes.push("Z=0 at grip axis".to_string());

    tracing::info!(
        passes = plan.passes.len(),
        rotary_mode = ?plan.rotary_mode,
        "generated grip toolpath"
    );

    let safe = spec.safe_z();
    let home = match plan.rotary_mode {
        RotaryMode::Continuous => AxisTarget::x(0.0),
        RotaryMode::Indexed => AxisTarget::x(0.0).with_a(0.0),
    };

    Ok(Program {
        title: "Fly Rod Grip G-Code".to_string(),
        notes,
        rotary_mode: Some(plan.rotary_mode),
        default_feed: spec.feed_rate,
        start: vec![
            Motion::rapid(AxisTarget::z(safe)),
            Motion::rapid(AxisTarget::x(0.0).with_a(0.0)),
        ],
        passes: plan.passes,
        end: vec![Motion::rapid(AxisTarget::z(safe)), Motion::rapid(home)],
    })
}
