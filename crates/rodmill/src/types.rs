use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

pub const MM_PER_INCH: f64 = 25.4;

/// Unit a literal table column is written in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Millimeter,
    Inch,
}

impl LengthUnit {
    /// Convert a value in this unit to millimetres.
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimeter => value,
            LengthUnit::Inch => value * MM_PER_INCH,
        }
    }
}

/// Machine axes addressed by the generators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Axis {
    /// Along the rod or grip length.
    X,
    /// Cut depth (taper/hollow) or distance from the grip axis (grip).
    Z,
    /// Rotary axis of the dividing head.
    A,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Axis::X => "X",
            Axis::Z => "Z",
            Axis::A => "A",
        };
        f.write_str(letter)
    }
}

/// Absolute target for a single move. Axes left at `None` keep their position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AxisTarget {
    pub x: Option<f64>,
    pub z: Option<f64>,
    pub a: Option<f64>,
}

impl AxisTarget {
    pub fn x(x: f64) -> Self {
        Self {
            x: Some(x),
            ..Self::default()
        }
    }

    pub fn z(z: f64) -> Self {
        Self {
            z: Some(z),
            ..Self::default()
        }
    }

    pub fn a(a: f64) -> Self {
        Self {
            a: Some(a),
            ..Self::default()
        }
    }

    pub fn xz(x: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            z: Some(z),
            a: None,
        }
    }

    pub fn with_a(mut self, a: f64) -> Self {
        self.a = Some(a);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.z.is_none() && self.a.is_none()
    }

    /// Iterate over the axes this target sets, in X, Z, A order.
    pub fn axes(&self) -> impl Iterator<Item = (Axis, f64)> {
        [(Axis::X, self.x), (Axis::Z, self.z), (Axis::A, self.a)]
            .into_iter()
            .filter_map(|(axis, value)| value.map(|v| (axis, v)))
    }
}

/// Rapid positioning vs. programmed feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MotionMode {
    Rapid,
    Feed,
}

/// One entry of a toolpath pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Motion {
    Rapid(AxisTarget),
    Feed { target: AxisTarget, rate: f64 },
}

impl Motion {
    pub fn rapid(target: AxisTarget) -> Self {
        Motion::Rapid(target)
    }

    pub fn feed(target: AxisTarget, rate: f64) -> Self {
        Motion::Feed { target, rate }
    }

    pub fn mode(&self) -> MotionMode {
        match self {
            Motion::Rapid(_) => MotionMode::Rapid,
            Motion::Feed { .. } => MotionMode::Feed,
        }
    }

    pub fn target(&self) -> &AxisTarget {
        match self {
            Motion::Rapid(target) => target,
            Motion::Feed { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PassKind {
    /// Roughing pass `index` (1-based) of `count`.
    Rough { index: usize, count: usize },
    Finish,
}

/// An ordered run of motions making up one rough or finish pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolpathPass {
    pub kind: PassKind,
    /// Human readable label written as a comment ahead of the pass.
    pub label: String,
    /// Polygon face this pass belongs to (0-based), if any.
    pub face: Option<usize>,
    pub moves: Vec<Motion>,
}

impl ToolpathPass {
    pub fn new(kind: PassKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            face: None,
            moves: Vec::new(),
        }
    }

    pub fn on_face(mut self, face: usize) -> Self {
        self.face = Some(face);
        self
    }

    pub fn push(&mut self, motion: Motion) {
        self.moves.push(motion);
    }

    /// Feed moves only, i.e. the moves that actually remove material.
    pub fn cutting_moves(&self) -> impl Iterator<Item = &AxisTarget> {
        self.moves.iter().filter_map(|m| match m {
            Motion::Feed { target, .. } => Some(target),
            Motion::Rapid(_) => None,
        })
    }
}

/// How the rotary axis is driven for a whole program.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RotaryMode {
    /// A turns continuously together with X/Z (turning).
    Continuous,
    /// A indexes between fixed angles and stays still while cutting.
    Indexed,
}

impl RotaryMode {
    /// LinuxCNC `WRAPPED_ROTARY` value the machine has to be configured with.
    pub fn wrapped_rotary(self) -> u8 {
        match self {
            RotaryMode::Continuous => 0,
            RotaryMode::Indexed => 1,
        }
    }
}

/// Represents the final, machine-specific G-code output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GCode {
    /// A list of G-code command strings.
    pub lines: Vec<String>,
}

impl GCode {
    /// Write every line, newline terminated, and flush the writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }
}

impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_conversion() {
        assert_eq!(LengthUnit::Inch.to_mm(10.0), 254.0);
        assert_eq!(LengthUnit::Millimeter.to_mm(12.5), 12.5);
    }

    #[test]
    fn test_axis_target_axes_order() {
        let target = AxisTarget::xz(1.0, -2.0).with_a(90.0);
        let axes: Vec<_> = target.axes().collect();
        assert_eq!(axes, vec![(Axis::X, 1.0), (Axis::Z, -2.0), (Axis::A, 90.0)]);
        assert!(AxisTarget::default().is_empty());
    }

    #[test]
    fn test_pass_cutting_moves() {
        let mut pass = ToolpathPass::new(PassKind::Finish, "finish");
        pass.push(Motion::rapid(AxisTarget::z(5.0)));
        pass.push(Motion::feed(AxisTarget::xz(0.0, -1.0), 300.0));
        pass.push(Motion::feed(AxisTarget::xz(1.0, -1.0), 300.0));
        assert_eq!(pass.cutting_moves().count(), 2);
        assert_eq!(pass.moves[0].mode(), MotionMode::Rapid);
    }

    #[test]
    fn test_gcode_display() {
        let gcode = GCode {
            lines: vec!["G90".to_string(), "G21".to_string()],
        };
        assert_eq!(gcode.to_string(), "G90\nG21\n");

        let mut out = Vec::new();
        gcode.write_to(&mut out).unwrap();
        assert_eq!(out, b"G90\nG21\n");
    }
}
