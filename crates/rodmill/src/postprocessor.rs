use crate::config::TravelLimits;
use crate::error::{MillError, Result};
use crate::types::{Axis, GCode, Motion, MotionMode, RotaryMode, ToolpathPass};

/// A complete motion program before it is turned into text.
#[derive(Debug, Clone)]
pub struct Program {
    pub title: String,
    /// Header comment lines describing the job.
    pub notes: Vec<String>,
    /// Declared once in the preamble when the program drives the A axis.
    pub rotary_mode: Option<RotaryMode>,
    /// Feed rate declared in the preamble (mm/min).
    pub default_feed: f64,
    /// Moves before the first pass (safe height, approach).
    pub start: Vec<Motion>,
    pub passes: Vec<ToolpathPass>,
    /// Moves after the last pass (retract, home).
    pub end: Vec<Motion>,
}

/// Turns motions into G-code words, emitting the motion and feed words only
/// when they change and rejecting coordinates outside machine travel.
#[derive(Debug)]
pub struct MotionEmitter {
    lines: Vec<String>,
    mode: Option<MotionMode>,
    feed: Option<f64>,
    limits: TravelLimits,
}

impl MotionEmitter {
    pub fn new(limits: TravelLimits) -> Self {
        Self {
            lines: Vec::new(),
            mode: None,
            feed: None,
            limits,
        }
    }

    pub fn comment(&mut self, text: &str) {
        self.lines.push(format!("; {text}"));
    }

    pub fn blank_line(&mut self) {
        self.lines.push(String::new());
    }

    /// Emit a non-motion modal declaration such as `G21 G90 G94`.
    pub fn declare(&mut self, words: &str) {
        self.lines.push(words.to_string());
    }

    /// Declare the feed rate on its own line if it differs from the current one.
    pub fn set_feed(&mut self, rate: f64) {
        if self.feed != Some(rate) {
            self.lines.push(format!("F{}", format_feed(rate)));
            self.feed = Some(rate);
        }
    }

    pub fn emit(&mut self, motion: &Motion) -> Result<()> {
        let target = motion.target();
        if target.is_empty() {
            return Ok(());
        }
        for (axis, value) in target.axes() {
            self.check_travel(axis, value)?;
        }

        let mut words = Vec::with_capacity(5);
        let mode = motion.mode();
        if self.mode != Some(mode) {
            words.push(match mode {
                MotionMode::Rapid => "G0".to_string(),
                MotionMode::Feed => "G1".to_string(),
            });
            self.mode = Some(mode);
        }

        for (axis, value) in target.axes() {
            let precision = match axis {
                Axis::X => 3,
                Axis::Z => 4,
                Axis::A => 3,
            };
            words.push(format!("{axis}{}", format_coord(value, precision)));
        }

        if let Motion::Feed { rate, .. } = motion {
            if self.feed != Some(*rate) {
                words.push(format!("F{}", format_feed(*rate)));
                self.feed = Some(*rate);
            }
        }

        self.lines.push(words.join(" "));
        Ok(())
    }

    /// Close the program with the end marker.
    pub fn finish(mut self) -> GCode {
        self.lines.push("M2".to_string());
        GCode { lines: self.lines }
    }

    fn check_travel(&self, axis: Axis, value: f64) -> Result<()> {
        let range = match axis {
            Axis::X => Some(self.limits.x),
            Axis::Z => Some(self.limits.z),
            Axis::A => self.limits.a,
        };
        match range {
            Some(range) if !value.is_finite() || !range.contains(value) => {
                Err(MillError::TravelExceeded {
                    axis,
                    value,
                    min: range.min,
                    max: range.max,
                })
            }
            None if !value.is_finite() => Err(MillError::TravelExceeded {
                axis,
                value,
                min: f64::NEG_INFINITY,
                max: f64::INFINITY,
            }),
            _ => Ok(()),
        }
    }
}

/// Convert a program to LinuxCNC-compatible G-code.
pub fn post_process_linuxcnc(program: &Program, limits: &TravelLimits) -> Result<GCode> {
    let mut out = MotionEmitter::new(*limits);

    out.comment(&program.title);
    for note in &program.notes {
        out.comment(note);
    }
    out.blank_line();

    // Metric, absolute, feed per minute
    out.declare("G21 G90 G94");
    out.set_feed(program.default_feed);
    if let Some(mode) = program.rotary_mode {
        let name = match mode {
            RotaryMode::Continuous => "CONTINUOUS",
            RotaryMode::Indexed => "INDEXED",
        };
        out.comment(&format!(
            "AXIS A MODE {name} (WRAPPED_ROTARY = {})",
            mode.wrapped_rotary()
        ));
    }
    out.blank_line();

    for motion in &program.start {
        out.emit(motion)?;
    }

    for pass in &program.passes {
        out.blank_line();
        out.comment(&format!("--- {} ---", pass.label));
        for motion in &pass.moves {
            out.emit(motion)?;
        }
    }

    out.blank_line();
    for motion in &program.end {
        out.emit(motion)?;
    }

    Ok(out.finish())
}

/// Fixed-precision coordinate without a negative zero.
fn format_coord(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => text,
    }
}

/// Feed rate with at most one decimal and no trailing zeros.
fn format_feed(rate: f64) -> String {
    let text = format!("{rate:.1}");
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisRange;
    use crate::types::{AxisTarget, PassKind};

    fn program_with(moves: Vec<Motion>) -> Program {
        let mut pass = ToolpathPass::new(PassKind::Finish, "test pass");
        pass.moves = moves;
        Program {
            title: "Test".to_string(),
            notes: vec![],
            rotary_mode: None,
            default_feed: 300.0,
            start: vec![Motion::rapid(AxisTarget::z(5.0))],
            passes: vec![pass],
            end: vec![Motion::rapid(AxisTarget::z(5.0))],
        }
    }

    #[test]
    fn test_postprocessor_structure() {
        let program = program_with(vec![
            Motion::rapid(AxisTarget::x(0.0)),
            Motion::feed(AxisTarget::xz(0.0, -1.0), 300.0),
            Motion::feed(AxisTarget::xz(10.0, -1.5), 300.0),
        ]);
        let gcode = post_process_linuxcnc(&program, &TravelLimits::default()).unwrap();

        assert_eq!(gcode.lines[0], "; Test");
        assert!(gcode.lines.iter().any(|l| l == "G21 G90 G94"));
        assert!(gcode.lines.iter().any(|l| l == "F300"));
        assert!(gcode.lines.iter().any(|l| l == "G0 Z5.0000"));
        assert!(gcode.lines.iter().any(|l| l == "X0.000"));
        assert!(gcode.lines.iter().any(|l| l == "G1 X0.000 Z-1.0000"));
        assert!(gcode.lines.iter().any(|l| l == "X10.000 Z-1.5000"));
        assert_eq!(gcode.lines.last().unwrap(), "M2");
    }

    #[test]
    fn test_mode_words_only_on_change() {
        let mut out = MotionEmitter::new(TravelLimits::default());
        out.emit(&Motion::rapid(AxisTarget::z(5.0))).unwrap();
        out.emit(&Motion::rapid(AxisTarget::x(1.0))).unwrap();
        out.emit(&Motion::feed(AxisTarget::z(-1.0), 100.0)).unwrap();
        out.emit(&Motion::feed(AxisTarget::x(2.0), 100.0)).unwrap();
        out.emit(&Motion::feed(AxisTarget::x(3.0), 50.0)).unwrap();
        out.emit(&Motion::rapid(AxisTarget::z(5.0))).unwrap();
        let gcode = out.finish();
        assert_eq!(
            gcode.lines,
            vec![
                "G0 Z5.0000",
                "X1.000",
                "G1 Z-1.0000 F100",
                "X2.000",
                "X3.000 F50",
                "G0 Z5.0000",
                "M2",
            ]
        );
    }

    #[test]
    fn test_rejects_out_of_travel() {
        let limits = TravelLimits {
            x: AxisRange::new(0.0, 100.0),
            z: AxisRange::new(-10.0, 10.0),
            a: Some(AxisRange::new(0.0, 360.0)),
        };
        let mut out = MotionEmitter::new(limits);
        assert!(matches!(
            out.emit(&Motion::rapid(AxisTarget::x(100.5))),
            Err(MillError::TravelExceeded { axis: Axis::X, .. })
        ));
        assert!(matches!(
            out.emit(&Motion::rapid(AxisTarget::a(400.0))),
            Err(MillError::TravelExceeded { axis: Axis::A, .. })
        ));
        assert!(out.emit(&Motion::rapid(AxisTarget::z(10.0))).is_ok());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_coord(-0.00001, 4), "0.0000");
        assert_eq!(format_coord(-0.76, 4), "-0.7600");
        assert_eq!(format_feed(150.0), "150");
        assert_eq!(format_feed(100.0 / 3.0), "33.3");
    }
}
