//! Hollow milling of the pith side of a strip.
//!
//! The rod is tiled into solid zones (tip, butt and glue lands) and the
//! intervals between them. Each interval ramps in from zero depth, runs at
//! full hollow depth and ramps back out, so the cutter never steps at a land
//! edge. Full hollow depth follows the taper, leaving `wall_thickness` of
//! power fibres under the cut.

use crate::config::MillConfig;
use crate::error::{non_negative, positive, ConfigError, MillError, Result};
use crate::postprocessor::Program;
use crate::taper_profile::{sample_positions, TaperProfile, POSITION_EPSILON};
use crate::types::{AxisTarget, Motion, PassKind, ToolpathPass};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Depth below which a sample counts as uncut (mm).
pub const CUT_THRESHOLD: f64 = 0.01;

/// Sample positions closer than this are merged (mm).
const SAMPLE_MERGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HollowConfig {
    /// Solid length at the tip (mm).
    pub tip_solid: f64,
    /// Solid length at the butt (mm).
    pub butt_solid: f64,
    /// Glue land spacing, center to center (mm).
    pub land_spacing: f64,
    pub land_width: f64,
    /// Length of each eased ramp between solid and hollow (mm).
    pub transition: f64,
    /// Remaining wall under the hollow (mm).
    pub wall_thickness: f64,
    /// Overrides the machine feed rate for the hollowing pass.
    pub feed_rate: Option<f64>,
}

impl Default for HollowConfig {
    fn default() -> Self {
        Self {
            tip_solid: 80.0,
            butt_solid: 60.0,
            land_spacing: 150.0,
            land_width: 12.0,
            transition: 8.0,
            wall_thickness: 0.4,
            feed_rate: Some(200.0),
        }
    }
}

impl HollowConfig {
    /// Check the parameters against a rod of `length` mm.
    pub fn validate(&self, length: f64) -> std::result::Result<(), ConfigError> {
        non_negative("tip_solid", self.tip_solid)?;
        non_negative("butt_solid", self.butt_solid)?;
        positive("land_spacing", self.land_spacing)?;
        positive("land_width", self.land_width)?;
        positive("transition", self.transition)?;
        non_negative("wall_thickness", self.wall_thickness)?;
        if let Some(feed_rate) = self.feed_rate {
            positive("hollow.feed_rate", feed_rate)?;
        }
        if self.land_width >= self.land_spacing {
            return Err(ConfigError::LandWiderThanSpacing {
                land_width: self.land_width,
                land_spacing: self.land_spacing,
            });
        }
        if self.tip_solid + self.butt_solid + self.land_width > length + POSITION_EPSILON {
            return Err(ConfigError::ReservedExceedsLength {
                tip_solid: self.tip_solid,
                butt_solid: self.butt_solid,
                land_width: self.land_width,
                length,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SegmentKind {
    Solid,
    /// Ramp from solid down to full hollow depth.
    TransitionIn,
    Hollow,
    /// Ramp from full hollow depth back up to solid.
    TransitionOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HollowSegment {
    pub kind: SegmentKind,
    pub start: f64,
    pub end: f64,
}

impl HollowSegment {
    fn new(kind: SegmentKind, start: f64, end: f64) -> Self {
        Self { kind, start, end }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= POSITION_EPSILON
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start - POSITION_EPSILON && position <= self.end + POSITION_EPSILON
    }

    /// Fraction of full hollow depth cut at `position`.
    pub fn depth_factor(&self, position: f64) -> f64 {
        match self.kind {
            SegmentKind::Solid => 0.0,
            SegmentKind::Hollow => 1.0,
            SegmentKind::TransitionIn => ease((position - self.start) / self.len()),
            SegmentKind::TransitionOut => ease((self.end - position) / self.len()),
        }
    }
}

/// A glue land. `center` is the nominal center, `start..end` the zone after clipping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LandZone {
    pub center: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HollowSample {
    pub position: f64,
    pub kind: SegmentKind,
    /// Hollow depth below the strip surface (mm, positive down).
    pub depth: f64,
}

/// `sin²(π/2·t)`, zero slope at both ends.
pub fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    (FRAC_PI_2 * t).sin().powi(2)
}

/// Place glue lands from the tip-solid boundary toward the butt solid.
///
/// The first land starts exactly where the tip solid ends, so it is counted
/// as a land but merges into the tip solid zone in `classify_segments`
/// rather than standing as a separate rib.
pub fn land_zones(rod_start: f64, rod_end: f64, config: &HollowConfig) -> Vec<LandZone> {
    let tip_end = rod_start + config.tip_solid;
    let butt_start = rod_end - config.butt_solid;
    let half = config.land_width / 2.0;

    let mut lands = Vec::new();
    let mut k: u64 = 0;
    loop {
        let center = tip_end + half + k as f64 * config.land_spacing;
        let start = center - half;
        if start >= butt_start - POSITION_EPSILON {
            break;
        }
        let end = (center + half).min(butt_start);
        if end - start > POSITION_EPSILON {
            lands.push(LandZone { center, start, end });
        }
        k += 1;
    }
    lands
}

/// Tile `rod_start..rod_end` into solid, transition and hollow segments.
pub fn classify_segments(
    rod_start: f64,
    rod_end: f64,
    config: &HollowConfig,
    lands: &[LandZone],
) -> Vec<HollowSegment> {
    let mut solids: Vec<(f64, f64)> = Vec::with_capacity(lands.len() + 2);
    solids.push((rod_start, rod_start + config.tip_solid));
    solids.extend(lands.iter().map(|land| (land.start, land.end)));
    solids.push((rod_end - config.butt_solid, rod_end));
    solids.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Touching or overlapping solid zones become one.
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(solids.len());
    for (start, end) in solids {
        match merged.last_mut() {
            Some(last) if start <= last.1 + POSITION_EPSILON => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut segments = Vec::new();
    let mut cursor = rod_start;
    for (start, end) in merged {
        if start > cursor + POSITION_EPSILON {
            push_gap(&mut segments, cursor, start, config.transition);
        }
        if end - start > POSITION_EPSILON {
            segments.push(HollowSegment::new(SegmentKind::Solid, start, end));
        }
        cursor = end;
    }
    if rod_end > cursor + POSITION_EPSILON {
        push_gap(&mut segments, cursor, rod_end, config.transition);
    }
    segments
}

fn push_gap(segments: &mut Vec<HollowSegment>, start: f64, end: f64, transition: f64) {
    let gap = end - start;
    if gap + POSITION_EPSILON >= 2.0 * transition {
        segments.push(HollowSegment::new(
            SegmentKind::TransitionIn,
            start,
            start + transition,
        ));
        if gap - 2.0 * transition > POSITION_EPSILON {
            segments.push(HollowSegment::new(
                SegmentKind::Hollow,
                start + transition,
                end - transition,
            ));
        }
        segments.push(HollowSegment::new(
            SegmentKind::TransitionOut,
            end - transition,
            end,
        ));
    } else {
        // Too short for a flat floor: the two ramps meet in the middle.
        tracing::warn!(
            start,
            end,
            transition,
            "hollow interval shorter than two transitions, blending without a flat floor"
        );
        let mid = start + gap / 2.0;
        segments.push(HollowSegment::new(SegmentKind::TransitionIn, start, mid));
        segments.push(HollowSegment::new(SegmentKind::TransitionOut, mid, end));
    }
}

/// Hollow-side depth profile of one strip.
#[derive(Debug, Clone)]
pub struct HollowProfile {
    profile: TaperProfile,
    wall_thickness: f64,
    lands: Vec<LandZone>,
    segments: Vec<HollowSegment>,
    samples: Vec<HollowSample>,
}

impl HollowProfile {
    pub fn build(profile: &TaperProfile, config: &HollowConfig, step: f64) -> Result<Self> {
        config.validate(profile.length())?;
        positive("step_resolution", step)?;

        let (rod_start, rod_end) = (profile.start(), profile.end());
        let lands = land_zones(rod_start, rod_end, config);
        let segments = classify_segments(rod_start, rod_end, config, &lands);

        let mut hollow = Self {
            profile: profile.clone(),
            wall_thickness: config.wall_thickness,
            lands,
            segments,
            samples: Vec::new(),
        };

        // (position, is segment boundary)
        let mut positions: Vec<(f64, bool)> = sample_positions(rod_start, rod_end, step)
            .into_iter()
            .map(|position| (position, false))
            .collect();
        for segment in &hollow.segments {
            positions.push((segment.start, true));
            positions.push((segment.end, true));
        }
        positions.sort_by(|a, b| a.0.total_cmp(&b.0));
        // A boundary always survives a merge with a nearby grid point.
        positions.dedup_by(|later, kept| {
            if (later.0 - kept.0).abs() >= SAMPLE_MERGE_TOLERANCE {
                return false;
            }
            if later.1 && !kept.1 {
                *kept = *later;
            }
            true
        });

        hollow.samples = positions
            .into_iter()
            .map(|(position, _)| {
                let segment = hollow.segment_at(position)?;
                Ok(HollowSample {
                    position,
                    kind: segment.kind,
                    depth: hollow.depth_in(segment, position)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            segments = hollow.segments.len(),
            samples = hollow.samples.len(),
            "classified hollow profile"
        );
        Ok(hollow)
    }

    pub fn lands(&self) -> &[LandZone] {
        &self.lands
    }

    pub fn segments(&self) -> &[HollowSegment] {
        &self.segments
    }

    pub fn samples(&self) -> &[HollowSample] {
        &self.samples
    }

    /// Full hollow depth at `position`: strip height minus wall, never negative.
    pub fn max_depth_at(&self, position: f64) -> Result<f64> {
        let height = self.profile.strip_height_at(position)?;
        Ok((height - self.wall_thickness).max(0.0))
    }

    pub fn segment_at(&self, position: f64) -> Result<&HollowSegment> {
        self.segments
            .iter()
            .find(|segment| segment.contains(position))
            .ok_or(MillError::OutOfRange {
                position,
                min: self.profile.start(),
                max: self.profile.end(),
            })
    }

    /// Hollow depth at an arbitrary position on the rod.
    pub fn depth_at(&self, position: f64) -> Result<f64> {
        let segment = self.segment_at(position)?;
        self.depth_in(segment, position)
    }

    fn depth_in(&self, segment: &HollowSegment, position: f64) -> Result<f64> {
        if segment.kind == SegmentKind::Solid {
            return Ok(0.0);
        }
        Ok(self.max_depth_at(position)? * segment.depth_factor(position))
    }
}

/// Build the hollowing program. Solid stretches are crossed at safe height;
/// every cut starts and ends on the last uncut sample next to it.
pub fn generate_hollow_program(config: &MillConfig) -> Result<Program> {
    let machine = &config.machine;
    machine.validate()?;
    let profile = config.taper_profile()?;
    let hollow = HollowProfile::build(&profile, &config.hollow, machine.step_resolution)?;
    let feed = config.hollow.feed_rate.unwrap_or(machine.feed_rate);

    let mut pass = ToolpathPass::new(PassKind::Finish, "Hollow milling pass");
    let mut cutting = false;
    let mut previous: Option<&HollowSample> = None;
    for sample in hollow.samples() {
        let cuts = sample.depth > CUT_THRESHOLD;
        match (cutting, cuts) {
            (false, true) => {
                let entry = previous.unwrap_or(sample);
                pass.push(Motion::rapid(AxisTarget::x(entry.position)));
                pass.push(Motion::feed(AxisTarget::z(-entry.depth), feed));
                if entry.position != sample.position {
                    pass.push(Motion::feed(
                        AxisTarget::xz(sample.position, -sample.depth),
                        feed,
                    ));
                }
                cutting = true;
            }
            (true, true) => {
                pass.push(Motion::feed(
                    AxisTarget::xz(sample.position, -sample.depth),
                    feed,
                ));
            }
            (true, false) => {
                pass.push(Motion::feed(
                    AxisTarget::xz(sample.position, -sample.depth),
                    feed,
                ));
                pass.push(Motion::rapid(AxisTarget::z(machine.rapid_height)));
                cutting = false;
            }
            (false, false) => {}
        }
        previous = Some(sample);
    }
    if cutting {
        pass.push(Motion::rapid(AxisTarget::z(machine.rapid_height)));
    }

    let land_list = hollow
        .lands()
        .iter()
        .map(|land| format!("{:.1}mm", land.center))
        .collect::<Vec<_>>()
        .join(", ");

    tracing::info!(
        lands = hollow.lands().len(),
        segments = hollow.segments().len(),
        samples = hollow.samples().len(),
        "generated hollow toolpath"
    );

    let hollow_config = &config.hollow;
    Ok(Program {
        title: "Hexrod Hollowing G-Code".to_string(),
        notes: vec![
            format!(
                "Tip solid: {:.1}mm | Butt solid: {:.1}mm | Rod length: {:.1}mm",
                hollow_config.tip_solid,
                hollow_config.butt_solid,
                profile.length()
            ),
            format!("Glue lands: {land_list}"),
            format!(
                "Land width: {:.1}mm | Transition: {:.1}mm | Wall thickness: {:.2}mm",
                hollow_config.land_width, hollow_config.transition, hollow_config.wall_thickness
            ),
            "Axes: X=length, Z=depth (Z0 = strip surface)".to_string(),
        ],
        rotary_mode: None,
        default_feed: feed,
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
