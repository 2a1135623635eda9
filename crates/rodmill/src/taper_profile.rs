use crate::error::{non_negative, ConfigError, MillError, Result};
use crate::types::LengthUnit;
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing positions against profile or segment bounds (mm).
pub const POSITION_EPSILON: f64 = 1e-9;

/// A measured sample along the rod, normalized to millimetres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub position: f64,
    /// Flat-to-flat dimension at `position`.
    pub dimension: f64,
}

impl Station {
    pub fn new(position: f64, dimension: f64) -> Self {
        Self {
            position,
            dimension,
        }
    }
}

/// The literal station table as written by the rod maker: positions are
/// usually given in inches (5" stations), dimensions in millimetres.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationTable {
    pub position_unit: LengthUnit,
    pub dimension_unit: LengthUnit,
    /// `(position, dimension)` pairs, tip first.
    pub stations: Vec<(f64, f64)>,
}

impl StationTable {
    /// Convert both columns to millimetres.
    pub fn normalize(&self) -> Vec<Station> {
        self.stations
            .iter()
            .map(|&(position, dimension)| {
                Station::new(
                    self.position_unit.to_mm(position),
                    self.dimension_unit.to_mm(dimension),
                )
            })
            .collect()
    }
}

impl Default for StationTable {
    /// 7'6" 4wt hex taper, 5" stations.
    fn default() -> Self {
        Self {
            position_unit: LengthUnit::Inch,
            dimension_unit: LengthUnit::Millimeter,
            stations: vec![
                (0.0, 1.52),
                (5.0, 1.78),
                (10.0, 2.03),
                (15.0, 2.29),
                (20.0, 2.54),
                (25.0, 2.79),
                (30.0, 3.05),
                (35.0, 3.30),
                (40.0, 3.56),
                (45.0, 3.81),
                (50.0, 4.06),
                (55.0, 4.32),
                (60.0, 4.57),
            ],
        }
    }
}

/// Piecewise-linear dimension profile along the rod, held flat across the
/// overshoot past the butt station.
#[derive(Debug, Clone, PartialEq)]
pub struct TaperProfile {
    stations: Vec<Station>,
    overshoot: f64,
}

impl TaperProfile {
    pub fn new(stations: Vec<Station>, overshoot: f64) -> std::result::Result<Self, ConfigError> {
        if stations.len() < 2 {
            return Err(ConfigError::TooFewStations {
                count: stations.len(),
            });
        }
        non_negative("overshoot", overshoot)?;

        for (index, station) in stations.iter().enumerate() {
            if !station.position.is_finite() {
                return Err(ConfigError::NotFinite {
                    name: "station position",
                });
            }
            non_negative("station dimension", station.dimension)?;
            if index > 0 {
                let previous = stations[index - 1].position;
                if station.position <= previous {
                    return Err(ConfigError::StationsNotIncreasing {
                        index,
                        previous,
                        position: station.position,
                    });
                }
            }
        }

        Ok(Self {
            stations,
            overshoot,
        })
    }

    /// Build from a literal table, normalizing units once.
    pub fn from_table(
        table: &StationTable,
        overshoot: f64,
    ) -> std::result::Result<Self, ConfigError> {
        Self::new(table.normalize(), overshoot)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn overshoot(&self) -> f64 {
        self.overshoot
    }

    /// Tip position.
    pub fn start(&self) -> f64 {
        self.stations[0].position
    }

    /// Butt position (last real station).
    pub fn end(&self) -> f64 {
        self.last().position
    }

    /// End of the cut including the overshoot.
    pub fn cut_end(&self) -> f64 {
        self.end() + self.overshoot
    }

    /// Rod length between first and last station.
    pub fn length(&self) -> f64 {
        self.end() - self.start()
    }

    fn last(&self) -> &Station {
        &self.stations[self.stations.len() - 1]
    }

    /// Interpolated dimension at `position`.
    pub fn depth_at(&self, position: f64) -> Result<f64> {
        let (min, max) = (self.start(), self.cut_end());
        if !position.is_finite()
            || position < min - POSITION_EPSILON
            || position > max + POSITION_EPSILON
        {
            return Err(MillError::OutOfRange { position, min, max });
        }

        let upper = self.stations.partition_point(|s| s.position <= position);
        if upper == 0 {
            return Ok(self.stations[0].dimension);
        }
        if upper >= self.stations.len() {
            // flat hold across the overshoot
            return Ok(self.last().dimension);
        }

        let s0 = self.stations[upper - 1];
        let s1 = self.stations[upper];
        let t = (position - s0.position) / (s1.position - s0.position);
        Ok(s0.dimension + t * (s1.dimension - s0.dimension))
    }

    /// Taper-side cut depth (strip height) at `position`.
    pub fn strip_height_at(&self, position: f64) -> Result<f64> {
        self.depth_at(position).map(strip_height)
    }
}

/// Height of a hex strip with the given flat-to-flat dimension.
pub fn strip_height(dimension: f64) -> f64 {
    dimension / 2.0
}

/// Positions `start, start + step, ...` ending exactly at `end`.
///
/// Positions are computed by multiplication so rounding does not accumulate
/// over long rods; a final partial step is clipped to `end`.
pub fn sample_positions(start: f64, end: f64, step: f64) -> Vec<f64> {
    let mut positions = Vec::new();
    let mut k: u64 = 0;
    loop {
        let x = start + k as f64 * step;
        if x >= end - POSITION_EPSILON {
            break;
        }
        positions.push(x);
        k += 1;
    }
    positions.push(end);
    positions
}
