use crate::error::{non_negative, positive, ConfigError};
use crate::grip::GripSpec;
use crate::hollow::HollowConfig;
use crate::taper_profile::{StationTable, TaperProfile};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Closed interval of reachable machine coordinates on one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, name: &'static str) -> std::result::Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NotFinite { name });
        }
        positive(name, self.max - self.min)
    }
}

/// Physical travel of the mill. Coordinates outside are rejected, never clamped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TravelLimits {
    pub x: AxisRange,
    pub z: AxisRange,
    /// `None` leaves the rotary axis unbounded (continuous turning).
    #[serde(default)]
    pub a: Option<AxisRange>,
}

impl Default for TravelLimits {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-10.0, 1700.0),
            z: AxisRange::new(-60.0, 60.0),
            a: None,
        }
    }
}

/// Machine parameters shared by the taper and hollow generators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MachineConfig {
    /// Cutting feed (mm/min).
    pub feed_rate: f64,
    /// Safe Z above the strip surface (mm).
    pub rapid_height: f64,
    /// Zero-point correction added to every taper cut depth (mm).
    pub zero_offset: f64,
    /// Extra length cut past the butt station at the butt dimension (mm).
    pub overshoot: f64,
    /// X resolution of the generated toolpath (mm).
    pub step_resolution: f64,
    pub travel: TravelLimits,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            feed_rate: 300.0,
            rapid_height: 5.0,
            zero_offset: 0.0,
            overshoot: 10.0,
            step_resolution: 1.0,
            travel: TravelLimits::default(),
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        positive("feed_rate", self.feed_rate)?;
        non_negative("rapid_height", self.rapid_height)?;
        if !self.zero_offset.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "zero_offset",
            });
        }
        non_negative("overshoot", self.overshoot)?;
        positive("step_resolution", self.step_resolution)?;
        self.travel.x.validate("travel.x")?;
        self.travel.z.validate("travel.z")?;
        if let Some(a) = &self.travel.a {
            a.validate("travel.a")?;
        }
        Ok(())
    }
}

/// Complete, immutable input for one run of any generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MillConfig {
    pub machine: MachineConfig,
    pub taper: StationTable,
    pub hollow: HollowConfig,
    pub grip: GripSpec,
}

impl MillConfig {
    /// Build the taper profile described by this configuration.
    pub fn taper_profile(&self) -> std::result::Result<TaperProfile, ConfigError> {
        TaperProfile::from_table(&self.taper, self.machine.overshoot)
    }

    /// Check every section. Generators re-check the sections they consume.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.machine.validate()?;
        let profile = self.taper_profile()?;
        self.hollow.validate(profile.length())?;
        self.grip.validate()
    }

    /// Load a configuration from the provided path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let config: MillConfig = serde_json::from_slice(&data)
            .with_context(|| format!("deserialize config {}", path.display()))?;
        Ok(config)
    }

    /// Persist the configuration to the provided path, ensuring the directory exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(self).context("serialize config to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write config {}", path.display()))
    }

    /// Resolve the per-user config path (`~/.rodmill/config.json`).
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".rodmill").join("config.json"))
    }

    /// An explicit path must exist. Without one, the per-user config is used
    /// when present and the built-in tables otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        match Self::default_config_path() {
            Ok(default_path) if default_path.exists() => {
                tracing::debug!(path = %default_path.display(), "using per-user config");
                Self::load_from_path(&default_path)
            }
            _ => {
                tracing::debug!("using built-in config");
                Ok(Self::default())
            }
        }
    }
}
