//! Simulation configuration with documented constants
//!
//! Values are loaded from TOML; any key left out falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{CoreError, Result};

/// Largest accepted army vision radius, in hex steps
pub const MAX_VISION_RADIUS: u32 = 32;

/// Configuration for the strategic simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === ARMIES ===
    /// Minimum roster size for a manually created army
    ///
    /// The orphan sweep ignores this and always forms single-unit armies.
    pub min_army_units: usize,

    /// Roster capacity of every army
    pub max_army_units: usize,

    /// Movement points granted to an army at the start of each turn
    pub default_movement_points: u32,

    // === SCHEDULING ===
    /// Ticks between orphan-capture sweeps
    pub sweep_interval: u64,

    // === FOG OF WAR ===
    /// When false every tile reports as visible
    pub fog_enabled: bool,

    /// Vision radius of an army in hex steps
    pub vision_radius: u32,

    // === GEOMETRY ===
    /// Hex outer radius in world units
    pub tile_size: f32,

    /// World units of height per unit of tile elevation
    pub elevation_scale: f32,

    // === RELIGION ===
    /// Fraction of a tile's dominant pressure pushed to each land neighbour per turn
    pub religion_spread_rate: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_army_units: 1,
            max_army_units: 8,
            default_movement_points: 2,
            sweep_interval: 60,
            fog_enabled: true,
            vision_radius: 2,
            tile_size: 1.0,
            elevation_scale: 0.1,
            religion_spread_rate: 0.1,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded simulation config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.min_army_units == 0 {
            return Err(CoreError::Config("min_army_units must be at least 1".into()));
        }

        if self.min_army_units > self.max_army_units {
            return Err(CoreError::Config(format!(
                "min_army_units ({}) should be <= max_army_units ({})",
                self.min_army_units, self.max_army_units
            )));
        }

        if self.sweep_interval == 0 {
            return Err(CoreError::Config("sweep_interval must be positive".into()));
        }

        if self.vision_radius > MAX_VISION_RADIUS {
            return Err(CoreError::Config(format!(
                "vision_radius ({}) must be at most {}",
                self.vision_radius, MAX_VISION_RADIUS
            )));
        }

        if self.tile_size <= 0.0 {
            return Err(CoreError::Config("tile_size must be positive".into()));
        }

        if !(0.0..=1.0).contains(&self.religion_spread_rate) {
            return Err(CoreError::Config(format!(
                "religion_spread_rate ({}) must be within 0..=1",
                self.religion_spread_rate
            )));
        }

        Ok(())
    }
}
