//! Biome and improvement tables
//!
//! Closed enums so every lookup is an exhaustive match.

use serde::{Deserialize, Serialize};

/// Surface classification of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Biome {
    Ocean,
    Coast,
    Lake,
    #[default]
    Grassland,
    Plains,
    Desert,
    Tundra,
    Snow,
    Forest,
    Jungle,
    Marsh,
    Mountain,
}

impl Biome {
    /// Whether armies can stand on this biome
    pub fn is_land(&self) -> bool {
        !matches!(self, Self::Ocean | Self::Coast | Self::Lake)
    }

    /// Movement points spent entering a tile of this biome
    pub fn movement_cost(&self) -> u32 {
        match self {
            Self::Grassland | Self::Plains | Self::Desert | Self::Tundra => 1,
            Self::Snow | Self::Forest | Self::Jungle | Self::Marsh => 2,
            Self::Mountain => 3,
            // Never entered by land pathing, priced for completeness
            Self::Ocean | Self::Coast | Self::Lake => 1,
        }
    }

    /// Defence multiplier bonus for armies holding a tile of this biome
    pub fn defense_bonus(&self) -> f32 {
        match self {
            Self::Grassland | Self::Plains | Self::Desert | Self::Tundra | Self::Snow => 0.0,
            Self::Forest | Self::Jungle => 0.2,
            Self::Marsh => 0.1,
            Self::Mountain => 0.5,
            Self::Ocean | Self::Coast | Self::Lake => 0.0,
        }
    }

    /// Classify from climate inputs
    ///
    /// `elevation` is in map units with sea level at 0.0.
    pub fn classify(elevation: f32, temperature: f32, moisture: f32) -> Self {
        if elevation < -0.3 {
            return Self::Ocean;
        }
        if elevation < 0.0 {
            return Self::Coast;
        }
        if elevation > 0.75 {
            return Self::Mountain;
        }

        match (temperature, moisture) {
            (t, _) if t < 0.15 => Self::Snow,
            (t, m) if t < 0.3 => {
                if m > 0.6 {
                    Self::Forest
                } else {
                    Self::Tundra
                }
            }
            (t, m) if t > 0.75 => {
                if m > 0.7 {
                    Self::Jungle
                } else if m < 0.25 {
                    Self::Desert
                } else {
                    Self::Plains
                }
            }
            (_, m) if m > 0.8 => Self::Marsh,
            (_, m) if m > 0.55 => Self::Forest,
            (_, m) if m < 0.3 => Self::Plains,
            _ => Self::Grassland,
        }
    }
}

/// Built improvement or district occupying a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Improvement {
    Farm,
    Mine,
    Road,
    Fort,
    CityCenter,
    Harbor,
}

impl Improvement {
    /// Movement cost override, if the improvement changes it
    pub fn movement_override(&self) -> Option<u32> {
        match self {
            Self::Road | Self::CityCenter => Some(1),
            Self::Farm | Self::Mine | Self::Fort | Self::Harbor => None,
        }
    }
}
