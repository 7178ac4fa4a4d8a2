//! Armies on the strategic map
//!
//! An army is a roster of units under one civilization, standing on one tile.

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{ArmyId, CivId, TileIndex, UnitId};

/// Lifecycle of an army
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArmyStatus {
    #[default]
    Active,
    /// Every unit moved into another army
    MergedAway,
    Destroyed,
}

/// Limits applied by the army manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyRules {
    pub min_units: usize,
    pub max_units: usize,
    pub movement_points: u32,
}

impl From<&SimulationConfig> for ArmyRules {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            min_units: config.min_army_units,
            max_units: config.max_army_units,
            movement_points: config.default_movement_points,
        }
    }
}

impl Default for ArmyRules {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub owner: CivId,
    pub tile: TileIndex,
    pub units: Vec<UnitId>,
    pub movement_points: u32,
    pub max_movement_points: u32,
    pub max_units: usize,
    /// Steps still to walk on a superseded-or-unfinished move order
    pub path: Vec<TileIndex>,
    pub status: ArmyStatus,
}

impl Army {
    pub fn new(id: ArmyId, owner: CivId, tile: TileIndex, rules: &ArmyRules) -> Self {
        Self {
            id,
            owner,
            tile,
            units: Vec::new(),
            movement_points: rules.movement_points,
            max_movement_points: rules.movement_points,
            max_units: rules.max_units,
            path: Vec::new(),
            status: ArmyStatus::Active,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn spare_capacity(&self) -> usize {
        self.max_units.saturating_sub(self.units.len())
    }

    pub fn is_active(&self) -> bool {
        self.status == ArmyStatus::Active
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.units.contains(&unit)
    }

    pub fn has_pending_move(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Read-only summary for UI panels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmyInfo {
    pub id: ArmyId,
    pub owner: CivId,
    pub tile: TileIndex,
    pub unit_count: usize,
    pub max_units: usize,
    pub movement_points: u32,
    pub max_movement_points: u32,
    pub total_strength: u32,
    pub destination: Option<TileIndex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spare_capacity() {
        let rules = ArmyRules {
            min_units: 1,
            max_units: 3,
            movement_points: 2,
        };
        let mut army = Army::new(ArmyId(1), CivId(1), TileIndex(0), &rules);
        assert_eq!(army.spare_capacity(), 3);
        army.units.extend([UnitId(1), UnitId(2), UnitId(3)]);
        assert_eq!(army.spare_capacity(), 0);
        army.units.push(UnitId(4));
        assert_eq!(army.spare_capacity(), 0);
    }

    #[test]
    fn test_rules_from_config() {
        let config = SimulationConfig {
            max_army_units: 12,
            default_movement_points: 4,
            ..SimulationConfig::default()
        };
        let rules = ArmyRules::from(&config);
        assert_eq!(rules.max_units, 12);
        assert_eq!(rules.movement_points, 4);
    }
}
