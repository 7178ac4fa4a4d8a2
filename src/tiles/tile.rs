//! Per-tile data

use serde::{Deserialize, Serialize};

use super::biome::{Biome, Improvement};
use super::hex::HexCoord;
use crate::core::types::{ArmyId, CivId, ReligionId, UnitId};

/// Occupancy layers; each holds at most one occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupancyLayer {
    Military,
    Civilian,
}

/// Something standing on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    Army(ArmyId),
    Unit(UnitId),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub military: Option<Occupant>,
    pub civilian: Option<Occupant>,
}

impl Occupancy {
    pub fn get(&self, layer: OccupancyLayer) -> Option<Occupant> {
        match layer {
            OccupancyLayer::Military => self.military,
            OccupancyLayer::Civilian => self.civilian,
        }
    }

    pub fn slot_mut(&mut self, layer: OccupancyLayer) -> &mut Option<Occupant> {
        match layer {
            OccupancyLayer::Military => &mut self.military,
            OccupancyLayer::Civilian => &mut self.civilian,
        }
    }
}

/// Accumulated religious pressure on a tile, kept sorted by religion id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReligionPressure {
    entries: Vec<(ReligionId, f32)>,
}

impl ReligionPressure {
    pub fn add(&mut self, religion: ReligionId, amount: f32) {
        match self.entries.binary_search_by_key(&religion, |(id, _)| *id) {
            Ok(i) => {
                let value = &mut self.entries[i].1;
                *value = (*value + amount).max(0.0);
            }
            Err(i) => self.entries.insert(i, (religion, amount.max(0.0))),
        }
    }

    pub fn get(&self, religion: ReligionId) -> f32 {
        self.entries
            .binary_search_by_key(&religion, |(id, _)| *id)
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }

    /// Religion with the highest pressure; lowest id wins ties
    pub fn dominant(&self) -> Option<(ReligionId, f32)> {
        self.entries
            .iter()
            .filter(|(_, p)| *p > 0.0)
            .fold(None, |best: Option<(ReligionId, f32)>, &(id, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((id, p)),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, p)| *p <= 0.0)
    }
}

/// A single hex tile on the planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: HexCoord,
    pub biome: Biome,
    pub elevation: f32,
    pub is_hill: bool,
    pub temperature: f32,
    pub moisture: f32,
    pub occupants: Occupancy,
    pub improvement: Option<Improvement>,
    pub owner: Option<CivId>,
    pub religion: ReligionPressure,
}

impl Tile {
    pub fn new(coord: HexCoord, biome: Biome) -> Self {
        Self {
            coord,
            biome,
            elevation: 0.0,
            is_hill: false,
            temperature: 0.5,
            moisture: 0.5,
            occupants: Occupancy::default(),
            improvement: None,
            owner: None,
            religion: ReligionPressure::default(),
        }
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_hill(mut self) -> Self {
        self.is_hill = true;
        self
    }

    pub fn is_land(&self) -> bool {
        self.biome.is_land()
    }

    /// Movement points spent entering this tile
    pub fn movement_cost(&self) -> u32 {
        if let Some(cost) = self.improvement.and_then(|i| i.movement_override()) {
            return cost;
        }
        self.biome.movement_cost() + u32::from(self.is_hill)
    }
}
