//! JSON save and load of the strategic state
//!
//! The tactical collaborator is not saved; the caller supplies a fresh one
//! on restore. Dirty tiles and queued events are transient and start empty.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::army::ArmyManager;
use crate::battle::{BattleHandoff, TacticalBattles};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{CivId, Tick};
use crate::fog::FogOfWar;
use crate::sim::{Alliances, Simulation};
use crate::tiles::TileStore;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub config: SimulationConfig,
    pub tick: Tick,
    pub turn: u32,
    pub local_civ: Option<CivId>,
    pub tiles: TileStore,
    pub fog: FogOfWar,
    pub armies: ArmyManager,
    pub battles: BattleHandoff,
    pub alliances: Alliances,
}

impl Snapshot {
    pub fn capture<T: TacticalBattles>(sim: &Simulation<T>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config: sim.config().clone(),
            tick: sim.current_tick(),
            turn: sim.turn(),
            local_civ: sim.local_civ(),
            tiles: sim.tiles().clone(),
            fog: sim.fog().clone(),
            armies: sim.armies().clone(),
            battles: sim.battles().clone(),
            alliances: sim.alliances().clone(),
        }
    }

    /// Rebuild a simulation around `tactical`; call `init` before ticking
    pub fn restore<T: TacticalBattles>(self, tactical: T) -> Result<Simulation<T>> {
        if self.version != SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version {} differs from {}, loading anyway",
                self.version,
                SNAPSHOT_VERSION
            );
        }
        Simulation::from_parts(
            self.config,
            self.tiles,
            self.fog,
            self.armies,
            self.battles,
            self.alliances,
            tactical,
            self.local_civ,
            self.tick,
            self.turn,
        )
    }
}

pub fn save<T: TacticalBattles>(sim: &Simulation<T>) -> Result<String> {
    Ok(serde_json::to_string(&Snapshot::capture(sim))?)
}

pub fn load(json: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(json)?)
}

pub fn save_to_file<T: TacticalBattles>(sim: &Simulation<T>, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&Snapshot::capture(sim))?;
    std::fs::write(path.as_ref(), json)?;
    tracing::info!("Saved snapshot to {}", path.as_ref().display());
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path.as_ref())?;
    load(&json)
}
