//! Battle hand-off between the strategic map and the tactical layer
//!
//! When hostile armies share a tile their units are handed to a tactical
//! battle. The tactical layer reports back once the fight is over and
//! survivors are folded back into their armies.

pub mod auto;
pub mod handoff;

pub use auto::AutoResolver;
pub use handoff::{BattleHandoff, BattleStart, PendingBattle, ReconcileReport};

use serde::{Deserialize, Serialize};

use crate::core::types::{CivId, TileIndex, UnitId};

/// The tactical battle subsystem, seen from the strategic core
pub trait TacticalBattles {
    /// Play out a battle between the two unit lists
    ///
    /// The call is synchronous; the outcome arrives later through
    /// `Simulation::on_battle_ended`.
    fn start_battle(
        &mut self,
        attacker: CivId,
        defender: CivId,
        attacker_units: &[UnitId],
        defender_units: &[UnitId],
    );
}

/// Final state of one unit as reported by the tactical layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: UnitId,
    pub health: u32,
    pub strength: u32,
    pub routed: bool,
}

/// Outcome of a tactical battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// Contested tile the battle was started for
    pub tile: TileIndex,
    pub winner: Option<CivId>,
    /// Units not listed keep whatever state the tactical layer left them in
    pub reports: Vec<UnitReport>,
}

impl BattleResult {
    pub fn new(tile: TileIndex, winner: Option<CivId>) -> Self {
        Self {
            tile,
            winner,
            reports: Vec::new(),
        }
    }

    pub fn with_report(mut self, unit: UnitId, health: u32, strength: u32) -> Self {
        self.reports.push(UnitReport {
            unit,
            health,
            strength,
            routed: false,
        });
        self
    }
}
