//! Two-phase battle hand-off
//!
//! Phase one partitions the armies on a contested tile into attacker and
//! defender buckets and invokes the tactical layer. Phase two reconciles
//! casualties once the tactical layer reports back. Each contested tile has
//! at most one battle in flight.

use serde::{Deserialize, Serialize};

use super::{BattleResult, TacticalBattles};
use crate::army::{ArmyManager, BattleSide};
use crate::core::types::{ArmyId, CivId, TileIndex, UnitId};
use crate::tiles::TileStore;

/// Participants handed to the tactical layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleStart {
    pub tile: TileIndex,
    pub attacker: CivId,
    pub defender: CivId,
    pub attacker_armies: Vec<ArmyId>,
    pub defender_armies: Vec<ArmyId>,
    pub attacker_units: Vec<UnitId>,
    pub defender_units: Vec<UnitId>,
}

/// Cached participant set, valid until reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBattle {
    pub tile: TileIndex,
    pub attacker: CivId,
    pub defender: CivId,
    pub armies: Vec<ArmyId>,
    pub units: Vec<UnitId>,
}

/// What reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub tile: Option<TileIndex>,
    pub casualties: Vec<UnitId>,
    pub survivors: Vec<UnitId>,
    pub destroyed: Vec<ArmyId>,
    /// Cached armies that no longer existed at reconciliation
    pub missing: Vec<ArmyId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.tile.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleHandoff {
    pending: Vec<PendingBattle>,
}

impl BattleHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Battle awaiting its outcome on `tile`
    pub fn pending(&self, tile: TileIndex) -> Option<&PendingBattle> {
        self.pending.iter().find(|p| p.tile == tile)
    }

    pub fn is_pending(&self, tile: TileIndex) -> bool {
        self.pending(tile).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn all_pending(&self) -> &[PendingBattle] {
        &self.pending
    }

    /// Whether `army` is cached in any battle in flight
    pub fn involves(&self, army: ArmyId) -> bool {
        self.pending.iter().any(|p| p.armies.contains(&army))
    }

    /// Hand every cached battle to a fresh tactical layer
    ///
    /// Used after loading a snapshot. Participants are re-read from their
    /// battle flags; a battle with no surviving participant is dropped.
    /// Returns the number of battles handed over.
    pub fn resume<T: TacticalBattles + ?Sized>(&mut self, manager: &ArmyManager, tactical: &mut T) -> usize {
        let side_of = |pending: &PendingBattle, side: BattleSide| -> Vec<UnitId> {
            pending
                .units
                .iter()
                .copied()
                .filter(|id| manager.unit(*id).is_some_and(|u| u.battle_side == Some(side)))
                .collect()
        };

        let mut resumed = 0;
        self.pending.retain(|pending| {
            let attacker_units = side_of(pending, BattleSide::Attacker);
            let defender_units = side_of(pending, BattleSide::Defender);
            if attacker_units.is_empty() && defender_units.is_empty() {
                tracing::warn!("Dropping battle at {} with no participants left", pending.tile);
                return false;
            }
            tactical.start_battle(pending.attacker, pending.defender, &attacker_units, &defender_units);
            resumed += 1;
            true
        });

        if resumed > 0 {
            tracing::info!("Resumed {} battles in flight", resumed);
        }
        resumed
    }

    /// Hand the armies on `tile` to the tactical layer
    ///
    /// The first army found decides the attacking civilization; every army
    /// of any other civilization defends. Returns `None` when the tile
    /// holds no opposing side or is already being fought over.
    pub fn initiate<T: TacticalBattles + ?Sized>(
        &mut self,
        tile: TileIndex,
        manager: &mut ArmyManager,
        tactical: &mut T,
    ) -> Option<BattleStart> {
        if self.is_pending(tile) {
            tracing::trace!("Battle at {} already in flight", tile);
            return None;
        }

        let armies = manager.armies_at(tile);
        let attacker = manager.army(*armies.first()?)?.owner;

        let mut attacker_armies = Vec::new();
        let mut defender_armies = Vec::new();
        for id in armies {
            let Some(army) = manager.army(id) else {
                continue;
            };
            if army.owner == attacker {
                attacker_armies.push(id);
            } else {
                defender_armies.push(id);
            }
        }

        let defender = manager.army(*defender_armies.first()?)?.owner;

        let attacker_units = Self::enlist(manager, &attacker_armies, BattleSide::Attacker);
        let defender_units = Self::enlist(manager, &defender_armies, BattleSide::Defender);

        let mut cached = attacker_armies.clone();
        cached.extend(defender_armies.iter().copied());
        let mut units = attacker_units.clone();
        units.extend(defender_units.iter().copied());

        self.pending.push(PendingBattle {
            tile,
            attacker,
            defender,
            armies: cached,
            units,
        });

        tracing::info!(
            "Battle at {}: {} ({} units) attacks {} ({} units)",
            tile,
            attacker,
            attacker_units.len(),
            defender,
            defender_units.len()
        );
        tactical.start_battle(attacker, defender, &attacker_units, &defender_units);

        Some(BattleStart {
            tile,
            attacker,
            defender,
            attacker_armies,
            defender_armies,
            attacker_units,
            defender_units,
        })
    }

    /// Flag every unit of `armies` for battle on `side`
    ///
    /// Engaged armies also drop any unfinished march.
    fn enlist(manager: &mut ArmyManager, armies: &[ArmyId], side: BattleSide) -> Vec<UnitId> {
        let mut roster = Vec::new();
        for id in armies {
            if let Some(army) = manager.army_mut(*id) {
                army.path.clear();
                roster.extend(army.units.iter().copied());
            }
        }

        let mut enlisted = Vec::with_capacity(roster.len());
        for unit_id in roster {
            if let Some(unit) = manager.unit_mut(unit_id) {
                unit.enter_battle(side);
                enlisted.push(unit_id);
            }
        }
        enlisted
    }

    /// Fold the tactical outcome back into the strategic armies
    ///
    /// Dead units leave their army and the global unit list; survivors are
    /// hidden and reset. Armies emptied by casualties are destroyed. The
    /// cached participants for `result.tile` are cleared whatever happens,
    /// so a result for a tile with nothing pending changes nothing.
    pub fn reconcile(
        &mut self,
        result: &BattleResult,
        manager: &mut ArmyManager,
        store: &mut TileStore,
    ) -> ReconcileReport {
        let Some(slot) = self.pending.iter().position(|p| p.tile == result.tile) else {
            tracing::trace!("Reconcile for {} with no pending battle ignored", result.tile);
            return ReconcileReport::default();
        };
        let pending = self.pending.remove(slot);

        let mut report = ReconcileReport {
            tile: Some(pending.tile),
            ..ReconcileReport::default()
        };

        for r in &result.reports {
            if let Some(unit) = manager.unit_mut(r.unit) {
                unit.health = r.health;
                unit.strength = r.strength;
                unit.routed = r.routed;
            }
        }

        for army_id in &pending.armies {
            let Some(army) = manager.army(*army_id) else {
                report.missing.push(*army_id);
                continue;
            };
            let roster = army.units.clone();

            let mut gone = Vec::new();
            for unit_id in roster {
                match manager.unit(unit_id).map(|u| u.is_alive()) {
                    None => gone.push(unit_id),
                    Some(false) => {
                        manager.remove_unit(unit_id);
                        report.casualties.push(unit_id);
                    }
                    Some(true) => {
                        if let Some(unit) = manager.unit_mut(unit_id) {
                            unit.leave_battle();
                        }
                        report.survivors.push(unit_id);
                    }
                }
            }

            if let Some(army) = manager.army_mut(*army_id) {
                army.units.retain(|u| !gone.contains(u));
            }

            if manager.army(*army_id).is_some_and(|a| a.is_empty()) {
                manager.destroy(*army_id, store);
                report.destroyed.push(*army_id);
            }
        }

        // Participants whose army vanished mid-battle
        for unit_id in &pending.units {
            let Some(unit) = manager.unit(*unit_id) else {
                continue;
            };
            if unit.battle_side.is_none() {
                continue;
            }
            if unit.is_alive() {
                if let Some(unit) = manager.unit_mut(*unit_id) {
                    unit.leave_battle();
                }
                report.survivors.push(*unit_id);
            } else {
                let army = unit.army;
                manager.remove_unit(*unit_id);
                report.casualties.push(*unit_id);
                if let Some(army) = army.filter(|a| manager.army(*a).is_some_and(|a| a.is_empty())) {
                    manager.destroy(army, store);
                    report.destroyed.push(army);
                }
            }
        }
        manager.refresh_occupancy(store, pending.tile);

        tracing::info!(
            "Battle at {} reconciled: {} dead, {} survivors, {} armies destroyed",
            pending.tile,
            report.casualties.len(),
            report.survivors.len(),
            report.destroyed.len()
        );
        report
    }
}
