//! Army manager - owns every strategic unit and army
//!
//! Handles army creation, merge/split, selection, movement orders, the
//! periodic orphan sweep and hostile-army collision detection. Requirement
//! violations come back as `Err` after a warning and leave state untouched.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use super::types::{Army, ArmyInfo, ArmyRules, ArmyStatus};
use super::unit::{Unit, UnitState};
use crate::core::error::{CoreError, Result};
use crate::core::types::{ArmyId, CivId, TileIndex, UnitId};
use crate::pathfinding::{find_path, trim_to_budget};
use crate::tiles::{OccupancyLayer, Occupant, TileStore};

/// Result of executing a move order for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub army: ArmyId,
    pub from: TileIndex,
    pub to: TileIndex,
    pub spent: u32,
    /// Steps left for later turns
    pub remaining: Vec<TileIndex>,
}

impl MoveOutcome {
    pub fn arrived(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Result of merging one army into another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub moved: usize,
    /// Units left behind because the target was full
    pub rejected: usize,
    pub source_status: ArmyStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmyManager {
    rules: ArmyRules,
    units: AHashMap<UnitId, Unit>,
    armies: AHashMap<ArmyId, Army>,
    /// Registration order; drives every deterministic iteration
    registry: Vec<ArmyId>,
    selected: Option<ArmyId>,
    next_army_id: u32,
    next_unit_id: u32,
}

impl ArmyManager {
    pub fn new(rules: ArmyRules) -> Self {
        Self {
            rules,
            units: AHashMap::new(),
            armies: AHashMap::new(),
            registry: Vec::new(),
            selected: None,
            next_army_id: 1,
            next_unit_id: 1,
        }
    }

    pub fn rules(&self) -> &ArmyRules {
        &self.rules
    }

    // === UNITS ===

    /// Raise a new unit outside of any army
    pub fn spawn_unit(&mut self, owner: CivId, tile: TileIndex) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.insert(id, Unit::new(id, owner, tile));
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Drop a unit from the global list and from its army's roster
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if let Some(army) = unit.army.and_then(|a| self.armies.get_mut(&a)) {
            army.units.retain(|u| *u != id);
        }
        Some(unit)
    }

    /// Units not in any army, lowest id first
    pub fn units_outside_armies(&self) -> Vec<UnitId> {
        let mut orphans: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.army.is_none())
            .map(|u| u.id)
            .collect();
        orphans.sort_unstable();
        orphans
    }

    pub fn units_of(&self, civ: CivId) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.owner == civ)
            .map(|u| u.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // === REGISTRY ===

    pub fn army(&self, id: ArmyId) -> Option<&Army> {
        self.armies.get(&id)
    }

    pub fn army_mut(&mut self, id: ArmyId) -> Option<&mut Army> {
        self.armies.get_mut(&id)
    }

    pub fn army_count(&self) -> usize {
        self.registry.len()
    }

    /// Registered armies in registration order
    pub fn armies(&self) -> impl Iterator<Item = &Army> {
        self.registry.iter().filter_map(|id| self.armies.get(id))
    }

    pub fn armies_of(&self, civ: CivId) -> Vec<ArmyId> {
        self.armies()
            .filter(|a| a.owner == civ)
            .map(|a| a.id)
            .collect()
    }

    /// Active armies with a non-empty roster on a tile, in registration order
    pub fn armies_at(&self, tile: TileIndex) -> Vec<ArmyId> {
        self.armies()
            .filter(|a| a.is_active() && !a.is_empty() && a.tile == tile)
            .map(|a| a.id)
            .collect()
    }

    /// Every civilization that owns a unit or an army
    pub fn civs(&self) -> Vec<CivId> {
        let mut civs: Vec<CivId> = self
            .units
            .values()
            .map(|u| u.owner)
            .chain(self.armies.values().map(|a| a.owner))
            .collect();
        civs.sort_unstable();
        civs.dedup();
        civs
    }

    /// Add an army to the registry; a repeated id is ignored
    pub fn register(&mut self, army: Army) -> bool {
        if self.armies.contains_key(&army.id) {
            tracing::debug!("Ignoring double registration of {:?}", army.id);
            return false;
        }
        self.next_army_id = self.next_army_id.max(army.id.0 + 1);
        self.registry.push(army.id);
        self.armies.insert(army.id, army);
        true
    }

    /// Remove an army from the registry without touching its units
    pub fn unregister(&mut self, id: ArmyId) -> Option<Army> {
        let Some(army) = self.armies.remove(&id) else {
            tracing::debug!("Ignoring unregister of unknown {:?}", id);
            return None;
        };
        self.registry.retain(|a| *a != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(army)
    }

    fn allocate_army_id(&mut self) -> ArmyId {
        let id = ArmyId(self.next_army_id);
        self.next_army_id += 1;
        id
    }

    /// Re-point the tile's occupancy slots
    ///
    /// The military slot names the first army still standing there; the
    /// civilian slot names the lowest-id unit on the tile outside any army.
    pub fn refresh_occupancy(&self, store: &mut TileStore, tile: TileIndex) {
        let army = self.armies_at(tile).first().map(|&id| Occupant::Army(id));
        Self::sync_slot(store, tile, OccupancyLayer::Military, army);

        let orphan = self
            .units
            .values()
            .filter(|u| u.army.is_none() && u.tile == tile)
            .map(|u| u.id)
            .min()
            .map(Occupant::Unit);
        Self::sync_slot(store, tile, OccupancyLayer::Civilian, orphan);
    }

    fn sync_slot(store: &mut TileStore, tile: TileIndex, layer: OccupancyLayer, wanted: Option<Occupant>) {
        let current = store.occupant(tile, layer);
        if current == wanted {
            return;
        }
        match wanted {
            Some(occupant) => {
                store.set_occupant(tile, layer, occupant);
            }
            None => {
                store.clear_occupant(tile, layer);
            }
        }
    }

    // === LIFECYCLE ===

    /// Group units into a new army at `tile`
    ///
    /// Units owned by another civilization, already in an army, or unknown
    /// are silently left out. The roster is capped at the army capacity.
    pub fn create_army(
        &mut self,
        owner: CivId,
        tile: TileIndex,
        units: &[UnitId],
        store: &mut TileStore,
    ) -> Result<ArmyId> {
        if !store.contains(tile) {
            tracing::warn!("Cannot create army on unknown tile {}", tile);
            return Err(CoreError::UnknownTile(tile));
        }

        let mut roster: Vec<UnitId> = Vec::new();
        for &id in units {
            let Some(unit) = self.units.get(&id) else {
                continue;
            };
            if unit.owner != owner {
                tracing::trace!("Excluding {:?}: owned by {}, not {}", id, unit.owner, owner);
                continue;
            }
            if unit.army.is_some() || roster.contains(&id) {
                continue;
            }
            if roster.len() >= self.rules.max_units {
                break;
            }
            roster.push(id);
        }

        if roster.len() < self.rules.min_units {
            tracing::warn!(
                "Army for {} needs {} units, only {} eligible",
                owner,
                self.rules.min_units,
                roster.len()
            );
            return Err(CoreError::TooFewUnits {
                required: self.rules.min_units,
                available: roster.len(),
            });
        }

        Ok(self.form_army(owner, tile, roster, store))
    }

    fn form_army(&mut self, owner: CivId, tile: TileIndex, roster: Vec<UnitId>, store: &mut TileStore) -> ArmyId {
        let id = self.allocate_army_id();
        let mut army = Army::new(id, owner, tile, &self.rules);
        for unit_id in &roster {
            if let Some(unit) = self.units.get_mut(unit_id) {
                unit.army = Some(id);
                unit.tile = tile;
            }
        }
        army.units = roster;
        tracing::info!("{} formed {:?} with {} units at {}", owner, id, army.len(), tile);
        self.register(army);
        self.refresh_occupancy(store, tile);
        id
    }

    /// Unregister the army and release its units as orphans
    pub fn disband(&mut self, id: ArmyId, store: &mut TileStore) -> Result<Vec<UnitId>> {
        let Some(mut army) = self.unregister(id) else {
            tracing::warn!("Cannot disband unknown {:?}", id);
            return Err(CoreError::UnknownArmy(id));
        };
        army.status = ArmyStatus::Destroyed;
        for unit_id in &army.units {
            if let Some(unit) = self.units.get_mut(unit_id) {
                unit.army = None;
                unit.state = UnitState::Idle;
            }
        }
        self.refresh_occupancy(store, army.tile);
        tracing::info!("Disbanded {:?}, released {} units", id, army.len());
        Ok(army.units)
    }

    /// Unregister the army and delete every unit still on its roster
    pub fn destroy(&mut self, id: ArmyId, store: &mut TileStore) -> Option<Army> {
        let mut army = self.unregister(id)?;
        army.status = ArmyStatus::Destroyed;
        for unit_id in &army.units {
            self.units.remove(unit_id);
        }
        self.refresh_occupancy(store, army.tile);
        tracing::info!("Destroyed {:?} of {} at {}", id, army.owner, army.tile);
        Some(army)
    }

    /// Move units from `source` into `target` until the target is full
    ///
    /// Only same-owner armies on the same tile merge. Units that do not
    /// fit stay in `source`. An emptied source is retired.
    pub fn merge(&mut self, source: ArmyId, target: ArmyId, store: &mut TileStore) -> Result<MergeOutcome> {
        let src = self.armies.get(&source).ok_or(CoreError::UnknownArmy(source))?;
        let dst = self.armies.get(&target).ok_or(CoreError::UnknownArmy(target))?;

        if source == target {
            return Ok(MergeOutcome {
                moved: 0,
                rejected: 0,
                source_status: src.status,
            });
        }

        if src.owner != dst.owner {
            tracing::warn!("Refusing merge of {:?} into {:?}: owners differ", source, target);
            return Err(CoreError::OwnerMismatch {
                expected: dst.owner,
                found: src.owner,
            });
        }

        if src.tile != dst.tile {
            tracing::warn!("Refusing merge of {:?} into {:?}: not co-located", source, target);
            return Err(CoreError::NotColocated(source, target));
        }

        let spare = dst.spare_capacity();
        if spare == 0 {
            tracing::warn!("Refusing merge into {:?}: at capacity", target);
            return Err(CoreError::CapacityExceeded(target));
        }

        let count = spare.min(src.len());
        let rejected = src.len() - count;
        let tile = src.tile;
        let source_points = src.movement_points;

        let moving: Vec<UnitId> = match self.armies.get_mut(&source) {
            Some(src) => src.units.drain(..count).collect(),
            None => Vec::new(),
        };
        for unit_id in &moving {
            if let Some(unit) = self.units.get_mut(unit_id) {
                unit.army = Some(target);
            }
        }
        if let Some(dst) = self.armies.get_mut(&target) {
            dst.units.extend(moving);
            // The combined force moves at the pace of the slower half
            dst.movement_points = dst.movement_points.min(source_points);
        }

        let mut source_status = ArmyStatus::Active;
        if rejected == 0 {
            self.unregister(source);
            source_status = ArmyStatus::MergedAway;
            self.refresh_occupancy(store, tile);
            tracing::info!("{:?} merged away into {:?}", source, target);
        } else {
            tracing::info!(
                "{:?} moved {} units into {:?}, {} rejected at capacity",
                source,
                count,
                target,
                rejected
            );
        }

        Ok(MergeOutcome {
            moved: count,
            rejected,
            source_status,
        })
    }

    /// Detach `units` from `army` into a new army on the same tile
    ///
    /// The source must keep at least one unit.
    pub fn split(&mut self, id: ArmyId, units: &[UnitId], store: &mut TileStore) -> Result<ArmyId> {
        let army = self.armies.get(&id).ok_or(CoreError::UnknownArmy(id))?;

        let mut moving: Vec<UnitId> = Vec::new();
        for &unit_id in units {
            if army.contains(unit_id) && !moving.contains(&unit_id) {
                moving.push(unit_id);
            }
        }

        if moving.is_empty() {
            tracing::warn!("Split of {:?} names none of its units", id);
            return Err(CoreError::TooFewUnits {
                required: 1,
                available: 0,
            });
        }
        if moving.len() >= army.len() {
            tracing::warn!("Split of {:?} would leave it empty", id);
            return Err(CoreError::TooFewUnits {
                required: moving.len() + 1,
                available: army.len(),
            });
        }

        let (owner, tile, points) = (army.owner, army.tile, army.movement_points);
        if let Some(army) = self.armies.get_mut(&id) {
            army.units.retain(|u| !moving.contains(u));
        }

        let new_id = self.form_army(owner, tile, moving, store);
        if let Some(split) = self.armies.get_mut(&new_id) {
            split.movement_points = points;
        }
        Ok(new_id)
    }

    // === SELECTION ===

    pub fn select(&mut self, id: ArmyId) -> bool {
        if self.armies.contains_key(&id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Army> {
        self.selected.and_then(|id| self.armies.get(&id))
    }

    pub fn army_info(&self, id: ArmyId) -> Option<ArmyInfo> {
        let army = self.armies.get(&id)?;
        let total_strength = army
            .units
            .iter()
            .filter_map(|u| self.units.get(u))
            .map(|u| u.strength)
            .sum();
        Some(ArmyInfo {
            id,
            owner: army.owner,
            tile: army.tile,
            unit_count: army.len(),
            max_units: army.max_units,
            movement_points: army.movement_points,
            max_movement_points: army.max_movement_points,
            total_strength,
            destination: army.path.last().copied(),
        })
    }

    // === MOVEMENT ===

    /// Path the army towards `target` and walk as far as it can afford
    ///
    /// Replaces any pending order. Unwalked steps are kept for later turns.
    pub fn order_move(&mut self, id: ArmyId, target: TileIndex, store: &mut TileStore) -> Result<MoveOutcome> {
        let army = self.armies.get(&id).ok_or(CoreError::UnknownArmy(id))?;
        let from = army.tile;

        let Some(path) = find_path(store, from, target) else {
            tracing::warn!("{:?} has no land path from {} to {}", id, from, target);
            return Err(CoreError::NoPath { from, to: target });
        };

        self.walk(id, &path, store)
    }

    fn walk(&mut self, id: ArmyId, path: &[TileIndex], store: &mut TileStore) -> Result<MoveOutcome> {
        let army = self.armies.get(&id).ok_or(CoreError::UnknownArmy(id))?;
        let from = army.tile;
        let trimmed = trim_to_budget(store, path, army.movement_points);

        if trimmed.is_stalled() && path.len() > 1 {
            tracing::warn!(
                "{:?} has {} movement points, not enough to enter {}",
                id,
                army.movement_points,
                path[1]
            );
            return Err(CoreError::InsufficientMovement(id));
        }

        let to = trimmed.destination().unwrap_or(from);
        let remaining: Vec<TileIndex> = path.get(trimmed.path.len()..).unwrap_or(&[]).to_vec();

        let roster = match self.armies.get_mut(&id) {
            Some(army) => {
                army.tile = to;
                army.movement_points -= trimmed.spent;
                army.path = remaining.clone();
                army.units.clone()
            }
            None => Vec::new(),
        };

        let state = if remaining.is_empty() {
            UnitState::Idle
        } else {
            UnitState::Moving
        };
        for unit_id in &roster {
            if let Some(unit) = self.units.get_mut(unit_id) {
                unit.tile = to;
                unit.state = state;
            }
        }

        if from != to {
            self.refresh_occupancy(store, from);
            self.refresh_occupancy(store, to);
            tracing::debug!("{:?} moved {} -> {} spending {}", id, from, to, trimmed.spent);
        }

        Ok(MoveOutcome {
            army: id,
            from,
            to,
            spent: trimmed.spent,
            remaining,
        })
    }

    /// Continue every unfinished move order as far as this turn allows
    ///
    /// A pending route blocked by terrain changes is re-planned; if no route
    /// remains the order is dropped.
    pub fn advance_pending(&mut self, store: &mut TileStore) -> Vec<MoveOutcome> {
        let pending: Vec<ArmyId> = self
            .armies()
            .filter(|a| a.is_active() && a.has_pending_move())
            .map(|a| a.id)
            .collect();

        let mut outcomes = Vec::new();
        for id in pending {
            let Some(army) = self.armies.get(&id) else {
                continue;
            };
            let mut route = Vec::with_capacity(army.path.len() + 1);
            route.push(army.tile);
            route.extend(army.path.iter().copied());

            let still_valid = route.windows(2).all(|w| store.are_adjacent(w[0], w[1]) && store.is_land(w[1]));
            if !still_valid {
                let target = route[route.len() - 1];
                match find_path(store, route[0], target) {
                    Some(path) => route = path,
                    None => {
                        tracing::warn!("{:?} lost its route to {}, order dropped", id, target);
                        if let Some(army) = self.armies.get_mut(&id) {
                            army.path.clear();
                        }
                        continue;
                    }
                }
            }

            if let Ok(outcome) = self.walk(id, &route, store) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Start-of-turn refill of every army's movement points
    pub fn refill_movement(&mut self) {
        for army in self.armies.values_mut() {
            army.movement_points = army.max_movement_points;
        }
    }

    // === SWEEPS ===

    /// Fold every orphaned unit into an army
    ///
    /// An orphan joins the first same-owner army on its tile with spare
    /// capacity; otherwise a single-unit army is raised there. Units still
    /// flagged for a battle wait until it is reconciled. Returns the armies
    /// created by this sweep.
    pub fn auto_form(&mut self, store: &mut TileStore) -> Vec<ArmyId> {
        let mut formed = Vec::new();
        let mut joined = Vec::new();

        for unit_id in self.units_outside_armies() {
            let Some(unit) = self.units.get(&unit_id) else {
                continue;
            };
            if unit.battle_side.is_some() {
                tracing::trace!("{:?} still in battle, left out of the sweep", unit_id);
                continue;
            }
            let (owner, tile) = (unit.owner, unit.tile);

            let host = self.registry.iter().copied().find(|id| {
                self.armies.get(id).is_some_and(|a| {
                    a.is_active() && a.owner == owner && a.tile == tile && a.spare_capacity() > 0
                })
            });

            match host {
                Some(army_id) => {
                    if let Some(army) = self.armies.get_mut(&army_id) {
                        army.units.push(unit_id);
                    }
                    if let Some(unit) = self.units.get_mut(&unit_id) {
                        unit.army = Some(army_id);
                    }
                    tracing::debug!("Orphan {:?} joined {:?}", unit_id, army_id);
                    joined.push(tile);
                }
                None => formed.push(self.form_army(owner, tile, vec![unit_id], store)),
            }
        }

        joined.sort_unstable();
        joined.dedup();
        for tile in joined {
            self.refresh_occupancy(store, tile);
        }
        formed
    }

    /// Tiles where armies of two or more civilizations stand, ascending
    pub fn detect_collisions(&self) -> Vec<TileIndex> {
        let mut civs_at: AHashMap<TileIndex, AHashSet<CivId>> = AHashMap::new();
        for army in self.armies().filter(|a| a.is_active() && !a.is_empty()) {
            civs_at.entry(army.tile).or_default().insert(army.owner);
        }

        let mut contested: Vec<TileIndex> = civs_at
            .into_iter()
            .filter(|(_, civs)| civs.len() >= 2)
            .map(|(tile, _)| tile)
            .collect();
        contested.sort_unstable();
        contested
    }
}

impl Default for ArmyManager {
    fn default() -> Self {
        Self::new(ArmyRules::default())
    }
}
