//! Headless auto-resolve for battles
//!
//! Stands in for the tactical layer in the headless runner and in tests.
//! Each round both sides take damage proportional to the enemy's share of
//! the total strength; the defender gets its tile's terrain bonus. The
//! fight ends when a side's strength falls below the rout threshold.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{BattleResult, TacticalBattles, UnitReport};
use crate::army::ArmyManager;
use crate::core::types::{CivId, TileIndex, UnitId};
use crate::tiles::TileStore;

/// Damage dealt to every unit of a side holding half the total strength
pub const BASE_DAMAGE: f32 = 12.0;

/// Fraction of starting strength below which a side routs
pub const ROUT_THRESHOLD: f32 = 0.2;

pub const DEFAULT_MAX_ROUNDS: u32 = 12;

#[derive(Debug, Clone)]
struct QueuedBattle {
    attacker: CivId,
    defender: CivId,
    attacker_units: Vec<UnitId>,
    defender_units: Vec<UnitId>,
}

#[derive(Debug, Clone, Copy)]
struct Fighter {
    id: UnitId,
    health: u32,
    strength: u32,
}

#[derive(Debug)]
pub struct AutoResolver {
    rng: ChaCha8Rng,
    max_rounds: u32,
    queued: VecDeque<QueuedBattle>,
    battles_started: u32,
}

impl AutoResolver {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_rounds: DEFAULT_MAX_ROUNDS,
            queued: VecDeque::new(),
            battles_started: 0,
        }
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn battles_started(&self) -> u32 {
        self.battles_started
    }

    /// Fight the oldest queued battle and report every participant
    ///
    /// The battle's tile is read from its first surviving participant.
    /// Battles whose participants have all vanished are dropped.
    pub fn resolve_next(&mut self, manager: &ArmyManager, store: &TileStore) -> Option<BattleResult> {
        while let Some(battle) = self.queued.pop_front() {
            let tile = battle
                .attacker_units
                .iter()
                .chain(battle.defender_units.iter())
                .find_map(|id| manager.unit(*id))
                .map(|u| u.tile);
            match tile {
                Some(tile) => return Some(self.fight(battle, manager, store, tile)),
                None => tracing::debug!("Dropping queued battle with no surviving participants"),
            }
        }
        None
    }

    fn fight(&mut self, battle: QueuedBattle, manager: &ArmyManager, store: &TileStore, tile: TileIndex) -> BattleResult {
        let mut attackers = Self::muster(manager, &battle.attacker_units);
        let mut defenders = Self::muster(manager, &battle.defender_units);
        let terrain_bonus = store
            .get(tile)
            .map(|t| t.biome.defense_bonus())
            .unwrap_or(0.0);

        let attacker_start = Self::total(&attackers).max(1.0);
        let defender_start = Self::total(&defenders).max(1.0);
        let mut attacker_routed = false;
        let mut defender_routed = false;

        for round in 1..=self.max_rounds {
            let attack = Self::total(&attackers);
            let defend = Self::total(&defenders) * (1.0 + terrain_bonus);
            if attack <= 0.0 || defend <= 0.0 {
                break;
            }

            let total = attack + defend;
            self.apply_damage(&mut attackers, defend / total);
            self.apply_damage(&mut defenders, attack / total);

            attacker_routed = Self::total(&attackers) < attacker_start * ROUT_THRESHOLD;
            defender_routed = Self::total(&defenders) < defender_start * ROUT_THRESHOLD;
            if attacker_routed || defender_routed {
                tracing::debug!("Auto-resolve ended after {} rounds", round);
                break;
            }
        }

        let attacker_ratio = Self::total(&attackers) / attacker_start;
        let defender_ratio = Self::total(&defenders) / defender_start;
        let winner = match (attacker_routed, defender_routed) {
            (true, false) => Some(battle.defender),
            (false, true) => Some(battle.attacker),
            _ if attacker_ratio > defender_ratio => Some(battle.attacker),
            _ if defender_ratio > attacker_ratio => Some(battle.defender),
            _ => None,
        };

        let reports = attackers
            .iter()
            .map(|f| (f, attacker_routed))
            .chain(defenders.iter().map(|f| (f, defender_routed)))
            .map(|(f, routed)| UnitReport {
                unit: f.id,
                health: f.health,
                strength: f.strength,
                routed,
            })
            .collect();

        BattleResult { tile, winner, reports }
    }

    fn muster(manager: &ArmyManager, units: &[UnitId]) -> Vec<Fighter> {
        units
            .iter()
            .filter_map(|id| manager.unit(*id))
            .map(|u| Fighter {
                id: u.id,
                health: u.health,
                strength: u.strength,
            })
            .collect()
    }

    fn total(side: &[Fighter]) -> f32 {
        side.iter()
            .filter(|f| f.health > 0)
            .map(|f| f.strength as f32)
            .sum()
    }

    fn apply_damage(&mut self, side: &mut [Fighter], enemy_share: f32) {
        for fighter in side.iter_mut().filter(|f| f.health > 0 && f.strength > 0) {
            let jitter: f32 = self.rng.gen_range(0.75..1.25);
            let damage = (BASE_DAMAGE * enemy_share * 2.0 * jitter).round() as u32;
            fighter.strength = fighter.strength.saturating_sub(damage);
            fighter.health = fighter.health.saturating_sub(damage);
        }
    }
}

impl TacticalBattles for AutoResolver {
    fn start_battle(
        &mut self,
        attacker: CivId,
        defender: CivId,
        attacker_units: &[UnitId],
        defender_units: &[UnitId],
    ) {
        self.battles_started += 1;
        self.queued.push_back(QueuedBattle {
            attacker,
            defender,
            attacker_units: attacker_units.to_vec(),
            defender_units: defender_units.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::ArmyRules;
    use crate::tiles::Biome;

    fn two_sides(red: usize, blue: usize) -> (ArmyManager, TileStore, Vec<UnitId>, Vec<UnitId>) {
        let mut manager = ArmyManager::new(ArmyRules::default());
        let store = TileStore::rectangle(4, 4, Biome::Plains);
        let a: Vec<UnitId> = (0..red).map(|_| manager.spawn_unit(CivId(1), TileIndex(0))).collect();
        let d: Vec<UnitId> = (0..blue).map(|_| manager.spawn_unit(CivId(2), TileIndex(0))).collect();
        (manager, store, a, d)
    }

    #[test]
    fn test_nothing_queued() {
        let (manager, store, _, _) = two_sides(1, 1);
        let mut resolver = AutoResolver::new(7);
        assert!(resolver.resolve_next(&manager, &store).is_none());
    }

    #[test]
    fn test_larger_side_wins() {
        let (manager, store, a, d) = two_sides(6, 1);
        let mut resolver = AutoResolver::new(7).with_max_rounds(50);
        resolver.start_battle(CivId(1), CivId(2), &a, &d);

        let result = resolver.resolve_next(&manager, &store).unwrap();
        assert_eq!(result.tile, TileIndex(0));
        assert_eq!(result.winner, Some(CivId(1)));
        assert_eq!(result.reports.len(), 7);
        assert!(!resolver.has_queued());
    }

    #[test]
    fn test_same_seed_same_result() {
        let (manager, store, a, d) = two_sides(3, 3);
        let mut first = AutoResolver::new(99);
        let mut second = AutoResolver::new(99);
        first.start_battle(CivId(1), CivId(2), &a, &d);
        second.start_battle(CivId(1), CivId(2), &a, &d);
        assert_eq!(
            first.resolve_next(&manager, &store),
            second.resolve_next(&manager, &store)
        );
    }

    #[test]
    fn test_battle_without_participants_dropped() {
        let (manager, store, _, _) = two_sides(0, 0);
        let mut resolver = AutoResolver::new(1);
        resolver.start_battle(CivId(1), CivId(2), &[UnitId(90)], &[UnitId(91)]);

        assert!(resolver.resolve_next(&manager, &store).is_none());
        assert!(!resolver.has_queued());
        assert_eq!(resolver.battles_started(), 1);
    }
}
