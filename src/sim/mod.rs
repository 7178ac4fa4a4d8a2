//! Simulation service - owns every strategic subsystem and drives them
//!
//! There are no globals: the tile store, fog, armies, battle hand-off and
//! alliances all live here and are reached through `Simulation`. An
//! external loop calls `init`, then `tick` once per frame, and `shutdown`.
//!
//! Per tick:
//! 1. Collision detection; each contested tile not already in battle is
//!    handed to the tactical layer
//! 2. Every `sweep_interval` ticks, orphaned units are folded into armies
//! 3. Vision is recomputed per civilization and merged for the local one

pub mod alliance;
pub mod event;

pub use alliance::Alliances;
pub use event::SimEvent;

use crate::army::{ArmyManager, ArmyRules, MergeOutcome, MoveOutcome};
use crate::battle::{AutoResolver, BattleHandoff, BattleResult, ReconcileReport, TacticalBattles};
use crate::core::config::SimulationConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::{ArmyId, CivId, Tick, TileIndex, UnitId};
use crate::fog::{vision_from, FogOfWar};
use crate::tiles::{TileEvent, TileStore};

/// Lifecycle driven by the host loop
pub trait SimService {
    fn init(&mut self);
    fn tick(&mut self) -> Vec<SimEvent>;
    fn shutdown(&mut self);
}

pub struct Simulation<T: TacticalBattles> {
    config: SimulationConfig,
    tiles: TileStore,
    fog: FogOfWar,
    armies: ArmyManager,
    battles: BattleHandoff,
    alliances: Alliances,
    tactical: T,
    local_civ: Option<CivId>,
    tick: Tick,
    turn: u32,
    running: bool,
    /// Raised by orders and callbacks, delivered with the next tick
    events: Vec<SimEvent>,
}

impl<T: TacticalBattles> Simulation<T> {
    pub fn new(config: SimulationConfig, tiles: TileStore, tactical: T) -> Result<Self> {
        config.validate()?;
        let fog = FogOfWar::new(tiles.len(), config.fog_enabled);
        let armies = ArmyManager::new(ArmyRules::from(&config));
        Ok(Self {
            config,
            tiles,
            fog,
            armies,
            battles: BattleHandoff::new(),
            alliances: Alliances::new(),
            tactical,
            local_civ: None,
            tick: 0,
            turn: 1,
            running: false,
            events: Vec::new(),
        })
    }

    /// Rebuild from saved parts; every tile is marked dirty for a full redraw
    /// and battles still in flight are handed to `tactical` again
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: SimulationConfig,
        mut tiles: TileStore,
        fog: FogOfWar,
        armies: ArmyManager,
        battles: BattleHandoff,
        alliances: Alliances,
        tactical: T,
        local_civ: Option<CivId>,
        tick: Tick,
        turn: u32,
    ) -> Result<Self> {
        config.validate()?;
        if fog.tile_count() != tiles.len() {
            return Err(CoreError::Config(format!(
                "fog covers {} tiles but the map has {}",
                fog.tile_count(),
                tiles.len()
            )));
        }
        let all: Vec<TileIndex> = tiles.indices().collect();
        for idx in all {
            tiles.mark_dirty(idx);
        }
        let mut sim = Self {
            config,
            tiles,
            fog,
            armies,
            battles,
            alliances,
            tactical,
            local_civ,
            tick,
            turn,
            running: false,
            events: Vec::new(),
        };
        sim.battles.resume(&sim.armies, &mut sim.tactical);
        Ok(sim)
    }

    // === ACCESSORS ===

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileStore {
        &mut self.tiles
    }

    pub fn fog(&self) -> &FogOfWar {
        &self.fog
    }

    pub fn armies(&self) -> &ArmyManager {
        &self.armies
    }

    pub fn armies_mut(&mut self) -> &mut ArmyManager {
        &mut self.armies
    }

    pub fn battles(&self) -> &BattleHandoff {
        &self.battles
    }

    pub fn alliances(&self) -> &Alliances {
        &self.alliances
    }

    pub fn alliances_mut(&mut self) -> &mut Alliances {
        &mut self.alliances
    }

    pub fn tactical(&self) -> &T {
        &self.tactical
    }

    pub fn tactical_mut(&mut self) -> &mut T {
        &mut self.tactical
    }

    pub fn local_civ(&self) -> Option<CivId> {
        self.local_civ
    }

    /// Civilization whose merged fog is shown to the player
    pub fn set_local_civ(&mut self, civ: Option<CivId>) {
        if let Some(civ) = civ {
            self.fog.register_civ(civ);
        }
        self.local_civ = civ;
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Toggle fog at runtime; takes effect at the next vision pass
    pub fn set_fog_enabled(&mut self, enabled: bool) {
        self.config.fog_enabled = enabled;
        self.fog.set_enabled(enabled);
    }

    /// Events queued since the last tick
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    // === ORDERS ===

    pub fn spawn_unit(&mut self, owner: CivId, tile: TileIndex) -> Result<UnitId> {
        if !self.tiles.contains(tile) {
            tracing::warn!("Cannot spawn a unit on unknown tile {}", tile);
            return Err(CoreError::UnknownTile(tile));
        }
        self.fog.register_civ(owner);
        let id = self.armies.spawn_unit(owner, tile);
        self.armies.refresh_occupancy(&mut self.tiles, tile);
        Ok(id)
    }

    pub fn create_army(&mut self, owner: CivId, tile: TileIndex, units: &[UnitId]) -> Result<ArmyId> {
        let id = self.armies.create_army(owner, tile, units, &mut self.tiles)?;
        self.fog.register_civ(owner);
        self.events.push(SimEvent::ArmyFormed {
            army: id,
            owner,
            tile,
        });
        Ok(id)
    }

    fn ensure_free(&self, army: ArmyId) -> Result<()> {
        if self.battles.involves(army) {
            tracing::warn!("{:?} is engaged in battle and cannot take orders", army);
            return Err(CoreError::Engaged(army));
        }
        Ok(())
    }

    pub fn order_move(&mut self, army: ArmyId, target: TileIndex) -> Result<MoveOutcome> {
        self.ensure_free(army)?;
        let outcome = self.armies.order_move(army, target, &mut self.tiles)?;
        if outcome.from != outcome.to {
            self.events.push(SimEvent::ArmyMoved {
                army,
                from: outcome.from,
                to: outcome.to,
            });
        }
        Ok(outcome)
    }

    pub fn merge(&mut self, source: ArmyId, target: ArmyId) -> Result<MergeOutcome> {
        self.ensure_free(source)?;
        self.ensure_free(target)?;
        let outcome = self.armies.merge(source, target, &mut self.tiles)?;
        self.events.push(SimEvent::ArmyMerged {
            source,
            target,
            moved: outcome.moved,
        });
        if self.armies.army(source).is_none() {
            self.events.push(SimEvent::ArmyDestroyed { army: source });
        }
        Ok(outcome)
    }

    pub fn split(&mut self, army: ArmyId, units: &[UnitId]) -> Result<ArmyId> {
        self.ensure_free(army)?;
        let id = self.armies.split(army, units, &mut self.tiles)?;
        if let Some(new_army) = self.armies.army(id) {
            self.events.push(SimEvent::ArmyFormed {
                army: id,
                owner: new_army.owner,
                tile: new_army.tile,
            });
        }
        Ok(id)
    }

    /// Release an army's units; allowed mid-battle
    pub fn disband(&mut self, army: ArmyId) -> Result<Vec<UnitId>> {
        let released = self.armies.disband(army, &mut self.tiles)?;
        self.events.push(SimEvent::ArmyDestroyed { army });
        Ok(released)
    }

    pub fn transfer_ownership(&mut self, tile: TileIndex, owner: Option<CivId>) -> Option<TileEvent> {
        if let Some(civ) = owner {
            self.fog.register_civ(civ);
        }
        self.tiles.transfer_ownership(tile, owner)
    }

    // === BATTLES ===

    /// Tactical layer callback once a battle is decided
    pub fn on_battle_ended(&mut self, result: BattleResult) -> ReconcileReport {
        let report = self.battles.reconcile(&result, &mut self.armies, &mut self.tiles);
        if let Some(tile) = report.tile {
            self.events.push(SimEvent::BattleEnded {
                tile,
                winner: result.winner,
                casualties: report.casualties.len(),
                survivors: report.survivors.len(),
            });
            for army in &report.destroyed {
                self.events.push(SimEvent::ArmyDestroyed { army: *army });
            }
        }
        report
    }

    fn initiate_battles(&mut self, events: &mut Vec<SimEvent>) {
        for tile in self.armies.detect_collisions() {
            if let Some(start) = self.battles.initiate(tile, &mut self.armies, &mut self.tactical) {
                events.push(SimEvent::BattleStarted(start));
            }
        }
    }

    // === SWEEPS ===

    fn sweep_orphans(&mut self, events: &mut Vec<SimEvent>) {
        for id in self.armies.auto_form(&mut self.tiles) {
            if let Some(army) = self.armies.army(id) {
                events.push(SimEvent::ArmyFormed {
                    army: id,
                    owner: army.owner,
                    tile: army.tile,
                });
            }
        }
    }

    /// Recompute every civilization's vision, then merge for the local civ
    pub fn update_vision(&mut self) {
        let mut civs = self.fog.civs();
        civs.extend(self.armies.civs());
        civs.sort_unstable();
        civs.dedup();

        let radius = self.config.vision_radius;
        for civ in civs {
            let sources: Vec<TileIndex> = self
                .armies
                .armies_of(civ)
                .iter()
                .filter_map(|id| self.armies.army(*id))
                .map(|a| a.tile)
                .collect();
            let seen = vision_from(&self.tiles, sources, radius);
            let changed = self.fog.apply_vision(civ, &seen);
            if !changed.is_empty() {
                tracing::trace!("{} vision changed on {} tiles", civ, changed.len());
            }
        }

        if let Some(local) = self.local_civ {
            let allies = self.alliances.allies_of(local);
            self.fog.merge(local, &allies);
            for &tile in self.fog.merged_changes() {
                self.tiles.mark_dirty(tile);
            }
        }
    }

    // === TURNS ===

    /// Refill movement, continue pending marches and spread religion
    pub fn end_turn(&mut self) {
        self.armies.refill_movement();
        for outcome in self.armies.advance_pending(&mut self.tiles) {
            if outcome.from != outcome.to {
                self.events.push(SimEvent::ArmyMoved {
                    army: outcome.army,
                    from: outcome.from,
                    to: outcome.to,
                });
            }
        }
        self.tiles.spread_religion(self.config.religion_spread_rate);

        tracing::info!("Turn {} ended at tick {}", self.turn, self.tick);
        self.events.push(SimEvent::TurnEnded { turn: self.turn });
        self.turn += 1;
    }
}

impl<T: TacticalBattles> SimService for Simulation<T> {
    fn init(&mut self) {
        for civ in self.armies.civs() {
            self.fog.register_civ(civ);
        }
        self.update_vision();
        self.running = true;
        tracing::info!(
            "Simulation started: {}x{} map, {} armies, fog {}",
            self.tiles.width(),
            self.tiles.height(),
            self.armies.army_count(),
            if self.fog.is_enabled() { "on" } else { "off" }
        );
    }

    fn tick(&mut self) -> Vec<SimEvent> {
        if !self.running {
            tracing::warn!("Tick requested on a simulation that is not running");
            return Vec::new();
        }
        self.tick += 1;

        let mut events = std::mem::take(&mut self.events);
        self.initiate_battles(&mut events);

        let interval = self.config.sweep_interval.max(1);
        if self.tick % interval == 0 {
            self.sweep_orphans(&mut events);
        }

        self.update_vision();

        events.extend(self.tiles.drain_events().into_iter().map(SimEvent::from));
        events
    }

    fn shutdown(&mut self) {
        self.running = false;
        tracing::info!(
            "Simulation stopped after {} ticks: {} armies, {} units, {} battles pending",
            self.tick,
            self.armies.army_count(),
            self.armies.unit_count(),
            self.battles.pending_count()
        );
    }
}

impl Simulation<AutoResolver> {
    /// Resolve every queued battle headlessly and reconcile the results
    pub fn resolve_battles(&mut self) -> Vec<ReconcileReport> {
        let mut reports = Vec::new();
        while let Some(result) = self.tactical.resolve_next(&self.armies, &self.tiles) {
            reports.push(self.on_battle_ended(result));
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fog::Visibility;
    use crate::tiles::Biome;

    const RED: CivId = CivId(1);
    const BLUE: CivId = CivId(2);

    #[derive(Default)]
    struct Recorder {
        calls: usize,
    }

    impl TacticalBattles for Recorder {
        fn start_battle(&mut self, _: CivId, _: CivId, _: &[UnitId], _: &[UnitId]) {
            self.calls += 1;
        }
    }

    fn sim() -> Simulation<Recorder> {
        let config = SimulationConfig {
            sweep_interval: 5,
            vision_radius: 1,
            ..SimulationConfig::default()
        };
        let tiles = TileStore::rectangle(8, 8, Biome::Plains);
        Simulation::new(config, tiles, Recorder::default()).unwrap()
    }

    fn raise(sim: &mut Simulation<Recorder>, owner: CivId, tile: TileIndex, n: usize) -> ArmyId {
        let units: Vec<UnitId> = (0..n).map(|_| sim.spawn_unit(owner, tile).unwrap()).collect();
        sim.create_army(owner, tile, &units).unwrap()
    }

    #[test]
    fn test_tick_requires_init() {
        let mut sim = sim();
        assert!(sim.tick().is_empty());
        assert_eq!(sim.current_tick(), 0);

        sim.init();
        sim.tick();
        assert_eq!(sim.current_tick(), 1);

        sim.shutdown();
        assert!(!sim.is_running());
    }

    #[test]
    fn test_collision_starts_one_battle_per_tile() {
        let mut sim = sim();
        raise(&mut sim, RED, TileIndex(10), 1);
        raise(&mut sim, BLUE, TileIndex(10), 1);
        sim.init();

        let events = sim.tick();
        let started = events
            .iter()
            .filter(|e| matches!(e, SimEvent::BattleStarted(_)))
            .count();
        assert_eq!(started, 1);
        assert_eq!(sim.tactical().calls, 1);

        sim.tick();
        assert_eq!(sim.tactical().calls, 1);
    }

    #[test]
    fn test_engaged_army_refuses_orders() {
        let mut sim = sim();
        let red = raise(&mut sim, RED, TileIndex(10), 1);
        raise(&mut sim, BLUE, TileIndex(10), 1);
        sim.init();
        sim.tick();

        let order = sim.order_move(red, TileIndex(11));
        assert!(matches!(order, Err(CoreError::Engaged(id)) if id == red));

        sim.on_battle_ended(BattleResult::new(TileIndex(10), None));
        assert!(sim.order_move(red, TileIndex(11)).is_ok());
    }

    #[test]
    fn test_sweep_runs_on_interval() {
        let mut sim = sim();
        sim.spawn_unit(RED, TileIndex(3)).unwrap();
        sim.init();

        for _ in 0..4 {
            sim.tick();
        }
        assert_eq!(sim.armies().army_count(), 0);

        let events = sim.tick();
        assert_eq!(sim.armies().army_count(), 1);
        assert!(events.iter().any(|e| matches!(e, SimEvent::ArmyFormed { owner, .. } if *owner == RED)));
    }

    #[test]
    fn test_vision_follows_armies_and_allies() {
        let mut sim = sim();
        raise(&mut sim, RED, TileIndex(0), 1);
        raise(&mut sim, BLUE, TileIndex(63), 1);
        sim.set_local_civ(Some(RED));
        sim.init();

        assert_eq!(sim.fog().merged(TileIndex(0)), Visibility::Visible);
        assert_eq!(sim.fog().merged(TileIndex(63)), Visibility::Unseen);

        sim.alliances_mut().declare(RED, BLUE);
        sim.tick();
        assert_eq!(sim.fog().merged(TileIndex(63)), Visibility::Visible);
    }

    #[test]
    fn test_end_turn_refills_and_reports() {
        let mut sim = sim();
        let red = raise(&mut sim, RED, TileIndex(0), 1);
        sim.init();
        sim.tick();

        sim.order_move(red, TileIndex(5)).unwrap();
        assert_eq!(sim.armies().army(red).unwrap().tile, TileIndex(2));

        sim.end_turn();
        assert_eq!(sim.armies().army(red).unwrap().tile, TileIndex(4));
        assert_eq!(sim.turn(), 2);

        let events = sim.tick();
        assert!(events.contains(&SimEvent::TurnEnded { turn: 1 }));
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::ArmyMoved { to, .. } if *to == TileIndex(4))));
    }

    #[test]
    fn test_ownership_change_reported() {
        let mut sim = sim();
        sim.init();
        assert!(sim.transfer_ownership(TileIndex(7), Some(BLUE)).is_some());

        let events = sim.tick();
        assert!(events.contains(&SimEvent::OwnershipChanged {
            tile: TileIndex(7),
            from: None,
            to: Some(BLUE),
        }));
    }

    #[test]
    fn test_auto_resolver_settles_battle() {
        let config = SimulationConfig::default();
        let tiles = TileStore::rectangle(6, 6, Biome::Grassland);
        let mut sim = Simulation::new(config, tiles, AutoResolver::new(3).with_max_rounds(50)).unwrap();
        let units: Vec<UnitId> = (0..6).map(|_| sim.spawn_unit(RED, TileIndex(8)).unwrap()).collect();
        sim.create_army(RED, TileIndex(8), &units).unwrap();
        let lone = sim.spawn_unit(BLUE, TileIndex(8)).unwrap();
        sim.create_army(BLUE, TileIndex(8), &[lone]).unwrap();
        sim.init();

        sim.tick();
        let reports = sim.resolve_battles();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].tile, Some(TileIndex(8)));
        assert_eq!(sim.battles().pending_count(), 0);
        assert!(!sim.tactical().has_queued());
    }
}
