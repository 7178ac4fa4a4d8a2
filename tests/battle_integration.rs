//! Battle hand-off integration tests

use hexfront::battle::{AutoResolver, BattleResult, TacticalBattles};
use hexfront::core::types::{ArmyId, CivId, TileIndex, UnitId};
use hexfront::core::SimulationConfig;
use hexfront::sim::{SimEvent, SimService, Simulation};
use hexfront::tiles::{Biome, OccupancyLayer, Occupant, TileStore};

const RED: CivId = CivId(1);
const BLUE: CivId = CivId(2);
const GREEN: CivId = CivId(3);

#[derive(Default)]
struct Recorder {
    calls: Vec<(CivId, CivId, Vec<UnitId>, Vec<UnitId>)>,
}

impl TacticalBattles for Recorder {
    fn start_battle(&mut self, attacker: CivId, defender: CivId, a: &[UnitId], d: &[UnitId]) {
        self.calls.push((attacker, defender, a.to_vec(), d.to_vec()));
    }
}

fn world<T: TacticalBattles>(tactical: T) -> Simulation<T> {
    let tiles = TileStore::rectangle(10, 10, Biome::Grassland);
    Simulation::new(SimulationConfig::default(), tiles, tactical).unwrap()
}

fn raise<T: TacticalBattles>(sim: &mut Simulation<T>, owner: CivId, tile: TileIndex, n: usize) -> ArmyId {
    let units: Vec<UnitId> = (0..n).map(|_| sim.spawn_unit(owner, tile).unwrap()).collect();
    sim.create_army(owner, tile, &units).unwrap()
}

#[test]
fn test_two_armies_on_tile_42_start_one_battle() {
    let mut sim = world(Recorder::default());
    let red = raise(&mut sim, RED, TileIndex(42), 1);
    let blue = raise(&mut sim, BLUE, TileIndex(42), 1);
    sim.init();

    let events = sim.tick();

    let starts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SimEvent::BattleStarted(start) => Some(start),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].tile, TileIndex(42));
    assert_eq!(starts[0].attacker_armies, vec![red]);
    assert_eq!(starts[0].defender_armies, vec![blue]);

    let calls = &sim.tactical().calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, RED);
    assert_eq!(calls[0].1, BLUE);
    assert_eq!(calls[0].2.len(), 1);
    assert_eq!(calls[0].3.len(), 1);
}

#[test]
fn test_two_dead_of_three_leaves_one_survivor() {
    let mut sim = world(Recorder::default());
    let red = raise(&mut sim, RED, TileIndex(42), 3);
    raise(&mut sim, BLUE, TileIndex(42), 1);
    sim.init();
    sim.tick();

    let roster = sim.armies().army(red).unwrap().units.clone();
    let result = BattleResult::new(TileIndex(42), Some(BLUE))
        .with_report(roster[0], 0, 50)
        .with_report(roster[1], 30, 0)
        .with_report(roster[2], 60, 70);
    let report = sim.on_battle_ended(result);

    assert_eq!(report.casualties.len(), 2);
    let army = sim.armies().army(red).unwrap();
    assert_eq!(army.units, vec![roster[2]]);
    assert!(sim.armies().unit(roster[2]).unwrap().is_alive());
    assert!(sim.armies().unit(roster[0]).is_none());
    assert!(sim.armies().unit(roster[1]).is_none());
    assert_eq!(sim.armies().unit_count(), 2);
}

#[test]
fn test_reconcile_twice_changes_nothing() {
    let mut sim = world(Recorder::default());
    raise(&mut sim, RED, TileIndex(42), 2);
    raise(&mut sim, BLUE, TileIndex(42), 2);
    sim.init();
    sim.tick();

    let first = sim.on_battle_ended(BattleResult::new(TileIndex(42), None));
    assert!(!first.is_empty());
    let units = sim.armies().unit_count();
    let armies = sim.armies().army_count();

    let second = sim.on_battle_ended(BattleResult::new(TileIndex(42), None));
    assert!(second.is_empty());
    assert_eq!(sim.armies().unit_count(), units);
    assert_eq!(sim.armies().army_count(), armies);
}

#[test]
fn test_three_civs_first_attacks_rest_defend() {
    let mut sim = world(Recorder::default());
    raise(&mut sim, GREEN, TileIndex(5), 1);
    raise(&mut sim, RED, TileIndex(5), 2);
    raise(&mut sim, BLUE, TileIndex(5), 1);
    sim.init();
    sim.tick();

    let calls = &sim.tactical().calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, GREEN);
    assert_eq!(calls[0].2.len(), 1);
    assert_eq!(calls[0].3.len(), 3);
}

#[test]
fn test_destroyed_army_leaves_tile_to_survivor() {
    let mut sim = world(Recorder::default());
    let red = raise(&mut sim, RED, TileIndex(42), 2);
    let blue = raise(&mut sim, BLUE, TileIndex(42), 1);
    sim.init();
    sim.tick();

    let blue_unit = sim.armies().army(blue).unwrap().units[0];
    sim.on_battle_ended(BattleResult::new(TileIndex(42), Some(RED)).with_report(blue_unit, 0, 0));

    assert!(sim.armies().army(blue).is_none());
    let occupant = sim.tiles().occupant(TileIndex(42), OccupancyLayer::Military);
    assert_eq!(occupant, Some(Occupant::Army(red)));

    let events = sim.tick();
    assert!(events.contains(&SimEvent::ArmyDestroyed { army: blue }));
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::BattleEnded { winner: Some(w), .. } if *w == RED)));
}

#[test]
fn test_disbanded_participants_wait_out_the_battle() {
    let config = SimulationConfig {
        sweep_interval: 1,
        ..SimulationConfig::default()
    };
    let tiles = TileStore::rectangle(10, 10, Biome::Grassland);
    let mut sim = Simulation::new(config, tiles, Recorder::default()).unwrap();
    let red = raise(&mut sim, RED, TileIndex(42), 2);
    let blue = raise(&mut sim, BLUE, TileIndex(42), 1);
    sim.init();
    sim.tick();

    let released = sim.disband(blue).unwrap();
    sim.tick();

    // Still flagged for battle, so the sweep leaves it alone
    assert_eq!(sim.armies().units_outside_armies(), released);
    assert_eq!(sim.armies().army_count(), 1);
    assert_eq!(
        sim.tiles().occupant(TileIndex(42), OccupancyLayer::Civilian),
        Some(Occupant::Unit(released[0]))
    );

    let report = sim.on_battle_ended(BattleResult::new(TileIndex(42), Some(RED)).with_report(released[0], 0, 0));

    assert_eq!(report.casualties, released);
    assert!(sim.armies().unit(released[0]).is_none());
    assert_eq!(sim.armies().armies_at(TileIndex(42)), vec![red]);
    assert!(sim.armies().armies().all(|a| !a.is_empty()));
    assert_eq!(sim.tiles().occupant(TileIndex(42), OccupancyLayer::Civilian), None);
    assert_eq!(
        sim.tiles().occupant(TileIndex(42), OccupancyLayer::Military),
        Some(Occupant::Army(red))
    );
}

#[test]
fn test_separate_tiles_fight_in_parallel() {
    let mut sim = world(Recorder::default());
    raise(&mut sim, RED, TileIndex(11), 1);
    raise(&mut sim, BLUE, TileIndex(11), 1);
    raise(&mut sim, RED, TileIndex(77), 1);
    raise(&mut sim, BLUE, TileIndex(77), 1);
    sim.init();

    sim.tick();
    assert_eq!(sim.tactical().calls.len(), 2);
    assert_eq!(sim.battles().pending_count(), 2);

    sim.on_battle_ended(BattleResult::new(TileIndex(77), None));
    assert!(sim.battles().is_pending(TileIndex(11)));
    assert!(!sim.battles().is_pending(TileIndex(77)));
}

#[test]
fn test_auto_resolved_skirmish_ends_with_one_side() {
    let mut sim = world(AutoResolver::new(11).with_max_rounds(200));
    raise(&mut sim, RED, TileIndex(42), 6);
    let blue = raise(&mut sim, BLUE, TileIndex(42), 1);
    sim.init();

    for _ in 0..30 {
        sim.tick();
        sim.resolve_battles();
        if sim.armies().army(blue).is_none() {
            break;
        }
    }

    assert!(sim.armies().army(blue).is_none());
    assert_eq!(sim.armies().armies_of(RED).len(), 1);
    assert_eq!(sim.battles().pending_count(), 0);
}
