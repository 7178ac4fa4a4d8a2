//! Hexfront - headless skirmish runner
//!
//! Generates a seeded map, raises armies for a few civilizations and lets
//! them march on each other. Battles are settled by the auto-resolver.
//! Prints a summary as text or JSON.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hexfront::battle::AutoResolver;
use hexfront::core::error::Result;
use hexfront::core::types::{ArmyId, CivId, ReligionId, TileIndex, UnitId};
use hexfront::core::SimulationConfig;
use hexfront::fog::Visibility;
use hexfront::mapgen::{self, MapSettings};
use hexfront::sim::{SimEvent, SimService, Simulation};
use hexfront::snapshot;

/// Headless skirmish on a generated hex map
#[derive(Parser, Debug)]
#[command(name = "hexfront")]
#[command(about = "Run a scripted headless skirmish and report the outcome")]
struct Args {
    /// Map width in hexes
    #[arg(long, default_value_t = 32)]
    width: u32,

    /// Map height in hexes
    #[arg(long, default_value_t = 24)]
    height: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 300)]
    ticks: u64,

    /// Ticks per strategic turn
    #[arg(long, default_value_t = 10)]
    turn_length: u64,

    /// Number of civilizations
    #[arg(long, default_value_t = 2)]
    civs: usize,

    /// Armies raised per civilization
    #[arg(long, default_value_t = 2)]
    armies: usize,

    /// Units per army
    #[arg(long, default_value_t = 4)]
    units: usize,

    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable fog of war
    #[arg(long)]
    no_fog: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Write a snapshot of the final state
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CivSummary {
    civ: CivId,
    armies: usize,
    units: usize,
    tiles_owned: usize,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    turns: u32,
    battles_started: usize,
    battles_ended: usize,
    armies_destroyed: usize,
    tiles_explored: usize,
    civs: Vec<CivSummary>,
}

impl Summary {
    fn record(&mut self, events: &[SimEvent]) {
        for event in events {
            match event {
                SimEvent::BattleStarted(_) => self.battles_started += 1,
                SimEvent::BattleEnded { .. } => self.battles_ended += 1,
                SimEvent::ArmyDestroyed { .. } => self.armies_destroyed += 1,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexfront=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if args.no_fog {
        config.fog_enabled = false;
    }

    let settings = MapSettings {
        width: args.width,
        height: args.height,
        seed,
        ..MapSettings::default()
    };
    let tiles = mapgen::generate(&settings, &config)?;
    let mut sim = Simulation::new(config, tiles, AutoResolver::new(seed))?;

    muster(&mut sim, &args)?;
    sim.set_local_civ(Some(CivId(1)));
    sim.init();

    let mut summary = Summary {
        seed,
        ..Summary::default()
    };
    let turn_length = args.turn_length.max(1);

    for tick in 1..=args.ticks {
        let events = sim.tick();
        summary.record(&events);
        sim.resolve_battles();

        if tick % turn_length == 0 {
            march(&mut sim);
            sim.end_turn();
        }
    }
    summary.record(&sim.drain_events());
    sim.shutdown();

    summary.ticks = sim.current_tick();
    summary.turns = sim.turn() - 1;
    summary.tiles_explored = (0..sim.tiles().len() as u32)
        .filter(|&i| sim.fog().merged(TileIndex(i)) >= Visibility::Explored)
        .count();
    summary.civs = (1..=args.civs as u32)
        .map(CivId)
        .map(|civ| CivSummary {
            civ,
            armies: sim.armies().armies_of(civ).len(),
            units: sim.armies().units_of(civ).len(),
            tiles_owned: sim.tiles().tiles_owned_by(civ).len(),
        })
        .collect();

    if let Some(path) = &args.save {
        snapshot::save_to_file(&sim, path)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Raise each civilization's armies at its spawn tile and claim the ground around it
fn muster(sim: &mut Simulation<AutoResolver>, args: &Args) -> Result<()> {
    let spawns = mapgen::spawn_points(sim.tiles(), args.civs);
    if spawns.len() < args.civs {
        tracing::warn!("Only {} of {} civilizations fit on this map", spawns.len(), args.civs);
    }

    for (i, &home) in spawns.iter().enumerate() {
        let civ = CivId(i as u32 + 1);
        for tile in sim.tiles().tiles_within(home, 1) {
            if sim.tiles().is_land(tile) {
                sim.transfer_ownership(tile, Some(civ));
            }
        }
        sim.tiles_mut().add_religion_pressure(home, ReligionId(i as u32 + 1), 1.0);

        for _ in 0..args.armies {
            let units = (0..args.units)
                .map(|_| sim.spawn_unit(civ, home))
                .collect::<Result<Vec<UnitId>>>()?;
            sim.create_army(civ, home, &units)?;
        }
    }
    Ok(())
}

/// Send every idle army towards the nearest hostile army
fn march(sim: &mut Simulation<AutoResolver>) {
    let orders: Vec<(ArmyId, TileIndex)> = sim
        .armies()
        .armies()
        .filter(|a| a.is_active() && !a.has_pending_move() && !sim.battles().involves(a.id))
        .filter_map(|army| {
            sim.armies()
                .armies()
                .filter(|enemy| enemy.owner != army.owner && enemy.is_active())
                .filter_map(|enemy| sim.tiles().distance(army.tile, enemy.tile).map(|d| (d, enemy.tile)))
                .min()
                .map(|(_, target)| (army.id, target))
        })
        .collect();

    for (army, target) in orders {
        if let Err(e) = sim.order_move(army, target) {
            tracing::debug!("{:?} holds position: {}", army, e);
        }
    }
}

fn print_summary(summary: &Summary) {
    println!("=== HEXFRONT SKIRMISH ===");
    println!("Seed: {}", summary.seed);
    println!("Ticks: {}  Turns: {}", summary.ticks, summary.turns);
    println!(
        "Battles: {} started, {} ended, {} armies destroyed",
        summary.battles_started, summary.battles_ended, summary.armies_destroyed
    );
    println!("Tiles explored by civ1: {}", summary.tiles_explored);
    for civ in &summary.civs {
        println!(
            "  {}: {} armies, {} units, {} tiles",
            civ.civ, civ.armies, civ.units, civ.tiles_owned
        );
    }
}
