//! Hexfront - strategic-map core for a hex-tile civilization game
//!
//! Tile storage and ownership, per-civilization fog of war, land
//! pathfinding, army lifecycle and the hand-off of contested tiles to a
//! tactical battle layer. Everything is owned by [`sim::Simulation`].

pub mod army;
pub mod battle;
pub mod core;
pub mod fog;
pub mod mapgen;
pub mod pathfinding;
pub mod sim;
pub mod snapshot;
pub mod tiles;
