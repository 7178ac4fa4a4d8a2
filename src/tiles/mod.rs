//! Strategic-map tiles: coordinates, biomes, occupancy and the tile store

pub mod biome;
pub mod hex;
pub mod store;
pub mod tile;

pub use biome::{Biome, Improvement};
pub use hex::HexCoord;
pub use store::{DirtyTiles, TileEvent, TileStore};
pub use tile::{Occupancy, OccupancyLayer, Occupant, ReligionPressure, Tile};
