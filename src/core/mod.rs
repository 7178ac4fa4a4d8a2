pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{CoreError, Result};
pub use types::{ArmyId, CivId, ReligionId, Tick, TileIndex, UnitId};
