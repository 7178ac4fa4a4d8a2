use thiserror::Error;

use crate::core::types::{ArmyId, CivId, TileIndex, UnitId};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Army not found: {0:?}")]
    UnknownArmy(ArmyId),

    #[error("Unit not found: {0:?}")]
    UnknownUnit(UnitId),

    #[error("Tile out of range: {0}")]
    UnknownTile(TileIndex),

    #[error("Too few units: need {required}, have {available}")]
    TooFewUnits { required: usize, available: usize },

    #[error("Owner mismatch: expected {expected}, found {found}")]
    OwnerMismatch { expected: CivId, found: CivId },

    #[error("Army {0:?} is at capacity")]
    CapacityExceeded(ArmyId),

    #[error("No land path from {from} to {to}")]
    NoPath { from: TileIndex, to: TileIndex },

    #[error("Army {0:?} cannot afford the next step")]
    InsufficientMovement(ArmyId),

    #[error("Armies {0:?} and {1:?} are not on the same tile")]
    NotColocated(ArmyId, ArmyId),

    #[error("Army {0:?} is engaged in a pending battle")]
    Engaged(ArmyId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
