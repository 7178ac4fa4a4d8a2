//! Armies and units on the strategic map

pub mod manager;
pub mod types;
pub mod unit;

pub use manager::{ArmyManager, MergeOutcome, MoveOutcome};
pub use types::{Army, ArmyInfo, ArmyRules, ArmyStatus};
pub use unit::{BattleSide, Unit, UnitState, FULL_HEALTH, FULL_STRENGTH};
