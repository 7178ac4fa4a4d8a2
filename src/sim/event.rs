//! Events reported by the simulation loop

use serde::Serialize;

use crate::battle::BattleStart;
use crate::core::types::{ArmyId, CivId, TileIndex};
use crate::tiles::TileEvent;

/// Something observable happened during a tick, an order or a turn change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// Hostile armies met and were handed to the tactical layer
    BattleStarted(BattleStart),
    BattleEnded {
        tile: TileIndex,
        winner: Option<CivId>,
        casualties: usize,
        survivors: usize,
    },
    ArmyFormed {
        army: ArmyId,
        owner: CivId,
        tile: TileIndex,
    },
    ArmyMoved {
        army: ArmyId,
        from: TileIndex,
        to: TileIndex,
    },
    /// Units moved from `source` into `target`
    ArmyMerged {
        source: ArmyId,
        target: ArmyId,
        moved: usize,
    },
    /// Destroyed in battle, disbanded, or emptied by a merge
    ArmyDestroyed { army: ArmyId },
    OwnershipChanged {
        tile: TileIndex,
        from: Option<CivId>,
        to: Option<CivId>,
    },
    TurnEnded { turn: u32 },
}

impl From<TileEvent> for SimEvent {
    fn from(event: TileEvent) -> Self {
        match event {
            TileEvent::OwnershipChanged { tile, from, to } => Self::OwnershipChanged { tile, from, to },
        }
    }
}
