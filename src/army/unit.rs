//! Combat units as seen by the strategic layer

use serde::{Deserialize, Serialize};

use crate::core::types::{ArmyId, CivId, TileIndex, UnitId};

/// Full health and strength of a freshly raised unit
pub const FULL_HEALTH: u32 = 100;
pub const FULL_STRENGTH: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitState {
    #[default]
    Idle,
    Moving,
    InBattle,
}

/// Which bucket a unit fights in during a tactical battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleSide {
    Attacker,
    Defender,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: CivId,
    pub tile: TileIndex,
    pub health: u32,
    pub strength: u32,
    /// Strategic units are hidden; the army marker stands in for them
    pub visible: bool,
    pub state: UnitState,
    pub routed: bool,
    pub battle_side: Option<BattleSide>,
    pub army: Option<ArmyId>,
}

impl Unit {
    pub fn new(id: UnitId, owner: CivId, tile: TileIndex) -> Self {
        Self {
            id,
            owner,
            tile,
            health: FULL_HEALTH,
            strength: FULL_STRENGTH,
            visible: false,
            state: UnitState::Idle,
            routed: false,
            battle_side: None,
            army: None,
        }
    }

    /// Dead units have no health or no strength left
    pub fn is_alive(&self) -> bool {
        self.health > 0 && self.strength > 0
    }

    /// Bring the unit onto the tactical map on the given side
    pub fn enter_battle(&mut self, side: BattleSide) {
        self.visible = true;
        self.state = UnitState::InBattle;
        self.battle_side = Some(side);
    }

    /// Return a battle survivor to its strategic resting state
    pub fn leave_battle(&mut self) {
        self.visible = false;
        self.state = UnitState::Idle;
        self.routed = false;
        self.battle_side = None;
    }
}
