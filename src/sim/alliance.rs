//! Symmetric alliance table used for shared vision

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::CivId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alliances {
    /// Pairs stored lowest id first
    pairs: AHashSet<(CivId, CivId)>,
}

impl Alliances {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: CivId, b: CivId) -> (CivId, CivId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Returns false for self-alliances and pairs already allied
    pub fn declare(&mut self, a: CivId, b: CivId) -> bool {
        if a == b {
            return false;
        }
        let added = self.pairs.insert(Self::key(a, b));
        if added {
            tracing::info!("{} and {} are now allied", a, b);
        }
        added
    }

    pub fn revoke(&mut self, a: CivId, b: CivId) -> bool {
        let removed = self.pairs.remove(&Self::key(a, b));
        if removed {
            tracing::info!("Alliance between {} and {} revoked", a, b);
        }
        removed
    }

    pub fn are_allied(&self, a: CivId, b: CivId) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    /// Allies of `civ`, lowest id first
    pub fn allies_of(&self, civ: CivId) -> Vec<CivId> {
        let mut allies: Vec<CivId> = self
            .pairs
            .iter()
            .filter_map(|&(a, b)| {
                if a == civ {
                    Some(b)
                } else if b == civ {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        allies.sort_unstable();
        allies
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
