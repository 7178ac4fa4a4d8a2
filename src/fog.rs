//! Fog of war - per-civilization tile visibility
//!
//! Each civilization keeps one byte per tile: unseen, explored or visible.
//! Visibility only changes through [`FogOfWar::reveal`] and
//! [`FogOfWar::apply_vision`]; the display buffer is rebuilt by
//! [`FogOfWar::merge`] from the local civilization and its allies.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::types::{CivId, TileIndex};
use crate::tiles::TileStore;

/// Visibility state for a tile
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Never seen - no information
    #[default]
    Unseen = 0,
    /// Previously seen but not currently visible
    Explored = 1,
    /// Currently visible
    Visible = 2,
}

impl Visibility {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Explored,
            2 => Self::Visible,
            _ => Self::Unseen,
        }
    }
}

/// Visibility data for a single civilization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivVisibility {
    tiles: Vec<Visibility>,
    /// Tiles made visible by the last vision update or reveal
    in_view: Vec<TileIndex>,
    explored_count: u32,
}

impl CivVisibility {
    fn new(tile_count: usize) -> Self {
        Self {
            tiles: vec![Visibility::Unseen; tile_count],
            in_view: Vec::new(),
            explored_count: 0,
        }
    }

    fn get(&self, tile: TileIndex) -> Visibility {
        self.tiles.get(tile.as_usize()).copied().unwrap_or_default()
    }

    /// Returns true when the stored value changed
    fn set(&mut self, tile: TileIndex, value: Visibility) -> bool {
        let Some(slot) = self.tiles.get_mut(tile.as_usize()) else {
            return false;
        };
        if *slot == value {
            return false;
        }
        if *slot == Visibility::Unseen {
            self.explored_count += 1;
        }
        *slot = value;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FogOfWar {
    enabled: bool,
    tile_count: usize,
    civs: AHashMap<CivId, CivVisibility>,
    merged: Vec<Visibility>,
    #[serde(skip)]
    merged_changes: Vec<TileIndex>,
}

impl FogOfWar {
    pub fn new(tile_count: usize, enabled: bool) -> Self {
        let fill = if enabled {
            Visibility::Unseen
        } else {
            Visibility::Visible
        };
        Self {
            enabled,
            tile_count,
            civs: AHashMap::new(),
            merged: vec![fill; tile_count],
            merged_changes: Vec::new(),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle fog; the merged buffer is refreshed on the next merge
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Register a civilization
    pub fn register_civ(&mut self, civ: CivId) {
        let tile_count = self.tile_count;
        self.civs
            .entry(civ)
            .or_insert_with(|| CivVisibility::new(tile_count));
    }

    pub fn is_registered(&self, civ: CivId) -> bool {
        self.civs.contains_key(&civ)
    }

    /// Registered civilizations, lowest id first
    pub fn civs(&self) -> Vec<CivId> {
        let mut civs: Vec<CivId> = self.civs.keys().copied().collect();
        civs.sort_unstable();
        civs
    }

    pub fn visibility(&self, civ: CivId, tile: TileIndex) -> Visibility {
        if !self.enabled {
            return Visibility::Visible;
        }
        self.civs
            .get(&civ)
            .map(|v| v.get(tile))
            .unwrap_or_default()
    }

    pub fn is_visible(&self, civ: CivId, tile: TileIndex) -> bool {
        self.visibility(civ, tile) == Visibility::Visible
    }

    /// Total tiles this civilization has ever seen
    pub fn explored_count(&self, civ: CivId) -> u32 {
        if !self.enabled {
            return self.tile_count as u32;
        }
        self.civs.get(&civ).map(|v| v.explored_count).unwrap_or(0)
    }

    /// Promote tiles to visible; never demotes
    ///
    /// Returns the tiles whose state changed.
    pub fn reveal(&mut self, civ: CivId, tiles: &[TileIndex]) -> Vec<TileIndex> {
        if !self.enabled {
            return Vec::new();
        }
        self.register_civ(civ);
        let Some(fv) = self.civs.get_mut(&civ) else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        for &tile in tiles {
            if tile.as_usize() >= fv.tiles.len() {
                continue;
            }
            if fv.set(tile, Visibility::Visible) {
                changed.push(tile);
            }
            fv.in_view.push(tile);
        }
        fv.in_view.sort_unstable();
        fv.in_view.dedup();
        tracing::trace!("{} revealed {} tiles", civ, changed.len());
        changed
    }

    /// Replace a civilization's vision set
    ///
    /// Tiles in `tiles` become visible; tiles visible before and absent now
    /// fall back to explored. Both halves are computed before anything is
    /// written, so a tile in the new set is never demoted.
    pub fn apply_vision(&mut self, civ: CivId, tiles: &[TileIndex]) -> Vec<TileIndex> {
        if !self.enabled {
            return Vec::new();
        }
        self.register_civ(civ);
        let Some(fv) = self.civs.get_mut(&civ) else {
            return Vec::new();
        };

        let limit = fv.tiles.len();
        let next: AHashSet<TileIndex> = tiles
            .iter()
            .copied()
            .filter(|t| t.as_usize() < limit)
            .collect();

        let demoted: Vec<TileIndex> = fv
            .in_view
            .iter()
            .copied()
            .filter(|t| !next.contains(t) && fv.get(*t) == Visibility::Visible)
            .collect();

        let mut changed = Vec::new();
        for tile in demoted {
            if fv.set(tile, Visibility::Explored) {
                changed.push(tile);
            }
        }

        let mut in_view: Vec<TileIndex> = next.into_iter().collect();
        in_view.sort_unstable();
        for &tile in &in_view {
            if fv.set(tile, Visibility::Visible) {
                changed.push(tile);
            }
        }
        fv.in_view = in_view;

        changed.sort_unstable();
        changed
    }

    /// Rebuild the display buffer as the per-tile max over `local` and `allies`
    pub fn merge(&mut self, local: CivId, allies: &[CivId]) -> &[Visibility] {
        self.merged_changes.clear();

        for i in 0..self.tile_count {
            let tile = TileIndex(i as u32);
            let value = if self.enabled {
                std::iter::once(local)
                    .chain(allies.iter().copied())
                    .filter_map(|civ| self.civs.get(&civ))
                    .map(|fv| fv.get(tile))
                    .max()
                    .unwrap_or_default()
            } else {
                Visibility::Visible
            };

            if self.merged[i] != value {
                self.merged[i] = value;
                self.merged_changes.push(tile);
            }
        }

        &self.merged
    }

    pub fn merged(&self, tile: TileIndex) -> Visibility {
        self.merged.get(tile.as_usize()).copied().unwrap_or_default()
    }

    pub fn merged_buffer(&self) -> &[Visibility] {
        &self.merged
    }

    /// Tiles whose merged value changed in the last merge
    pub fn merged_changes(&self) -> &[TileIndex] {
        &self.merged_changes
    }
}

/// Every tile within `radius` of any of `sources`, sorted and deduplicated
pub fn vision_from(store: &TileStore, sources: impl IntoIterator<Item = TileIndex>, radius: u32) -> Vec<TileIndex> {
    let mut seen: Vec<TileIndex> = sources
        .into_iter()
        .flat_map(|t| store.tiles_within(t, radius))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::Biome;

    const A: CivId = CivId(1);
    const B: CivId = CivId(2);

    fn tiles(ids: &[u32]) -> Vec<TileIndex> {
        ids.iter().map(|&i| TileIndex(i)).collect()
    }

    #[test]
    fn test_reveal_promotes_without_demotion() {
        let mut fog = FogOfWar::new(16, true);
        assert_eq!(fog.visibility(A, TileIndex(3)), Visibility::Unseen);

        let changed = fog.reveal(A, &tiles(&[3, 4]));
        assert_eq!(changed, tiles(&[3, 4]));
        assert_eq!(fog.explored_count(A), 2);

        // Revealing again changes nothing
        assert!(fog.reveal(A, &tiles(&[3])).is_empty());
        assert!(fog.is_visible(A, TileIndex(4)));
    }

    #[test]
    fn test_apply_vision_demotes_dropped_tiles() {
        let mut fog = FogOfWar::new(16, true);
        fog.apply_vision(A, &tiles(&[1, 2, 3]));
        let changed = fog.apply_vision(A, &tiles(&[3, 4]));

        assert_eq!(changed, tiles(&[1, 2, 4]));
        assert_eq!(fog.visibility(A, TileIndex(1)), Visibility::Explored);
        assert_eq!(fog.visibility(A, TileIndex(3)), Visibility::Visible);
        assert_eq!(fog.visibility(A, TileIndex(4)), Visibility::Visible);
        assert_eq!(fog.visibility(A, TileIndex(9)), Visibility::Unseen);
    }

    #[test]
    fn test_revealed_tiles_fall_back_on_next_vision() {
        let mut fog = FogOfWar::new(16, true);
        fog.reveal(A, &tiles(&[7]));
        fog.apply_vision(A, &tiles(&[1]));
        assert_eq!(fog.visibility(A, TileIndex(7)), Visibility::Explored);
    }

    #[test]
    fn test_repeated_reveal_demotes_each_tile_once() {
        let mut fog = FogOfWar::new(4096, true);
        let all: Vec<TileIndex> = (0..4096).chain(0..4096).map(TileIndex).collect();
        assert_eq!(fog.reveal(A, &all).len(), 4096);
        fog.reveal(A, &tiles(&[9, 3, 9]));

        let changed = fog.apply_vision(A, &[]);
        assert_eq!(changed.len(), 4096);
        assert!(changed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fog.visibility(A, TileIndex(9)), Visibility::Explored);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut fog = FogOfWar::new(4, true);
        assert!(fog.reveal(A, &tiles(&[10])).is_empty());
        assert!(fog.apply_vision(A, &tiles(&[10])).is_empty());
        assert_eq!(fog.visibility(A, TileIndex(10)), Visibility::Unseen);
    }

    #[test]
    fn test_merge_takes_max_over_allies() {
        let mut fog = FogOfWar::new(8, true);
        fog.apply_vision(A, &tiles(&[0]));
        fog.apply_vision(B, &tiles(&[1, 2]));
        fog.apply_vision(B, &tiles(&[2]));

        let merged = fog.merge(A, &[]).to_vec();
        assert_eq!(merged[0], Visibility::Visible);
        assert_eq!(merged[1], Visibility::Unseen);

        fog.merge(A, &[B]);
        assert_eq!(fog.merged(TileIndex(0)), Visibility::Visible);
        assert_eq!(fog.merged(TileIndex(1)), Visibility::Explored);
        assert_eq!(fog.merged(TileIndex(2)), Visibility::Visible);
        assert_eq!(fog.merged_changes(), &tiles(&[1, 2])[..]);
    }

    #[test]
    fn test_disabled_fog_is_all_visible() {
        let mut fog = FogOfWar::new(5, false);
        assert_eq!(fog.visibility(A, TileIndex(2)), Visibility::Visible);
        assert!(fog.apply_vision(A, &tiles(&[1])).is_empty());
        let merged = fog.merge(A, &[B]);
        assert!(merged.iter().all(|v| *v == Visibility::Visible));
    }

    #[test]
    fn test_vision_from_dedups() {
        let store = TileStore::rectangle(6, 6, Biome::Plains);
        let seen = vision_from(&store, [TileIndex(0), TileIndex(1)], 1);
        let mut sorted = seen.clone();
        sorted.dedup();
        assert_eq!(seen, sorted);
        assert!(seen.contains(&TileIndex(2)));
        assert!(seen.contains(&TileIndex(6)));
    }

    #[test]
    fn test_visibility_byte_roundtrip() {
        for v in [Visibility::Unseen, Visibility::Explored, Visibility::Visible] {
            assert_eq!(Visibility::from_u8(v.as_u8()), v);
        }
    }
}
