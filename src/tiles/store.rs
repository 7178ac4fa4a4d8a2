//! Tile store - canonical per-tile data, adjacency and ownership
//!
//! Tiles live in a dense array laid out as an axial rhombus: `q` runs over
//! `0..width`, `r` over `0..height`, and `index = r * width + q`.
//!
//! Every mutation marks the tile dirty so overlay renderers can redraw
//! incrementally. Out-of-range indices are no-ops, never panics.

use ahash::AHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::biome::{Biome, Improvement};
use super::hex::HexCoord;
use super::tile::{Occupancy, Occupant, OccupancyLayer, Tile};
use crate::core::error::{CoreError, Result};
use crate::core::types::{CivId, ReligionId, TileIndex};

/// Change notifications raised by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileEvent {
    OwnershipChanged {
        tile: TileIndex,
        from: Option<CivId>,
        to: Option<CivId>,
    },
}

/// Insertion-ordered set of tiles awaiting redraw
#[derive(Debug, Clone, Default)]
pub struct DirtyTiles {
    order: Vec<TileIndex>,
    seen: AHashSet<TileIndex>,
}

impl DirtyTiles {
    pub fn mark(&mut self, tile: TileIndex) {
        if self.seen.insert(tile) {
            self.order.push(tile);
        }
    }

    pub fn contains(&self, tile: TileIndex) -> bool {
        self.seen.contains(&tile)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn drain(&mut self) -> Vec<TileIndex> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileStore {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    adjacency: Vec<Vec<TileIndex>>,
    tile_size: f32,
    elevation_scale: f32,
    #[serde(skip)]
    dirty: DirtyTiles,
    #[serde(skip)]
    events: Vec<TileEvent>,
}

impl TileStore {
    /// Build a store from prepared tiles in index order
    ///
    /// Tile coordinates are overwritten to match their index.
    pub fn new(width: u32, height: u32, mut tiles: Vec<Tile>) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if tiles.len() != expected {
            return Err(CoreError::Config(format!(
                "expected {} tiles for a {}x{} map, got {}",
                expected,
                width,
                height,
                tiles.len()
            )));
        }

        for (i, tile) in tiles.iter_mut().enumerate() {
            tile.coord = HexCoord::new((i as u32 % width) as i32, (i as u32 / width) as i32);
        }

        let adjacency = Self::build_adjacency(width, height);

        Ok(Self {
            width,
            height,
            tiles,
            adjacency,
            tile_size: 1.0,
            elevation_scale: 0.1,
            dirty: DirtyTiles::default(),
            events: Vec::new(),
        })
    }

    /// A uniform map of one biome
    pub fn rectangle(width: u32, height: u32, biome: Biome) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for r in 0..height as i32 {
            for q in 0..width as i32 {
                tiles.push(Tile::new(HexCoord::new(q, r), biome));
            }
        }
        let adjacency = Self::build_adjacency(width, height);
        Self {
            width,
            height,
            tiles,
            adjacency,
            tile_size: 1.0,
            elevation_scale: 0.1,
            dirty: DirtyTiles::default(),
            events: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, tile_size: f32, elevation_scale: f32) -> Self {
        self.tile_size = tile_size;
        self.elevation_scale = elevation_scale;
        self
    }

    fn build_adjacency(width: u32, height: u32) -> Vec<Vec<TileIndex>> {
        let mut adjacency = Vec::with_capacity((width * height) as usize);
        for r in 0..height as i32 {
            for q in 0..width as i32 {
                let neighbors = HexCoord::new(q, r)
                    .neighbors()
                    .into_iter()
                    .filter_map(|n| Self::index_in(width, height, n))
                    .collect();
                adjacency.push(neighbors);
            }
        }
        adjacency
    }

    fn index_in(width: u32, height: u32, coord: HexCoord) -> Option<TileIndex> {
        if coord.q < 0 || coord.r < 0 || coord.q >= width as i32 || coord.r >= height as i32 {
            return None;
        }
        Some(TileIndex(coord.r as u32 * width + coord.q as u32))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, idx: TileIndex) -> bool {
        idx.as_usize() < self.tiles.len()
    }

    pub fn index_of(&self, coord: HexCoord) -> Option<TileIndex> {
        Self::index_in(self.width, self.height, coord)
    }

    pub fn indices(&self) -> impl Iterator<Item = TileIndex> {
        (0..self.tiles.len() as u32).map(TileIndex)
    }

    pub fn get(&self, idx: TileIndex) -> Option<&Tile> {
        self.tiles.get(idx.as_usize())
    }

    /// Apply an arbitrary edit; returns false for an unknown tile
    pub fn update(&mut self, idx: TileIndex, edit: impl FnOnce(&mut Tile)) -> bool {
        let Some(tile) = self.tiles.get_mut(idx.as_usize()) else {
            tracing::trace!("update ignored for out-of-range tile {}", idx);
            return false;
        };
        edit(tile);
        self.dirty.mark(idx);
        true
    }

    pub fn set_biome(&mut self, idx: TileIndex, biome: Biome) -> bool {
        self.update(idx, |tile| tile.biome = biome)
    }

    pub fn set_improvement(&mut self, idx: TileIndex, improvement: Option<Improvement>) -> bool {
        self.update(idx, |tile| tile.improvement = improvement)
    }

    pub fn is_land(&self, idx: TileIndex) -> bool {
        self.get(idx).is_some_and(|t| t.is_land())
    }

    pub fn movement_cost(&self, idx: TileIndex) -> Option<u32> {
        self.get(idx).map(|t| t.movement_cost())
    }

    // === OCCUPANCY ===

    pub fn occupant(&self, idx: TileIndex, layer: OccupancyLayer) -> Option<Occupant> {
        self.get(idx).and_then(|t| t.occupants.get(layer))
    }

    /// Place an occupant, replacing whatever held the layer
    pub fn set_occupant(&mut self, idx: TileIndex, layer: OccupancyLayer, occupant: Occupant) -> bool {
        self.update(idx, |tile| *tile.occupants.slot_mut(layer) = Some(occupant))
    }

    pub fn clear_occupant(&mut self, idx: TileIndex, layer: OccupancyLayer) -> bool {
        self.update(idx, |tile| *tile.occupants.slot_mut(layer) = None)
    }

    pub fn occupancy(&self, idx: TileIndex) -> Option<&Occupancy> {
        self.get(idx).map(|t| &t.occupants)
    }

    // === GEOMETRY ===

    /// World-space centre; `elevated` lifts it to the tile's surface height
    pub fn center(&self, idx: TileIndex, elevated: bool) -> Option<Vec3> {
        let tile = self.get(idx)?;
        let planar = tile.coord.to_planar(self.tile_size);
        let y = if elevated {
            tile.elevation.max(0.0) * self.elevation_scale
        } else {
            0.0
        };
        Some(Vec3::new(planar.x, y, planar.y))
    }

    pub fn neighbors(&self, idx: TileIndex) -> &[TileIndex] {
        self.adjacency
            .get(idx.as_usize())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: TileIndex, b: TileIndex) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Hex distance in steps, ignoring terrain
    pub fn distance(&self, a: TileIndex, b: TileIndex) -> Option<u32> {
        let ta = self.get(a)?;
        let tb = self.get(b)?;
        Some(ta.coord.distance(&tb.coord))
    }

    /// All tiles within `radius` steps of `center`, in index order
    ///
    /// The radius is capped at `width + height`, which already spans the map.
    pub fn tiles_within(&self, center: TileIndex, radius: u32) -> Vec<TileIndex> {
        let Some(origin) = self.get(center).map(|t| t.coord) else {
            return Vec::new();
        };
        let radius = radius.min(self.width.saturating_add(self.height));
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let mut found = Vec::new();
        for dr in -r..=r {
            for dq in -r..=r {
                let coord = HexCoord::new(origin.q + dq, origin.r + dr);
                if origin.distance(&coord) > radius {
                    continue;
                }
                if let Some(idx) = self.index_of(coord) {
                    found.push(idx);
                }
            }
        }
        found.sort_unstable();
        found
    }

    // === OWNERSHIP ===

    pub fn owner(&self, idx: TileIndex) -> Option<CivId> {
        self.get(idx).and_then(|t| t.owner)
    }

    /// Change a tile's owner and queue the notification
    ///
    /// Returns the event raised, or `None` for an unknown tile or an
    /// unchanged owner.
    pub fn transfer_ownership(&mut self, idx: TileIndex, new_owner: Option<CivId>) -> Option<TileEvent> {
        let previous = self.get(idx)?.owner;
        if previous == new_owner {
            return None;
        }
        self.update(idx, |tile| tile.owner = new_owner);
        let event = TileEvent::OwnershipChanged {
            tile: idx,
            from: previous,
            to: new_owner,
        };
        tracing::debug!("Tile {} changed hands: {:?} -> {:?}", idx, previous, new_owner);
        self.events.push(event);
        Some(event)
    }

    pub fn tiles_owned_by(&self, civ: CivId) -> Vec<TileIndex> {
        self.indices().filter(|&i| self.owner(i) == Some(civ)).collect()
    }

    // === RELIGION ===

    pub fn add_religion_pressure(&mut self, idx: TileIndex, religion: ReligionId, amount: f32) -> bool {
        self.update(idx, |tile| tile.religion.add(religion, amount))
    }

    pub fn dominant_religion(&self, idx: TileIndex) -> Option<ReligionId> {
        self.get(idx).and_then(|t| t.religion.dominant()).map(|(id, _)| id)
    }

    /// One spreading pass: each tile pushes `rate` of its dominant pressure
    /// to every land neighbour. Deltas are collected before any is applied.
    pub fn spread_religion(&mut self, rate: f32) {
        let mut deltas: Vec<(TileIndex, ReligionId, f32)> = Vec::new();
        for idx in self.indices() {
            let Some((religion, pressure)) = self.get(idx).and_then(|t| t.religion.dominant()) else {
                continue;
            };
            for &n in self.neighbors(idx) {
                if self.is_land(n) {
                    deltas.push((n, religion, pressure * rate));
                }
            }
        }

        for (idx, religion, amount) in deltas {
            self.add_religion_pressure(idx, religion, amount);
        }
    }

    // === RENDERER BOUNDARY ===

    pub fn is_dirty(&self, idx: TileIndex) -> bool {
        self.dirty.contains(idx)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Tiles changed since the last drain, in first-touched order
    pub fn drain_dirty(&mut self) -> Vec<TileIndex> {
        self.dirty.drain()
    }

    pub fn mark_dirty(&mut self, idx: TileIndex) {
        if self.contains(idx) {
            self.dirty.mark(idx);
        }
    }

    pub fn drain_events(&mut self) -> Vec<TileEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ArmyId;

    fn store() -> TileStore {
        TileStore::rectangle(10, 10, Biome::Grassland)
    }

    #[test]
    fn test_corner_and_interior_neighbors() {
        let store = store();
        assert_eq!(store.neighbors(TileIndex(0)).len(), 2);
        let interior = store.index_of(HexCoord::new(5, 5)).unwrap();
        assert_eq!(store.neighbors(interior).len(), 6);
        assert!(store.neighbors(TileIndex(999)).is_empty());
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let store = store();
        for a in store.indices() {
            for &b in store.neighbors(a) {
                assert!(store.are_adjacent(b, a));
            }
        }
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut store = store();
        assert!(!store.set_biome(TileIndex(500), Biome::Desert));
        assert!(store.get(TileIndex(500)).is_none());
        assert!(store.center(TileIndex(500), false).is_none());
        assert!(store.transfer_ownership(TileIndex(500), Some(CivId(1))).is_none());
        assert_eq!(store.dirty_count(), 0);
    }

    #[test]
    fn test_mutation_marks_dirty_once() {
        let mut store = store();
        store.set_biome(TileIndex(3), Biome::Forest);
        store.set_improvement(TileIndex(3), Some(Improvement::Farm));
        store.set_occupant(TileIndex(7), OccupancyLayer::Military, Occupant::Army(ArmyId(1)));

        assert_eq!(store.drain_dirty(), vec![TileIndex(3), TileIndex(7)]);
        assert!(store.drain_dirty().is_empty());
    }

    #[test]
    fn test_transfer_ownership_notifies() {
        let mut store = store();
        let event = store.transfer_ownership(TileIndex(4), Some(CivId(1)));
        assert_eq!(
            event,
            Some(TileEvent::OwnershipChanged {
                tile: TileIndex(4),
                from: None,
                to: Some(CivId(1)),
            })
        );
        // Same owner again is a no-op
        assert!(store.transfer_ownership(TileIndex(4), Some(CivId(1))).is_none());
        assert_eq!(store.drain_events().len(), 1);
        assert_eq!(store.tiles_owned_by(CivId(1)), vec![TileIndex(4)]);
    }

    #[test]
    fn test_center_elevated() {
        let mut store = store().with_geometry(2.0, 0.5);
        store.update(TileIndex(0), |t| t.elevation = 4.0);
        let flat = store.center(TileIndex(0), false).unwrap();
        let raised = store.center(TileIndex(0), true).unwrap();
        assert_eq!(flat.y, 0.0);
        assert_eq!(raised.y, 2.0);
        assert_eq!(flat.x, raised.x);
    }

    #[test]
    fn test_tiles_within_radius() {
        let store = store();
        let center = store.index_of(HexCoord::new(5, 5)).unwrap();
        assert_eq!(store.tiles_within(center, 0), vec![center]);
        assert_eq!(store.tiles_within(center, 1).len(), 7);
        assert_eq!(store.tiles_within(center, 2).len(), 19);
    }

    #[test]
    fn test_huge_radius_covers_map() {
        let store = TileStore::rectangle(5, 4, Biome::Plains);
        assert_eq!(store.tiles_within(TileIndex(7), u32::MAX).len(), 20);
    }

    #[test]
    fn test_religion_spreads_to_land_only() {
        let mut store = store();
        let center = store.index_of(HexCoord::new(5, 5)).unwrap();
        let water = store.neighbors(center)[0];
        store.set_biome(water, Biome::Lake);
        store.add_religion_pressure(center, ReligionId(1), 10.0);

        store.spread_religion(0.1);

        for &n in store.neighbors(center) {
            if n == water {
                assert!(store.dominant_religion(n).is_none());
            } else {
                assert_eq!(store.dominant_religion(n), Some(ReligionId(1)));
            }
        }
    }

    #[test]
    fn test_new_rejects_wrong_tile_count() {
        let tiles = vec![Tile::new(HexCoord::default(), Biome::Plains); 3];
        assert!(TileStore::new(2, 2, tiles).is_err());
    }
}
