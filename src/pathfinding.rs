//! Breadth-first land pathfinding for armies
//!
//! Paths are shortest by hop count; terrain cost only matters when a path
//! is trimmed to what an army can afford this turn.

use std::collections::VecDeque;

use crate::core::types::TileIndex;
use crate::tiles::TileStore;

/// A path cut down to an army's movement budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedPath {
    /// Start tile plus every step that fits the budget
    pub path: Vec<TileIndex>,
    /// Movement points consumed by the kept steps
    pub spent: u32,
}

impl TrimmedPath {
    /// True when no step beyond the start was affordable
    pub fn is_stalled(&self) -> bool {
        self.path.len() <= 1
    }

    pub fn destination(&self) -> Option<TileIndex> {
        self.path.last().copied()
    }
}

/// Find the shortest land path from `start` to `target`, both inclusive
///
/// Water tiles and tiles already visited are never expanded. Among equally
/// short paths the first one discovered wins. Returns `None` when either
/// end is off the map or the target cannot be reached over land.
pub fn find_path(store: &TileStore, start: TileIndex, target: TileIndex) -> Option<Vec<TileIndex>> {
    if !store.contains(start) || !store.contains(target) {
        return None;
    }

    if start == target {
        return Some(vec![start]);
    }

    if !store.is_land(target) {
        return None;
    }

    let mut came_from: Vec<Option<TileIndex>> = vec![None; store.len()];
    let mut visited = vec![false; store.len()];
    let mut frontier = VecDeque::new();

    visited[start.as_usize()] = true;
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        if current == target {
            return Some(reconstruct_path(&came_from, target));
        }

        for &neighbor in store.neighbors(current) {
            let slot = neighbor.as_usize();
            if visited[slot] || !store.is_land(neighbor) {
                continue;
            }
            visited[slot] = true;
            came_from[slot] = Some(current);
            frontier.push_back(neighbor);
        }
    }

    None
}

fn reconstruct_path(came_from: &[Option<TileIndex>], target: TileIndex) -> Vec<TileIndex> {
    let mut path = vec![target];
    let mut current = target;
    while let Some(prev) = came_from[current.as_usize()] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Keep the longest prefix of `path` whose entry costs fit in `movement_points`
///
/// The first tile is where the army already stands and costs nothing.
/// Trimming an already affordable path returns it unchanged.
pub fn trim_to_budget(store: &TileStore, path: &[TileIndex], movement_points: u32) -> TrimmedPath {
    let Some(&start) = path.first() else {
        return TrimmedPath {
            path: Vec::new(),
            spent: 0,
        };
    };

    let mut kept = vec![start];
    let mut spent = 0u32;

    for &step in &path[1..] {
        let Some(cost) = store.movement_cost(step) else {
            break;
        };
        if spent + cost > movement_points {
            break;
        }
        spent += cost;
        kept.push(step);
    }

    TrimmedPath { path: kept, spent }
}

/// Total movement cost of walking `path` from its first tile
pub fn path_cost(store: &TileStore, path: &[TileIndex]) -> Option<u32> {
    path.iter()
        .skip(1)
        .map(|&t| store.movement_cost(t))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{Biome, HexCoord};

    fn at(store: &TileStore, q: i32, r: i32) -> TileIndex {
        store.index_of(HexCoord::new(q, r)).unwrap()
    }

    #[test]
    fn test_same_tile() {
        let store = TileStore::rectangle(5, 5, Biome::Plains);
        assert_eq!(find_path(&store, TileIndex(6), TileIndex(6)), Some(vec![TileIndex(6)]));
    }

    #[test]
    fn test_straight_line_is_shortest() {
        let store = TileStore::rectangle(8, 8, Biome::Plains);
        let start = at(&store, 0, 3);
        let goal = at(&store, 5, 3);
        let path = find_path(&store, start, goal).unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        for pair in path.windows(2) {
            assert!(store.are_adjacent(pair[0], pair[1]));
        }
    }

    #[test]
    fn test_detours_around_water() {
        let mut store = TileStore::rectangle(5, 5, Biome::Plains);
        // Wall of water at q = 2 except the top row
        for r in 1..5 {
            let t = at(&store, 2, r);
            store.set_biome(t, Biome::Ocean);
        }
        let path = find_path(&store, at(&store, 0, 4), at(&store, 4, 4)).unwrap();
        assert!(path.iter().all(|&t| store.is_land(t)));
        assert!(path.contains(&at(&store, 2, 0)));
    }

    #[test]
    fn test_unreachable_returns_none() {
        let mut store = TileStore::rectangle(5, 5, Biome::Plains);
        for r in 0..5 {
            let t = at(&store, 2, r);
            store.set_biome(t, Biome::Lake);
        }
        assert!(find_path(&store, at(&store, 0, 0), at(&store, 4, 4)).is_none());
        // Water target
        assert!(find_path(&store, at(&store, 0, 0), at(&store, 2, 2)).is_none());
        // Off-map
        assert!(find_path(&store, TileIndex(0), TileIndex(999)).is_none());
    }

    #[test]
    fn test_trim_two_points_five_tiles() {
        let store = TileStore::rectangle(8, 1, Biome::Grassland);
        let path: Vec<TileIndex> = (0..5).map(TileIndex).collect();

        let trimmed = trim_to_budget(&store, &path, 2);
        assert_eq!(trimmed.path, vec![TileIndex(0), TileIndex(1), TileIndex(2)]);
        assert_eq!(trimmed.spent, 2);
    }

    #[test]
    fn test_trim_zero_points_stalls() {
        let store = TileStore::rectangle(8, 1, Biome::Grassland);
        let path: Vec<TileIndex> = (0..3).map(TileIndex).collect();
        let trimmed = trim_to_budget(&store, &path, 0);
        assert!(trimmed.is_stalled());
        assert_eq!(trimmed.path, vec![TileIndex(0)]);
    }

    #[test]
    fn test_trim_stops_before_expensive_tile() {
        let mut store = TileStore::rectangle(8, 1, Biome::Grassland);
        store.set_biome(TileIndex(2), Biome::Mountain);
        let path: Vec<TileIndex> = (0..5).map(TileIndex).collect();
        // 1 for tile 1, then 3 for the mountain exceeds 3 total
        let trimmed = trim_to_budget(&store, &path, 3);
        assert_eq!(trimmed.path, vec![TileIndex(0), TileIndex(1)]);
        assert_eq!(trimmed.spent, 1);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let store = TileStore::rectangle(8, 1, Biome::Forest);
        let path: Vec<TileIndex> = (0..6).map(TileIndex).collect();
        let once = trim_to_budget(&store, &path, 5);
        let twice = trim_to_budget(&store, &once.path, 5);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_path_cost() {
        let mut store = TileStore::rectangle(4, 1, Biome::Plains);
        store.set_biome(TileIndex(2), Biome::Forest);
        let path: Vec<TileIndex> = (0..4).map(TileIndex).collect();
        assert_eq!(path_cost(&store, &path), Some(4));
        assert_eq!(path_cost(&store, &[TileIndex(0), TileIndex(9)]), None);
    }
}
