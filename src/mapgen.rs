//! Seeded map generation
//!
//! Elevation, temperature and moisture come from smoothed value noise on a
//! coarse lattice; biomes are then classified from those three inputs.
//! The same settings and seed always produce the same map.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::TileIndex;
use crate::tiles::{Biome, HexCoord, Tile, TileStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    /// Lattice spacing of the noise in tiles; larger means broader features
    pub feature_size: u32,
    /// Shift applied to raw elevation; raise for more ocean
    pub sea_level: f32,
    /// Chance that rolling land becomes a hill
    pub hill_chance: f32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 32,
            height: 24,
            seed: 42,
            feature_size: 6,
            sea_level: 0.35,
            hill_chance: 0.15,
        }
    }
}

/// Smoothed random lattice sampled with bilinear interpolation
struct ValueNoise {
    cell: f32,
    cols: usize,
    grid: Vec<f32>,
}

impl ValueNoise {
    fn new(width: u32, height: u32, cell: u32, rng: &mut ChaCha8Rng) -> Self {
        let cols = (width / cell + 2) as usize;
        let rows = (height / cell + 2) as usize;
        let grid = (0..cols * rows).map(|_| rng.gen::<f32>()).collect();
        Self {
            cell: cell as f32,
            cols,
            grid,
        }
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        self.grid.get(y * self.cols + x).copied().unwrap_or(0.5)
    }

    fn sample(&self, x: u32, y: u32) -> f32 {
        let fx = x as f32 / self.cell;
        let fy = y as f32 / self.cell;
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let tx = smoothstep(fx.fract());
        let ty = smoothstep(fy.fract());

        let top = lerp(self.at(x0, y0), self.at(x0 + 1, y0), tx);
        let bottom = lerp(self.at(x0, y0 + 1), self.at(x0 + 1, y0 + 1), tx);
        lerp(top, bottom, ty)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Generate a tile store for `settings`, with geometry taken from `config`
pub fn generate(settings: &MapSettings, config: &SimulationConfig) -> Result<TileStore> {
    if settings.width == 0 || settings.height == 0 {
        return Err(CoreError::Config(format!(
            "map must not be empty, got {}x{}",
            settings.width, settings.height
        )));
    }
    let cell = settings.feature_size.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);

    let elevation_noise = ValueNoise::new(settings.width, settings.height, cell, &mut rng);
    let moisture_noise = ValueNoise::new(settings.width, settings.height, cell, &mut rng);
    let heat_noise = ValueNoise::new(settings.width, settings.height, cell * 2, &mut rng);

    let mut tiles = Vec::with_capacity((settings.width * settings.height) as usize);
    for r in 0..settings.height {
        for q in 0..settings.width {
            // Edges sink towards the ocean
            let edge = q.min(settings.width - 1 - q).min(r).min(settings.height - 1 - r) as f32;
            let falloff = (edge / cell as f32).min(1.0);

            let elevation = (elevation_noise.sample(q, r) - settings.sea_level) * 2.0 * falloff
                - (1.0 - falloff) * 0.4;

            // Warm at the equator row, cold at the poles
            let latitude = (2.0 * r as f32 / settings.height.max(2) as f32 - 1.0).abs();
            let temperature = ((1.0 - latitude) * 0.8 + heat_noise.sample(q, r) * 0.2).clamp(0.0, 1.0);
            let moisture = moisture_noise.sample(q, r);

            let biome = Biome::classify(elevation, temperature, moisture);
            let mut tile = Tile::new(HexCoord::new(q as i32, r as i32), biome).with_elevation(elevation);
            tile.temperature = temperature;
            tile.moisture = moisture;
            if biome.is_land() && biome != Biome::Mountain && elevation > 0.45 && rng.gen::<f32>() < settings.hill_chance {
                tile = tile.with_hill();
            }
            tiles.push(tile);
        }
    }

    let store = TileStore::new(settings.width, settings.height, tiles)?
        .with_geometry(config.tile_size, config.elevation_scale);

    tracing::info!(
        "Generated {}x{} map (seed {}): {} land tiles",
        settings.width,
        settings.height,
        settings.seed,
        land_tiles(&store).len()
    );
    Ok(store)
}

/// Every land tile, ascending
pub fn land_tiles(store: &TileStore) -> Vec<TileIndex> {
    store.indices().filter(|&i| store.is_land(i)).collect()
}

/// Pick `count` distinct land tiles spread west to east across the middle row
///
/// Each anchor takes the nearest unclaimed land tile; fewer tiles come back
/// when the map runs out of land.
pub fn spawn_points(store: &TileStore, count: usize) -> Vec<TileIndex> {
    let land = land_tiles(store);
    let mut chosen: Vec<TileIndex> = Vec::with_capacity(count);
    let row = store.height() as i32 / 2;

    for i in 0..count {
        let q = ((i as f32 + 0.5) / count as f32 * store.width() as f32) as i32;
        let anchor = HexCoord::new(q, row);
        let nearest = land
            .iter()
            .copied()
            .filter(|t| !chosen.contains(t))
            .filter_map(|t| store.get(t).map(|tile| (t, tile.coord.distance(&anchor))))
            .min_by_key(|&(t, d)| (d, t));
        match nearest {
            Some((tile, _)) => chosen.push(tile),
            None => break,
        }
    }
    chosen
}
