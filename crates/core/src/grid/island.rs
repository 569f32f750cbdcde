//! Procedural island terrain.
//!
//! Three OpenSimplex2 layers (a broad fBm base, fine detail and a very low
//! frequency swell) are mixed, pulled down towards the map border and shaped
//! with `tanh` before classification. Lakes, house clusters and forest
//! clearings are then stamped on with a seeded RNG, so a seed always gives the
//! same map.

use crate::core_types::TerrainClass;
use crate::error::SimError;
use crate::grid::{TerrainGenerator, TerrainGrid};
use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::debug;

/// Shaped-noise class thresholds (values below each bound)
const WATER_BELOW: f32 = -0.4;
const FIELD_BELOW: f32 = -0.15;
const GRASSLAND_BELOW: f32 = 0.05;

/// Deterministic noise-based island generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandGenerator {
    /// How strongly the border is pushed under water (0 = no island shape)
    pub falloff: f32,
    /// Elevation of the highest land cell, water sits at 0
    pub relief: f32,
    pub lakes: RangeInclusive<u32>,
    pub house_clusters: RangeInclusive<u32>,
    pub houses_per_cluster: RangeInclusive<u32>,
    pub clearings: RangeInclusive<u32>,
}

impl Default for IslandGenerator {
    fn default() -> Self {
        Self {
            falloff: 0.35,
            relief: 0.4,
            lakes: 1..=3,
            house_clusters: 3..=7,
            houses_per_cluster: 2..=6,
            clearings: 5..=10,
        }
    }
}

fn fbm(seed: i32, frequency: f32, octaves: i32, gain: f32, lacunarity: f32) -> FastNoiseLite {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(frequency));
    if octaves > 1 {
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(octaves));
        noise.set_fractal_gain(Some(gain));
        noise.set_fractal_lacunarity(Some(lacunarity));
    }
    noise
}

/// Range of positions at least `margin` cells from both ends, or the whole axis
fn inner_range(len: usize, margin: usize) -> RangeInclusive<usize> {
    if len > margin * 2 {
        margin..=len - margin - 1
    } else {
        0..=len.saturating_sub(1)
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

impl IslandGenerator {
    /// Shaped noise value per cell, roughly in (-1, 1)
    fn shaped_values(&self, seed: u64, width: usize, height: usize) -> Vec<f32> {
        let noise_seed = (seed ^ (seed >> 32)) as i32;
        let span = width.max(height) as f32;
        let low = fbm(noise_seed, 3.0 / span, 4, 0.5, 2.0);
        let high = fbm(noise_seed.wrapping_add(1), 10.0 / span, 1, 0.4, 2.5);
        let swell = fbm(noise_seed.wrapping_add(2), 1.0 / span, 2, 0.5, 2.0);

        let mut values = Vec::with_capacity(width * height);
        for z in 0..height {
            for x in 0..width {
                let (fx, fz) = (x as f32, z as f32);
                let combined = low.get_noise_2d(fx, fz) * 0.85 + high.get_noise_2d(fx, fz) * 0.15;
                let mut value = combined + 0.3 * swell.get_noise_2d(fx + 50.0, fz + 50.0);

                let dx = (fx + 0.5) / width as f32 * 2.0 - 1.0;
                let dz = (fz + 0.5) / height as f32 * 2.0 - 1.0;
                let radius = (dx * dx + dz * dz).sqrt();
                value -= self.falloff * smoothstep(0.7, 1.2, radius);

                values.push((value * 1.2).tanh());
            }
        }
        values
    }

    fn classify(value: f32) -> TerrainClass {
        if value < WATER_BELOW {
            TerrainClass::Water
        } else if value < FIELD_BELOW {
            TerrainClass::Field
        } else if value < GRASSLAND_BELOW {
            TerrainClass::Grassland
        } else {
            TerrainClass::Forest
        }
    }

    fn add_lakes(&self, rng: &mut StdRng, classes: &mut [TerrainClass], width: usize, height: usize) {
        let count = rng.random_range(self.lakes.clone());
        for _ in 0..count {
            for _ in 0..50 {
                let cx = rng.random_range(inner_range(width, 5));
                let cz = rng.random_range(inner_range(height, 5));
                if classes[cz * width + cx] == TerrainClass::Water {
                    continue;
                }
                let radius = rng.random_range(4_i32..=8);
                for oz in -radius..=radius {
                    for ox in -radius..=radius {
                        let dist = ((ox * ox + oz * oz) as f32).sqrt();
                        if dist > radius as f32 + rng.random_range(-1.0_f32..=1.0) {
                            continue;
                        }
                        let (lx, lz) = (cx as i32 + ox, cz as i32 + oz);
                        if lx >= 0 && lz >= 0 && (lx as usize) < width && (lz as usize) < height {
                            classes[lz as usize * width + lx as usize] = TerrainClass::Water;
                        }
                    }
                }
                break;
            }
        }
    }

    fn add_houses(&self, rng: &mut StdRng, classes: &mut [TerrainClass], width: usize, height: usize) {
        let clusters = rng.random_range(self.house_clusters.clone());
        for _ in 0..clusters {
            for _ in 0..50 {
                let cx = rng.random_range(inner_range(width, 5));
                let cz = rng.random_range(inner_range(height, 5));
                if !matches!(
                    classes[cz * width + cx],
                    TerrainClass::Grassland | TerrainClass::Field
                ) {
                    continue;
                }
                for _ in 0..rng.random_range(self.houses_per_cluster.clone()) {
                    let hx = cx as i32 + rng.random_range(-3..=3);
                    let hz = cz as i32 + rng.random_range(-3..=3);
                    if hx < 0 || hz < 0 || hx as usize >= width || hz as usize >= height {
                        continue;
                    }
                    let cell = &mut classes[hz as usize * width + hx as usize];
                    if cell.is_flammable() {
                        *cell = TerrainClass::House;
                    }
                }
                break;
            }
        }
    }

    fn add_clearings(&self, rng: &mut StdRng, classes: &mut [TerrainClass], width: usize, height: usize) {
        for _ in 0..rng.random_range(self.clearings.clone()) {
            let cx = rng.random_range(inner_range(width, 3)) as i32;
            let cz = rng.random_range(inner_range(height, 3)) as i32;
            if classes[cz as usize * width + cx as usize] != TerrainClass::Forest {
                continue;
            }
            let half = rng.random_range(2_i32..=5) / 2;
            for oz in -half..=half {
                for ox in -half..=half {
                    let (x, z) = (cx + ox, cz + oz);
                    if x < 0 || z < 0 || x as usize >= width || z as usize >= height {
                        continue;
                    }
                    if rng.random::<f32>() < 0.6 {
                        let cell = &mut classes[z as usize * width + x as usize];
                        if *cell == TerrainClass::Forest {
                            *cell = TerrainClass::Grassland;
                        }
                    }
                }
            }
        }
    }
}

impl TerrainGenerator for IslandGenerator {
    fn generate(&self, seed: u64, width: usize, height: usize) -> Result<TerrainGrid, SimError> {
        if width == 0 || height == 0 {
            return Err(SimError::invalid_dimensions(format!(
                "cannot generate a {width}x{height} island"
            )));
        }

        let values = self.shaped_values(seed, width, height);
        let mut classes: Vec<TerrainClass> = values.iter().map(|v| Self::classify(*v)).collect();

        let mut rng = StdRng::seed_from_u64(seed);
        self.add_lakes(&mut rng, &mut classes, width, height);
        self.add_houses(&mut rng, &mut classes, width, height);
        self.add_clearings(&mut rng, &mut classes, width, height);

        let elevations = values
            .iter()
            .zip(&classes)
            .map(|(value, class)| match class {
                TerrainClass::Water => 0.0,
                _ => ((value - WATER_BELOW) / (1.0 - WATER_BELOW)).clamp(0.0, 1.0) * self.relief,
            })
            .collect();

        let grid = TerrainGrid::new(width, height, classes, elevations)?;
        debug!(
            seed,
            width,
            height,
            houses = grid.house_count(),
            burnable = grid.burnable_count(),
            "Generated island terrain"
        );
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_island() {
        let generator = IslandGenerator::default();
        let a = generator.generate(42, 80, 45).unwrap();
        let b = generator.generate(42, 80, 45).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let generator = IslandGenerator::default();
        let a = generator.generate(1, 80, 45).unwrap();
        let b = generator.generate(2, 80, 45).unwrap();
        assert_ne!(a.classes(), b.classes());
    }

    #[test]
    fn test_island_has_land_and_water() {
        let grid = IslandGenerator::default().generate(7, 80, 45).unwrap();
        assert!(grid.burnable_count() > 0);
        assert!(grid.count_of(TerrainClass::Water) > 0);
    }

    #[test]
    fn test_water_sits_at_sea_level() {
        let grid = IslandGenerator::default().generate(3, 40, 40).unwrap();
        for idx in 0..grid.len() {
            let elevation = grid.elevation_at_index(idx);
            if grid.class_at_index(idx) == TerrainClass::Water {
                assert_eq!(elevation, 0.0);
            } else {
                assert!((0.0..=0.4).contains(&elevation));
            }
        }
    }

    #[test]
    fn test_tiny_grids_do_not_panic() {
        let generator = IslandGenerator::default();
        assert!(generator.generate(5, 1, 1).is_ok());
        assert!(generator.generate(5, 6, 3).is_ok());
        assert!(generator.generate(5, 0, 3).is_err());
    }
}
