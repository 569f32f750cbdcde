//! Player controlled burns.
//!
//! A click is turned into a grid cell, validated against the current fire
//! state at the time it is processed, and then forced straight to `Burning`
//! together with a small square neighbourhood.

use crate::config::IgnitionConfig;
use crate::core_types::{CombustionState, GridCoord, TerrainClass, Vec3};
use crate::error::SimError;
use crate::grid::{TerrainGrid, WorldMapper};
use crate::simulation::automaton::{FireAutomaton, IgnitionKind};
use crate::simulation::camera::CameraPose;
use tracing::debug;

/// Cells set alight by one successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnitionReport {
    pub target: GridCoord,
    /// Every cell forced to `Burning`, target first
    pub affected: Vec<GridCoord>,
}

/// Screen pixel to the terrain surface under the cursor.
///
/// Each cell is a flat quad at its elevation, so the ray is marched in
/// quarter-cell steps through the band between the lowest and highest cell
/// and stops at the first sample on or below the cell it is over. A ray that
/// crosses the band without touching the map ends on the lowest plane,
/// off the map.
///
/// Returns `None` for rays that never descend to the terrain, e.g. pointing
/// at the sky.
pub fn pick_ground(
    camera: &CameraPose,
    viewport: (u32, u32),
    pixel: (f32, f32),
    terrain: &TerrainGrid,
    mapper: &WorldMapper,
) -> Option<Vec3> {
    let (origin, direction) = camera.ray_through(viewport, pixel)?;
    if direction.y > -f32::EPSILON {
        return None;
    }
    let (low, high) = terrain.elevation_range();
    let t_end = (low - origin.y) / direction.y;
    if t_end < 0.0 {
        return None;
    }
    let step = mapper.cell_size() * 0.25;
    let mut t = ((high - origin.y) / direction.y).max(0.0);
    loop {
        let point = origin + direction * t;
        if let Ok(elevation) = terrain.elevation_at(mapper.world_to_grid(&point)) {
            if point.y <= elevation {
                return Some(Vec3::new(point.x, elevation, point.z));
            }
        }
        if t >= t_end {
            return Some(origin + direction * t_end);
        }
        t = (t + step).min(t_end);
    }
}

/// Validates and applies controlled burns
#[derive(Debug, Clone, Default)]
pub struct IgnitionController {
    config: IgnitionConfig,
    burns_used: u32,
}

impl IgnitionController {
    #[must_use]
    pub fn new(config: IgnitionConfig) -> Self {
        Self {
            config,
            burns_used: 0,
        }
    }

    /// Successful controlled burns so far
    pub fn burns_used(&self) -> u32 {
        self.burns_used
    }

    pub fn reset(&mut self) {
        self.burns_used = 0;
    }

    pub fn config(&self) -> &IgnitionConfig {
        &self.config
    }

    /// Start a controlled burn at `world_point`.
    ///
    /// The point is a position on the terrain surface (see [`pick_ground`]).
    /// Only its X and Z select the cell, so a click on a raised cell lands on
    /// that cell whatever its elevation.
    ///
    /// # Arguments
    /// * `automaton` - fire state to mutate, checked at call time
    /// * `world_point` - clicked position in world space
    /// * `camera` - pose the click was made from
    ///
    /// # Returns
    /// The affected cells, or `OutOfBounds` / `InvalidTarget` / `AlreadyBurning`
    /// for the target cell, in that order. Houses are invalid targets while
    /// `spare_houses` is set. Nothing changes on error.
    pub fn request_ignition(
        &mut self,
        automaton: &mut FireAutomaton,
        terrain: &TerrainGrid,
        mapper: &WorldMapper,
        world_point: &Vec3,
        camera: &CameraPose,
    ) -> Result<IgnitionReport, SimError> {
        let target = mapper.world_to_grid(world_point);
        if self.config.spare_houses && terrain.class_at(target) == Ok(TerrainClass::House) {
            return Err(SimError::InvalidTarget {
                coord: target,
                class: TerrainClass::House,
            });
        }
        let kind = IgnitionKind::Controlled {
            fuel_factor: self.config.controlled_burn_fuel_factor,
        };

        automaton.ignite(terrain, target, kind)?;
        let mut affected = vec![target];

        let radius = self.config.radius as i32;
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let coord = target.offset(dx, dz);
                let Ok(class) = terrain.class_at(coord) else {
                    continue;
                };
                if self.config.spare_houses && class == TerrainClass::House {
                    continue;
                }
                let unburnt = automaton
                    .state_at(coord)
                    .is_ok_and(|cell| cell.combustion == CombustionState::Unburnt);
                if class.is_flammable() && unburnt && automaton.ignite(terrain, coord, kind).is_ok() {
                    affected.push(coord);
                }
            }
        }

        self.burns_used += 1;
        debug!(
            %target,
            cells = affected.len(),
            burns_used = self.burns_used,
            distance = (world_point - camera.eye).norm(),
            "Controlled burn started"
        );
        Ok(IgnitionReport { target, affected })
    }
}
