//! World-space placement of the terrain grid.
//!
//! The grid is centred on the world origin in the XZ plane, Y is up.
//! Cell `(x, z)` covers `[x - W/2, x - W/2 + 1) * cell_size` along X, and the
//! same along Z with `H`.

use crate::core_types::{GridCoord, Vec3};
use crate::grid::TerrainGrid;
use serde::{Deserialize, Serialize};

/// World <-> grid coordinate transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldMapper {
    width: usize,
    height: usize,
    cell_size: f32,
}

impl WorldMapper {
    pub fn new(width: usize, height: usize, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size: cell_size.max(f32::EPSILON),
        }
    }

    /// Mapper matching `terrain`'s dimensions
    pub fn for_terrain(terrain: &TerrainGrid, cell_size: f32) -> Self {
        Self::new(terrain.width(), terrain.height(), cell_size)
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of a cell centre at `elevation`
    #[inline]
    pub fn cell_center(&self, coord: GridCoord, elevation: f32) -> Vec3 {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        Vec3::new(
            (coord.x as f32 - half_w + 0.5) * self.cell_size,
            elevation,
            (coord.z as f32 - half_h + 0.5) * self.cell_size,
        )
    }

    /// World position of grid-line intersection `(x, z)`, `0..=W` by `0..=H`
    #[inline]
    pub fn cell_corner(&self, x: usize, z: usize, elevation: f32) -> Vec3 {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        Vec3::new(
            (x as f32 - half_w) * self.cell_size,
            elevation,
            (z as f32 - half_h) * self.cell_size,
        )
    }

    /// Grid cell containing a world point, ignoring Y.
    ///
    /// Off-map points map to out-of-range coordinates, which grid lookups
    /// reject with `OutOfBounds`. Non-finite input maps to `i32::MIN`.
    pub fn world_to_grid(&self, point: &Vec3) -> GridCoord {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        let to_cell = |world: f32, half: f32| {
            let cell = (world / self.cell_size + half).floor();
            if cell.is_finite() {
                // `as` saturates, so huge values stay out of range
                cell as i32
            } else {
                i32::MIN
            }
        };
        GridCoord::new(to_cell(point.x, half_w), to_cell(point.z, half_h))
    }

    /// Half of the map extent along X and Z, in world units
    pub fn half_extent(&self) -> (f32, f32) {
        (
            self.width as f32 * self.cell_size / 2.0,
            self.height as f32 * self.cell_size / 2.0,
        )
    }
}
