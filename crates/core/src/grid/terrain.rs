//! Static terrain classification and elevation grid.
//!
//! A [`TerrainGrid`] is built once per session and only ever read afterwards.
//! Cells are stored row-major: `index = z * width + x`.

use crate::config::Neighborhood;
use crate::core_types::{GridCoord, TerrainClass};
use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Immutable terrain grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    classes: Vec<TerrainClass>,
    elevations: Vec<f32>,
    /// Cells orthogonally adjacent to at least one house
    house_adjacent: Vec<bool>,
    house_count: usize,
    burnable_count: usize,
}

impl TerrainGrid {
    /// Build a grid from parallel class and elevation arrays.
    ///
    /// # Arguments
    /// * `width`, `height` - grid dimensions in cells, both non-zero
    /// * `classes` - one class per cell, row-major
    /// * `elevations` - one elevation per cell, row-major
    ///
    /// # Returns
    /// `SimError::InvalidDimensions` if a dimension is zero or an array has the
    /// wrong length.
    pub fn new(
        width: usize,
        height: usize,
        classes: Vec<TerrainClass>,
        elevations: Vec<f32>,
    ) -> Result<Self, SimError> {
        if width == 0 || height == 0 {
            return Err(SimError::invalid_dimensions(format!(
                "grid must be at least 1x1, got {width}x{height}"
            )));
        }
        let len = width * height;
        if classes.len() != len || elevations.len() != len {
            return Err(SimError::invalid_dimensions(format!(
                "{width}x{height} grid needs {len} cells, got {} classes and {} elevations",
                classes.len(),
                elevations.len()
            )));
        }

        let house_count = classes.iter().filter(|c| **c == TerrainClass::House).count();
        let burnable_count = classes.iter().filter(|c| c.is_flammable()).count();

        let mut grid = Self {
            width,
            height,
            classes,
            elevations,
            house_adjacent: vec![false; len],
            house_count,
            burnable_count,
        };
        grid.house_adjacent = (0..len)
            .map(|idx| {
                grid.neighbor_indices(idx, Neighborhood::VonNeumann)
                    .any(|n| grid.classes[n] == TerrainClass::House)
            })
            .collect();
        Ok(grid)
    }

    /// Flat grid of a single class at elevation 0
    pub fn filled(width: usize, height: usize, class: TerrainClass) -> Result<Self, SimError> {
        let len = width * height;
        Self::new(width, height, vec![class; len], vec![0.0; len])
    }

    /// Parse a map drawn with [`TerrainClass::symbol`] characters, one row per line.
    ///
    /// Blank lines and surrounding whitespace are ignored. Elevation is 0.
    pub fn from_ascii(map: &str) -> Result<Self, SimError> {
        let rows: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let width = rows.first().map_or(0, |row| row.chars().count());

        let mut classes = Vec::with_capacity(width * rows.len());
        for (z, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(SimError::invalid_dimensions(format!(
                    "row {z} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, symbol) in row.chars().enumerate() {
                let class = TerrainClass::from_symbol(symbol).ok_or(SimError::UnknownSymbol {
                    symbol,
                    coord: GridCoord::new(x as i32, z as i32),
                })?;
                classes.push(class);
            }
        }

        let len = classes.len();
        Self::new(width, rows.len(), classes, vec![0.0; len])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false, grids have at least one cell
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.z >= 0
            && (coord.x as usize) < self.width
            && (coord.z as usize) < self.height
    }

    /// Row-major index of `coord`, or `OutOfBounds`
    pub fn index_of(&self, coord: GridCoord) -> Result<usize, SimError> {
        if self.contains(coord) {
            Ok(coord.z as usize * self.width + coord.x as usize)
        } else {
            Err(SimError::OutOfBounds {
                coord,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Coordinate of a row-major index. `index` must be `< len()`.
    #[inline]
    pub fn coord_of(&self, index: usize) -> GridCoord {
        GridCoord::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn class_at(&self, coord: GridCoord) -> Result<TerrainClass, SimError> {
        self.index_of(coord).map(|idx| self.classes[idx])
    }

    pub fn elevation_at(&self, coord: GridCoord) -> Result<f32, SimError> {
        self.index_of(coord).map(|idx| self.elevations[idx])
    }

    /// Class by index, for hot loops that already hold a valid index
    #[inline]
    pub fn class_at_index(&self, index: usize) -> TerrainClass {
        self.classes[index]
    }

    #[inline]
    pub fn elevation_at_index(&self, index: usize) -> f32 {
        self.elevations[index]
    }

    #[inline]
    pub fn is_house_adjacent(&self, index: usize) -> bool {
        self.house_adjacent[index]
    }

    /// Lowest and highest cell elevation
    pub fn elevation_range(&self) -> (f32, f32) {
        self.elevations
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), &e| (low.min(e), high.max(e)))
    }

    pub fn classes(&self) -> &[TerrainClass] {
        &self.classes
    }

    /// In-bounds neighbours of `coord`
    pub fn neighbors(
        &self,
        coord: GridCoord,
        neighborhood: Neighborhood,
    ) -> impl Iterator<Item = GridCoord> + '_ {
        neighborhood
            .offsets()
            .iter()
            .map(move |&(dx, dz)| coord.offset(dx, dz))
            .filter(|c| self.contains(*c))
    }

    /// In-bounds neighbour indices of the cell at `index`
    pub fn neighbor_indices(
        &self,
        index: usize,
        neighborhood: Neighborhood,
    ) -> impl Iterator<Item = usize> + '_ {
        let coord = self.coord_of(index);
        self.neighbors(coord, neighborhood)
            .map(|c| c.z as usize * self.width + c.x as usize)
    }

    pub fn house_count(&self) -> usize {
        self.house_count
    }

    /// Cells that can burn at all (everything but water)
    pub fn burnable_count(&self) -> usize {
        self.burnable_count
    }

    /// Number of cells of `class`
    pub fn count_of(&self, class: TerrainClass) -> usize {
        self.classes.iter().filter(|c| **c == class).count()
    }
}

/// Source of terrain for a new session.
///
/// Implementations must be deterministic: the same seed and size always
/// produce the same grid.
pub trait TerrainGenerator {
    fn generate(&self, seed: u64, width: usize, height: usize) -> Result<TerrainGrid, SimError>;
}
