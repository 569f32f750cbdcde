//! Terrain mesh: one flat, vertex-coloured quad per cell.

use crate::config::ClassTable;
use crate::core_types::hash::{cell_hash, unit_f32};
use crate::core_types::{CellState, CombustionState, GridCoord, Rgba, TerrainClass, Vec3};
use crate::grid::{TerrainGrid, WorldMapper};
use crate::simulation::FireState;

pub const DENSE_FOREST: Rgba = Rgba::opaque(94, 178, 94);
pub const LIGHT_FOREST: Rgba = Rgba::opaque(14, 99, 14);
pub const GRASS_GREEN: Rgba = Rgba::opaque(54, 162, 0);
pub const FIELD_YELLOW: Rgba = Rgba::opaque(170, 130, 0);
pub const HOUSE_RED: Rgba = Rgba::opaque(90, 30, 10);
pub const WATER_BLUE: Rgba = Rgba::opaque(60, 100, 180);
pub const FIRE_RED: Rgba = Rgba::opaque(180, 30, 0);
pub const EMBER_ORANGE: Rgba = Rgba::opaque(180, 90, 0);
pub const SKY: Rgba = Rgba::opaque(45, 110, 180);

const SHADE_SALT: u64 = 0x0a;
const FOREST_SALT: u64 = 0x0b;
const ASH_SALT: u64 = 0x0c;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Vec3,
    pub color: Rgba,
}

/// Surface colour of a cell.
///
/// Unburnt land gets a fixed per-cell shade offset in `[-5, 5]`. Burning
/// cells fade from red to ash grey as their fuel runs out.
pub fn cell_color(class: TerrainClass, cell: &CellState, coord: GridCoord, initial_fuel: f32) -> Rgba {
    let hash = |salt| cell_hash(coord.x, coord.z, salt);
    match cell.combustion {
        CombustionState::Unburnt => {
            let base = match class {
                TerrainClass::Water => return WATER_BLUE,
                TerrainClass::House => return HOUSE_RED,
                TerrainClass::Forest if unit_f32(hash(FOREST_SALT)) < 0.5 => DENSE_FOREST,
                TerrainClass::Forest => LIGHT_FOREST,
                TerrainClass::Grassland => GRASS_GREEN,
                TerrainClass::Field => FIELD_YELLOW,
            };
            let variation = (unit_f32(hash(SHADE_SALT)) * 11.0).floor() as i16 - 5;
            base.shade(variation)
        }
        CombustionState::Igniting => EMBER_ORANGE,
        CombustionState::Burning => {
            let burnt = if initial_fuel > 0.0 {
                1.0 - cell.fuel / initial_fuel
            } else {
                1.0
            };
            FIRE_RED.lerp(Rgba::grey(50), burnt)
        }
        CombustionState::Ash => Rgba::grey(50 + (unit_f32(hash(ASH_SALT)) * 21.0) as u8),
    }
}

/// Indexed triangle mesh of the terrain for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// Build the mesh for the current fire state.
    ///
    /// `fuel` is the per-class starting fuel, used for the burn fade.
    pub fn build(state: &FireState, terrain: &TerrainGrid, mapper: &WorldMapper, fuel: &ClassTable) -> Self {
        let mut mesh = TerrainMesh {
            vertices: Vec::with_capacity(terrain.len() * 4),
            indices: Vec::with_capacity(terrain.len() * 6),
        };
        for (idx, cell) in state.cells().iter().enumerate() {
            let coord = terrain.coord_of(idx);
            let class = terrain.class_at_index(idx);
            let color = cell_color(class, cell, coord, fuel.get(class));
            let elevation = terrain.elevation_at_index(idx);
            let (x, z) = (coord.x as usize, coord.z as usize);

            let base = mesh.vertices.len() as u32;
            for (cx, cz) in [(x, z), (x + 1, z), (x + 1, z + 1), (x, z + 1)] {
                mesh.vertices.push(MeshVertex {
                    position: mapper.cell_corner(cx, cz, elevation),
                    color,
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices of each triangle
    pub fn triangles(&self) -> impl Iterator<Item = [&MeshVertex; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ]
        })
    }
}
