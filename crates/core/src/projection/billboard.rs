//! Camera-facing billboards derived from the fire and terrain state.
//!
//! Nothing here is stored between frames: [`project`] walks the grid lazily
//! and computes each instance from the cell, the camera and a hash of the cell
//! position, so equal inputs always give equal output.

use crate::config::SpriteConfig;
use crate::core_types::hash::{cell_hash, signed_unit_f32};
use crate::core_types::{GridCoord, Quat, Rgba, Vec3};
use crate::grid::{TerrainGrid, WorldMapper};
use crate::projection::sprites::{atlas_index, sprite_for, FacingMode, SpriteKind};
use crate::simulation::{CameraPose, FireState};
use nalgebra::Vector3;

const JITTER_SALT_X: u64 = 0x51;
const JITTER_SALT_Z: u64 = 0x52;

/// One quad to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillboardInstance {
    pub cell: GridCoord,
    /// Row-major cell index, used as a stable sort tie-break
    pub cell_index: usize,
    pub kind: SpriteKind,
    pub facing: FacingMode,
    /// Bottom centre of the quad in world space
    pub position: Vec3,
    /// Rotates the local quad (X right, Y up, +Z normal) to face the camera
    pub rotation: Quat,
    /// Width and height in world units
    pub size: [f32; 2],
    pub atlas_index: u16,
    pub tint: Rgba,
}

impl BillboardInstance {
    /// World-space corners, counter-clockwise from bottom left
    pub fn corners(&self) -> [Vec3; 4] {
        let half = self.size[0] / 2.0;
        let height = self.size[1];
        let local = [
            Vec3::new(-half, 0.0, 0.0),
            Vec3::new(half, 0.0, 0.0),
            Vec3::new(half, height, 0.0),
            Vec3::new(-half, height, 0.0),
        ];
        local.map(|corner| self.position + self.rotation * corner)
    }

    /// Quad normal in world space
    pub fn normal(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }
}

/// Rotation that turns a quad at `position` towards `eye`.
///
/// Cylindrical facing only yaws about world Y. Spherical facing points the
/// normal straight at the eye and keeps the quad's up close to world up.
pub fn facing_rotation(mode: FacingMode, position: &Vec3, eye: &Vec3) -> Quat {
    let to_eye = eye - position;
    match mode {
        FacingMode::Cylindrical => {
            if to_eye.x.abs() < f32::EPSILON && to_eye.z.abs() < f32::EPSILON {
                return Quat::identity();
            }
            Quat::from_axis_angle(&Vector3::y_axis(), to_eye.x.atan2(to_eye.z))
        }
        FacingMode::Spherical => {
            let Some(dir) = to_eye.try_normalize(f32::EPSILON) else {
                return Quat::identity();
            };
            // looking straight down the up axis: pick another up
            let up = if dir.cross(&Vec3::y()).norm() < 1e-4 {
                Vec3::z()
            } else {
                Vec3::y()
            };
            Quat::face_towards(&dir, &up)
        }
    }
}

/// Billboards for every cell that currently shows a sprite.
///
/// # Arguments
/// * `state` - committed fire state (its tick drives animation)
/// * `terrain` - terrain the state belongs to
/// * `camera` - pose to face
/// * `mapper` - grid to world placement
/// * `config` - jitter, animation speed, ash lifetime, tints
///
/// # Panics
/// If `state` and `terrain` dimensions differ.
pub fn project<'a>(
    state: &'a FireState,
    terrain: &'a TerrainGrid,
    camera: &'a CameraPose,
    mapper: &'a WorldMapper,
    config: &'a SpriteConfig,
) -> impl Iterator<Item = BillboardInstance> + 'a {
    assert_eq!(
        (state.width(), state.height()),
        (terrain.width(), terrain.height()),
        "fire state and terrain grid dimensions diverged"
    );
    let tick = state.tick();
    state
        .cells()
        .iter()
        .enumerate()
        .filter_map(move |(idx, cell)| {
            let class = terrain.class_at_index(idx);
            let age = cell.age(tick);
            let kind = sprite_for(class, cell.combustion, age, config)?;
            let info = kind.info();
            let coord = terrain.coord_of(idx);

            let jitter = match kind {
                SpriteKind::Tree => config.tree_jitter,
                SpriteKind::Grass => config.grass_jitter,
                _ => 0.0,
            } * mapper.cell_size();
            let mut position = mapper.cell_center(coord, terrain.elevation_at_index(idx));
            position.x += signed_unit_f32(cell_hash(coord.x, coord.z, JITTER_SALT_X)) * jitter;
            position.z += signed_unit_f32(cell_hash(coord.x, coord.z, JITTER_SALT_Z)) * jitter;

            let tint = match kind {
                SpriteKind::Grass => Rgba::WHITE.tinted(config.grass_tint),
                _ => Rgba::WHITE,
            };

            Some(BillboardInstance {
                cell: coord,
                cell_index: idx,
                kind,
                facing: info.facing,
                position,
                rotation: facing_rotation(info.facing, &position, &camera.eye),
                size: [
                    info.size[0] * mapper.cell_size(),
                    info.size[1] * mapper.cell_size(),
                ],
                atlas_index: atlas_index(kind, cell.combustion, age, config.ticks_per_frame),
                tint,
            })
        })
}
