//! Core types and utilities

pub mod cell;
pub mod color;
pub mod hash;
pub mod vec3;

pub use cell::{CellState, CombustionState, GridCoord, TerrainClass};
pub use color::Rgba;
pub use vec3::{Mat4, Quat, Vec3};
