//! Billboard sprite derivation
//!
//! Pure functions from the fire state, terrain and camera to the per-frame
//! list of camera-facing quads handed to the renderer.

pub mod billboard;
pub mod sprites;

pub use billboard::{facing_rotation, project, BillboardInstance};
pub use sprites::{atlas_index, sprite_for, FacingMode, SpriteInfo, SpriteKind, ATLAS_FRAMES, SPRITE_TABLE};
