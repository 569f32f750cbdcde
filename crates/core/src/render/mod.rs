//! Frame rendering: terrain mesh, sorted billboards and the low-resolution
//! retro composite.
//!
//! [`RenderPipeline`] decides where a frame is drawn and in which order. The
//! actual drawing happens behind the [`RenderBackend`] trait, implemented by
//! the always-available [`SoftwareBackend`] and, with the `gpu` feature, by
//! `WgpuBackend`.

pub mod atlas;
mod mesh;
mod pipeline;
mod software;

#[cfg(feature = "gpu")]
mod gpu;

pub use mesh::{cell_color, MeshVertex, TerrainMesh, SKY};
pub use pipeline::{sort_back_to_front, FrameInput, RenderPipeline, RenderReport};
pub use software::{Framebuffer, SoftwareBackend, DEFAULT_MAX_OFFSCREEN_PIXELS};

#[cfg(feature = "gpu")]
pub use gpu::{GpuSurface, WgpuBackend};

use crate::core_types::Rgba;
use crate::error::RenderError;
use crate::projection::BillboardInstance;
use crate::simulation::CameraPose;

/// Where a scene is drawn
#[derive(Debug)]
pub enum RenderTarget<'a, S> {
    /// The backend's own low-resolution colour target
    Offscreen,
    /// The display surface at native resolution
    Surface(&'a mut S),
}

/// Everything a backend needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub camera: &'a CameraPose,
    pub mesh: &'a TerrainMesh,
    /// Already sorted back to front
    pub billboards: &'a [BillboardInstance],
    pub clear_color: Rgba,
}

/// Drawing backend used by [`RenderPipeline`].
///
/// Terrain is depth tested and writes depth. Billboards are depth tested
/// against the terrain, alpha blended and drawn in the given order without
/// writing depth.
pub trait RenderBackend {
    /// Display target type handed in by the window layer
    type Surface;

    /// Pixel size of the display surface
    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32);

    /// Make sure an off-screen target of exactly this size exists.
    ///
    /// Keeps the current target when the size already matches.
    fn ensure_offscreen(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Free the off-screen target, if any
    fn release_offscreen(&mut self);

    fn offscreen_size(&self) -> Option<(u32, u32)>;

    /// Clear `target`, then draw terrain followed by billboards
    fn draw_scene(
        &mut self,
        target: RenderTarget<'_, Self::Surface>,
        scene: &Scene<'_>,
    ) -> Result<(), RenderError>;

    /// Stretch the off-screen target over the whole surface with nearest
    /// neighbour sampling
    fn present_offscreen(&mut self, surface: &mut Self::Surface) -> Result<(), RenderError>;
}
