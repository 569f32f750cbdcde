use crate::config::{FireConfig, RetroConfig, SpriteConfig};
use crate::error::RenderError;
use crate::grid::{TerrainGrid, WorldMapper};
use crate::projection::{project, BillboardInstance};
use crate::render::{RenderBackend, RenderTarget, Scene, TerrainMesh, SKY};
use crate::simulation::{CameraPose, FireState, Session};
use tracing::{debug, info, warn};

/// Read-only view of what to draw this frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub state: &'a FireState,
    pub terrain: &'a TerrainGrid,
    pub mapper: &'a WorldMapper,
    pub camera: CameraPose,
    pub fire: &'a FireConfig,
    pub sprites: &'a SpriteConfig,
}

impl<'a> FrameInput<'a> {
    /// Frame input for the session's committed state and current camera
    pub fn from_session(session: &'a Session) -> Self {
        Self {
            state: session.fire_state(),
            terrain: session.terrain(),
            mapper: session.mapper(),
            camera: session.camera(),
            fire: &session.config().fire,
            sprites: &session.config().sprites,
        }
    }
}

/// What one [`RenderPipeline::render`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub frame: u64,
    /// Drawn through the low-resolution target
    pub retro_active: bool,
    /// Size the scene was rasterised at
    pub render_size: (u32, u32),
    pub surface_size: (u32, u32),
    pub triangles: usize,
    pub billboards: usize,
    /// The off-screen target failed this frame and the effect is now off
    pub fell_back: bool,
}

/// Sort billboards farthest first along the camera forward axis.
///
/// Equal depths keep cell order, so the draw order is fully deterministic.
pub fn sort_back_to_front(billboards: &mut [BillboardInstance], camera: &CameraPose) {
    let forward = camera.forward();
    let depth = |b: &BillboardInstance| (b.position - camera.eye).dot(&forward);
    billboards.sort_by(|a, b| {
        depth(b)
            .total_cmp(&depth(a))
            .then_with(|| a.cell_index.cmp(&b.cell_index))
    });
}

fn clamp_to_surface(requested: (u32, u32), surface: (u32, u32)) -> (u32, u32) {
    (requested.0.min(surface.0), requested.1.min(surface.1))
}

/// Frame renderer with the optional low-resolution retro effect.
///
/// With the effect on, the scene is drawn into an off-screen target of the
/// configured low resolution (clamped to the surface) and stretched onto the
/// surface with nearest sampling. The target is created lazily on the first
/// frame that needs it and recreated when the size changes. If it cannot be
/// allocated the effect is switched off for the rest of the pipeline's life
/// and frames go straight to the surface.
#[derive(Debug)]
pub struct RenderPipeline<B: RenderBackend> {
    backend: B,
    retro: RetroConfig,
    fallback_latched: bool,
    frame: u64,
}

impl<B: RenderBackend> RenderPipeline<B> {
    pub fn new(backend: B, retro: RetroConfig) -> Self {
        Self {
            backend,
            retro,
            fallback_latched: false,
            frame: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Turn the retro effect on or off from the next frame
    pub fn set_psx_effect_enabled(&mut self, enabled: bool) {
        if self.retro.enabled != enabled {
            info!(enabled, "Retro effect toggled");
            self.retro.enabled = enabled;
        }
        if enabled && self.fallback_latched {
            debug!("Retro effect requested but disabled after an allocation failure");
        }
    }

    /// Requested state of the effect, independent of any fallback
    pub fn psx_effect_enabled(&self) -> bool {
        self.retro.enabled
    }

    /// The effect was switched off after an allocation failure
    pub fn fallback_latched(&self) -> bool {
        self.fallback_latched
    }

    /// Low-resolution target size, before clamping to the surface
    pub fn set_retro_resolution(&mut self, width: u32, height: u32) {
        self.retro.low_res_width = width;
        self.retro.low_res_height = height;
    }

    fn retro_active(&self) -> bool {
        self.retro.enabled && !self.fallback_latched
    }

    /// Draw one frame onto `surface`.
    ///
    /// The terrain mesh is drawn first, then billboards back to front.
    ///
    /// # Errors
    /// Backend failures while drawing. Off-screen allocation failures are
    /// handled here and never returned.
    pub fn render(
        &mut self,
        frame: &FrameInput<'_>,
        surface: &mut B::Surface,
    ) -> Result<RenderReport, RenderError> {
        self.frame += 1;
        let mesh = TerrainMesh::build(frame.state, frame.terrain, frame.mapper, &frame.fire.fuel);
        let mut billboards: Vec<BillboardInstance> = project(
            frame.state,
            frame.terrain,
            &frame.camera,
            frame.mapper,
            frame.sprites,
        )
        .collect();
        sort_back_to_front(&mut billboards, &frame.camera);

        let scene = Scene {
            camera: &frame.camera,
            mesh: &mesh,
            billboards: &billboards,
            clear_color: SKY,
        };
        let surface_size = self.backend.surface_size(surface);
        let mut report = RenderReport {
            frame: self.frame,
            retro_active: false,
            render_size: surface_size,
            surface_size,
            triangles: mesh.triangle_count(),
            billboards: billboards.len(),
            fell_back: false,
        };

        if self.retro_active() {
            let requested = (self.retro.low_res_width, self.retro.low_res_height);
            let size = clamp_to_surface(requested, surface_size);
            match self.backend.ensure_offscreen(size.0, size.1) {
                Ok(()) => {
                    self.backend.draw_scene(RenderTarget::Offscreen, &scene)?;
                    self.backend.present_offscreen(surface)?;
                    report.retro_active = true;
                    report.render_size = size;
                    return Ok(report);
                }
                Err(err) => {
                    warn!(error = %err, "Retro effect disabled, rendering at native resolution");
                    self.fallback_latched = true;
                    self.backend.release_offscreen();
                    report.fell_back = true;
                }
            }
        } else if self.backend.offscreen_size().is_some() {
            self.backend.release_offscreen();
        }

        self.backend.draw_scene(RenderTarget::Surface(surface), &scene)?;
        Ok(report)
    }
}
