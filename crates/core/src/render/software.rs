//! CPU rasteriser backend.
//!
//! Triangles are clipped against the near plane, then filled with
//! perspective-correct texture coordinates. Sprites are sampled from the
//! procedural atlas.

use crate::core_types::{Mat4, Rgba, Vec3};
use crate::error::RenderError;
use crate::render::atlas::sprite_texel;
use crate::render::{RenderBackend, RenderTarget, Scene};
use nalgebra::Vector4;
use rayon::prelude::*;
use tracing::{debug, info};

/// Texture coordinates of the billboard corners, in `corners()` order
const QUAD_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Default cap on off-screen target size (16M pixels)
pub const DEFAULT_MAX_OFFSCREEN_PIXELS: usize = 4096 * 4096;

/// RGBA8 colour plus normalised depth
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Rgba>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Allocate a cleared framebuffer.
    ///
    /// # Panics
    /// If either dimension is zero or the allocation fails; use
    /// [`Framebuffer::try_new`] to handle that.
    pub fn new(width: u32, height: u32) -> Self {
        match Self::try_new(width, height) {
            Ok(framebuffer) => framebuffer,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible allocation, fails for zero-sized targets or when memory runs out
    pub fn try_new(width: u32, height: u32) -> Result<Self, RenderError> {
        let fail = |reason: String| RenderError::TargetAllocation {
            width,
            height,
            reason,
        };
        if width == 0 || height == 0 {
            return Err(fail("zero-sized target".to_string()));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| fail("pixel count overflows".to_string()))?;

        let mut color = Vec::new();
        color.try_reserve_exact(len).map_err(|e| fail(e.to_string()))?;
        let mut depth = Vec::new();
        depth.try_reserve_exact(len).map_err(|e| fail(e.to_string()))?;
        color.resize(len, Rgba::BLACK);
        depth.resize(len, 1.0);
        Ok(Self {
            width,
            height,
            color,
            depth,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major pixels, top row first
    pub fn pixels(&self) -> &[Rgba] {
        &self.color
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.color[(y * self.width + x) as usize])
    }

    pub fn clear(&mut self, color: Rgba) {
        self.color.fill(color);
        self.depth.fill(1.0);
    }

    /// Packed RGB bytes, alpha dropped
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.color.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vector4<f32>,
    uv: [f32; 2],
}

impl ClipVertex {
    fn new(transform: &Mat4, position: &Vec3, uv: [f32; 2]) -> Self {
        Self {
            clip: transform * position.push(1.0),
            uv,
        }
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(&other.clip, t),
            uv: [
                self.uv[0] + (other.uv[0] - self.uv[0]) * t,
                self.uv[1] + (other.uv[1] - self.uv[1]) * t,
            ],
        }
    }

    /// Signed distance to the near plane, inside when positive
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }
}

#[derive(Debug, Clone, Copy)]
enum Shading {
    /// Opaque flat colour, writes depth
    Flat(Rgba),
    /// Atlas sprite, blended, depth tested only
    Sprite { atlas_index: u16, tint: Rgba },
}

/// Near-plane clip of one triangle into a convex polygon of up to 4 vertices
fn clip_near(triangle: &[ClipVertex; 3]) -> ([ClipVertex; 4], usize) {
    let mut out = [triangle[0]; 4];
    let mut count = 0;
    for i in 0..3 {
        let current = &triangle[i];
        let next = &triangle[(i + 1) % 3];
        let (dc, dn) = (current.near_distance(), next.near_distance());
        if dc >= 0.0 {
            out[count] = *current;
            count += 1;
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            out[count] = current.lerp(next, dc / (dc - dn));
            count += 1;
        }
    }
    (out, count)
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn draw_triangle(target: &mut Framebuffer, triangle: &[ClipVertex; 3], shading: Shading) {
    let (polygon, count) = clip_near(triangle);
    for i in 1..count.saturating_sub(1) {
        raster(target, [polygon[0], polygon[i], polygon[i + 1]], shading);
    }
}

fn raster(target: &mut Framebuffer, vertices: [ClipVertex; 3], shading: Shading) {
    let (width, height) = (target.width as f32, target.height as f32);
    let mut screen = [(0.0, 0.0); 3];
    let mut depth = [0.0; 3];
    let mut inv_w = [0.0; 3];
    for (i, vertex) in vertices.iter().enumerate() {
        if vertex.clip.w <= f32::EPSILON {
            return;
        }
        inv_w[i] = 1.0 / vertex.clip.w;
        let ndc = vertex.clip.xyz() * inv_w[i];
        screen[i] = ((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height);
        depth[i] = ndc.z * 0.5 + 0.5;
    }
    let area = edge(screen[0], screen[1], screen[2]);
    if area.abs() < f32::EPSILON {
        return;
    }

    let min_x = screen.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let min_y = screen.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = screen.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).ceil().min(width) as u32;
    let max_y = screen.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil().min(height) as u32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let b = [
                edge(screen[1], screen[2], p) / area,
                edge(screen[2], screen[0], p) / area,
                edge(screen[0], screen[1], p) / area,
            ];
            if b.iter().any(|&w| w < 0.0) {
                continue;
            }
            let z = b[0] * depth[0] + b[1] * depth[1] + b[2] * depth[2];
            let idx = (y * target.width + x) as usize;
            if !(0.0..=1.0).contains(&z) || z >= target.depth[idx] {
                continue;
            }

            match shading {
                Shading::Flat(color) => {
                    target.color[idx] = color;
                    target.depth[idx] = z;
                }
                Shading::Sprite { atlas_index, tint } => {
                    let one_over_w = b[0] * inv_w[0] + b[1] * inv_w[1] + b[2] * inv_w[2];
                    let attribute = |k: usize| {
                        (b[0] * vertices[0].uv[k] * inv_w[0]
                            + b[1] * vertices[1].uv[k] * inv_w[1]
                            + b[2] * vertices[2].uv[k] * inv_w[2])
                            / one_over_w
                    };
                    let texel = sprite_texel(atlas_index, attribute(0), attribute(1))
                        .tinted(tint.to_f32());
                    if texel.a > 0 {
                        target.color[idx] = texel.blend_over(target.color[idx]);
                    }
                }
            }
        }
    }
}

fn draw_into(target: &mut Framebuffer, scene: &Scene<'_>) {
    target.clear(scene.clear_color);
    let aspect = target.width as f32 / target.height as f32;
    let transform = scene.camera.view_projection(aspect);

    for [a, b, c] in scene.mesh.triangles() {
        let triangle = [
            ClipVertex::new(&transform, &a.position, [0.0, 0.0]),
            ClipVertex::new(&transform, &b.position, [0.0, 0.0]),
            ClipVertex::new(&transform, &c.position, [0.0, 0.0]),
        ];
        draw_triangle(target, &triangle, Shading::Flat(a.color));
    }

    for billboard in scene.billboards {
        let corners = billboard.corners();
        let vertex = |i: usize| ClipVertex::new(&transform, &corners[i], QUAD_UV[i]);
        let shading = Shading::Sprite {
            atlas_index: billboard.atlas_index,
            tint: billboard.tint,
        };
        draw_triangle(target, &[vertex(0), vertex(1), vertex(2)], shading);
        draw_triangle(target, &[vertex(0), vertex(2), vertex(3)], shading);
    }
}

/// Nearest-neighbour stretch of `source` over all of `dest`
fn upscale_nearest(source: &Framebuffer, dest: &mut Framebuffer) {
    let (sw, sh) = (source.width as usize, source.height as usize);
    let (dw, dh) = (dest.width as usize, dest.height as usize);
    dest.color
        .par_chunks_mut(dw)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = y * sh / dh;
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = source.color[sy * sw + x * sw / dw];
            }
        });
    dest.depth.fill(1.0);
}

/// Software renderer drawing into [`Framebuffer`] surfaces
#[derive(Debug)]
pub struct SoftwareBackend {
    offscreen: Option<Framebuffer>,
    max_offscreen_pixels: usize,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::with_pixel_budget(DEFAULT_MAX_OFFSCREEN_PIXELS)
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses off-screen targets larger than `max_pixels`
    pub fn with_pixel_budget(max_pixels: usize) -> Self {
        Self {
            offscreen: None,
            max_offscreen_pixels: max_pixels,
        }
    }

    /// Last rendered off-screen image
    pub fn offscreen(&self) -> Option<&Framebuffer> {
        self.offscreen.as_ref()
    }
}

impl RenderBackend for SoftwareBackend {
    type Surface = Framebuffer;

    fn surface_size(&self, surface: &Framebuffer) -> (u32, u32) {
        surface.size()
    }

    fn ensure_offscreen(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.offscreen_size() == Some((width, height)) {
            return Ok(());
        }
        let pixels = width as usize * height as usize;
        if pixels > self.max_offscreen_pixels {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!(
                    "{pixels} pixels exceeds the budget of {}",
                    self.max_offscreen_pixels
                ),
            });
        }
        self.offscreen = None;
        self.offscreen = Some(Framebuffer::try_new(width, height)?);
        info!(width, height, "Allocated off-screen target");
        Ok(())
    }

    fn release_offscreen(&mut self) {
        if let Some(target) = self.offscreen.take() {
            debug!(width = target.width, height = target.height, "Released off-screen target");
        }
    }

    fn offscreen_size(&self) -> Option<(u32, u32)> {
        self.offscreen.as_ref().map(Framebuffer::size)
    }

    fn draw_scene(
        &mut self,
        target: RenderTarget<'_, Framebuffer>,
        scene: &Scene<'_>,
    ) -> Result<(), RenderError> {
        let framebuffer = match target {
            RenderTarget::Offscreen => self.offscreen.as_mut().ok_or(RenderError::MissingOffscreen)?,
            RenderTarget::Surface(surface) => surface,
        };
        draw_into(framebuffer, scene);
        Ok(())
    }

    fn present_offscreen(&mut self, surface: &mut Framebuffer) -> Result<(), RenderError> {
        let source = self.offscreen.as_ref().ok_or(RenderError::MissingOffscreen)?;
        upscale_nearest(source, surface);
        Ok(())
    }
}
