//! wgpu render backend
//!
//! Draws the same passes as the software backend on the GPU. The sprite
//! atlas is baked once from the procedural shapes in [`crate::render::atlas`].
//! Off-screen target creation runs inside an out-of-memory error scope so a
//! failed allocation surfaces as [`RenderError::TargetAllocation`] instead of
//! a device error.

use crate::core_types::{Mat4, Rgba};
use crate::error::RenderError;
use crate::projection::ATLAS_FRAMES;
use crate::render::atlas::{build_atlas, ATLAS_FRAME_PIXELS};
use crate::render::{RenderBackend, RenderTarget, Scene};
use bytemuck::{Pod, Zeroable};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Maps OpenGL clip depth [-1, 1] to wgpu's [0, 1]
#[rustfmt::skip]
fn gl_to_wgpu() -> Mat4 {
    Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

const QUAD_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

fn color_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn clear_color(color: Rgba) -> wgpu::Color {
    let [r, g, b, a] = color.to_f32();
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}

/// Display target for [`WgpuBackend`]: a colour texture the window layer
/// presents or reads back
#[derive(Debug)]
pub struct GpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuSurface {
    pub fn new(backend: &WgpuBackend, width: u32, height: u32) -> Self {
        let texture = color_texture(&backend.device, "Display Surface", width, height);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            depth: depth_view(&backend.device, width, height),
            width,
            height,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug)]
struct Offscreen {
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// GPU renderer
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    terrain_pipeline: wgpu::RenderPipeline,
    billboard_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    offscreen: Option<Offscreen>,
}

impl WgpuBackend {
    /// Open the default adapter and build all pipelines.
    ///
    /// # Returns
    /// `None` when no adapter is found or the device cannot be created; the
    /// reason is logged.
    pub fn new() -> Option<Self> {
        info!("Attempting to initialize GPU renderer");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let Some(adapter) = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })) else {
            debug!("No GPU adapter found");
            return None;
        };
        let adapter_name = adapter.get_info().name;

        let (device, queue) = match pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Firebreak Renderer"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("GPU '{}' found but failed to initialize: {}", adapter_name, e);
                return None;
            }
        };
        info!("GPU renderer initialized: {}", adapter_name);
        Some(Self::with_device(device, queue, adapter_name))
    }

    fn with_device(device: wgpu::Device, queue: wgpu::Queue, adapter_name: String) -> Self {
        let scene_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/scene.wgsl"));
        let blit_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/blit.wgsl"));

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniforms"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::identity().into(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // nearest everywhere, for the atlas and the retro upscale
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let (atlas_width, atlas_height, pixels) = build_atlas(ATLAS_FRAME_PIXELS);
        let atlas_size = wgpu::Extent3d {
            width: atlas_width,
            height: atlas_height,
            depth_or_array_layers: 1,
        };
        let atlas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Atlas"),
            size: atlas_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let bytes: Vec<u8> = pixels.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &atlas,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * atlas_width),
                rows_per_image: Some(atlas_height),
            },
            atlas_size,
        );
        let atlas_view = atlas.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_bind_group = Self::texture_bind_group(&device, &texture_layout, &atlas_view, &sampler);

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });

        let scene_pipeline = |label: &str, fragment: &str, depth_write: bool, blend: wgpu::BlendState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&scene_layout),
                vertex: wgpu::VertexState {
                    module: &scene_shader,
                    entry_point: Some("vs_scene"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[Vertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &scene_shader,
                    entry_point: Some(fragment),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let terrain_pipeline = scene_pipeline("Terrain Pipeline", "fs_terrain", true, wgpu::BlendState::REPLACE);
        let billboard_pipeline =
            scene_pipeline("Billboard Pipeline", "fs_billboard", false, wgpu::BlendState::ALPHA_BLENDING);

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            device,
            queue,
            adapter_name,
            terrain_pipeline,
            billboard_pipeline,
            blit_pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas_bind_group,
            texture_layout,
            sampler,
            offscreen: None,
        }
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn scene_vertices(scene: &Scene<'_>) -> (Vec<Vertex>, Vec<Vertex>) {
        let terrain = scene
            .mesh
            .vertices
            .iter()
            .map(|v| Vertex {
                position: v.position.into(),
                uv: [0.0, 0.0],
                color: v.color.to_f32(),
            })
            .collect();

        let frames = f32::from(ATLAS_FRAMES);
        let mut billboards = Vec::with_capacity(scene.billboards.len() * 6);
        for billboard in scene.billboards {
            let corners = billboard.corners();
            let vertex = |i: usize| Vertex {
                position: corners[i].into(),
                // atlas is one row of frames, texture v grows downwards
                uv: [
                    (f32::from(billboard.atlas_index) + QUAD_UV[i][0]) / frames,
                    1.0 - QUAD_UV[i][1],
                ],
                color: billboard.tint.to_f32(),
            };
            billboards.extend([0, 1, 2, 0, 2, 3].map(vertex));
        }
        (terrain, billboards)
    }

    fn encode_scene(
        &self,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        aspect: f32,
        scene: &Scene<'_>,
    ) {
        let view_proj = gl_to_wgpu() * scene.camera.view_projection(aspect);
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: view_proj.into(),
            }),
        );

        let (terrain, billboards) = Self::scene_vertices(scene);
        let buffer = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        };
        let terrain_buffer = buffer("Terrain Vertices", bytemuck::cast_slice(&terrain), wgpu::BufferUsages::VERTEX);
        let index_buffer = buffer(
            "Terrain Indices",
            bytemuck::cast_slice(&scene.mesh.indices),
            wgpu::BufferUsages::INDEX,
        );
        let billboard_buffer =
            buffer("Billboard Vertices", bytemuck::cast_slice(&billboards), wgpu::BufferUsages::VERTEX);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.atlas_bind_group, &[]);
            if !scene.mesh.indices.is_empty() {
                pass.set_pipeline(&self.terrain_pipeline);
                pass.set_vertex_buffer(0, terrain_buffer.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..scene.mesh.indices.len() as u32, 0, 0..1);
            }
            if !billboards.is_empty() {
                pass.set_pipeline(&self.billboard_pipeline);
                pass.set_vertex_buffer(0, billboard_buffer.slice(..));
                pass.draw(0..billboards.len() as u32, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }
}

impl RenderBackend for WgpuBackend {
    type Surface = GpuSurface;

    fn surface_size(&self, surface: &GpuSurface) -> (u32, u32) {
        surface.size()
    }

    fn ensure_offscreen(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.offscreen_size() == Some((width, height)) {
            return Ok(());
        }
        let fail = |reason: String| RenderError::TargetAllocation {
            width,
            height,
            reason,
        };
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 {
            return Err(fail("zero-sized target".to_string()));
        }
        if width > max || height > max {
            return Err(fail(format!("exceeds the device texture limit of {max}")));
        }

        self.offscreen = None;
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = color_texture(&self.device, "Retro Target", width, height);
        let color = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = depth_view(&self.device, width, height);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(fail(err.to_string()));
        }

        let blit_bind_group = Self::texture_bind_group(&self.device, &self.texture_layout, &color, &self.sampler);
        self.offscreen = Some(Offscreen {
            color,
            depth,
            blit_bind_group,
            width,
            height,
        });
        info!(width, height, "Allocated off-screen target");
        Ok(())
    }

    fn release_offscreen(&mut self) {
        if let Some(target) = self.offscreen.take() {
            debug!(width = target.width, height = target.height, "Released off-screen target");
        }
    }

    fn offscreen_size(&self) -> Option<(u32, u32)> {
        self.offscreen.as_ref().map(|t| (t.width, t.height))
    }

    fn draw_scene(
        &mut self,
        target: RenderTarget<'_, GpuSurface>,
        scene: &Scene<'_>,
    ) -> Result<(), RenderError> {
        match target {
            RenderTarget::Offscreen => {
                let target = self.offscreen.as_ref().ok_or(RenderError::MissingOffscreen)?;
                let aspect = target.width as f32 / target.height as f32;
                self.encode_scene(&target.color, &target.depth, aspect, scene);
            }
            RenderTarget::Surface(surface) => {
                let aspect = surface.width as f32 / surface.height.max(1) as f32;
                self.encode_scene(&surface.view, &surface.depth, aspect, scene);
            }
        }
        Ok(())
    }

    fn present_offscreen(&mut self, surface: &mut GpuSurface) -> Result<(), RenderError> {
        let target = self.offscreen.as_ref().ok_or(RenderError::MissingOffscreen)?;
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Blit Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &target.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
