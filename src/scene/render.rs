//! wgpu side of the viewport: uploads a [`Frame`] and draws it.
//!
//! Meshes are drawn into a 4x multisampled offscreen target so that edge
//! antialiasing can use alpha-to-coverage, then resolved and blitted into the
//! widget's bounds.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use iced::Rectangle;
use iced::wgpu;
use iced::widget::shader::{self, Viewport};
use wgpu::util::DeviceExt;

use super::frame::{Frame, MeshDraw};
use super::lines::create_line_pipeline;
use crate::geometry::Geometry;
use crate::material::{Shading, Side};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const SAMPLE_COUNT: u32 = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    ambient: [f32; 4],
    sky: [f32; 4],
    ground: [f32; 4],
    hemisphere_direction: [f32; 4],
    point_position: [f32; 4],
    point_radiance: [f32; 4],
    planes: [[f32; 4]; 4],
}

impl Globals {
    fn from_frame(frame: &Frame) -> Self {
        let lights = &frame.lights;
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            eye: frame.eye.extend(1.0).to_array(),
            ambient: lights.ambient.extend(0.0).to_array(),
            sky: lights.sky.extend(0.0).to_array(),
            ground: lights.ground.extend(0.0).to_array(),
            hemisphere_direction: lights.hemisphere_direction.extend(0.0).to_array(),
            point_position: lights.point_position.extend(1.0).to_array(),
            point_radiance: lights.point_radiance.extend(0.0).to_array(),
            planes: frame.planes,
        }
    }
}

/// One slot of the dynamic-offset object buffer. Sized to the 256 byte
/// offset alignment wgpu requires.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    /// rgb specular, w shininess
    specular: [f32; 4],
    /// roughness, metalness, phong flag, unused
    surface: [f32; 4],
    /// plane mask, intersection flag, smooth edges flag, unused
    clip: [u32; 4],
    _pad: [[f32; 4]; 4],
}

const OBJECT_STRIDE: u64 = std::mem::size_of::<ObjectUniforms>() as u64;

impl ObjectUniforms {
    fn from_draw(draw: &MeshDraw) -> Self {
        let (specular, surface) = match draw.shading {
            Shading::Standard {
                roughness,
                metalness,
            } => ([0.0; 4], [roughness, metalness, 0.0, 0.0]),
            Shading::Phong {
                specular,
                shininess,
            } => (specular.to_array(shininess), [1.0, 0.0, 1.0, 0.0]),
        };

        let compiled = &draw.compiled;
        Self {
            model: draw.model.to_cols_array_2d(),
            normal_matrix: draw.model.inverse().transpose().to_cols_array_2d(),
            color: draw.color.to_array(draw.opacity),
            specular,
            surface,
            clip: [
                compiled.clip_mask,
                u32::from(compiled.clip_mode.is_intersection()),
                u32::from(compiled.alpha_to_coverage),
                0,
            ],
            _pad: [[0.0; 4]; 4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VariantKey {
    alpha_to_coverage: bool,
    double_sided: bool,
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vertices: Vec<Vertex> = geometry
            .positions()
            .iter()
            .zip(geometry.normals())
            .map(|(p, n)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();

        Self {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_mesh_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_mesh_indices"),
                contents: bytemuck::cast_slice(geometry.indices()),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: geometry.indices().len() as u32,
        }
    }
}

struct DrawCall {
    geometry: u64,
    variant: VariantKey,
    offset: u32,
}

struct Targets {
    size: (u32, u32),
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
    resolve: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
}

pub struct Pipeline {
    mesh_shader: wgpu::ShaderModule,
    mesh_layout: wgpu::PipelineLayout,
    variants: HashMap<VariantKey, wgpu::RenderPipeline>,
    meshes: HashMap<u64, GpuMesh>,
    draws: Vec<DrawCall>,

    globals: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    objects: wgpu::Buffer,
    object_capacity: u64,
    objects_bind_group: wgpu::BindGroup,

    line_pipeline: wgpu::RenderPipeline,
    lines: Option<wgpu::Buffer>,
    line_vertex_count: u32,

    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    targets: Option<Targets>,

    clear_color: wgpu::Color,
    uploaded_version: Option<u64>,
    last_bounds: (f32, f32, f32, f32),
}

impl shader::Pipeline for Pipeline {
    fn new(device: &wgpu::Device, _queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_globals_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_object_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(OBJECT_STRIDE),
                },
                count: None,
            }],
        });

        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });

        let object_capacity = 16;
        let (objects, objects_bind_group) =
            create_object_buffer(device, &object_layout, object_capacity);

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_mesh_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_line_pipeline_layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });
        let line_pipeline =
            create_line_pipeline(device, OFFSCREEN_FORMAT, &line_layout, DEPTH_FORMAT, SAMPLE_COUNT);

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene_blit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("scene_blit_bind_group_layout"),
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

        let blit_pipeline = create_blit_pipeline(device, format, &blit_bind_group_layout);

        Self {
            mesh_shader,
            mesh_layout,
            variants: HashMap::new(),
            meshes: HashMap::new(),
            draws: Vec::new(),
            globals,
            globals_bind_group,
            object_layout,
            objects,
            object_capacity,
            objects_bind_group,
            line_pipeline,
            lines: None,
            line_vertex_count: 0,
            blit_pipeline,
            blit_bind_group_layout,
            blit_sampler,
            targets: None,
            clear_color: wgpu::Color::WHITE,
            uploaded_version: None,
            last_bounds: (0.0, 0.0, 1.0, 1.0),
        }
    }
}

impl Pipeline {
    fn ensure_targets(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);

        if self
            .targets
            .as_ref()
            .is_some_and(|t| t.size == (width, height))
        {
            return;
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("scene_msaa_color"),
                size,
                mip_level_count: 1,
                sample_count: SAMPLE_COUNT,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("scene_depth"),
                size,
                mip_level_count: 1,
                sample_count: SAMPLE_COUNT,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let resolve = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("scene_resolve"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_blit_bind_group"),
            layout: &self.blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resolve),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                },
            ],
        });

        tracing::debug!(width, height, "viewport targets resized");
        self.targets = Some(Targets {
            size: (width, height),
            color,
            depth,
            resolve,
            blit_bind_group,
        });
    }

    fn ensure_variant(&mut self, device: &wgpu::Device, key: VariantKey) {
        if self.variants.contains_key(&key) {
            return;
        }
        tracing::debug!(
            alpha_to_coverage = key.alpha_to_coverage,
            double_sided = key.double_sided,
            "mesh pipeline variant created"
        );
        let pipeline = create_mesh_pipeline(device, &self.mesh_shader, &self.mesh_layout, key);
        self.variants.insert(key, pipeline);
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &Frame) {
        queue.write_buffer(&self.globals, 0, bytemuck::bytes_of(&Globals::from_frame(frame)));

        let count = frame.draws.len() as u64;
        if count > self.object_capacity {
            let capacity = count.next_power_of_two();
            let (objects, bind_group) = create_object_buffer(device, &self.object_layout, capacity);
            self.objects = objects;
            self.objects_bind_group = bind_group;
            self.object_capacity = capacity;
        }

        let uniforms: Vec<ObjectUniforms> = frame.draws.iter().map(ObjectUniforms::from_draw).collect();
        if !uniforms.is_empty() {
            queue.write_buffer(&self.objects, 0, bytemuck::cast_slice(&uniforms));
        }

        let mut live = HashSet::new();
        self.draws.clear();
        for (slot, draw) in frame.draws.iter().enumerate() {
            let geometry: &Arc<Geometry> = &draw.geometry;
            let id = geometry.id();
            live.insert(id);
            self.meshes
                .entry(id)
                .or_insert_with(|| GpuMesh::upload(device, geometry));

            let variant = VariantKey {
                alpha_to_coverage: draw.compiled.alpha_to_coverage,
                double_sided: draw.compiled.side == Side::Double,
            };
            self.ensure_variant(device, variant);

            self.draws.push(DrawCall {
                geometry: id,
                variant,
                offset: (slot as u64 * OBJECT_STRIDE) as u32,
            });
        }
        self.meshes.retain(|id, _| live.contains(id));

        if frame.lines.is_empty() {
            self.lines = None;
            self.line_vertex_count = 0;
        } else {
            self.lines = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_line_vertices"),
                contents: bytemuck::cast_slice(&frame.lines),
                usage: wgpu::BufferUsages::VERTEX,
            }));
            self.line_vertex_count = frame.lines.len() as u32;
        }

        let c = frame.clear_color;
        self.clear_color = wgpu::Color {
            r: f64::from(c.r),
            g: f64::from(c.g),
            b: f64::from(c.b),
            a: 1.0,
        };
        self.uploaded_version = Some(frame.version);
    }
}

fn create_object_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("scene_objects"),
        size: capacity * OBJECT_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene_objects_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(OBJECT_STRIDE),
            }),
        }],
    });

    (buffer, bind_group)
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    key: VariantKey,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_mesh_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: if key.double_sided {
                None
            } else {
                Some(wgpu::Face::Back)
            },
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: SAMPLE_COUNT,
            mask: !0,
            alpha_to_coverage_enabled: key.alpha_to_coverage,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: OFFSCREEN_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn create_blit_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scene_blit_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_blit_shader"),
        source: wgpu::ShaderSource::Wgsl(
            r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {
    var out: VertexOutput;

    out.tex_coords = vec2<f32>(
        f32((vi << 1u) & 2u),
        f32(vi & 2u),
    );

    out.position = vec4<f32>(out.tex_coords * 2.0 - 1.0, 0.0, 1.0);

    // Texture rows run top to bottom.
    out.tex_coords.y = 1.0 - out.tex_coords.y;
    return out;
}

@group(0) @binding(0)
var texture: texture_2d<f32>;
@group(0) @binding(1)
var texture_sampler: sampler;

@fragment
fn fs_main(vs: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(texture, texture_sampler, vs.tex_coords).rgb, 1.0);
}
"#
            .into(),
        ),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_blit_pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

/// Offscreen target size. A frame carries the size its surface asked for
/// (bounds times pixel ratio); without one the viewport scale is used.
fn target_size(physical: Option<(u32, u32)>, bounds: &Rectangle, scale: f32) -> (u32, u32) {
    match physical {
        Some((w, h)) => (w.max(1), h.max(1)),
        None => (
            (bounds.width * scale).round().max(1.0) as u32,
            (bounds.height * scale).round().max(1.0) as u32,
        ),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Primitive {
    frame: Option<Arc<Frame>>,
}

impl Primitive {
    pub fn new(frame: Option<Arc<Frame>>) -> Self {
        Self { frame }
    }
}

impl shader::Primitive for Primitive {
    type Pipeline = Pipeline;

    fn prepare(
        &self,
        pipeline: &mut Self::Pipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bounds: &Rectangle,
        viewport: &Viewport,
    ) {
        let scale = viewport.scale_factor();
        let (width, height) = target_size(self.frame.as_ref().map(|f| f.physical_size), bounds, scale);
        pipeline.ensure_targets(device, width, height);

        pipeline.last_bounds = (
            bounds.x * scale,
            bounds.y * scale,
            (bounds.width * scale).max(1.0),
            (bounds.height * scale).max(1.0),
        );

        match &self.frame {
            Some(frame) if pipeline.uploaded_version != Some(frame.version) => {
                pipeline.upload(device, queue, frame);
            }
            Some(_) => {}
            None => {
                pipeline.draws.clear();
                pipeline.lines = None;
                pipeline.line_vertex_count = 0;
                pipeline.uploaded_version = None;
            }
        }
    }

    fn draw(&self, _pipeline: &Self::Pipeline, _render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        // Use `render` so the offscreen multisampled pass can run first.
        false
    }

    fn render(
        &self,
        pipeline: &Self::Pipeline,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clip_bounds: &Rectangle<u32>,
    ) {
        let Some(targets) = pipeline.targets.as_ref() else {
            return;
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.color,
                    depth_slice: None,
                    resolve_target: Some(&targets.resolve),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pipeline.clear_color),
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &pipeline.globals_bind_group, &[]);
            for call in &pipeline.draws {
                let (Some(mesh), Some(variant)) = (
                    pipeline.meshes.get(&call.geometry),
                    pipeline.variants.get(&call.variant),
                ) else {
                    continue;
                };
                pass.set_pipeline(variant);
                pass.set_bind_group(1, &pipeline.objects_bind_group, &[call.offset]);
                pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if let Some(lines) = pipeline.lines.as_ref() {
                pass.set_pipeline(&pipeline.line_pipeline);
                pass.set_bind_group(0, &pipeline.globals_bind_group, &[]);
                pass.set_vertex_buffer(0, lines.slice(..));
                pass.draw(0..pipeline.line_vertex_count, 0..1);
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_blit_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
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

        let (bx, by, bw, bh) = pipeline.last_bounds;
        pass.set_viewport(bx, by, bw, bh, 0.0, 1.0);
        pass.set_scissor_rect(
            clip_bounds.x,
            clip_bounds.y,
            clip_bounds.width,
            clip_bounds.height,
        );
        pass.set_pipeline(&pipeline.blit_pipeline);
        pass.set_bind_group(0, &targets.blit_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

const MESH_SHADER: &str = r#"
const PI: f32 = 3.141592653589793;

struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    ambient: vec4<f32>,
    sky: vec4<f32>,
    ground: vec4<f32>,
    hemisphere_direction: vec4<f32>,
    point_position: vec4<f32>,
    point_radiance: vec4<f32>,
    planes: array<vec4<f32>, 4>,
};

struct Object {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    specular: vec4<f32>,
    surface: vec4<f32>,
    clip: vec4<u32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> object: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(in.position, 1.0);
    out.world_position = world.xyz;
    out.position = globals.view_proj * world;
    out.normal = (object.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    return out;
}

// 1 keeps the fragment, 0 drops it. With smooth edges the value ramps across
// one pixel at each plane so alpha-to-coverage can feather the cut.
fn clip_coverage(p: vec3<f32>) -> f32 {
    var distance: array<f32, 4>;
    var width: array<f32, 4>;
    for (var i = 0u; i < 4u; i = i + 1u) {
        let plane = globals.planes[i];
        distance[i] = dot(plane.xyz, p) + plane.w;
        width[i] = fwidth(distance[i]);
    }

    let mask = object.clip.x;
    if (mask == 0u) {
        return 1.0;
    }
    let intersection = object.clip.y == 1u;
    let smooth_edges = object.clip.z == 1u;

    var all_visible = 1.0;
    var all_hidden = 1.0;
    for (var i = 0u; i < 4u; i = i + 1u) {
        if ((mask & (1u << i)) == 0u) {
            continue;
        }
        var visible = select(0.0, 1.0, distance[i] >= 0.0);
        if (smooth_edges) {
            let w = max(width[i], 1e-6);
            visible = smoothstep(-w, w, distance[i]);
        }
        all_visible = all_visible * visible;
        all_hidden = all_hidden * (1.0 - visible);
    }

    if (intersection) {
        return 1.0 - all_hidden;
    }
    return all_visible;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    let coverage = clip_coverage(in.world_position);
    if (coverage <= 0.0) {
        discard;
    }

    var n = normalize(in.normal);
    if (!front_facing) {
        n = -n;
    }
    let v = normalize(globals.eye.xyz - in.world_position);

    let base = object.color.rgb;
    var diffuse_color = base;
    var specular_color = object.specular.rgb;
    var shininess = object.specular.w;
    if (object.surface.z < 0.5) {
        let roughness = clamp(object.surface.x, 0.04, 1.0);
        let metalness = clamp(object.surface.y, 0.0, 1.0);
        diffuse_color = base * (1.0 - metalness);
        specular_color = mix(vec3<f32>(0.04), base, metalness);
        let a2 = roughness * roughness * roughness * roughness;
        shininess = max(2.0 / max(a2, 1e-4) - 2.0, 1.0);
    }

    let hemi = dot(n, globals.hemisphere_direction.xyz) * 0.5 + 0.5;
    let irradiance = globals.ambient.rgb + mix(globals.ground.rgb, globals.sky.rgb, hemi);
    var color = irradiance * diffuse_color / PI;

    let to_light = globals.point_position.xyz - in.world_position;
    let d2 = max(dot(to_light, to_light), 1e-4);
    let l = to_light * inverseSqrt(d2);
    let n_dot_l = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let n_dot_h = max(dot(n, h), 0.0);
    let v_dot_h = max(dot(v, h), 0.0);
    let fresnel = specular_color + (vec3<f32>(1.0) - specular_color) * pow(1.0 - v_dot_h, 5.0);
    let blinn = 0.25 / PI * (0.5 * shininess + 1.0) * pow(n_dot_h, shininess);
    let direct = globals.point_radiance.rgb / d2 * n_dot_l;
    color = color + direct * (diffuse_color / PI + fresnel * blinn);

    return vec4<f32>(color, object.color.a * coverage);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_wins_over_viewport_scale() {
        let bounds = Rectangle::new(iced::Point::ORIGIN, iced::Size::new(400.0, 300.0));
        assert_eq!(target_size(Some((800, 600)), &bounds, 1.0), (800, 600));
        assert_eq!(target_size(None, &bounds, 1.5), (600, 450));
        assert_eq!(target_size(Some((0, 0)), &bounds, 1.0), (1, 1));
    }
}
