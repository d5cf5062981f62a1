// Renderer module for lamp-viewer

use std::mem;
use std::sync::Arc;

use bytemuck::Zeroable;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use wgpu::{Adapter, BindGroup, BindGroupLayout, Buffer, RenderPipeline, TextureView};
use winit::window::Window;

use crate::engine::SceneEngine;
use crate::error::{Result, ViewerError};
use crate::scene::{Light, NodeId, Scene};
use crate::ui::Rect;
use crate::viewer::Viewer;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;

// Define Vertex struct for vertex data
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Per-draw uniforms, one slot per draw at a dynamic offset.
/// `emissive.w` set to 1 draws `base_color` unlit (overlay).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
}

/// One point light and one spot light; `*_color.w` is the visibility flag.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniforms {
    camera_position: [f32; 4],
    point_position: [f32; 4],
    point_color: [f32; 4],
    /// x: cutoff distance, y: decay
    point_params: [f32; 4],
    spot_position: [f32; 4],
    spot_direction: [f32; 4],
    spot_color: [f32; 4],
    /// x: cos(outer angle), y: cos(inner angle), z: cutoff distance, w: decay
    spot_params: [f32; 4],
    /// x: tone mapping exposure
    exposure: [f32; 4],
}

impl LightUniforms {
    fn from_scene(scene: &Scene, camera_position: Vec3, exposure: f32) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.camera_position = camera_position.extend(1.0).to_array();
        uniforms.exposure = [exposure, 0.0, 0.0, 0.0];

        let point = scene.lights().iter().find_map(|light| match light {
            Light::Point(point) => Some(point),
            _ => None,
        });
        if let Some(point) = point {
            uniforms.point_position = point.position.extend(1.0).to_array();
            uniforms.point_color = scaled_color(point.color, point.intensity, point.visible);
            uniforms.point_params = [point.distance, point.decay, 0.0, 0.0];
        }

        let spot = scene.lights().iter().find_map(|light| match light {
            Light::Spot(spot) => Some(spot),
            _ => None,
        });
        if let Some(spot) = spot {
            let direction = (scene.world_position(spot.target) - spot.position).normalize_or_zero();
            uniforms.spot_position = spot.position.extend(1.0).to_array();
            uniforms.spot_direction = direction.extend(0.0).to_array();
            uniforms.spot_color = scaled_color(spot.color, spot.intensity, spot.visible);
            uniforms.spot_params = [
                spot.angle.cos(),
                (spot.angle * (1.0 - spot.penumbra)).cos(),
                spot.distance,
                spot.decay,
            ];
        }

        uniforms
    }
}

fn scaled_color(color: [f32; 3], intensity: f32, visible: bool) -> [f32; 4] {
    [
        color[0] * intensity,
        color[1] * intensity,
        color[2] * intensity,
        if visible { 1.0 } else { 0.0 },
    ]
}

/// Maps a pixel rectangle (origin top-left) onto a unit quad.
fn overlay_matrix(rect: Rect, width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0)
        * Mat4::from_translation(Vec3::new(rect.x, rect.y, 0.0))
        * Mat4::from_scale(Vec3::new(rect.width, rect.height, 1.0))
}

struct GpuMesh {
    node: NodeId,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    num_indices: u32,
}

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    scene_pipeline: RenderPipeline,
    overlay_pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    draw_buffer: Buffer,
    draw_stride: u64,
    draw_capacity: usize,
    light_buffer: Buffer,
    depth_view: TextureView,
    msaa_view: Option<TextureView>,
    quad_vertex_buffer: Buffer,
    quad_index_buffer: Buffer,
    meshes: Vec<GpuMesh>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            log::warn!("{:?} does not support {}x MSAA", surface_format, MSAA_SAMPLES);
            1
        };

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(mem::size_of::<DrawUniforms>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(mem::size_of::<LightUniforms>() as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let scene_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            sample_count,
            PipelineKind::Scene,
        );
        let overlay_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            sample_count,
            PipelineKind::Overlay,
        );

        let draw_stride = aligned_stride(device.limits().min_uniform_buffer_offset_alignment);
        let draw_capacity = 1;
        let draw_buffer = create_draw_buffer(&device, draw_stride, draw_capacity);

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = create_bind_group(&device, &bind_group_layout, &draw_buffer, &light_buffer);

        let quad_vertices = [
            Vertex { position: [0.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [1.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [1.0, 1.0, 0.0], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [0.0, 1.0, 0.0], normal: [0.0, 0.0, 1.0] },
        ];
        let quad_indices: &[u16] = &[0, 1, 2, 2, 3, 0];

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Button Vertex Buffer"),
            contents: bytemuck::cast_slice(&quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Button Index Buffer"),
            contents: bytemuck::cast_slice(quad_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let depth_view = create_depth_view(&device, &config, sample_count);
        let msaa_view = create_msaa_view(&device, &config, sample_count);

        log::info!(
            "Renderer ready: {:?}, {}x{}, {}x MSAA",
            surface_format,
            config.width,
            config.height,
            sample_count
        );

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            config,
            sample_count,
            scene_pipeline,
            overlay_pipeline,
            bind_group_layout,
            bind_group,
            draw_buffer,
            draw_stride,
            draw_capacity,
            light_buffer,
            depth_view,
            msaa_view,
            quad_vertex_buffer,
            quad_index_buffer,
            meshes: Vec::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let surface_caps = self.surface.get_capabilities(&self.adapter);
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.config.present_mode = surface_caps.present_modes[0];
        self.surface.configure(&self.device, &self.config);

        self.depth_view = create_depth_view(&self.device, &self.config, self.sample_count);
        self.msaa_view = create_msaa_view(&self.device, &self.config, self.sample_count);
    }

    /// Uploads every mesh node of the scene. Call once the model is attached.
    pub fn upload_scene(&mut self, scene: &Scene) {
        self.meshes.clear();
        for (node_id, node) in scene.mesh_nodes() {
            let Some(mesh) = node.mesh.as_ref() else {
                continue;
            };
            if mesh.indices.is_empty() {
                continue;
            }

            let vertices: Vec<Vertex> = mesh
                .positions
                .iter()
                .zip(mesh.normals.iter())
                .map(|(position, normal)| Vertex {
                    position: *position,
                    normal: *normal,
                })
                .collect();

            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Vertex Buffer {}", node.name)),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Index Buffer {}", node.name)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            self.meshes.push(GpuMesh {
                node: node_id,
                vertex_buffer,
                index_buffer,
                num_indices: mesh.indices.len() as u32,
            });
        }

        // One slot per mesh plus the button.
        let needed = self.meshes.len() + 1;
        if needed > self.draw_capacity {
            self.draw_capacity = needed;
            self.draw_buffer = create_draw_buffer(&self.device, self.draw_stride, needed);
            self.bind_group = create_bind_group(
                &self.device,
                &self.bind_group_layout,
                &self.draw_buffer,
                &self.light_buffer,
            );
        }
        log::info!("Uploaded {} meshes", self.meshes.len());
    }

    pub fn render(&mut self, viewer: &Viewer) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("Surface texture unavailable ({}), reconfiguring", err);
                self.surface.configure(&self.device, &self.config);
                return;
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let scene = viewer.scene();
        let camera = viewer.camera();
        let view_projection = camera.view_projection();

        let stride = self.draw_stride as usize;
        let mut staging = vec![0u8; stride * (self.meshes.len() + 1)];
        for (slot, mesh) in self.meshes.iter().enumerate() {
            let model = scene.world_matrix(mesh.node);
            let material = scene
                .node(mesh.node)
                .material
                .map(|id| scene.material(id).clone())
                .unwrap_or_default();
            let emissive = material.emissive.map(|c| c * material.emissive_intensity);
            let uniforms = DrawUniforms {
                mvp: (view_projection * model).to_cols_array_2d(),
                model: model.to_cols_array_2d(),
                base_color: material.base_color,
                emissive: [emissive[0], emissive[1], emissive[2], 0.0],
            };
            staging[slot * stride..slot * stride + mem::size_of::<DrawUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }

        let button = viewer.button();
        let button_slot = self.meshes.len();
        let button_uniforms = DrawUniforms {
            mvp: overlay_matrix(button.rect(), self.config.width as f32, self.config.height as f32)
                .to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            base_color: button.color(),
            emissive: [0.0, 0.0, 0.0, 1.0],
        };
        staging[button_slot * stride..button_slot * stride + mem::size_of::<DrawUniforms>()]
            .copy_from_slice(bytemuck::bytes_of(&button_uniforms));

        self.queue.write_buffer(&self.draw_buffer, 0, &staging);

        let lights = LightUniforms::from_scene(scene, camera.position, viewer.config().exposure);
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[lights]));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let (color_view, resolve_target) = match &self.msaa_view {
                Some(msaa_view) => (msaa_view, Some(&view)),
                None => (&view, None),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.scene_pipeline);
            for (slot, mesh) in self.meshes.iter().enumerate() {
                let offset = (slot as u64 * self.draw_stride) as u32;
                render_pass.set_bind_group(0, &self.bind_group, &[offset]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
            }

            let offset = (button_slot as u64 * self.draw_stride) as u32;
            render_pass.set_pipeline(&self.overlay_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[offset]);
            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..6, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

#[derive(Clone, Copy, PartialEq)]
enum PipelineKind {
    Scene,
    /// Unlit, always on top, no culling.
    Overlay,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    sample_count: u32,
    kind: PipelineKind,
) -> RenderPipeline {
    let overlay = kind == PipelineKind::Overlay;

    // Define vertex buffer layout
    let vertex_buffer_layout = wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if overlay { "Overlay Pipeline" } else { "Scene Pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: &[vertex_buffer_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // glTF models are often authored double sided.
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !overlay,
            depth_compare: if overlay {
                wgpu::CompareFunction::Always
            } else {
                wgpu::CompareFunction::Less
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn aligned_stride(alignment: u32) -> u64 {
    let size = mem::size_of::<DrawUniforms>() as u64;
    let alignment = u64::from(alignment.max(1));
    size.div_ceil(alignment) * alignment
}

fn create_draw_buffer(device: &wgpu::Device, stride: u64, slots: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: stride * slots as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &BindGroupLayout,
    draw_buffer: &Buffer,
    light_buffer: &Buffer,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Uniform Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(mem::size_of::<DrawUniforms>() as u64),
                }),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: light_buffer.as_entire_binding(),
            },
        ],
    })
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_msaa_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<TextureView> {
    if sample_count == 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("MSAA Color Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}
