//! Rendering system with wgpu pipelines: instanced scene pass into an HDR
//! target, then the bloom chain (bright pass, separable blur, composite with
//! tone mapping and the progress strip).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::params::BloomSettings;
use crate::scene::{InstanceRaw, MeshData, Vertex};

const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform buffer for the scene pass (view-projection + camera position)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BrightUniforms {
    threshold: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    inv_resolution: [f32; 2],
    radius: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CompositeUniforms {
    strength: f32,
    exposure: f32,
    progress: f32,
    _pad: f32,
}

/// One uploaded mesh (vertex + index buffers)
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Offscreen targets and the bind groups reading them; rebuilt on resize
struct PostTargets {
    depth_view: wgpu::TextureView,
    hdr_view: wgpu::TextureView,
    ping_view: wgpu::TextureView,
    pong_view: wgpu::TextureView,

    bright_bind_group: wgpu::BindGroup,
    blur_h_bind_group: wgpu::BindGroup,
    blur_v_bind_group: wgpu::BindGroup,
    composite_bind_group: wgpu::BindGroup,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    scene_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,

    prototype: GpuMesh,
    torus: GpuMesh,
    instance_buffer: wgpu::Buffer,
    prototype_instances: u32,
    torus_instances: u32,

    scene_uniform_buffer: wgpu::Buffer,
    bright_uniform_buffer: wgpu::Buffer,
    blur_h_uniform_buffer: wgpu::Buffer,
    blur_v_uniform_buffer: wgpu::Buffer,
    composite_uniform_buffer: wgpu::Buffer,

    scene_bind_group: wgpu::BindGroup,
    post_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    targets: PostTargets,

    bloom: BloomSettings,
    progress: f32,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: std::sync::Arc<winit::window::Window>,
        prototype_mesh: &MeshData,
        torus_mesh: &MeshData,
        instances: &[InstanceRaw],
        prototype_instances: u32,
        bloom: BloomSettings,
    ) -> Result<Self, String> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to request device: {}", e))?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Load shaders
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bloom_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("bloom.wgsl").into()),
        });

        // Upload meshes and instances
        let prototype = GpuMesh::upload(&device, prototype_mesh, "Prototype");
        let torus = GpuMesh::upload(&device, torus_mesh, "Torus");

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let torus_instances = instances.len() as u32 - prototype_instances;

        // Uniform buffers
        let scene_uniforms = SceneUniforms {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 4],
        };
        let scene_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: bytemuck::cast_slice(&[scene_uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_usage = wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST;
        let bright_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bright Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BrightUniforms {
                threshold: bloom.threshold,
                _pad: [0.0; 3],
            }]),
            usage: uniform_usage,
        });
        let blur_h_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blur H Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BlurUniforms::zeroed()]),
            usage: uniform_usage,
        });
        let blur_v_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blur V Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BlurUniforms::zeroed()]),
            usage: uniform_usage,
        });
        let composite_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniform Buffer"),
            contents: bytemuck::cast_slice(&[CompositeUniforms::zeroed()]),
            usage: uniform_usage,
        });

        // Scene bind group
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
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

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_uniform_buffer.as_entire_binding(),
            }],
        });

        // Post-processing layouts: (source texture, sampler, uniforms) for the
        // bright/blur passes, (scene, bloom, sampler, uniforms) for composite
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3),
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Scene render pipeline
        let scene_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&scene_layout],
                push_constant_ranges: &[],
            });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![
                2 => Float32x4,
                3 => Float32x4,
                4 => Float32x4,
                5 => Float32x4,
                6 => Float32x4,
                7 => Float32x4,
            ],
        };

        let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout, instance_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Post pipelines share the fullscreen-triangle vertex stage
        let post_pipeline = |label: &str,
                             entry: &str,
                             layout: &wgpu::BindGroupLayout,
                             format: wgpu::TextureFormat| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", label)),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &bloom_shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &bloom_shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let bright_pipeline = post_pipeline("Bright Pipeline", "fs_bright", &post_layout, HDR_FORMAT);
        let blur_pipeline = post_pipeline("Blur Pipeline", "fs_blur", &post_layout, HDR_FORMAT);
        let composite_pipeline =
            post_pipeline("Composite Pipeline", "fs_composite", &composite_layout, config.format);

        let targets = Self::create_targets(
            &device,
            &config,
            &post_layout,
            &composite_layout,
            &sampler,
            &bright_uniform_buffer,
            &blur_h_uniform_buffer,
            &blur_v_uniform_buffer,
            &composite_uniform_buffer,
        );

        let mut system = Self {
            surface,
            device,
            queue,
            config,
            scene_pipeline,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            prototype,
            torus,
            instance_buffer,
            prototype_instances,
            torus_instances,
            scene_uniform_buffer,
            bright_uniform_buffer,
            blur_h_uniform_buffer,
            blur_v_uniform_buffer,
            composite_uniform_buffer,
            scene_bind_group,
            post_layout,
            composite_layout,
            sampler,
            targets,
            bloom,
            progress: -1.0, // bar hidden until a track is loaded
        };
        system.write_post_uniforms();
        Ok(system)
    }

    fn create_target(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: config.width,
                    height: config.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[allow(clippy::too_many_arguments)]
    fn create_targets(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        post_layout: &wgpu::BindGroupLayout,
        composite_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        bright_uniform_buffer: &wgpu::Buffer,
        blur_h_uniform_buffer: &wgpu::Buffer,
        blur_v_uniform_buffer: &wgpu::Buffer,
        composite_uniform_buffer: &wgpu::Buffer,
    ) -> PostTargets {
        let offscreen_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

        let depth_view = Self::create_target(
            device,
            config,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            "Depth Texture",
        );
        let hdr_view =
            Self::create_target(device, config, HDR_FORMAT, offscreen_usage, "HDR Texture");
        let ping_view =
            Self::create_target(device, config, HDR_FORMAT, offscreen_usage, "Ping Texture");
        let pong_view =
            Self::create_target(device, config, HDR_FORMAT, offscreen_usage, "Pong Texture");

        let post_bind_group = |label: &str, source: &wgpu::TextureView, uniforms: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
        };

        let bright_bind_group = post_bind_group("Bright Bind Group", &hdr_view, bright_uniform_buffer);
        let blur_h_bind_group = post_bind_group("Blur H Bind Group", &ping_view, blur_h_uniform_buffer);
        let blur_v_bind_group = post_bind_group("Blur V Bind Group", &pong_view, blur_v_uniform_buffer);

        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&hdr_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&ping_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: composite_uniform_buffer.as_entire_binding(),
                },
            ],
        });

        PostTargets {
            depth_view,
            hdr_view,
            ping_view,
            pong_view,
            bright_bind_group,
            blur_h_bind_group,
            blur_v_bind_group,
            composite_bind_group,
        }
    }

    /// Push the current bloom/progress values into the post uniform buffers
    fn write_post_uniforms(&mut self) {
        let inv_resolution = [
            1.0 / self.config.width.max(1) as f32,
            1.0 / self.config.height.max(1) as f32,
        ];

        self.queue.write_buffer(
            &self.bright_uniform_buffer,
            0,
            bytemuck::cast_slice(&[BrightUniforms {
                threshold: self.bloom.threshold,
                _pad: [0.0; 3],
            }]),
        );
        self.queue.write_buffer(
            &self.blur_h_uniform_buffer,
            0,
            bytemuck::cast_slice(&[BlurUniforms {
                direction: [1.0, 0.0],
                inv_resolution,
                radius: self.bloom.radius,
                _pad: [0.0; 3],
            }]),
        );
        self.queue.write_buffer(
            &self.blur_v_uniform_buffer,
            0,
            bytemuck::cast_slice(&[BlurUniforms {
                direction: [0.0, 1.0],
                inv_resolution,
                radius: self.bloom.radius,
                _pad: [0.0; 3],
            }]),
        );
        self.queue.write_buffer(
            &self.composite_uniform_buffer,
            0,
            bytemuck::cast_slice(&[CompositeUniforms {
                strength: self.bloom.strength,
                exposure: self.bloom.exposure,
                progress: self.progress,
                _pad: 0.0,
            }]),
        );
    }

    /// Update audio-driven bloom parameters
    pub fn set_bloom(&mut self, strength: f32, radius: f32) {
        self.bloom.strength = strength;
        self.bloom.radius = radius;
        self.write_post_uniforms();
    }

    /// Update the playback progress strip (percent, negative hides it)
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress;
        self.write_post_uniforms();
    }

    /// Update per-instance transforms and colors
    pub fn update_instances(&self, instances: &[InstanceRaw]) {
        self.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
    }

    /// Update scene uniforms (camera)
    pub fn update_scene_uniforms(&self, view_proj: Mat4, camera_pos: Vec3) {
        let uniforms = SceneUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: [camera_pos.x, camera_pos.y, camera_pos.z, 1.0],
        };
        self.queue
            .write_buffer(&self.scene_uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Resize surface and offscreen targets to the new viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.targets = Self::create_targets(
            &self.device,
            &self.config,
            &self.post_layout,
            &self.composite_layout,
            &self.sampler,
            &self.bright_uniform_buffer,
            &self.blur_h_uniform_buffer,
            &self.blur_v_uniform_buffer,
            &self.composite_uniform_buffer,
        );
        self.write_post_uniforms();
    }

    /// Render a frame
    pub fn render(&self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Scene pass into the HDR target
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.scene_pipeline);
            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            // Ring instances lead the buffer, the torus trails it
            render_pass.set_vertex_buffer(0, self.prototype.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(self.prototype.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.prototype.index_count, 0, 0..self.prototype_instances);

            render_pass.set_vertex_buffer(0, self.torus.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(self.torus.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(
                0..self.torus.index_count,
                0,
                self.prototype_instances..self.prototype_instances + self.torus_instances,
            );
        }

        // Bloom chain: bright → blur H → blur V → composite
        self.post_pass(
            &mut encoder,
            "Bright Pass",
            &self.bright_pipeline,
            &self.targets.bright_bind_group,
            &self.targets.ping_view,
        );
        self.post_pass(
            &mut encoder,
            "Blur H Pass",
            &self.blur_pipeline,
            &self.targets.blur_h_bind_group,
            &self.targets.pong_view,
        );
        self.post_pass(
            &mut encoder,
            "Blur V Pass",
            &self.blur_pipeline,
            &self.targets.blur_v_bind_group,
            &self.targets.ping_view,
        );
        self.post_pass(
            &mut encoder,
            "Composite Pass",
            &self.composite_pipeline,
            &self.targets.composite_bind_group,
            &view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// One fullscreen-triangle pass
    fn post_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
