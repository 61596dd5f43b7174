//! Rendering system with wgpu pipeline and shader management.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::audio::{FeedFrame, FeedUniforms};
use crate::error::SessionError;
use crate::params::RenderConfig;

/// Built-in effect, used when no shader path is configured
const EFFECT_SHADER: &str = include_str!("shaders/effect.wgsl");

/// Shown while the effect is toggled off
const PICTURE_SHADER: &str = include_str!("shaders/picture.wgsl");

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline_layout: wgpu::PipelineLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    effect_pipeline: wgpu::RenderPipeline,
    picture_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    spectrum_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    shader_path: Option<PathBuf>,
    pictures: Vec<PathBuf>,
    picture_index: usize,
    use_effect: bool,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: Arc<winit::window::Window>,
        render_config: &RenderConfig,
        bin_count: usize,
    ) -> Result<Self, SessionError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance.create_surface(window)?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SessionError::NoAdapter)?;

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
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // Create buffers
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Feed Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FeedUniforms {
                time: 0.0,
                bin_count: bin_count as u32,
                resolution: [surface_config.width as f32, surface_config.height as f32],
                mouse: [0.0; 2],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let spectrum_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Spectrum Buffer"),
            contents: bytemuck::cast_slice(&vec![0.0f32; bin_count.max(1)]),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Picture Sampler"),
            address_mode_u: wgpu::AddressMode::MirrorRepeat,
            address_mode_v: wgpu::AddressMode::MirrorRepeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Feed Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Feed Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let picture_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            surface_format,
            PICTURE_SHADER,
            "Picture",
        );

        let shader_path = render_config.shader_path.clone();
        let effect_pipeline =
            match compile_effect(&device, &pipeline_layout, surface_format, shader_path.as_deref())
            {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    log::warn!("{}; using built-in effect", e);
                    create_pipeline(
                        &device,
                        &pipeline_layout,
                        surface_format,
                        EFFECT_SHADER,
                        "Effect",
                    )
                }
            };

        let pictures = render_config.pictures.clone();
        let picture_view = load_picture_view(&device, &queue, pictures.first());
        let bind_group = create_bind_group(
            &device,
            &bind_group_layout,
            &uniform_buffer,
            &spectrum_buffer,
            &picture_view,
            &sampler,
        );

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            pipeline_layout,
            bind_group_layout,
            effect_pipeline,
            picture_pipeline,
            uniform_buffer,
            spectrum_buffer,
            sampler,
            bind_group,
            shader_path,
            pictures,
            picture_index: 0,
            use_effect: true,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reconfigure the surface at its current size (after Lost/Outdated)
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Recompile the effect shader; the previous pipeline stays on failure
    pub fn reload_shader(&mut self) -> Result<(), SessionError> {
        log::info!("Loading shaders");
        self.effect_pipeline = compile_effect(
            &self.device,
            &self.pipeline_layout,
            self.surface_config.format,
            self.shader_path.as_deref(),
        )?;
        Ok(())
    }

    /// Flip between effect and plain picture; returns the new state
    pub fn toggle_effect(&mut self) -> bool {
        self.use_effect = !self.use_effect;
        self.use_effect
    }

    /// Show the next still image, wrapping around
    pub fn next_picture(&mut self) {
        if self.pictures.is_empty() {
            return;
        }
        self.picture_index = (self.picture_index + 1) % self.pictures.len();

        let view = load_picture_view(
            &self.device,
            &self.queue,
            self.pictures.get(self.picture_index),
        );
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.spectrum_buffer,
            &view,
            &self.sampler,
        );
    }

    /// Upload the uniforms and spectrum for this frame
    pub fn update(&self, frame: &FeedFrame) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[frame.uniforms()]));
        self.queue
            .write_buffer(&self.spectrum_buffer, 0, bytemuck::cast_slice(frame.spectrum()));
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

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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

            let pipeline = if self.use_effect {
                &self.effect_pipeline
            } else {
                &self.picture_pipeline
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Compile the configured effect (or the built-in one), capturing validation
/// errors instead of letting them abort the device
fn compile_effect(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    shader_path: Option<&Path>,
) -> Result<wgpu::RenderPipeline, SessionError> {
    let source = match shader_path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?,
        None => EFFECT_SHADER.to_string(),
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = create_pipeline(device, layout, format, &source, "Effect");
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(SessionError::Shader(err.to_string())),
        None => Ok(pipeline),
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    source: &str,
    label: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
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
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    spectrum_buffer: &wgpu::Buffer,
    picture: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Feed Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: spectrum_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(picture),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Decode a still image as RGBA8, shrunk to fit the texture limit
fn load_picture(path: &Path, max_dimension: u32) -> Result<image::RgbaImage, SessionError> {
    let picture = image::open(path).map_err(|source| SessionError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    let picture = if picture.width() > max_dimension || picture.height() > max_dimension {
        picture.thumbnail(max_dimension, max_dimension)
    } else {
        picture
    };
    Ok(picture.to_rgba8())
}

/// Texture view for `path`, or a flat grey pixel when there is no usable picture
fn load_picture_view(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: Option<&PathBuf>,
) -> wgpu::TextureView {
    let max_dimension = device.limits().max_texture_dimension_2d;
    let picture = match path.map(|p| load_picture(p, max_dimension)) {
        Some(Ok(picture)) => picture,
        Some(Err(e)) => {
            log::warn!("{}", e);
            image::RgbaImage::from_pixel(1, 1, image::Rgba([64, 64, 64, 255]))
        }
        None => image::RgbaImage::from_pixel(1, 1, image::Rgba([64, 64, 64, 255])),
    };

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Picture Texture"),
            size: wgpu::Extent3d {
                width: picture.width(),
                height: picture.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        picture.as_raw(),
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
