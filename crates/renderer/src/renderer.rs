//! Main renderer managing wgpu state and the two full-screen passes.

use crate::{
    assets::SceneAssets,
    config::EffectParams,
    pipeline::{
        create_field_bind_group_layout, create_field_pipeline, create_weather_bind_group_layout,
        create_weather_pipelines,
    },
    program::{CompiledProgram, GpuProgram, PASSTHROUGH_ENTRY},
    shading::FieldTextures,
    software::SoftwareRenderer,
    texture::{create_clamp_sampler, create_repeat_sampler, Texture},
    uniforms::{FieldUniform, FrameInputs, LandmarkUniform, WeatherUniform},
};
use anyhow::Result;
use bytemuck::Zeroable;
use procgen::TextureData;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// GPU field pass state: the field pipeline, its inputs and the offscreen scene target.
struct GpuField {
    program: GpuProgram,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    field_buffer: wgpu::Buffer,
    landmark_buffer: wgpu::Buffer,
    repeat_sampler: wgpu::Sampler,
    atlas_sampler: wgpu::Sampler,
    world: Texture,
    water: Texture,
    height: Texture,
    atlas: Texture,
    /// Field output, sampled by the weather pass.
    scene: Texture,
    assets_revision: Option<u64>,
    atlas_revision: Option<u64>,
}

/// CPU field pass: frames are shaded at reduced resolution and uploaded for presentation.
struct SoftwareField {
    renderer: SoftwareRenderer,
    downscale: u32,
    target: Option<Texture>,
}

enum FieldBackend {
    Gpu(Box<GpuField>),
    Software(SoftwareField),
}

/// Main renderer state.
pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,

    field: FieldBackend,
    effects: EffectParams,

    // Weather post pass (also presents the software image)
    weather_bind_group_layout: wgpu::BindGroupLayout,
    weather_pipelines: Vec<(&'static str, wgpu::RenderPipeline)>,
    weather_buffer: wgpu::Buffer,
    post_sampler: wgpu::Sampler,
}

impl Renderer {
    /// Create a new renderer for the given window.
    pub async fn new(window: Arc<Window>, program: &CompiledProgram, effects: EffectParams) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

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

        // Shading math works on stored values, so present through a linear format when offered.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no formats"))?;

        // Prefer Mailbox (low-latency vsync) if available; otherwise AutoVsync.
        let present_mode = surface_caps
            .present_modes
            .iter()
            .find(|m| matches!(m, wgpu::PresentMode::Mailbox))
            .copied()
            .unwrap_or(wgpu::PresentMode::AutoVsync);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let weather_bind_group_layout = create_weather_bind_group_layout(&device);
        let weather_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Weather Uniform Buffer"),
            contents: bytemuck::cast_slice(&[WeatherUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let post_sampler = create_clamp_sampler(&device, wgpu::FilterMode::Linear);

        let (field, weather_pipelines) = match program {
            CompiledProgram::Gpu(gpu) => {
                let pipelines = create_weather_pipelines(
                    &device,
                    &config,
                    &weather_bind_group_layout,
                    gpu.weather_source,
                    &gpu.weather_entries(),
                );
                let field = Self::create_gpu_field(&device, &queue, gpu.clone(), config.width, config.height);
                (FieldBackend::Gpu(Box::new(field)), pipelines)
            }
            CompiledProgram::Software { downscale } => {
                let pipelines = create_weather_pipelines(
                    &device,
                    &config,
                    &weather_bind_group_layout,
                    crate::program::WEATHER_WGSL,
                    &[PASSTHROUGH_ENTRY],
                );
                let downscale = (*downscale).max(1);
                let field = SoftwareField {
                    renderer: SoftwareRenderer::new(config.width / downscale, config.height / downscale),
                    downscale,
                    target: None,
                };
                (FieldBackend::Software(field), pipelines)
            }
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            field,
            effects,
            weather_bind_group_layout,
            weather_pipelines,
            weather_buffer,
            post_sampler,
        })
    }

    fn create_gpu_field(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        program: GpuProgram,
        width: u32,
        height: u32,
    ) -> GpuField {
        let bind_group_layout = create_field_bind_group_layout(device);
        let pipeline = create_field_pipeline(device, &bind_group_layout, program.field_source);
        let field_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Field Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FieldUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let landmark_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Landmark Uniform Buffer"),
            contents: bytemuck::cast_slice(&[LandmarkUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        // Placeholders until the first sync
        let fallback = SceneAssets::new();
        let empty = TextureData::new(1, 1);
        GpuField {
            program,
            pipeline,
            bind_group_layout,
            field_buffer,
            landmark_buffer,
            repeat_sampler: create_repeat_sampler(device),
            atlas_sampler: create_clamp_sampler(device, wgpu::FilterMode::Nearest),
            world: Texture::from_data(device, queue, fallback.world(), "World Map"),
            water: Texture::from_data(device, queue, fallback.water(), "Water Mask"),
            height: Texture::from_data(device, queue, fallback.height(), "Height Map"),
            atlas: Texture::from_data(device, queue, &empty, "Landmark Atlas"),
            scene: Texture::render_target(device, width, height, "Scene Color"),
            assets_revision: None,
            atlas_revision: None,
        }
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            match &mut self.field {
                FieldBackend::Gpu(gpu) => {
                    gpu.scene = Texture::render_target(&self.device, self.config.width, self.config.height, "Scene Color");
                }
                FieldBackend::Software(sw) => {
                    sw.renderer
                        .resize(self.config.width / sw.downscale, self.config.height / sw.downscale);
                }
            }
        }
    }

    /// Re-upload any textures that changed since the last call. No-op for the software backend.
    pub fn sync_textures(&mut self, assets: &SceneAssets, atlas: &TextureData, atlas_revision: u64) {
        let FieldBackend::Gpu(gpu) = &mut self.field else {
            return;
        };
        if gpu.assets_revision != Some(assets.revision()) {
            gpu.world.update(&self.device, &self.queue, assets.world(), "World Map");
            gpu.water.update(&self.device, &self.queue, assets.water(), "Water Mask");
            gpu.height.update(&self.device, &self.queue, assets.height(), "Height Map");
            gpu.assets_revision = Some(assets.revision());
        }
        if gpu.atlas_revision != Some(atlas_revision) {
            gpu.atlas.update(&self.device, &self.queue, atlas, "Landmark Atlas");
            gpu.atlas_revision = Some(atlas_revision);
        }
    }

    /// Begin a new frame, returns the command encoder and output view.
    pub fn begin_frame(&mut self) -> Result<(wgpu::SurfaceTexture, wgpu::CommandEncoder)> {
        let output = self.surface.get_current_texture()?;
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        Ok((output, encoder))
    }

    /// Draw one frame: field pass, then the weather pass (or passthrough) to the surface.
    pub fn render_frame(&mut self, frame: &FrameInputs, textures: FieldTextures) -> Result<()> {
        let (output, mut encoder) = self.begin_frame()?;
        let output_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.weather_buffer,
            0,
            bytemuck::cast_slice(&[WeatherUniform::new(frame)]),
        );

        let entry = match &mut self.field {
            FieldBackend::Gpu(gpu) => {
                let uniform = FieldUniform::new(frame, &self.effects);
                self.queue
                    .write_buffer(&gpu.field_buffer, 0, bytemuck::cast_slice(&[uniform]));
                self.queue.write_buffer(
                    &gpu.landmark_buffer,
                    0,
                    bytemuck::cast_slice(&[LandmarkUniform::new(frame.landmarks)]),
                );
                Self::run_field_pass(&self.device, &mut encoder, gpu);
                match frame.effect {
                    Some((kind, _)) => gpu.program.weather_entry(kind),
                    None => PASSTHROUGH_ENTRY,
                }
            }
            FieldBackend::Software(sw) => {
                let image = sw.renderer.render(frame, textures, &self.effects);
                match &mut sw.target {
                    Some(target) => target.update(&self.device, &self.queue, image, "Software Frame"),
                    None => sw.target = Some(Texture::from_data(&self.device, &self.queue, image, "Software Frame")),
                }
                PASSTHROUGH_ENTRY
            }
        };

        let source = match &self.field {
            FieldBackend::Gpu(gpu) => Some(&gpu.scene.view),
            FieldBackend::Software(sw) => sw.target.as_ref().map(|t| &t.view),
        };
        if let Some(source) = source {
            self.run_weather_pass(&mut encoder, source, &output_view, entry);
        }

        self.end_frame(output, encoder);
        Ok(())
    }

    fn run_field_pass(device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, gpu: &GpuField) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Field Bind Group"),
            layout: &gpu.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: gpu.field_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: gpu.landmark_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&gpu.repeat_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&gpu.world.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&gpu.water.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&gpu.height.view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&gpu.atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::Sampler(&gpu.atlas_sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Field Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &gpu.scene.view,
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
        pass.set_pipeline(&gpu.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Post pass: `source` through the weather entry `entry` into `output_view`.
    fn run_weather_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
        entry: &str,
    ) {
        let pipeline = self
            .weather_pipelines
            .iter()
            .find(|(name, _)| *name == entry)
            .or_else(|| self.weather_pipelines.iter().find(|(name, _)| *name == PASSTHROUGH_ENTRY))
            .map(|(_, pipeline)| pipeline);
        let Some(pipeline) = pipeline else {
            log::warn!("No weather pipeline for {}", entry);
            return;
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Weather Bind Group"),
            layout: &self.weather_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.weather_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.post_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(source),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Weather Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
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
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// End frame and present.
    pub fn end_frame(&self, output: wgpu::SurfaceTexture, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    /// Get window dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn set_effects(&mut self, effects: EffectParams) {
        self.effects = effects;
    }
}
