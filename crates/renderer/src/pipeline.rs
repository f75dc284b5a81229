//! Bind group layouts and render pipelines for the field and weather passes.

use crate::program::{FIELD_FRAGMENT_ENTRY, FIELD_VERTEX_ENTRY};
use crate::texture::FIELD_FORMAT;

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Field pass: field uniform, landmark block, map sampler, world/water/height/atlas, atlas sampler.
pub fn create_field_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Field Bind Group Layout"),
        entries: &[
            uniform_entry(0),
            uniform_entry(1),
            sampler_entry(2),
            texture_entry(3),
            texture_entry(4),
            texture_entry(5),
            texture_entry(6),
            sampler_entry(7),
        ],
    })
}

/// Weather pass: weather uniform, scene sampler, scene texture.
pub fn create_weather_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Weather Bind Group Layout"),
        entries: &[uniform_entry(0), sampler_entry(1), texture_entry(2)],
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(FIELD_VERTEX_ENTRY),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Field pass into the offscreen scene texture.
pub fn create_field_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    source: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Field Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    fullscreen_pipeline(device, "Field Pipeline", &shader, layout, FIELD_FRAGMENT_ENTRY, FIELD_FORMAT)
}

/// One weather pipeline per fragment entry, all drawing to the surface.
pub fn create_weather_pipelines(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    layout: &wgpu::BindGroupLayout,
    source: &str,
    entries: &[&'static str],
) -> Vec<(&'static str, wgpu::RenderPipeline)> {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Weather Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    entries
        .iter()
        .map(|&entry| {
            let label = format!("Weather Pipeline {}", entry);
            (entry, fullscreen_pipeline(device, &label, &shader, layout, entry, config.format))
        })
        .collect()
}
