//! Per-frame inputs and the GPU uniform blocks built from them.

use crate::config::EffectParams;
use crate::projection::{CAMERA_HEIGHT, FIELD_OF_VIEW, HORIZON_Y, TEXTURE_SCALE};
use bytemuck::{Pod, Zeroable};
use engine_core::{TransformState, Vec2};
use world::{LandmarkInstance, WeatherKind};

/// Upper bound on landmarks uploaded per frame.
pub const MAX_LANDMARKS: usize = 50;

/// Everything one frame of the field depends on.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub transform: TransformState,
    /// Tick counter.
    pub time: f32,
    pub world_size: Vec2,
    pub map_size: Vec2,
    /// 0 = perspective, 1 = top-down.
    pub view_blend: f32,
    /// Drives sky, cloud and fog colours.
    pub sky_weather: WeatherKind,
    /// Screen-space weather effect and its intensity, if any.
    pub effect: Option<(WeatherKind, f32)>,
    /// Full-screen tint over everything, rgb + amount. Used by the launch fade.
    pub tint: [f32; 4],
    pub landmarks: &'a [LandmarkInstance],
}

/// Field pass parameters (must match `FieldUniform` in field.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FieldUniform {
    /// xy = camera position, z = heading, w = pitch
    pub camera: [f32; 4],
    /// xy = world size, zw = map size in tiles
    pub world: [f32; 4],
    /// x = time, y = view blend, z = weather index, w = texture scale
    pub view: [f32; 4],
    /// x = horizon, y = camera height, z = field of view, w = landmark count
    pub projection: [f32; 4],
    /// x = enabled, y = amplitude, z = speed, w = frequency
    pub waves: [f32; 4],
    /// x = height map enabled, y = strength, z = height shadow enabled, w = shadow strength
    pub relief: [f32; 4],
    /// xy = light direction. Reserved; no shading term reads it.
    pub light: [f32; 4],
}

const _: [(); 112] = [(); std::mem::size_of::<FieldUniform>()];

fn flag(enabled: bool) -> f32 {
    if enabled {
        1.0
    } else {
        0.0
    }
}

impl FieldUniform {
    pub fn new(frame: &FrameInputs, effects: &EffectParams) -> Self {
        let t = &frame.transform;
        let [lx, ly] = effects.light_direction();
        Self {
            camera: [t.position.x, t.position.y, t.heading, t.pitch],
            world: [frame.world_size.x, frame.world_size.y, frame.map_size.x, frame.map_size.y],
            view: [
                frame.time,
                frame.view_blend,
                frame.sky_weather.shader_index() as f32,
                TEXTURE_SCALE,
            ],
            projection: [
                HORIZON_Y,
                CAMERA_HEIGHT,
                FIELD_OF_VIEW,
                frame.landmarks.len().min(MAX_LANDMARKS) as f32,
            ],
            waves: [
                flag(effects.enable_wave_effect),
                effects.wave_amplitude,
                effects.wave_speed,
                effects.wave_frequency,
            ],
            relief: [
                flag(effects.enable_height_map),
                effects.height_map_strength,
                flag(effects.enable_height_shadow),
                effects.height_shadow_strength,
            ],
            light: [lx, ly, 0.0, 0.0],
        }
    }
}

/// Landmark footprints (must match `LandmarkBlock` in field.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LandmarkUniform {
    /// xy = world position, z = footprint radius in world units
    pub data: [[f32; 4]; MAX_LANDMARKS],
    /// Atlas rect `[u0, v0, u1, v1]`.
    pub uv: [[f32; 4]; MAX_LANDMARKS],
}

impl LandmarkUniform {
    pub fn new(landmarks: &[LandmarkInstance]) -> Self {
        let mut block = Self::zeroed();
        for (i, lm) in landmarks.iter().take(MAX_LANDMARKS).enumerate() {
            block.data[i] = [lm.world_pos.x, lm.world_pos.y, lm.size, 0.0];
            block.uv[i] = lm.uv;
        }
        block
    }
}

/// Weather post-pass parameters (must match `WeatherUniform` in weather.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeatherUniform {
    /// x = time, y = intensity
    pub params: [f32; 4],
    /// rgb = tint colour, a = amount
    pub tint: [f32; 4],
}

const _: [(); 32] = [(); std::mem::size_of::<WeatherUniform>()];

impl WeatherUniform {
    pub fn new(frame: &FrameInputs) -> Self {
        let intensity = frame.effect.map_or(0.0, |(_, intensity)| intensity);
        Self {
            params: [frame.time, intensity, 0.0, 0.0],
            tint: frame.tint,
        }
    }
}
