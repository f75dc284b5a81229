//! CPU rasteriser for the field and weather passes.

use crate::config::EffectParams;
use crate::shading::{shade_field, FieldTextures, ShadeContext};
use crate::uniforms::{FrameInputs, MAX_LANDMARKS};
use crate::weather_fx::apply_weather;
use glam::Vec2;
use procgen::{Pixel, TextureData};

/// Renders frames into an RGBA buffer using the shared shading functions.
pub struct SoftwareRenderer {
    field: TextureData,
    output: TextureData,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            field: TextureData::new(width, height),
            output: TextureData::new(width, height),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != self.dimensions() {
            *self = Self::new(width, height);
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.field.width, self.field.height)
    }

    /// Shade one frame. The result depends only on `frame`, `textures` and `effects`.
    pub fn render(&mut self, frame: &FrameInputs, textures: FieldTextures, effects: &EffectParams) -> &TextureData {
        let (width, height) = self.dimensions();
        let landmarks = &frame.landmarks[..frame.landmarks.len().min(MAX_LANDMARKS)];
        let ctx = ShadeContext {
            camera: &frame.transform,
            time: frame.time,
            weather: frame.sky_weather.shader_index(),
            world_size: frame.world_size,
            landmarks,
            textures,
            effects,
        };

        for y in 0..height {
            for x in 0..width {
                let uv = pixel_uv(x, y, width, height);
                let c = shade_field(uv, frame.view_blend, &ctx);
                self.field.set_pixel(x, y, Pixel::from_rgba(c.x, c.y, c.z, c.w));
            }
        }

        let Some((kind, intensity)) = frame.effect else {
            return &self.field;
        };
        for y in 0..height {
            for x in 0..width {
                let uv = pixel_uv(x, y, width, height);
                let c = apply_weather(kind, &self.field, uv, frame.time, intensity);
                self.output.set_pixel(x, y, Pixel::from_rgba(c.x, c.y, c.z, c.w));
            }
        }
        &self.output
    }
}

fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new((x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32)
}
