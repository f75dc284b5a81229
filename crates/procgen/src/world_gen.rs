//! Seamless placeholder world: colour image, water mask and height map from one elevation field.
//!
//! **Wraparound:** noise is sampled on a 4D torus so the left/right and top/bottom edges of every
//! generated image match, like the world the airship flies over.

use crate::textures::{Pixel, TextureData};
use glam::Vec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Derive a deterministic u32 noise seed from a world seed and an offset.
#[inline]
pub(crate) fn deterministic_noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Side length of the generated images in pixels.
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    /// Elevation below which tiles are water.
    #[serde(default = "default_sea_level")]
    pub sea_level: f64,
    #[serde(default = "default_mountain_level")]
    pub mountain_level: f64,
    #[serde(default = "default_snow_level")]
    pub snow_level: f64,
    /// Radius of the sampling torus; larger means more continents.
    #[serde(default = "default_feature_scale")]
    pub feature_scale: f64,
}

fn default_seed() -> u64 {
    7
}
fn default_image_size() -> u32 {
    1024
}
fn default_sea_level() -> f64 {
    0.48
}
fn default_mountain_level() -> f64 {
    0.68
}
fn default_snow_level() -> f64 {
    0.78
}
fn default_feature_scale() -> f64 {
    1.2
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            image_size: default_image_size(),
            sea_level: default_sea_level(),
            mountain_level: default_mountain_level(),
            snow_level: default_snow_level(),
            feature_scale: default_feature_scale(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    DeepWater,
    Water,
    Beach,
    Grass,
    Forest,
    Hills,
    Mountain,
    Snow,
}

impl Terrain {
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::DeepWater | Terrain::Water)
    }

    pub fn color(self) -> Vec3 {
        match self {
            Terrain::DeepWater => Vec3::new(0.10, 0.22, 0.48),
            Terrain::Water => Vec3::new(0.18, 0.36, 0.66),
            Terrain::Beach => Vec3::new(0.86, 0.80, 0.58),
            Terrain::Grass => Vec3::new(0.36, 0.62, 0.28),
            Terrain::Forest => Vec3::new(0.16, 0.42, 0.20),
            Terrain::Hills => Vec3::new(0.52, 0.56, 0.32),
            Terrain::Mountain => Vec3::new(0.48, 0.42, 0.38),
            Terrain::Snow => Vec3::new(0.94, 0.95, 0.98),
        }
    }
}

/// The three images the field renderer samples.
#[derive(Debug, Clone)]
pub struct GeneratedWorld {
    pub color: TextureData,
    /// White where water.
    pub water_mask: TextureData,
    /// Grey elevation, 0.5 at sea level.
    pub height_map: TextureData,
}

pub struct WorldGenerator {
    config: WorldGenConfig,
    elevation: Perlin,
    moisture: Perlin,
}

impl WorldGenerator {
    pub fn new(config: WorldGenConfig) -> Self {
        Self {
            elevation: Perlin::new(deterministic_noise_seed(config.seed, 1)),
            moisture: Perlin::new(deterministic_noise_seed(config.seed, 2)),
            config,
        }
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    /// Elevation in roughly `[0, 1]` at normalised world coordinates.
    pub fn elevation(&self, u: f64, v: f64) -> f64 {
        self.torus_fbm(&self.elevation, u, v, 5)
    }

    pub fn moisture(&self, u: f64, v: f64) -> f64 {
        self.torus_fbm(&self.moisture, u + 0.37, v + 0.61, 3)
    }

    pub fn terrain_at(&self, u: f64, v: f64) -> Terrain {
        let e = self.elevation(u, v);
        let c = &self.config;
        if e < c.sea_level - 0.06 {
            Terrain::DeepWater
        } else if e < c.sea_level {
            Terrain::Water
        } else if e < c.sea_level + 0.02 {
            Terrain::Beach
        } else if e >= c.snow_level {
            Terrain::Snow
        } else if e >= c.mountain_level {
            Terrain::Mountain
        } else if e >= c.mountain_level - 0.06 {
            Terrain::Hills
        } else if self.moisture(u, v) > 0.55 {
            Terrain::Forest
        } else {
            Terrain::Grass
        }
    }

    pub fn generate(&self) -> GeneratedWorld {
        let size = self.config.image_size.max(1);
        let mut color = TextureData::new(size, size);
        let mut water_mask = TextureData::new(size, size);
        let mut height_map = TextureData::new(size, size);

        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let e = self.elevation(u, v);
                let terrain = self.terrain_at(u, v);

                // subtle shading so flat terrain bands are not uniform
                let detail = self.torus_fbm(&self.moisture, u * 7.0, v * 7.0, 2) as f32;
                let mut c = terrain.color() * (0.9 + detail * 0.2);
                if terrain.is_water() {
                    let depth = ((self.config.sea_level - e) * 4.0).clamp(0.0, 1.0) as f32;
                    c *= 1.0 - depth * 0.35;
                }
                color.set_pixel(x, y, Pixel::from_vec3(c));
                water_mask.set_pixel(x, y, Pixel::grey(if terrain.is_water() { 1.0 } else { 0.0 }));

                let height = if terrain.is_water() {
                    0.5
                } else {
                    0.5 + (e - self.config.sea_level) / (1.0 - self.config.sea_level) * 0.5
                };
                height_map.set_pixel(x, y, Pixel::grey(height as f32));
            }
        }

        log::info!("Generated {}x{} world (seed {})", size, size, self.config.seed);
        GeneratedWorld {
            color,
            water_mask,
            height_map,
        }
    }

    /// fBm on a 4D torus: wraps seamlessly in both `u` and `v`.
    fn torus_fbm(&self, noise: &Perlin, u: f64, v: f64, octaves: u32) -> f64 {
        let r = self.config.feature_scale;
        let (su, cu) = (u * TAU).sin_cos();
        let (sv, cv) = (v * TAU).sin_cos();
        let p = [cu * r, su * r, cv * r, sv * r];

        let mut value = 0.0;
        let mut amplitude = 0.5;
        let mut frequency = 1.0;
        for _ in 0..octaves {
            let q = [p[0] * frequency, p[1] * frequency, p[2] * frequency, p[3] * frequency];
            value += amplitude * (noise.get(q) * 0.5 + 0.5);
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        // normalise the partial geometric sum back to ~[0, 1]
        value / (1.0 - 0.5f64.powi(octaves as i32))
    }
}
