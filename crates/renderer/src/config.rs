//! Renderer configuration: backend choice, image paths and ground effect parameters.

use serde::{Deserialize, Serialize};

/// Which program implementation draws the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gpu,
    Software,
}

/// Ground effect toggles and strengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    #[serde(default = "default_true")]
    pub enable_wave_effect: bool,
    #[serde(default = "default_wave_amplitude")]
    pub wave_amplitude: f32,
    #[serde(default = "default_wave_speed")]
    pub wave_speed: f32,
    #[serde(default = "default_wave_frequency")]
    pub wave_frequency: f32,
    /// Also gates the atmospheric haze.
    #[serde(default = "default_true")]
    pub enable_height_map: bool,
    #[serde(default = "default_height_map_strength")]
    pub height_map_strength: f32,
    #[serde(default = "default_true")]
    pub enable_height_shadow: bool,
    #[serde(default = "default_height_shadow_strength")]
    pub height_shadow_strength: f32,
    /// Compass bearing of the light in degrees. Uploaded with the field uniform but reserved:
    /// the camera shadow falls opposite the heading regardless.
    #[serde(default = "default_light_direction")]
    pub light_direction_deg: f32,
}

fn default_true() -> bool {
    true
}
fn default_wave_amplitude() -> f32 {
    10.0
}
fn default_wave_speed() -> f32 {
    0.5
}
fn default_wave_frequency() -> f32 {
    1.0
}
fn default_height_map_strength() -> f32 {
    1.0
}
fn default_height_shadow_strength() -> f32 {
    0.4
}
fn default_light_direction() -> f32 {
    135.0
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            enable_wave_effect: true,
            wave_amplitude: default_wave_amplitude(),
            wave_speed: default_wave_speed(),
            wave_frequency: default_wave_frequency(),
            enable_height_map: true,
            height_map_strength: default_height_map_strength(),
            enable_height_shadow: true,
            height_shadow_strength: default_height_shadow_strength(),
            light_direction_deg: default_light_direction(),
        }
    }
}

impl EffectParams {
    /// Unit light vector in world space (`(sin a, -cos a)`).
    pub fn light_direction(&self) -> [f32; 2] {
        let a = self.light_direction_deg.to_radians();
        [a.sin(), -a.cos()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub backend: Backend,
    /// World colour image. `None` uses the generated world.
    #[serde(default)]
    pub world_map_image: Option<String>,
    #[serde(default)]
    pub water_mask_image: Option<String>,
    #[serde(default)]
    pub height_map_image: Option<String>,
    /// Directory searched for character and tileset sheets used by landmark sprites.
    #[serde(default = "default_sprite_dir")]
    pub sprite_dir: String,
    /// Software backend renders at window size divided by this.
    #[serde(default = "default_software_downscale")]
    pub software_downscale: u32,
    #[serde(default)]
    pub effects: EffectParams,
}

fn default_sprite_dir() -> String {
    "assets/sprites".to_string()
}
fn default_software_downscale() -> u32 {
    4
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            world_map_image: None,
            water_mask_image: None,
            height_map_image: None,
            sprite_dir: default_sprite_dir(),
            software_downscale: default_software_downscale(),
            effects: EffectParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_defaults() {
        let p = EffectParams::default();
        assert_eq!(p.wave_amplitude, 10.0);
        assert_eq!(p.height_shadow_strength, 0.4);
        let [x, y] = p.light_direction();
        // 135 degrees points down-right on screen
        assert!(x > 0.7 && y > 0.7);
    }

    #[test]
    fn partial_ron_fills_defaults() {
        let cfg: RenderConfig = ron::from_str("(backend: software, effects: (wave_amplitude: 4.0))").expect("parse");
        assert_eq!(cfg.backend, Backend::Software);
        assert_eq!(cfg.effects.wave_amplitude, 4.0);
        assert!(cfg.effects.enable_height_shadow);
        assert_eq!(cfg.software_downscale, 4);
    }
}
