//! Flight tuning. Read once when the scene is built.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightConfig {
    /// Forward speed in world units per tick.
    #[serde(default = "default_cruise_speed")]
    pub cruise_speed: f32,
    /// Multiplier applied to cruise speed while boosting.
    #[serde(default = "default_boost_multiplier")]
    pub boost_multiplier: f32,
    /// Maximum turn rate in degrees per tick.
    #[serde(default = "default_rotation_speed_deg")]
    pub rotation_speed_deg: f32,
    #[serde(default = "default_true")]
    pub enable_camera_pitch: bool,
    #[serde(default = "default_max_pitch_up_deg")]
    pub max_pitch_up_deg: f32,
    /// Stored as a signed angle; the sign is ignored (always looks down).
    #[serde(default = "default_max_pitch_down_deg")]
    pub max_pitch_down_deg: f32,
}

fn default_cruise_speed() -> f32 {
    5.0
}
fn default_boost_multiplier() -> f32 {
    2.5
}
fn default_rotation_speed_deg() -> f32 {
    2.0
}
fn default_true() -> bool {
    true
}
fn default_max_pitch_up_deg() -> f32 {
    30.0
}
fn default_max_pitch_down_deg() -> f32 {
    -17.0
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            cruise_speed: default_cruise_speed(),
            boost_multiplier: default_boost_multiplier(),
            rotation_speed_deg: default_rotation_speed_deg(),
            enable_camera_pitch: default_true(),
            max_pitch_up_deg: default_max_pitch_up_deg(),
            max_pitch_down_deg: default_max_pitch_down_deg(),
        }
    }
}

impl FlightConfig {
    /// Base turn rate in radians per tick.
    pub fn rotation_rate(&self) -> f32 {
        self.rotation_speed_deg.to_radians()
    }

    pub fn max_pitch_up(&self) -> f32 {
        self.max_pitch_up_deg.abs().to_radians()
    }

    pub fn max_pitch_down(&self) -> f32 {
        -self.max_pitch_down_deg.abs().to_radians()
    }

    pub fn max_speed(&self) -> f32 {
        self.cruise_speed * self.boost_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FlightConfig::default();
        assert_eq!(cfg.cruise_speed, 5.0);
        assert_eq!(cfg.max_speed(), 12.5);
        assert!((cfg.rotation_rate() - 2.0f32.to_radians()).abs() < 1e-6);
        assert!(cfg.max_pitch_down() < 0.0 && cfg.max_pitch_up() > 0.0);
    }

    #[test]
    fn pitch_down_sign_is_normalised() {
        let cfg = FlightConfig {
            max_pitch_down_deg: 17.0,
            ..FlightConfig::default()
        };
        assert!((cfg.max_pitch_down() + 17.0f32.to_radians()).abs() < 1e-6);
    }
}
