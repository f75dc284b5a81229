//! Airship scene configuration. Loaded from config.ron at startup.

use engine_core::{LaunchEffect, LaunchSequence, WorldGeometry};
use flight::{FlightConfig, TransferConfig};
use procgen::WorldGenConfig;
use renderer::{RenderConfig, ViewMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use world::{LandmarkParams, WeatherRegions};

/// Take-off sequence played when the scene starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub effect: LaunchEffect,
    /// Ticks from take-off to ready.
    #[serde(default = "default_launch_duration")]
    pub duration: u32,
}

fn default_launch_duration() -> u32 {
    LaunchSequence::DEFAULT_DURATION
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            effect: LaunchEffect::default(),
            duration: default_launch_duration(),
        }
    }
}

impl LaunchConfig {
    pub fn sequence(&self) -> LaunchSequence {
        LaunchSequence::new(self.effect, self.duration)
    }
}

/// Persistent scene settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirshipConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    /// Field map JSON. `None` builds the demo map.
    #[serde(default)]
    pub map_path: Option<String>,
    /// Map id reported by landing transfers.
    #[serde(default = "default_return_map_id")]
    pub return_map_id: u32,
    /// Facing after a landing transfer (2 = down).
    #[serde(default = "default_return_direction")]
    pub return_direction: u8,
    /// Where flight state and visited places are persisted.
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default)]
    pub start_view: ViewMode,
    /// Party facing a fresh flight departs with (2 = down, 4 = left, 6 = right, 8 = up).
    #[serde(default = "default_start_facing")]
    pub start_facing: u8,
    /// Departure tile for a fresh flight. `None` keeps the default start position.
    #[serde(default)]
    pub start_tile: Option<[u32; 2]>,
    /// Landmarks in the generated demo map.
    #[serde(default = "default_demo_landmarks")]
    pub demo_landmarks: usize,
    #[serde(default)]
    pub world: WorldGeometry,
    #[serde(default)]
    pub flight: FlightConfig,
    #[serde(default)]
    pub weather: WeatherRegions,
    #[serde(default)]
    pub landmarks: LandmarkParams,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub worldgen: WorldGenConfig,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_tick_rate() -> f64 {
    60.0
}
fn default_return_map_id() -> u32 {
    2
}
fn default_return_direction() -> u8 {
    2
}
fn default_start_facing() -> u8 {
    2
}
fn default_save_path() -> String {
    "flight_save.ron".to_string()
}
fn default_demo_landmarks() -> usize {
    24
}

impl Default for AirshipConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            tick_rate: default_tick_rate(),
            map_path: None,
            return_map_id: default_return_map_id(),
            return_direction: default_return_direction(),
            save_path: default_save_path(),
            start_view: ViewMode::default(),
            start_facing: default_start_facing(),
            start_tile: None,
            demo_landmarks: default_demo_landmarks(),
            world: WorldGeometry::default(),
            flight: FlightConfig::default(),
            weather: WeatherRegions::default(),
            landmarks: LandmarkParams::default(),
            render: RenderConfig::default(),
            transfer: TransferConfig::default(),
            launch: LaunchConfig::default(),
            worldgen: WorldGenConfig::default(),
        }
    }
}

impl AirshipConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AirshipConfig = ron::from_str("()").unwrap();
        assert_eq!(config.flight.cruise_speed, 5.0);
        assert_eq!(config.flight.boost_multiplier, 2.5);
        assert_eq!(config.flight.rotation_speed_deg, 2.0);
        assert!(config.flight.enable_camera_pitch);
        assert_eq!(config.flight.max_pitch_up_deg, 30.0);
        assert_eq!(config.flight.max_pitch_down_deg, -17.0);
        assert_eq!(config.world.world_width, 10000.0);
        assert_eq!(config.world.map_width, 100);
        assert_eq!(config.weather.transition_frames, 30);
        assert_eq!(config.landmarks.max_count, 50);
        assert_eq!(config.landmarks.name_display_radius, 500.0);
        assert_eq!(config.launch.duration, 180);
        assert_eq!(config.transfer.interior_map_id, 1);
        assert!(config.map_path.is_none());
    }

    #[test]
    fn partial_override() {
        let config: AirshipConfig =
            ron::from_str("(flight: (cruise_speed: 8.0), launch: (effect: white), start_view: topdown)").unwrap();
        assert_eq!(config.flight.cruise_speed, 8.0);
        assert_eq!(config.flight.boost_multiplier, 2.5, "unset fields keep defaults");
        assert_eq!(config.launch.effect, LaunchEffect::White);
        assert_eq!(config.start_view, ViewMode::TopDown);
    }

    #[test]
    fn invalid_file_falls_back() {
        let path = std::env::temp_dir().join(format!("airship-config-{}.ron", std::process::id()));
        std::fs::write(&path, "(window_width: \"wide\")").unwrap();
        let config = AirshipConfig::load_from(&path);
        assert_eq!(config.window_width, 1280);
        let _ = std::fs::remove_file(&path);
    }
}
