//! Flight transform state and wraparound math for the torus world.
//!
//! Conventions: heading 0 = north, increasing clockwise, in radians.
//! Screen/world Y grows downward, so "north" is -Y.

use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Wrap a scalar into `[0, size)`. Never negative, even for inputs far outside the range.
pub fn wrap(value: f32, size: f32) -> f32 {
    if size <= 0.0 {
        return 0.0;
    }
    if (0.0..size).contains(&value) {
        return value;
    }
    ((value % size) + size) % size
}

/// Wrap both components of a position into the world rectangle.
pub fn wrap_position(position: Vec2, world_size: Vec2) -> Vec2 {
    Vec2::new(wrap(position.x, world_size.x), wrap(position.y, world_size.y))
}

/// Normalize a heading into `[0, 2π)`.
pub fn normalize_heading(angle: f32) -> f32 {
    let h = angle.rem_euclid(TAU);
    // rem_euclid of a tiny negative value rounds up to exactly TAU
    if h >= TAU {
        0.0
    } else {
        h
    }
}

/// Normalize an angular difference into `(-π, π]`.
pub fn normalize_angle_diff(diff: f32) -> f32 {
    let d = diff.rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Signed delta from `from` to `to` along one wrapped axis, taking the shorter way round.
pub fn shortest_wrap_delta(from: f32, to: f32, size: f32) -> f32 {
    let delta = to - from;
    if delta.abs() > size * 0.5 {
        if delta > 0.0 {
            delta - size
        } else {
            delta + size
        }
    } else {
        delta
    }
}

/// Shortest wrapped delta vector between two world positions.
pub fn wrapped_delta(from: Vec2, to: Vec2, world_size: Vec2) -> Vec2 {
    Vec2::new(
        shortest_wrap_delta(from.x, to.x, world_size.x),
        shortest_wrap_delta(from.y, to.y, world_size.y),
    )
}

/// Euclidean distance measured across the torus.
pub fn wrapped_distance(a: Vec2, b: Vec2, world_size: Vec2) -> f32 {
    wrapped_delta(a, b, world_size).length()
}

/// Unit vector the airship moves along for a heading.
pub fn forward_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.sin(), -heading.cos())
}

/// Unit vector to the right of a heading.
pub fn right_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Heading chosen when launching from a character facing (2 = down, 4 = left, 6 = right, 8 = up).
///
/// Facing left yields an easterly heading and facing right a westerly one.
pub fn heading_from_facing(direction: u8) -> f32 {
    match direction {
        2 => PI,
        4 => PI * 0.5,
        6 => PI * 1.5,
        8 => 0.01,
        _ => 0.0,
    }
}

/// World and tile-map dimensions. The world is a torus of `world_width × world_height` units
/// covering a `map_width × map_height` tile map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldGeometry {
    #[serde(default = "default_world_extent")]
    pub world_width: f32,
    #[serde(default = "default_world_extent")]
    pub world_height: f32,
    #[serde(default = "default_map_extent")]
    pub map_width: u32,
    #[serde(default = "default_map_extent")]
    pub map_height: u32,
}

fn default_world_extent() -> f32 {
    10000.0
}
fn default_map_extent() -> u32 {
    100
}

impl Default for WorldGeometry {
    fn default() -> Self {
        Self {
            world_width: default_world_extent(),
            world_height: default_world_extent(),
            map_width: default_map_extent(),
            map_height: default_map_extent(),
        }
    }
}

impl WorldGeometry {
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.world_width, self.world_height)
    }

    pub fn map_size(&self) -> UVec2 {
        UVec2::new(self.map_width, self.map_height)
    }

    /// Same world, different tile map (the loaded map's dimensions win over config).
    pub fn with_map_size(mut self, width: u32, height: u32) -> Self {
        self.map_width = width.max(1);
        self.map_height = height.max(1);
        self
    }

    /// World units covered by one tile.
    pub fn tile_size(&self) -> Vec2 {
        self.world_size() / self.map_size().max(UVec2::ONE).as_vec2()
    }

    /// Centre of a tile in world coordinates, clamped to the world rectangle.
    pub fn tile_to_world(&self, tile: UVec2) -> Vec2 {
        let normalized = (tile.as_vec2() + Vec2::splat(0.5)) / self.map_size().max(UVec2::ONE).as_vec2();
        (normalized * self.world_size()).clamp(Vec2::ZERO, self.world_size())
    }

    /// Tile under a world position. The position is wrapped first and the tile clamped to the map.
    pub fn world_to_tile(&self, position: Vec2) -> UVec2 {
        let world = self.world_size();
        let map = self.map_size().max(UVec2::ONE);
        let normalized = wrap_position(position, world) / world;
        let tile = (normalized * map.as_vec2()).floor();
        let x = (tile.x.max(0.0) as u32).min(map.x - 1);
        let y = (tile.y.max(0.0) as u32).min(map.y - 1);
        UVec2::new(x, y)
    }
}

/// Canonical per-tick airship transform. Read-only snapshot handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    /// World position, always inside `[0, world_size)`.
    pub position: Vec2,
    /// Heading in `[0, 2π)`.
    pub heading: f32,
    /// Camera pitch, clamped by the controller.
    pub pitch: f32,
    /// Signed speed in world units per tick.
    pub speed: f32,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position: Vec2::new(5000.0, 5000.0),
            heading: 0.0,
            pitch: 0.0,
            speed: 0.0,
        }
    }
}

/// The four scalars persisted across save/load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedFlight {
    pub position: [f32; 2],
    pub heading: f32,
    pub pitch: f32,
    pub speed: f32,
}

impl From<&TransformState> for SavedFlight {
    fn from(state: &TransformState) -> Self {
        Self {
            position: state.position.to_array(),
            heading: state.heading,
            pitch: state.pitch,
            speed: state.speed,
        }
    }
}

impl From<SavedFlight> for TransformState {
    fn from(saved: SavedFlight) -> Self {
        Self {
            position: Vec2::from_array(saved.position),
            heading: saved.heading,
            pitch: saved.pitch,
            speed: saved.speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_never_negative() {
        assert_eq!(wrap(-1.0, 100.0), 99.0);
        assert_eq!(wrap(100.0, 100.0), 0.0);
        assert_eq!(wrap(-250.0, 100.0), 50.0);
        assert!((wrap(12345.5, 10000.0) - 2345.5).abs() < 1e-3);
    }

    #[test]
    fn normalize_heading_range() {
        for i in -40..40 {
            let a = i as f32 * 0.77;
            let h = normalize_heading(a);
            assert!((0.0..TAU).contains(&h), "heading {} out of range for {}", h, a);
        }
        assert_eq!(normalize_heading(-1e-9), 0.0);
    }

    #[test]
    fn angle_diff_is_half_open() {
        assert!((normalize_angle_diff(PI) - PI).abs() < 1e-5);
        assert!((normalize_angle_diff(-PI) - PI).abs() < 1e-5);
        assert!((normalize_angle_diff(TAU - 0.1) + 0.1).abs() < 1e-5);
    }

    #[test]
    fn shortest_delta_prefers_wraparound() {
        assert_eq!(shortest_wrap_delta(100.0, 9950.0, 10000.0), -150.0);
        assert_eq!(shortest_wrap_delta(9950.0, 100.0, 10000.0), 150.0);
        assert_eq!(shortest_wrap_delta(100.0, 400.0, 10000.0), 300.0);
    }

    #[test]
    fn forward_points_north_at_zero_heading() {
        let f = forward_vector(0.0);
        assert!(f.x.abs() < 1e-6);
        assert!((f.y + 1.0).abs() < 1e-6, "north must be -Y");
        let east = forward_vector(PI * 0.5);
        assert!((east.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tile_conversions_use_tile_centres_and_clamp() {
        let geo = WorldGeometry::default();
        assert!(geo.tile_to_world(UVec2::new(0, 0)).abs_diff_eq(Vec2::new(50.0, 50.0), 1e-2));
        assert!(geo.tile_to_world(UVec2::new(99, 10)).abs_diff_eq(Vec2::new(9950.0, 1050.0), 1e-2));
        assert_eq!(geo.world_to_tile(Vec2::new(9999.9, 0.0)), UVec2::new(99, 0));
        assert_eq!(geo.world_to_tile(Vec2::new(-1.0, 150.0)), UVec2::new(99, 1));
        let small = geo.with_map_size(10, 20);
        assert_eq!(small.world_to_tile(Vec2::new(5000.0, 5000.0)), UVec2::new(5, 10));
    }

    #[test]
    fn saved_flight_round_trips_transform() {
        let state = TransformState {
            position: Vec2::new(12.0, 34.0),
            heading: 1.0,
            pitch: -0.1,
            speed: 3.0,
        };
        let saved = SavedFlight::from(&state);
        assert_eq!(TransformState::from(saved), state);
    }
}
