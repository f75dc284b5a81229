//! Screen → world mapping for the two field projections, and the view-mode blend.
//!
//! Screen coordinates are normalised: `uv.x` left→right and `uv.y` top→bottom, both in `[0, 1]`.

use engine_core::{forward_vector, right_vector, wrap_position, TransformState, Vec2};
use serde::{Deserialize, Serialize};

pub const HORIZON_Y: f32 = 0.5;
pub const CAMERA_HEIGHT: f32 = 0.5;
pub const FIELD_OF_VIEW: f32 = 0.6;
/// World-image repeats per unit of projected offset.
pub const TEXTURE_SCALE: f32 = 0.02;

pub const TOPDOWN_HORIZON: f32 = 0.35;
const TOPDOWN_HEIGHT: f32 = 1.2;
const TOPDOWN_SCALE: f32 = 3.0;
/// Scanline (from the horizon) the airship sits over in top-down view.
const TOPDOWN_AIRSHIP_SCAN: f32 = 0.15;

/// Per-tick blend step when switching views.
pub const VIEW_TRANSITION_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Perspective,
    TopDown,
}

impl ViewMode {
    /// 0 for perspective, 1 for top-down.
    pub fn value(self) -> f32 {
        match self {
            ViewMode::Perspective => 0.0,
            ViewMode::TopDown => 1.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Perspective => ViewMode::TopDown,
            ViewMode::TopDown => ViewMode::Perspective,
        }
    }
}

/// Linear blend between the two projections.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewModeBlend {
    mode: ViewMode,
    target: ViewMode,
    transition: f32,
}

impl ViewModeBlend {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            target: mode,
            transition: 0.0,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn target(&self) -> ViewMode {
        self.target
    }

    pub fn is_transitioning(&self) -> bool {
        self.mode != self.target
    }

    /// Start switching to the other view. Returns the new target.
    pub fn toggle(&mut self) -> ViewMode {
        self.target = self.mode.toggled();
        self.transition = 0.0;
        self.target
    }

    pub fn tick(&mut self) {
        if self.mode != self.target {
            self.transition += VIEW_TRANSITION_STEP;
            if self.transition >= 1.0 {
                self.transition = 1.0;
                self.mode = self.target;
            }
        } else {
            self.transition = 0.0;
        }
    }

    /// Projection parameter: 0 = perspective, 1 = top-down, in between while switching.
    pub fn factor(&self) -> f32 {
        if self.transition > 0.0 {
            self.mode.value() * (1.0 - self.transition) + self.target.value() * self.transition
        } else {
            self.mode.value()
        }
    }
}

/// `x - floor(x)` per component (GLSL `fract`).
pub fn fract_gl(v: Vec2) -> Vec2 {
    v - v.floor()
}

/// A ground pixel resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Normalised world-image coordinate.
    pub tex_coord: Vec2,
    /// Wrapped world position.
    pub world_pos: Vec2,
    pub depth: f32,
    /// 0 at the horizon, 1 at the bottom of the screen.
    pub scan: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenSample {
    /// `sky_y` is 0 at the top of the screen and 1 at the horizon.
    Sky { sky_y: f32 },
    Ground(GroundHit),
}

pub fn perspective_horizon(pitch: f32) -> f32 {
    (HORIZON_Y + pitch * 0.3).clamp(0.2, 0.8)
}

pub fn project_perspective(uv: Vec2, camera: &TransformState, world_size: Vec2) -> ScreenSample {
    let horizon = perspective_horizon(camera.pitch);
    if uv.y < horizon {
        return ScreenSample::Sky { sky_y: uv.y / horizon };
    }
    let scan = (uv.y - horizon) / (1.0 - horizon);
    let pitch_factor = 1.0 + camera.pitch * 2.0;
    let depth = pitch_factor / (scan + 0.1);
    let screen_x = (uv.x - 0.5) * depth * 2.0;
    let offset = right_vector(camera.heading) * screen_x + forward_vector(camera.heading) * depth;
    ScreenSample::Ground(ground_hit(offset, depth, scan, camera.position, world_size))
}

pub fn project_topdown(uv: Vec2, camera: &TransformState, world_size: Vec2) -> ScreenSample {
    if uv.y < TOPDOWN_HORIZON {
        return ScreenSample::Sky {
            sky_y: uv.y / TOPDOWN_HORIZON,
        };
    }
    let scan = (uv.y - TOPDOWN_HORIZON) / (1.0 - TOPDOWN_HORIZON);
    let z = TOPDOWN_HEIGHT / (scan + 0.1);
    let depth = z * TOPDOWN_SCALE;
    let screen_x = (uv.x - 0.5) * z * 2.0;
    // keep the ground under the airship near its screen anchor
    let correction = (scan - TOPDOWN_AIRSHIP_SCAN) * 3.0 * TOPDOWN_SCALE * 0.8;
    let offset = right_vector(camera.heading) * screen_x + forward_vector(camera.heading) * (depth - correction);
    ScreenSample::Ground(ground_hit(offset, depth, scan, camera.position, world_size))
}

fn ground_hit(offset: Vec2, depth: f32, scan: f32, camera: Vec2, world_size: Vec2) -> GroundHit {
    let step = offset * TEXTURE_SCALE;
    GroundHit {
        tex_coord: fract_gl(camera / world_size + step),
        world_pos: wrap_position(camera + step * world_size, world_size),
        depth,
        scan,
    }
}
