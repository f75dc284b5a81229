//! Autopilot planner: steer toward a world target along the shortest wrapped path.

use engine_core::{normalize_angle_diff, normalize_heading, wrapped_delta, Vec2};

/// Arrival radius in world units.
pub const ARRIVAL_DISTANCE: f32 = 50.0;
/// Ticks the autopilot must run before it may report arrival (so re-targeting the current spot still moves).
pub const MIN_TICKS_BEFORE_ARRIVAL: u64 = 10;
/// Maximum heading change per tick.
pub const TURN_STEP: f32 = 0.05;
/// Autopilot flies a little faster than manual cruise.
pub const SPEED_FACTOR: f32 = 1.5;
const MIN_ALIGNMENT: f32 = 0.3;

/// Active autopilot destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutopilotTask {
    pub target: Vec2,
    /// Controller tick at which the task started.
    pub start_tick: u64,
}

impl AutopilotTask {
    pub fn is_valid(&self) -> bool {
        self.target.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanOutput {
    pub heading: f32,
    pub speed: f32,
    pub arrived: bool,
}

/// One planning step. Pure; the controller applies the result.
///
/// On arrival the heading and speed are returned unchanged.
pub fn plan(
    position: Vec2,
    heading: f32,
    speed: f32,
    target: Vec2,
    world_size: Vec2,
    cruise_speed: f32,
    ticks_since_start: u64,
) -> PlanOutput {
    let delta = wrapped_delta(position, target, world_size);
    let distance = delta.length();

    if distance < ARRIVAL_DISTANCE && ticks_since_start > MIN_TICKS_BEFORE_ARRIVAL {
        return PlanOutput {
            heading,
            speed,
            arrived: true,
        };
    }

    let target_heading = delta.x.atan2(-delta.y);
    let diff = normalize_angle_diff(target_heading - heading);

    let next = if diff.abs() > TURN_STEP {
        heading + diff.signum() * TURN_STEP
    } else {
        target_heading
    };

    let alignment = (1.0 - diff.abs() / std::f32::consts::PI).max(MIN_ALIGNMENT);

    PlanOutput {
        heading: normalize_heading(next),
        speed: cruise_speed * alignment * SPEED_FACTOR,
        arrived: false,
    }
}
