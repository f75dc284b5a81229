//! Kinematic flight controller.
//!
//! Owns the airship [`TransformState`] and advances it once per tick from a [`ControlIntent`]
//! or, while a task is active, from the autopilot planner. Every change is announced on the
//! controller's [`EventQueue`], which the scene drains after the tick.

use crate::autopilot::{self, AutopilotTask};
use crate::config::FlightConfig;
use engine_core::{
    forward_vector, normalize_angle_diff, normalize_heading, wrap_position, EventQueue, SavedFlight, TransformState, UVec2,
    Vec2, WorldGeometry,
};

const BOOST_ACCELERATION: f32 = 0.2;
const NORMAL_ACCELERATION: f32 = 0.1;
const BRAKE_FACTOR: f32 = 0.95;
const SPEED_SNAP: f32 = 0.01;
const TURN_SMOOTHING: f32 = 0.1;
const MIN_TURN_RATE: f32 = 0.001;
const PITCH_STEP: f32 = 0.02;
const PITCH_SMOOTHING: f32 = 0.1;
const PITCH_SNAP: f32 = 0.001;
const MIN_MOVE_SPEED: f32 = 0.001;
/// Turn authority kept even when hovering.
const TURN_FLOOR: f32 = 0.3;

/// Discrete per-tick player intent. Recomputed every tick, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlIntent {
    pub forward: bool,
    pub backward: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub boost: bool,
    pub pitch_up: bool,
    pub pitch_down: bool,
    pub landing_requested: bool,
    pub enter_interior_requested: bool,
    /// The only input honoured while the autopilot flies.
    pub cancel_autopilot: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementState {
    #[default]
    Idle,
    Cruising,
    Boosting,
    Landing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlightEvent {
    PositionChanged { position: Vec2, speed: f32 },
    HeadingChanged { heading: f32 },
    PitchChanged { pitch: f32 },
    TurningStateChanged { turning_left: bool, turning_right: bool, turn_rate: f32 },
    MovementStateChanged { from: MovementState, to: MovementState },
    BoostStateChanged { boosting: bool },
    LandingRequested { position: Vec2 },
    InteriorRequested { position: Vec2 },
    AutopilotStarted { target: Vec2 },
    AutopilotCompleted { target: Vec2, position: Vec2 },
    AutopilotCancelled,
}

pub struct FlightController {
    config: FlightConfig,
    geometry: WorldGeometry,
    state: TransformState,
    target_speed: f32,
    turn_rate: f32,
    target_pitch: f32,
    movement: MovementState,
    autopilot: Option<AutopilotTask>,
    landing_pending: bool,
    interior_pending: bool,
    tick: u64,
    events: EventQueue<FlightEvent>,
}

impl FlightController {
    /// Fresh controller at the default start position, pitched fully up.
    pub fn new(config: FlightConfig, geometry: WorldGeometry) -> Self {
        let pitch = config.max_pitch_up();
        let state = TransformState {
            pitch,
            ..TransformState::default()
        };
        Self {
            config,
            geometry,
            state,
            target_speed: 0.0,
            turn_rate: 0.0,
            target_pitch: pitch,
            movement: MovementState::Idle,
            autopilot: None,
            landing_pending: false,
            interior_pending: false,
            tick: 0,
            events: EventQueue::new(),
        }
    }

    /// Controller seeded from persisted flight state.
    pub fn resume(config: FlightConfig, geometry: WorldGeometry, saved: SavedFlight) -> Self {
        let mut controller = Self::new(config, geometry);
        controller.restore(saved);
        controller
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn geometry(&self) -> &WorldGeometry {
        &self.geometry
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    pub fn position(&self) -> Vec2 {
        self.state.position
    }

    pub fn heading(&self) -> f32 {
        self.state.heading
    }

    pub fn pitch(&self) -> f32 {
        self.state.pitch
    }

    pub fn speed(&self) -> f32 {
        self.state.speed
    }

    pub fn movement_state(&self) -> MovementState {
        self.movement
    }

    pub fn turn_rate(&self) -> f32 {
        self.turn_rate
    }

    pub fn autopilot(&self) -> Option<&AutopilotTask> {
        self.autopilot.as_ref()
    }

    pub fn is_autopiloting(&self) -> bool {
        self.autopilot.is_some()
    }

    pub fn events(&mut self) -> &mut EventQueue<FlightEvent> {
        &mut self.events
    }

    /// Announce the starting transform.
    pub fn activate(&mut self) {
        self.emit_transform();
    }

    /// Advance one tick and return the new transform.
    pub fn tick(&mut self, intent: &ControlIntent) -> TransformState {
        let elapsed_tick = self.tick;
        self.tick += 1;

        if let Some(task) = self.autopilot {
            if !intent.cancel_autopilot {
                self.tick_autopilot(task, elapsed_tick);
                self.state.position = wrap_position(self.state.position, self.geometry.world_size());
                self.emit_transform();
                return self.state;
            }
            // manual control resumes on the cancelling tick
            self.cancel_autopilot();
        }

        if intent.landing_requested {
            self.landing_pending = true;
        }
        if intent.enter_interior_requested {
            self.interior_pending = true;
        }

        self.update_movement_state(intent);
        self.update_speed(intent);
        self.update_turning(intent);
        if self.config.enable_camera_pitch {
            self.update_pitch(intent);
        }
        self.update_position();
        self.emit_transform();
        self.state
    }

    fn update_movement_state(&mut self, intent: &ControlIntent) {
        let next = if self.landing_pending {
            MovementState::Landing
        } else if intent.boost && intent.forward {
            MovementState::Boosting
        } else if intent.forward || intent.backward {
            MovementState::Cruising
        } else {
            MovementState::Idle
        };

        if next != self.movement {
            let from = self.movement;
            self.movement = next;
            self.events.push(FlightEvent::MovementStateChanged { from, to: next });
            if from == MovementState::Boosting || next == MovementState::Boosting {
                self.events.push(FlightEvent::BoostStateChanged {
                    boosting: next == MovementState::Boosting,
                });
            }
        }
    }

    fn update_speed(&mut self, intent: &ControlIntent) {
        let cruise = self.config.cruise_speed;
        self.target_speed = if intent.forward {
            if intent.boost {
                cruise * self.config.boost_multiplier
            } else {
                cruise
            }
        } else if intent.backward {
            -cruise * 0.5
        } else {
            0.0
        };

        let accel = if intent.boost {
            BOOST_ACCELERATION
        } else {
            NORMAL_ACCELERATION
        };
        let speed = self.state.speed;
        let target = self.target_speed;

        self.state.speed = if (target - speed).abs() < SPEED_SNAP {
            target
        } else if target > speed {
            (speed + accel).min(target)
        } else if target == 0.0 {
            let braked = speed * BRAKE_FACTOR;
            if braked.abs() < SPEED_SNAP {
                0.0
            } else {
                braked
            }
        } else {
            (speed - accel).max(target)
        };
    }

    fn update_turning(&mut self, intent: &ControlIntent) {
        let base = self.config.rotation_rate();
        let mut target = match (intent.turn_left, intent.turn_right) {
            (true, false) => -base,
            (false, true) => base,
            _ => 0.0,
        };

        let cruise = self.config.cruise_speed.max(f32::EPSILON);
        target *= (self.state.speed.abs() / cruise + TURN_FLOOR).min(1.0);

        self.turn_rate += (target - self.turn_rate) * TURN_SMOOTHING;
        if self.turn_rate.abs() > MIN_TURN_RATE {
            self.state.heading = normalize_heading(self.state.heading + self.turn_rate);
        }

        self.events.push(FlightEvent::TurningStateChanged {
            turning_left: intent.turn_left,
            turning_right: intent.turn_right,
            turn_rate: self.turn_rate,
        });
    }

    fn update_pitch(&mut self, intent: &ControlIntent) {
        let pitch = self.state.pitch;
        match (intent.pitch_up, intent.pitch_down) {
            (true, false) => self.target_pitch = (pitch + PITCH_STEP).min(self.config.max_pitch_up()),
            (false, true) => self.target_pitch = (pitch - PITCH_STEP).max(self.config.max_pitch_down()),
            _ => {}
        }

        let mut next = pitch + (self.target_pitch - pitch) * PITCH_SMOOTHING;
        if next.abs() < PITCH_SNAP {
            next = 0.0;
        }
        self.state.pitch = next;
    }

    fn update_position(&mut self) {
        if self.state.speed.abs() < MIN_MOVE_SPEED {
            return;
        }
        let moved = self.state.position + forward_vector(self.state.heading) * self.state.speed;
        self.state.position = wrap_position(moved, self.geometry.world_size());
    }

    fn tick_autopilot(&mut self, task: AutopilotTask, elapsed_tick: u64) {
        if !task.is_valid() {
            log::warn!("Autopilot target {:?} is not a valid world position", task.target);
            self.cancel_autopilot();
            return;
        }

        let out = autopilot::plan(
            self.state.position,
            self.state.heading,
            self.state.speed,
            task.target,
            self.geometry.world_size(),
            self.config.cruise_speed,
            elapsed_tick.saturating_sub(task.start_tick),
        );

        if out.arrived {
            self.autopilot = None;
            self.push_autopilot_turn(0.0);
            log::info!("Autopilot arrived at ({:.0}, {:.0})", task.target.x, task.target.y);
            self.events.push(FlightEvent::AutopilotCompleted {
                target: task.target,
                position: self.state.position,
            });
            return;
        }

        self.push_autopilot_turn(normalize_angle_diff(out.heading - self.state.heading));
        self.state.heading = out.heading;
        self.state.speed = out.speed;
        self.state.position += forward_vector(out.heading) * out.speed;
    }

    fn push_autopilot_turn(&mut self, turn_rate: f32) {
        self.turn_rate = turn_rate;
        self.events.push(FlightEvent::TurningStateChanged {
            turning_left: turn_rate < -MIN_TURN_RATE,
            turning_right: turn_rate > MIN_TURN_RATE,
            turn_rate,
        });
    }

        /// Hand control to the autopilot. Manual input (except cancel) is ignored until it finishes.
    pub fn start_autopilot(&mut self, target: Vec2) {
        let target = if target.is_finite() {
            wrap_position(target, self.geometry.world_size())
        } else {
            target
        };
        self.autopilot = Some(AutopilotTask {
            target,
            start_tick: self.tick,
        });
        log::info!("Autopilot engaged toward ({:.0}, {:.0})", target.x, target.y);
        self.events.push(FlightEvent::AutopilotStarted { target });
    }

    /// Fly to the centre of a map tile.
    pub fn start_autopilot_to_tile(&mut self, tile: UVec2) {
        let target = self.geometry.tile_to_world(tile);
        self.start_autopilot(target);
    }

    /// Idempotent. Emits a cancellation only if a task was active.
    pub fn cancel_autopilot(&mut self) {
        if self.autopilot.take().is_some() {
            log::info!("Autopilot cancelled");
            self.events.push(FlightEvent::AutopilotCancelled);
        }
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.state.position = wrap_position(position, self.geometry.world_size());
        self.emit_transform();
    }

    pub fn set_heading(&mut self, heading: f32) {
        self.state.heading = normalize_heading(heading);
        self.emit_transform();
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        let clamped = pitch.clamp(self.config.max_pitch_down(), self.config.max_pitch_up());
        self.state.pitch = clamped;
        self.target_pitch = clamped;
        self.emit_transform();
    }

    pub fn snapshot(&self) -> SavedFlight {
        SavedFlight::from(&self.state)
    }

    /// Load persisted state, re-establishing every range invariant.
    pub fn restore(&mut self, saved: SavedFlight) {
        let restored = TransformState::from(saved);
        let max_speed = self.config.max_speed();
        let pitch = if restored.pitch.is_finite() {
            restored.pitch
        } else {
            self.config.max_pitch_up()
        }
        .clamp(self.config.max_pitch_down(), self.config.max_pitch_up());

        self.state = TransformState {
            position: if restored.position.is_finite() {
                wrap_position(restored.position, self.geometry.world_size())
            } else {
                TransformState::default().position
            },
            heading: normalize_heading(if restored.heading.is_finite() { restored.heading } else { 0.0 }),
            pitch,
            speed: if restored.speed.is_finite() {
                restored.speed.clamp(-self.config.cruise_speed * 0.5, max_speed)
            } else {
                0.0
            },
        };
        self.target_pitch = pitch;
        self.turn_rate = 0.0;
    }

    fn emit_transform(&mut self) {
        let position = self.state.position;
        self.events.push(FlightEvent::PositionChanged {
            position,
            speed: self.state.speed,
        });
        self.events.push(FlightEvent::HeadingChanged {
            heading: self.state.heading,
        });
        if self.config.enable_camera_pitch {
            self.events.push(FlightEvent::PitchChanged {
                pitch: self.state.pitch,
            });
        }
        if std::mem::take(&mut self.landing_pending) {
            self.events.push(FlightEvent::LandingRequested { position });
        }
        if std::mem::take(&mut self.interior_pending) {
            self.events.push(FlightEvent::InteriorRequested { position });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn controller() -> FlightController {
        FlightController::new(FlightConfig::default(), WorldGeometry::default())
    }

    fn forward() -> ControlIntent {
        ControlIntent {
            forward: true,
            ..Default::default()
        }
    }

    fn count_events(c: &mut FlightController, pred: impl Fn(&FlightEvent) -> bool) -> usize {
        c.events().drain().filter(|e| pred(e)).count()
    }

    #[test]
    fn manual_cruise_moves_north_and_saturates() {
        let mut c = controller();
        let mut last_y = c.position().y;
        for _ in 0..100 {
            let s = c.tick(&forward());
            assert!(s.position.y < last_y, "y must decrease while flying north");
            last_y = s.position.y;
        }
        assert_eq!(c.speed(), 5.0);
        assert_eq!(c.movement_state(), MovementState::Cruising);
    }

    #[test]
    fn position_wraps_across_the_boundary() {
        let mut c = controller();
        c.set_position(Vec2::new(5000.0, 1.0));
        for _ in 0..200 {
            let s = c.tick(&forward());
            assert!(s.position.y >= 0.0 && s.position.y < 10000.0, "y out of range: {}", s.position.y);
            assert!(s.position.x >= 0.0 && s.position.x < 10000.0);
        }
        assert!(c.position().y > 5000.0, "should have wrapped to the bottom edge");
    }

    #[test]
    fn held_left_turn_wraps_heading() {
        let mut c = controller();
        let left = ControlIntent {
            turn_left: true,
            ..Default::default()
        };
        let mut wrapped = false;
        let mut last = c.heading();
        for _ in 0..1000 {
            let h = c.tick(&left).heading;
            assert!((0.0..TAU).contains(&h), "heading out of range: {}", h);
            if h > last + 1.0 {
                wrapped = true;
            }
            last = h;
        }
        assert!(wrapped, "left turn never crossed zero");
    }

    #[test]
    fn braking_converges_to_exact_zero() {
        let mut c = controller();
        for _ in 0..100 {
            c.tick(&forward());
        }
        let idle = ControlIntent::default();
        let mut ticks = 0;
        while c.speed() != 0.0 {
            let before = c.speed();
            c.tick(&idle);
            assert!(c.speed() <= before);
            ticks += 1;
            assert!(ticks < 500, "speed never reached zero");
        }
        assert_eq!(c.speed(), 0.0);
    }

    #[test]
    fn reverse_is_capped_at_half_cruise() {
        let mut c = controller();
        let back = ControlIntent {
            backward: true,
            ..Default::default()
        };
        for _ in 0..200 {
            c.tick(&back);
        }
        assert_eq!(c.speed(), -2.5);
    }

    #[test]
    fn boost_emits_state_changes() {
        let mut c = controller();
        let boost = ControlIntent {
            forward: true,
            boost: true,
            ..Default::default()
        };
        c.tick(&boost);
        let entered = count_events(&mut c, |e| matches!(e, FlightEvent::BoostStateChanged { boosting: true }));
        assert_eq!(entered, 1);
        for _ in 0..200 {
            c.tick(&boost);
        }
        assert_eq!(c.speed(), 12.5);
        c.events().clear();
        c.tick(&forward());
        let left = count_events(&mut c, |e| matches!(e, FlightEvent::BoostStateChanged { boosting: false }));
        assert_eq!(left, 1);
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut c = controller();
        let (lo, hi) = (c.config().max_pitch_down(), c.config().max_pitch_up());
        let down = ControlIntent {
            pitch_down: true,
            ..Default::default()
        };
        for _ in 0..500 {
            let p = c.tick(&down).pitch;
            assert!(p >= lo - 1e-6 && p <= hi + 1e-6);
        }
        assert!((c.pitch() - lo).abs() < 0.01, "pitch should settle at the lower bound");
        c.set_pitch(10.0);
        assert_eq!(c.pitch(), hi);
    }

    #[test]
    fn landing_request_is_one_shot() {
        let mut c = controller();
        let land = ControlIntent {
            landing_requested: true,
            ..Default::default()
        };
        c.tick(&land);
        assert_eq!(c.movement_state(), MovementState::Landing);
        assert_eq!(count_events(&mut c, |e| matches!(e, FlightEvent::LandingRequested { .. })), 1);
        c.tick(&ControlIntent::default());
        assert_eq!(count_events(&mut c, |e| matches!(e, FlightEvent::LandingRequested { .. })), 0);
        assert_eq!(c.movement_state(), MovementState::Idle);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut c = controller();
        c.start_autopilot(Vec2::new(8000.0, 8000.0));
        c.cancel_autopilot();
        c.cancel_autopilot();
        let cancel = ControlIntent {
            cancel_autopilot: true,
            ..Default::default()
        };
        c.tick(&cancel);
        assert_eq!(count_events(&mut c, |e| matches!(e, FlightEvent::AutopilotCancelled)), 1);
        assert!(!c.is_autopiloting());
    }

    #[test]
    fn autopilot_ignores_manual_input_and_arrives() {
        let mut c = controller();
        c.start_autopilot(Vec2::new(6000.0, 5000.0));
        c.events().clear();
        let noisy = ControlIntent {
            turn_left: true,
            backward: true,
            landing_requested: true,
            ..Default::default()
        };
        let mut completed_at = None;
        for tick in 0..2000u32 {
            c.tick(&noisy);
            let mut done = false;
            for event in c.events().drain() {
                assert!(!matches!(event, FlightEvent::LandingRequested { .. }), "manual landing leaked through");
                done |= matches!(event, FlightEvent::AutopilotCompleted { .. });
            }
            if done {
                completed_at = Some(tick);
                break;
            }
        }
        let tick = completed_at.expect("autopilot never arrived");
        assert!(tick > 10);
        assert!(!c.is_autopiloting());
        let dist = engine_core::wrapped_distance(c.position(), Vec2::new(6000.0, 5000.0), Vec2::splat(10000.0));
        assert!(dist < 50.0);
    }

    #[test]
    fn autopilot_turns_are_announced() {
        let mut c = controller();
        c.start_autopilot(Vec2::new(6000.0, 5000.0));
        c.events().clear();
        c.tick(&ControlIntent::default());
        let turning: Vec<_> = c
            .events()
            .drain()
            .filter_map(|e| match e {
                FlightEvent::TurningStateChanged { turning_left, turning_right, turn_rate } => {
                    Some((turning_left, turning_right, turn_rate))
                }
                _ => None,
            })
            .collect();
        assert_eq!(turning.len(), 1);
        let (left, right, rate) = turning[0];
        assert!(!left && right, "east of a north heading is a right turn");
        assert!(rate > 0.0);
    }

    #[test]
    fn cancelling_tick_flies_manually() {
        let mut c = controller();
        c.start_autopilot(Vec2::new(8000.0, 8000.0));
        let start = c.position();
        c.tick(&ControlIntent {
            cancel_autopilot: true,
            forward: true,
            ..Default::default()
        });
        assert!(!c.is_autopiloting());
        assert!(c.speed() > 0.0);
        assert!(c.position().y < start.y, "cruise applied on the same tick");
    }

    #[test]
    fn invalid_target_cancels_on_next_tick() {
        let mut c = controller();
        c.start_autopilot(Vec2::new(f32::NAN, 10.0));
        c.tick(&ControlIntent::default());
        assert!(!c.is_autopiloting());
        assert_eq!(count_events(&mut c, |e| matches!(e, FlightEvent::AutopilotCancelled)), 1);
    }

    #[test]
    fn tile_autopilot_targets_tile_centre() {
        let mut c = controller();
        c.start_autopilot_to_tile(UVec2::new(3, 4));
        let target = c.autopilot().map(|t| t.target).expect("autopilot should be active");
        assert!(target.abs_diff_eq(Vec2::new(350.0, 450.0), 1e-2), "got {:?}", target);
    }

    #[test]
    fn snapshot_restore_preserves_transform() {
        let mut c = controller();
        for _ in 0..30 {
            c.tick(&ControlIntent {
                forward: true,
                turn_right: true,
                ..Default::default()
            });
        }
        let saved = c.snapshot();
        let resumed = FlightController::resume(FlightConfig::default(), WorldGeometry::default(), saved);
        assert_eq!(resumed.state(), c.state());
    }
}
