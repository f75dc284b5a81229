//! Keyboard state and the mapping from keys to flight intents.

use flight::ControlIntent;
use std::collections::HashSet;

/// Keyboard state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,
    /// Keys released this frame.
    keys_released: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call once the frame's input has been consumed.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
                self.keys_released.insert(key);
            }
        }
    }

    /// Drop held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_released.extend(self.keys_held.drain());
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Boost (Shift).
    pub fn is_boosting(&self) -> bool {
        self.is_key_held(KeyCode::ShiftLeft) || self.is_key_held(KeyCode::ShiftRight)
    }

    /// Toggle between perspective and top-down (U).
    pub fn is_view_toggle_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::KeyU)
    }

    /// Fly to the next landmark (P).
    pub fn is_autopilot_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::KeyP)
    }

    /// Snapshot of this frame's flight intent.
    ///
    /// Arrows fly and turn, Shift boosts, PageUp/PageDown pitch, V lands, C enters the interior and
    /// Escape cancels the autopilot.
    pub fn control_intent(&self) -> ControlIntent {
        ControlIntent {
            forward: self.is_key_held(KeyCode::ArrowUp),
            backward: self.is_key_held(KeyCode::ArrowDown),
            turn_left: self.is_key_held(KeyCode::ArrowLeft),
            turn_right: self.is_key_held(KeyCode::ArrowRight),
            boost: self.is_boosting(),
            pitch_up: self.is_key_held(KeyCode::PageUp),
            pitch_down: self.is_key_held(KeyCode::PageDown),
            landing_requested: self.is_key_pressed(KeyCode::KeyV),
            enter_interior_requested: self.is_key_pressed(KeyCode::KeyC),
            cancel_autopilot: self.is_key_pressed(KeyCode::Escape),
        }
    }
}

// Re-export for convenience
pub use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_edge_triggered() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyV, ElementState::Pressed);
        assert!(input.control_intent().landing_requested);

        input.begin_frame();
        // key repeat while held
        input.process_keyboard(KeyCode::KeyV, ElementState::Pressed);
        assert!(!input.control_intent().landing_requested, "repeat must not retrigger");
        assert!(input.is_key_held(KeyCode::KeyV));
    }

    #[test]
    fn held_keys_map_to_flight_intent() {
        let mut input = InputState::new();
        for key in [KeyCode::ArrowUp, KeyCode::ArrowLeft, KeyCode::ShiftRight, KeyCode::PageDown] {
            input.process_keyboard(key, ElementState::Pressed);
        }
        input.begin_frame();
        let intent = input.control_intent();
        assert!(intent.forward && intent.turn_left && intent.boost && intent.pitch_down);
        assert!(!intent.backward && !intent.turn_right && !intent.pitch_up);
        assert!(!intent.landing_requested && !intent.enter_interior_requested && !intent.cancel_autopilot);
    }

    #[test]
    fn release_clears_held_state() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::ArrowDown, ElementState::Pressed);
        input.process_keyboard(KeyCode::ArrowDown, ElementState::Released);
        assert!(!input.control_intent().backward);
        assert!(input.is_key_released(KeyCode::ArrowDown));

        input.process_keyboard(KeyCode::ArrowUp, ElementState::Pressed);
        input.release_all();
        assert_eq!(input.control_intent(), ControlIntent::default());
    }

    #[test]
    fn triggers_for_interior_cancel_and_view() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyC, ElementState::Pressed);
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyU, ElementState::Pressed);
        let intent = input.control_intent();
        assert!(intent.enter_interior_requested && intent.cancel_autopilot);
        assert!(input.is_view_toggle_pressed());
        assert!(!input.is_autopilot_pressed());
    }
}
