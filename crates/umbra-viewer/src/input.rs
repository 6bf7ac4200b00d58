//! Keyboard and mouse state, sampled once per frame

use std::collections::{HashMap, HashSet};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Held and just-pressed keys plus accumulated mouse motion
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    /// Pointer motion this frame, in pixels
    mouse_delta: (f64, f64),
    /// Last cursor position, used when raw device motion is unavailable
    cursor: Option<(f64, f64)>,
    /// Action name -> bound keys
    action_map: HashMap<&'static str, Vec<KeyCode>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            buttons_down: HashSet::new(),
            mouse_delta: (0.0, 0.0),
            cursor: None,
            action_map: Self::default_action_map(),
        }
    }

    fn default_action_map() -> HashMap<&'static str, Vec<KeyCode>> {
        let mut map = HashMap::new();
        map.insert("move_forward", vec![KeyCode::KeyW]);
        map.insert("move_backward", vec![KeyCode::KeyS]);
        map.insert("move_left", vec![KeyCode::KeyA]);
        map.insert("move_right", vec![KeyCode::KeyD]);
        map.insert("move_down", vec![KeyCode::KeyQ]);
        map.insert("move_up", vec![KeyCode::KeyE]);
        map.insert("sprint", vec![KeyCode::ShiftLeft, KeyCode::ShiftRight]);
        map.insert("cycle_forward", vec![KeyCode::NumpadAdd, KeyCode::Equal]);
        map.insert("cycle_backward", vec![KeyCode::NumpadSubtract, KeyCode::Minus]);
        map.insert("toggle_shadows", vec![KeyCode::F4]);
        map.insert("snapshot", vec![KeyCode::F12]);
        map.insert("quit", vec![KeyCode::Escape]);
        map
    }

    pub fn process_key_down(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_just_pressed.insert(key);
        }
    }

    pub fn process_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons_down.insert(button);
        } else {
            self.buttons_down.remove(&button);
        }
    }

    /// Cursor position from window events
    pub fn process_cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.cursor {
            self.mouse_delta.0 += x - last_x;
            self.mouse_delta.1 += y - last_y;
        }
        self.cursor = Some((x, y));
    }

    /// Clear per-frame state; call after the frame has consumed it
    pub fn end_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    /// Forget held keys, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.keys_down.clear();
        self.buttons_down.clear();
        self.cursor = None;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Is any key bound to `action` held?
    pub fn is_action_pressed(&self, action: &str) -> bool {
        self.action_map
            .get(action)
            .is_some_and(|keys| keys.iter().any(|k| self.keys_down.contains(k)))
    }

    /// Was any key bound to `action` pressed this frame?
    pub fn is_action_just_pressed(&self, action: &str) -> bool {
        self.action_map
            .get(action)
            .is_some_and(|keys| keys.iter().any(|k| self.keys_just_pressed.contains(k)))
    }

    pub fn mouse_delta(&self) -> (f64, f64) {
        self.mouse_delta
    }

    /// Digit 1-9 pressed this frame, lowest first
    pub fn digit_just_pressed(&self) -> Option<u32> {
        const DIGITS: [KeyCode; 9] = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
            KeyCode::Digit6,
            KeyCode::Digit7,
            KeyCode::Digit8,
            KeyCode::Digit9,
        ];
        DIGITS
            .iter()
            .position(|key| self.keys_just_pressed.contains(key))
            .map(|index| index as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_transitions() {
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyW);
        assert!(input.is_key_down(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        // Key repeat does not count as a new press
        input.end_frame();
        input.process_key_down(KeyCode::KeyW);
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));

        input.process_key_up(KeyCode::KeyW);
        assert!(!input.is_key_down(KeyCode::KeyW));
    }

    #[test]
    fn test_actions() {
        let mut input = InputState::new();
        assert!(!input.is_action_pressed("sprint"));
        input.process_key_down(KeyCode::ShiftRight);
        assert!(input.is_action_pressed("sprint"));
        assert!(!input.is_action_pressed("no_such_action"));

        input.process_key_down(KeyCode::F4);
        assert!(input.is_action_just_pressed("toggle_shadows"));
        input.end_frame();
        assert!(!input.is_action_just_pressed("toggle_shadows"));
    }

    #[test]
    fn test_cursor_delta_accumulates() {
        let mut input = InputState::new();
        input.process_cursor_moved(100.0, 100.0);
        assert_eq!(input.mouse_delta(), (0.0, 0.0), "first position has no reference");
        input.process_cursor_moved(110.0, 95.0);
        input.process_cursor_moved(112.0, 95.0);
        assert_eq!(input.mouse_delta(), (12.0, -5.0));
        input.end_frame();
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_digit() {
        let mut input = InputState::new();
        assert_eq!(input.digit_just_pressed(), None);
        input.process_key_down(KeyCode::Digit5);
        assert_eq!(input.digit_just_pressed(), Some(5));
    }
}
