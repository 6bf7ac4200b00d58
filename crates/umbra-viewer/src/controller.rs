//! Free-look camera controller

use crate::input::InputState;
use umbra_core::Vec3;
use umbra_render::Camera;
use umbra_scene::CameraDef;
use winit::event::MouseButton;

/// Speed multiplier while sprint is held
pub const SPRINT_MULTIPLIER: f32 = 5.0;

/// Moves and turns a [`Camera`] from held keys and mouse drags
#[derive(Debug, Clone)]
pub struct FreeLookController {
    /// World units per second
    pub move_speed: f32,
    /// Degrees per pixel of drag, per second of frame time
    pub look_sensitivity: f32,
}

impl Default for FreeLookController {
    fn default() -> Self {
        Self::from_def(&CameraDef::default())
    }
}

impl FreeLookController {
    pub fn from_def(def: &CameraDef) -> Self {
        Self {
            move_speed: def.move_speed,
            look_sensitivity: def.look_sensitivity,
        }
    }

    /// Apply one frame of input. Looking only happens while the left
    /// button is held.
    pub fn update(&self, camera: &mut Camera, input: &InputState, dt: f32) {
        if input.is_mouse_button_down(MouseButton::Left) {
            let (dx, dy) = input.mouse_delta();
            let scale = dt * self.look_sensitivity;
            camera.rotate_local(-dy as f32 * scale, -dx as f32 * scale);
        }

        let mut speed = self.move_speed * dt;
        if input.is_action_pressed("sprint") {
            speed *= SPRINT_MULTIPLIER;
        }

        let axis = |positive: &str, negative: &str| {
            input.is_action_pressed(positive) as i32 as f32 - input.is_action_pressed(negative) as i32 as f32
        };
        let motion = camera.forward() * axis("move_forward", "move_backward")
            + camera.right() * axis("move_right", "move_left")
            + camera.up() * axis("move_up", "move_down");
        if motion != Vec3::ZERO {
            camera.position = camera.position + motion * speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn camera() -> Camera {
        Camera::new(Vec3::ZERO, 80.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn test_w_moves_forward() {
        let controller = FreeLookController {
            move_speed: 2.0,
            look_sensitivity: 50.0,
        };
        let mut cam = camera();
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyW);
        controller.update(&mut cam, &input, 0.5);
        assert!(cam.position.abs_diff_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-5), "{:?}", cam.position);
    }

    #[test]
    fn test_sprint_and_strafe() {
        let controller = FreeLookController::default();
        let mut cam = camera();
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyA);
        input.process_key_down(KeyCode::ShiftLeft);
        controller.update(&mut cam, &input, 0.1);
        assert!(cam.position.abs_diff_eq(&Vec3::new(-0.5, 0.0, 0.0), 1e-5), "{:?}", cam.position);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let controller = FreeLookController::default();
        let mut cam = camera();
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyQ);
        input.process_key_down(KeyCode::KeyE);
        controller.update(&mut cam, &input, 0.1);
        assert_eq!(cam.position, Vec3::ZERO);
    }

    #[test]
    fn test_look_requires_left_button() {
        let controller = FreeLookController::default();
        let mut cam = camera();
        let mut input = InputState::new();
        input.process_cursor_moved(0.0, 0.0);
        input.process_cursor_moved(10.0, 0.0);
        controller.update(&mut cam, &input, 0.1);
        assert_eq!(cam.yaw(), 0.0);

        input.process_mouse_button(MouseButton::Left, true);
        controller.update(&mut cam, &input, 0.1);
        // Dragging right turns right, which is negative yaw: 10 px * 0.1 s * 50
        assert!((cam.yaw() - 310.0).abs() < 1e-3, "yaw = {}", cam.yaw());
    }
}
