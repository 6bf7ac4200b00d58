//! First-person perspective camera and projection helpers
//!
//! All projections here follow the OpenGL convention (NDC depth in `[-1, 1]`)
//! so that the math matches what scene authors expect. [`OPENGL_TO_WGPU`]
//! remaps depth to wgpu's `[0, 1]` right before upload.

use umbra_core::matrix::{self, mat4_mul, Mat4};
use umbra_core::{Result, UmbraError, Vec3};
use umbra_scene::CameraDef;

/// Pitch is clamped to this many degrees either side of the horizon
pub const PITCH_LIMIT: f32 = 89.0;

/// Remaps clip-space depth from `[-w, w]` to `[0, w]`: `z' = 0.5 z + 0.5 w`
#[rustfmt::skip]
pub const OPENGL_TO_WGPU: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 0.5, 0.0],
    [0.0, 0.0, 0.5, 1.0],
];

/// Apply [`OPENGL_TO_WGPU`] to an OpenGL-style projection (or projection-view)
pub fn to_wgpu(m: &Mat4) -> Mat4 {
    mat4_mul(&OPENGL_TO_WGPU, m)
}

/// OpenGL-style perspective projection. `fov_degrees` is the vertical field of view.
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
    let depth = far - near;

    [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, -(far + near) / depth, -1.0],
        [0.0, 0.0, -(2.0 * far * near) / depth, 0.0],
    ]
}

/// OpenGL-style orthographic projection of the box
/// `[left, right] x [bottom, top] x [-near, -far]` (view space looks down -Z)
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let width = right - left;
    let height = top - bottom;
    let depth = far - near;

    [
        [2.0 / width, 0.0, 0.0, 0.0],
        [0.0, 2.0 / height, 0.0, 0.0],
        [0.0, 0.0, -2.0 / depth, 0.0],
        [
            -(right + left) / width,
            -(top + bottom) / height,
            -(far + near) / depth,
            1.0,
        ],
    ]
}

/// Right-handed view matrix looking from `eye` towards `target`.
///
/// Fails when `eye == target` or when `up` is parallel to the view direction.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Result<Mat4> {
    let f = (target - eye).try_normalized().ok_or_else(|| {
        UmbraError::InvalidArgument("look_at: eye and target coincide".into())
    })?;
    let s = f.cross(&up).try_normalized().ok_or_else(|| {
        UmbraError::InvalidArgument("look_at: up is parallel to the view direction".into())
    })?;
    let u = s.cross(&f);

    Ok([
        [s.x, u.x, -f.x, 0.0],
        [s.y, u.y, -f.y, 0.0],
        [s.z, u.z, -f.z, 0.0],
        [-s.dot(&eye), -u.dot(&eye), f.dot(&eye), 1.0],
    ])
}

/// A free-flying camera driven by pitch and yaw.
///
/// At zero angles it looks down -Z with +Y up. Positive pitch looks up,
/// positive yaw turns towards -X.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pitch: f32,
    yaw: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 2.0),
            pitch: 0.0,
            yaw: 0.0,
            fov: 80.0,
            near: 0.1,
            far: 100.0,
            aspect: 4.0 / 3.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            fov,
            aspect,
            near,
            far,
            ..Default::default()
        }
    }

    /// Build a camera from a scene document's `[camera]` table
    pub fn from_def(def: &CameraDef, aspect: f32) -> Self {
        let mut camera = Self::new(def.position, def.fov, aspect, def.near, def.far);
        camera.set_rotation(def.pitch, def.yaw);
        camera
    }

    /// Pitch in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn set_rotation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = yaw.rem_euclid(360.0);
    }

    /// Rotate by the given deltas in degrees
    pub fn rotate_local(&mut self, delta_pitch: f32, delta_yaw: f32) {
        self.set_rotation(self.pitch + delta_pitch, self.yaw + delta_yaw);
    }

    /// Keep the projection in step with the viewport
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Unit view direction in world space
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    pub fn up(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(sy * sp, cp, cy * sp)
    }

    /// `Rx(-pitch) · Ry(-yaw) · T(-position)`
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_only_view();
        mat4_mul(&rotation, &matrix::mat4_translation(-self.position))
    }

    /// View matrix with the translation removed, used to draw the sky at infinity
    pub fn skybox_view(&self) -> Mat4 {
        self.rotation_only_view()
    }

    fn rotation_only_view(&self) -> Mat4 {
        mat4_mul(
            &matrix::mat4_rotation_x(-self.pitch),
            &matrix::mat4_rotation_y(-self.yaw),
        )
    }

    /// OpenGL-style perspective projection
    pub fn projection_matrix(&self) -> Mat4 {
        perspective(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::matrix::{mat4_abs_diff_eq, mat4_transform_point, mat4_transform_vec4};

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(camera.forward().abs_diff_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-6));
        assert!(camera.right().abs_diff_eq(&Vec3::X, 1e-6));
        assert!(camera.up().abs_diff_eq(&Vec3::Y, 1e-6));
    }

    #[test]
    fn test_view_moves_camera_to_origin() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(3.0, -2.0, 7.0);
        camera.set_rotation(25.0, 130.0);
        let view = camera.view_matrix();
        let at_eye = mat4_transform_point(&view, camera.position);
        assert!(at_eye.abs_diff_eq(&Vec3::ZERO, 1e-4));

        // A point straight ahead lands on -Z in view space
        let ahead = mat4_transform_point(&view, camera.position + camera.forward() * 2.0);
        assert!(ahead.abs_diff_eq(&Vec3::new(0.0, 0.0, -2.0), 1e-4), "{:?}", ahead);
        let right = mat4_transform_point(&view, camera.position + camera.right());
        assert!(right.abs_diff_eq(&Vec3::X, 1e-4));
        let up = mat4_transform_point(&view, camera.position + camera.up());
        assert!(up.abs_diff_eq(&Vec3::Y, 1e-4));
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        for _ in 0..5 {
            camera.rotate_local(200.0, 0.0);
            assert_eq!(camera.pitch(), PITCH_LIMIT);
            assert!(camera.forward().is_finite());
        }
        for _ in 0..5 {
            camera.rotate_local(-200.0, 0.0);
            assert_eq!(camera.pitch(), -PITCH_LIMIT);
            assert!(camera.forward().is_finite());
        }
    }

    #[test]
    fn test_yaw_turns_left() {
        let mut camera = Camera::default();
        camera.rotate_local(0.0, 90.0);
        assert!(camera.forward().abs_diff_eq(&Vec3::new(-1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective(60.0, 1.5, 0.5, 50.0);
        let near = mat4_transform_vec4(&proj, [0.0, 0.0, -0.5, 1.0]);
        let far = mat4_transform_vec4(&proj, [0.0, 0.0, -50.0, 1.0]);
        assert!((near[2] / near[3] + 1.0).abs() < 1e-5);
        assert!((far[2] / far[3] - 1.0).abs() < 1e-4);

        let wgpu_proj = to_wgpu(&proj);
        let near = mat4_transform_vec4(&wgpu_proj, [0.0, 0.0, -0.5, 1.0]);
        let far = mat4_transform_vec4(&wgpu_proj, [0.0, 0.0, -50.0, 1.0]);
        assert!((near[2] / near[3]).abs() < 1e-5);
        assert!((far[2] / far[3] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_orthographic_maps_box_corners() {
        let proj = orthographic(-2.0, 4.0, -1.0, 3.0, 0.5, 10.0);
        let low = mat4_transform_point(&proj, Vec3::new(-2.0, -1.0, -0.5));
        assert!(low.abs_diff_eq(&Vec3::new(-1.0, -1.0, -1.0), 1e-5), "{:?}", low);
        let high = mat4_transform_point(&proj, Vec3::new(4.0, 3.0, -10.0));
        assert!(high.abs_diff_eq(&Vec3::new(1.0, 1.0, 1.0), 1e-5), "{:?}", high);
    }

    #[test]
    fn test_look_at() {
        let view = look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        let expected = matrix::mat4_translation(Vec3::new(0.0, 0.0, -5.0));
        assert!(mat4_abs_diff_eq(&view, &expected, 1e-6));

        assert!(look_at(Vec3::Y, Vec3::ZERO, Vec3::Y).is_err());
        assert!(look_at(Vec3::ONE, Vec3::ONE, Vec3::Y).is_err());
    }

    #[test]
    fn test_skybox_view_ignores_position() {
        let mut camera = Camera::default();
        camera.set_rotation(10.0, 45.0);
        let a = camera.skybox_view();
        camera.position = Vec3::new(100.0, 50.0, -20.0);
        assert!(mat4_abs_diff_eq(&a, &camera.skybox_view(), 0.0));
        assert_eq!(a[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
