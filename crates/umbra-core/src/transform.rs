//! Position / rotation / scale triple

use crate::error::Result;
use crate::matrix::{mat4_mul, mat4_scale, mat4_translation, Mat4};
use crate::quaternion::Quaternion;
use crate::types::Vec3;

/// A 3D transform. The model matrix always composes as `T · R · S`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quaternion,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Position, Euler rotation in degrees and scale, as written in scene documents
    pub fn from_euler(position: Vec3, euler_degrees: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quaternion::from_euler(euler_degrees),
            scale,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Compose an Euler delta (degrees) in the local frame
    pub fn rotate_euler(&mut self, euler_degrees: Vec3) {
        self.rotation *= Quaternion::from_euler(euler_degrees);
    }

    /// Compose an axis-angle delta in the local frame
    pub fn rotate_axis(&mut self, axis: Vec3, degrees: f32) -> Result<()> {
        self.rotation *= Quaternion::from_axis_angle(axis, degrees)?;
        Ok(())
    }

    pub fn scale_add(&mut self, delta: Vec3) {
        self.scale += delta;
    }

    pub fn scale_mult(&mut self, factor: Vec3) {
        self.scale = self.scale.mul_elements(&factor);
    }

    /// Point local +Z at `target`, replacing the rotation outright
    pub fn look_at_self(&mut self, target: Vec3, up: Vec3) -> Result<()> {
        self.rotation = Quaternion::look_rotation(target - self.position, up)?;
        Ok(())
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::Z)
    }

    pub fn right(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::X)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation.rotate_vector(Vec3::Y)
    }

    /// Model matrix: scale first, then rotation, then translation
    pub fn trs_matrix(&self) -> Mat4 {
        let t = mat4_translation(self.position);
        let r = self.rotation.to_rotation_matrix();
        let s = mat4_scale(self.scale);
        mat4_mul(&t, &mat4_mul(&r, &s))
    }

    /// Split a `T · R · S` matrix without shear back into its parts
    pub fn decompose(m: &Mat4) -> Self {
        let column = |c: usize| Vec3::new(m[c][0], m[c][1], m[c][2]);
        let (cx, cy, cz) = (column(0), column(1), column(2));
        let mut scale = Vec3::new(cx.length(), cy.length(), cz.length());

        // A negative determinant means one axis is mirrored; fold it into X
        if cx.cross(&cy).dot(&cz) < 0.0 {
            scale.x = -scale.x;
        }

        let safe = |v: Vec3, s: f32| if s.abs() > 1e-12 { v / s } else { v };
        let (rx, ry, rz) = (safe(cx, scale.x), safe(cy, scale.y), safe(cz, scale.z));
        let rotation_matrix = [
            [rx.x, rx.y, rx.z, 0.0],
            [ry.x, ry.y, ry.z, 0.0],
            [rz.x, rz.y, rz.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];

        Self {
            position: column(3),
            rotation: Quaternion::from_rotation_matrix(&rotation_matrix),
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::mat4_transform_point;

    #[test]
    fn test_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quaternion::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn test_trs_without_rotation() {
        let p = Vec3::new(1.0, -2.0, 3.0);
        let s = Vec3::new(2.0, 3.0, 4.0);
        let t = Transform::from_position(p).with_scale(s);
        let m = t.trs_matrix();

        assert_eq!(m[0][0], 2.0);
        assert_eq!(m[1][1], 3.0);
        assert_eq!(m[2][2], 4.0);
        assert_eq!(m[3], [1.0, -2.0, 3.0, 1.0]);

        let back = Transform::decompose(&m);
        assert!(back.position.abs_diff_eq(&p, 1e-6));
        assert!(back.scale.abs_diff_eq(&s, 1e-6));
        assert!(back.rotation.same_rotation(&Quaternion::IDENTITY, 1e-6));
    }

    #[test]
    fn test_trs_order_is_scale_rotate_translate() {
        let mut t = Transform::from_position(Vec3::new(10.0, 0.0, 0.0)).with_scale(Vec3::splat(2.0));
        t.rotate_axis(Vec3::Y, 90.0).unwrap();
        // (1,0,0) scaled to (2,0,0), rotated to (0,0,-2), moved to (10,0,-2)
        let p = mat4_transform_point(&t.trs_matrix(), Vec3::X);
        assert!(p.abs_diff_eq(&Vec3::new(10.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn test_decompose_round_trip_with_rotation() {
        let t = Transform::from_euler(
            Vec3::new(4.0, 5.0, -6.0),
            Vec3::new(30.0, -45.0, 10.0),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let back = Transform::decompose(&t.trs_matrix());
        assert!(back.position.abs_diff_eq(&t.position, 1e-5));
        assert!(back.scale.abs_diff_eq(&t.scale, 1e-5));
        assert!(back.rotation.same_rotation(&t.rotation, 1e-5));
    }

    #[test]
    fn test_rotate_composes_in_local_frame() {
        let mut t = Transform::default();
        t.rotate_axis(Vec3::Y, 90.0).unwrap();
        // Local X now points along world -Z; pitching about local X tilts forward upward
        t.rotate_axis(Vec3::X, -90.0).unwrap();
        assert!(t.forward().abs_diff_eq(&Vec3::Y, 1e-5));
        assert!(t.right().abs_diff_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_look_at_self() {
        let mut t = Transform::from_position(Vec3::new(0.0, 0.0, -5.0));
        t.look_at_self(Vec3::ZERO, Vec3::Y).unwrap();
        assert!(t.forward().abs_diff_eq(&Vec3::Z, 1e-5));
        assert!(t.up().abs_diff_eq(&Vec3::Y, 1e-5));

        assert!(t.look_at_self(t.position + Vec3::Y, Vec3::Y).is_err());
    }

    #[test]
    fn test_scale_helpers() {
        let mut t = Transform::default();
        t.scale_add(Vec3::splat(1.0));
        t.scale_mult(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::new(2.0, 4.0, 6.0));
    }
}
