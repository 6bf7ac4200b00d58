//! Unit-quaternion rotation algebra
//!
//! Conventions used throughout Umbra:
//! - Components are stored as `(w, x, y, z)`.
//! - `a * b` is the Hamilton product and means "rotate by `b`, then by `a`".
//!   Composing `rotation * delta` therefore applies `delta` in the local frame
//!   of `rotation`.
//! - Euler angles are degrees `(x = pitch, y = yaw, z = roll)` in intrinsic
//!   Z-X-Y order: `R = Rz · Rx · Ry`, equivalently `q = qz * qx * qy`.
//!
//! Every composing operation ends with an explicit [`Quaternion::normalized`]
//! step so the value stays unit length.

use crate::error::{Result, UmbraError};
use crate::matrix::Mat4;
use crate::types::Vec3;
use std::ops::{Mul, MulAssign};

/// A rotation stored as a unit quaternion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Build from raw components and renormalize
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }.normalized()
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Divide all four components by the magnitude.
    ///
    /// Fails for a zero (or non-finite) quaternion.
    pub fn try_normalized(&self) -> Result<Self> {
        let mag = self.magnitude();
        if mag < 1e-12 || !mag.is_finite() {
            return Err(UmbraError::InvalidArgument(format!(
                "cannot normalize quaternion with magnitude {}",
                mag
            )));
        }
        Ok(Self {
            w: self.w / mag,
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
        })
    }

    /// Divide all four components by the magnitude; a degenerate value
    /// collapses to the identity rotation instead of producing NaN.
    pub fn normalized(&self) -> Self {
        self.try_normalized().unwrap_or(Self::IDENTITY)
    }

    /// Inverse rotation. The conjugate suffices since the value is unit length.
    pub fn inverse(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotation of `degrees` about `axis` (right-hand rule)
    pub fn from_axis_angle(axis: Vec3, degrees: f32) -> Result<Self> {
        let axis = axis.try_normalized().ok_or_else(|| {
            UmbraError::InvalidArgument("rotation axis must have non-zero length".into())
        })?;
        let (s, c) = (degrees.to_radians() * 0.5).sin_cos();
        Ok(Self {
            w: c,
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
        .normalized())
    }

    /// Axis and angle in degrees. The angle is in `[0, 180]`; the identity
    /// rotation reports the X axis with a zero angle.
    pub fn to_axis_angle(&self) -> (Vec3, f32) {
        let q = if self.w < 0.0 {
            Self {
                w: -self.w,
                x: -self.x,
                y: -self.y,
                z: -self.z,
            }
        } else {
            *self
        };
        let s = (q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        if s < 1e-7 {
            return (Vec3::X, 0.0);
        }
        let angle = 2.0 * s.atan2(q.w);
        (Vec3::new(q.x / s, q.y / s, q.z / s), angle.to_degrees())
    }

    fn axis(axis: Vec3, degrees: f32) -> Self {
        let (s, c) = (degrees.to_radians() * 0.5).sin_cos();
        Self {
            w: c,
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// Euler angles in degrees, applied as `R = Rz · Rx · Ry`
    pub fn from_euler(euler: Vec3) -> Self {
        let qx = Self::axis(Vec3::X, euler.x);
        let qy = Self::axis(Vec3::Y, euler.y);
        let qz = Self::axis(Vec3::Z, euler.z);
        qz * qx * qy
    }

    /// Inverse of [`Quaternion::from_euler`] for pitch away from ±90°.
    ///
    /// At gimbal lock the roll is reported as zero and folded into yaw.
    pub fn to_euler(&self) -> Vec3 {
        let Self { w, x, y, z } = *self;

        let r21 = 2.0 * (y * z + w * x);
        let pitch = r21.clamp(-1.0, 1.0).asin();

        if r21.abs() > 0.999_999 {
            let r00 = 1.0 - 2.0 * (y * y + z * z);
            let r02 = 2.0 * (x * z + w * y);
            let yaw = r02.atan2(r00);
            return Vec3::new(pitch.to_degrees(), yaw.to_degrees(), 0.0);
        }

        let yaw = (2.0 * (w * y - x * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let roll = (2.0 * (w * z - x * y)).atan2(1.0 - 2.0 * (x * x + z * z));
        Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    /// Rotation as a homogeneous 4x4 column-major matrix
    pub fn to_rotation_matrix(&self) -> Mat4 {
        let Self { w, x, y, z } = *self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y + w * z),
                2.0 * (x * z - w * y),
                0.0,
            ],
            [
                2.0 * (x * y - w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z + w * x),
                0.0,
            ],
            [
                2.0 * (x * z + w * y),
                2.0 * (y * z - w * x),
                1.0 - 2.0 * (x * x + y * y),
                0.0,
            ],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    /// Extract the rotation from the upper 3x3 of an orthonormal matrix.
    ///
    /// Branches on the trace so the divisor is always the largest term.
    pub fn from_rotation_matrix(m: &Mat4) -> Self {
        // r(row, col) in conventional notation
        let r = |row: usize, col: usize| m[col][row];
        let trace = r(0, 0) + r(1, 1) + r(2, 2);

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self {
                w: 0.25 * s,
                x: (r(2, 1) - r(1, 2)) / s,
                y: (r(0, 2) - r(2, 0)) / s,
                z: (r(1, 0) - r(0, 1)) / s,
            }
        } else if r(0, 0) > r(1, 1) && r(0, 0) > r(2, 2) {
            let s = (1.0 + r(0, 0) - r(1, 1) - r(2, 2)).sqrt() * 2.0;
            Self {
                w: (r(2, 1) - r(1, 2)) / s,
                x: 0.25 * s,
                y: (r(0, 1) + r(1, 0)) / s,
                z: (r(0, 2) + r(2, 0)) / s,
            }
        } else if r(1, 1) > r(2, 2) {
            let s = (1.0 + r(1, 1) - r(0, 0) - r(2, 2)).sqrt() * 2.0;
            Self {
                w: (r(0, 2) - r(2, 0)) / s,
                x: (r(0, 1) + r(1, 0)) / s,
                y: 0.25 * s,
                z: (r(1, 2) + r(2, 1)) / s,
            }
        } else {
            let s = (1.0 + r(2, 2) - r(0, 0) - r(1, 1)).sqrt() * 2.0;
            Self {
                w: (r(1, 0) - r(0, 1)) / s,
                x: (r(0, 2) + r(2, 0)) / s,
                y: (r(1, 2) + r(2, 1)) / s,
                z: 0.25 * s,
            }
        };
        q.normalized()
    }

    /// Rotation whose local +Z points along `forward` and whose local +Y is
    /// as close to `up` as possible.
    pub fn look_rotation(forward: Vec3, up: Vec3) -> Result<Self> {
        let z = forward.try_normalized().ok_or_else(|| {
            UmbraError::InvalidArgument("look_rotation forward must be non-zero".into())
        })?;
        let x = up.cross(&z).try_normalized().ok_or_else(|| {
            UmbraError::InvalidArgument("look_rotation forward and up are parallel".into())
        })?;
        let y = z.cross(&x);

        let basis = [
            [x.x, x.y, x.z, 0.0],
            [y.x, y.y, y.z, 0.0],
            [z.x, z.y, z.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Ok(Self::from_rotation_matrix(&basis))
    }

    /// Rotate `v` by this quaternion (`q · (0, v) · q⁻¹`, expanded)
    pub fn rotate_vector(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(&v) * 2.0;
        v + t * self.w + u.cross(&t)
    }

    /// Spherical interpolation along the shortest arc
    pub fn slerp(&self, other: &Self, t: f32) -> Self {
        let mut end = *other;
        let mut cos_theta = self.dot(other);
        if cos_theta < 0.0 {
            end = Self {
                w: -end.w,
                x: -end.x,
                y: -end.y,
                z: -end.z,
            };
            cos_theta = -cos_theta;
        }

        if cos_theta > 0.9995 {
            return Self {
                w: self.w + (end.w - self.w) * t,
                x: self.x + (end.x - self.x) * t,
                y: self.y + (end.y - self.y) * t,
                z: self.z + (end.z - self.z) * t,
            }
            .normalized();
        }

        let theta = cos_theta.acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Self {
            w: self.w * a + end.w * b,
            x: self.x * a + end.x * b,
            y: self.y * a + end.y * b,
            z: self.z * a + end.z * b,
        }
        .normalized()
    }

    /// True when both values describe the same rotation (`q` and `-q` are equal)
    pub fn same_rotation(&self, other: &Self, epsilon: f32) -> bool {
        (self.dot(other).abs() - 1.0).abs() <= epsilon
    }
}

impl Mul for Quaternion {
    type Output = Self;

    /// Hamilton product; the result rotates by `rhs` first, then `self`
    fn mul(self, rhs: Self) -> Self {
        let (lw, lx, ly, lz) = (self.w, self.x, self.y, self.z);
        let (rw, rx, ry, rz) = (rhs.w, rhs.x, rhs.y, rhs.z);
        Self {
            w: lw * rw - lx * rx - ly * ry - lz * rz,
            x: lw * rx + lx * rw + ly * rz - lz * ry,
            y: lw * ry - lx * rz + ly * rw + lz * rx,
            z: lw * rz + lx * ry - ly * rx + lz * rw,
        }
        .normalized()
    }
}

impl MulAssign for Quaternion {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{
        mat4_abs_diff_eq, mat4_mul, mat4_rotation_x, mat4_rotation_y, mat4_rotation_z,
        mat4_transform_direction,
    };

    const EPS: f32 = 1e-5;

    fn sample_rotations() -> Vec<Quaternion> {
        let axes = [
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-0.3, 0.8, 0.2),
            Vec3::new(0.0, -1.0, 4.0),
        ];
        let angles = [5.0, 45.0, 90.0, 135.0, 179.0, -60.0];
        axes.iter()
            .flat_map(|axis| {
                angles
                    .iter()
                    .map(move |angle| Quaternion::from_axis_angle(*axis, *angle).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_matrix_of_half_quaternion() {
        let q = Quaternion::new(0.5, 0.5, 0.5, 0.5);
        let m = q.to_rotation_matrix();
        // Rows of the rotation: [0,0,1], [1,0,0], [0,1,0]
        let expected = [
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        assert!(mat4_abs_diff_eq(&m, &expected, EPS));
    }

    #[test]
    fn test_hamilton_product_of_half_quaternion() {
        let q = Quaternion::new(0.5, 0.5, 0.5, 0.5);
        let qq = q * q;
        assert!((qq.w + 0.5).abs() < EPS);
        assert!((qq.x - 0.5).abs() < EPS);
        assert!((qq.y - 0.5).abs() < EPS);
        assert!((qq.z - 0.5).abs() < EPS);
    }

    #[test]
    fn test_rotation_about_own_axis_is_fixed_point() {
        let q = Quaternion::new(0.5, 0.5, 0.5, 0.5);
        let v = q.rotate_vector(Vec3::new(1.0, 1.0, 1.0));
        assert!(v.abs_diff_eq(&Vec3::new(1.0, 1.0, 1.0), EPS));
    }

    #[test]
    fn test_stays_unit_length() {
        let rotations = sample_rotations();
        let mut acc = Quaternion::IDENTITY;
        for q in &rotations {
            assert!((q.magnitude() - 1.0).abs() < EPS);
            acc = acc * *q;
            assert!((acc.magnitude() - 1.0).abs() < EPS);
        }
        assert!((Quaternion::new(3.0, 1.0, -2.0, 0.5).magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_times_inverse_is_identity() {
        for q in sample_rotations() {
            let r = q * q.inverse();
            assert!((r.w - 1.0).abs() < EPS, "{:?}", r);
            assert!(r.x.abs() < EPS && r.y.abs() < EPS && r.z.abs() < EPS);
        }
    }

    #[test]
    fn test_axis_angle_round_trip() {
        let axes = [Vec3::X, Vec3::new(1.0, 2.0, 3.0).normalized(), Vec3::new(0.0, -1.0, 0.0)];
        for axis in axes {
            for angle in [1.0f32, 30.0, 90.0, 170.0] {
                let q = Quaternion::from_axis_angle(axis, angle).unwrap();
                let (a, deg) = q.to_axis_angle();
                assert!((deg - angle).abs() < 1e-3, "{} vs {}", deg, angle);
                assert!(a.abs_diff_eq(&axis, 1e-4));
            }
        }
        // Negative angle comes back as the opposite axis
        let q = Quaternion::from_axis_angle(Vec3::Y, -40.0).unwrap();
        let (a, deg) = q.to_axis_angle();
        assert!((deg - 40.0).abs() < 1e-3);
        assert!(a.abs_diff_eq(&-Vec3::Y, 1e-4));
    }

    #[test]
    fn test_zero_axis_is_invalid() {
        assert!(matches!(
            Quaternion::from_axis_angle(Vec3::ZERO, 45.0),
            Err(UmbraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_euler_matches_zxy_matrix_product() {
        let e = Vec3::new(20.0, 35.0, -50.0);
        let expected = mat4_mul(
            &mat4_rotation_z(e.z),
            &mat4_mul(&mat4_rotation_x(e.x), &mat4_rotation_y(e.y)),
        );
        let m = Quaternion::from_euler(e).to_rotation_matrix();
        assert!(mat4_abs_diff_eq(&m, &expected, EPS));
    }

    #[test]
    fn test_euler_round_trip() {
        for pitch in [-80.0f32, -45.0, 0.0, 10.0, 60.0, 85.0] {
            for yaw in [-170.0f32, -90.0, 0.0, 45.0, 120.0] {
                for roll in [-135.0f32, 0.0, 30.0, 175.0] {
                    let e = Vec3::new(pitch, yaw, roll);
                    let back = Quaternion::from_euler(e).to_euler();
                    assert!(back.abs_diff_eq(&e, 1e-2), "{:?} -> {:?}", e, back);
                }
            }
        }
    }

    #[test]
    fn test_euler_gimbal_lock_keeps_rotation() {
        let e = Vec3::new(90.0, 30.0, 0.0);
        let q = Quaternion::from_euler(e);
        let again = Quaternion::from_euler(q.to_euler());
        assert!(q.same_rotation(&again, 1e-4));
    }

    #[test]
    fn test_matrix_round_trip_all_branches() {
        let cases = [
            Quaternion::IDENTITY,
            Quaternion::from_axis_angle(Vec3::X, 179.0).unwrap(),
            Quaternion::from_axis_angle(Vec3::Y, 179.0).unwrap(),
            Quaternion::from_axis_angle(Vec3::Z, 179.0).unwrap(),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 200.0).unwrap(),
        ];
        for q in cases.into_iter().chain(sample_rotations()) {
            let back = Quaternion::from_rotation_matrix(&q.to_rotation_matrix());
            assert!(q.same_rotation(&back, 1e-4), "{:?} vs {:?}", q, back);
        }
    }

    #[test]
    fn test_rotate_vector_matches_matrix() {
        let v = Vec3::new(0.3, -2.0, 1.5);
        for q in sample_rotations() {
            let by_matrix = mat4_transform_direction(&q.to_rotation_matrix(), v);
            assert!(q.rotate_vector(v).abs_diff_eq(&by_matrix, 1e-4));
        }
    }

    #[test]
    fn test_composition_order() {
        // rotate by b first (X -> Y about Z), then a (Y -> Z about X)
        let a = Quaternion::from_axis_angle(Vec3::X, 90.0).unwrap();
        let b = Quaternion::from_axis_angle(Vec3::Z, 90.0).unwrap();
        let v = (a * b).rotate_vector(Vec3::X);
        assert!(v.abs_diff_eq(&Vec3::Z, EPS));
    }

    #[test]
    fn test_look_rotation() {
        let forward = Vec3::new(1.0, 0.0, 1.0);
        let q = Quaternion::look_rotation(forward, Vec3::Y).unwrap();
        assert!(q.rotate_vector(Vec3::Z).abs_diff_eq(&forward.normalized(), EPS));
        assert!(q.rotate_vector(Vec3::Y).abs_diff_eq(&Vec3::Y, EPS));

        assert!(Quaternion::look_rotation(Vec3::Y, Vec3::Y).is_err());
        assert!(Quaternion::look_rotation(Vec3::ZERO, Vec3::Y).is_err());
    }

    #[test]
    fn test_slerp_halfway() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(Vec3::Y, 90.0).unwrap();
        let mid = a.slerp(&b, 0.5);
        let expected = Quaternion::from_axis_angle(Vec3::Y, 45.0).unwrap();
        assert!(mid.same_rotation(&expected, 1e-5));
    }
}
