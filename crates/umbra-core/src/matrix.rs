//! 4x4 matrix helpers
//!
//! Matrices are column-major (`m[col][row]`), the layout WGSL expects for
//! `mat4x4<f32>`, so they upload without a transpose. Vectors are columns and
//! products read right to left: `mat4_mul(&a, &b)` applies `b` first.

use crate::types::Vec3;

/// A column-major 4x4 matrix
pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two column-major matrices (`a · b`)
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut result = [[0.0; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            for k in 0..4 {
                result[col][row] += a[k][row] * b[col][k];
            }
        }
    }
    result
}

/// `m · v` for a homogeneous column vector
pub fn mat4_transform_vec4(m: &Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (row, value) in out.iter_mut().enumerate() {
        *value = m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3];
    }
    out
}

/// Transform a point (w = 1) and apply the perspective divide
pub fn mat4_transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    let [x, y, z, w] = mat4_transform_vec4(m, [p.x, p.y, p.z, 1.0]);
    if w.abs() < 1e-12 {
        return Vec3::new(x, y, z);
    }
    Vec3::new(x / w, y / w, z / w)
}

/// Transform a direction (w = 0); translation is ignored
pub fn mat4_transform_direction(m: &Mat4, d: Vec3) -> Vec3 {
    let [x, y, z, _] = mat4_transform_vec4(m, [d.x, d.y, d.z, 0.0]);
    Vec3::new(x, y, z)
}

pub fn mat4_transpose(m: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (col, column) in m.iter().enumerate() {
        for (row, value) in column.iter().enumerate() {
            out[row][col] = *value;
        }
    }
    out
}

pub fn mat4_translation(t: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[3] = [t.x, t.y, t.z, 1.0];
    m
}

pub fn mat4_scale(s: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[0][0] = s.x;
    m[1][1] = s.y;
    m[2][2] = s.z;
    m
}

/// Right-handed rotation about +X by `degrees`
pub fn mat4_rotation_x(degrees: f32) -> Mat4 {
    let (s, c) = degrees.to_radians().sin_cos();
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, c, s, 0.0],
        [0.0, -s, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Right-handed rotation about +Y by `degrees`
pub fn mat4_rotation_y(degrees: f32) -> Mat4 {
    let (s, c) = degrees.to_radians().sin_cos();
    [
        [c, 0.0, -s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Right-handed rotation about +Z by `degrees`
pub fn mat4_rotation_z(degrees: f32) -> Mat4 {
    let (s, c) = degrees.to_radians().sin_cos();
    [
        [c, s, 0.0, 0.0],
        [-s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Inverse by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` for singular matrices.
pub fn mat4_inverse(m: &Mat4) -> Option<Mat4> {
    // Row-major augmented system [M | I]
    let mut a = [[0.0f64; 8]; 4];
    for (row, aug) in a.iter_mut().enumerate() {
        for col in 0..4 {
            aug[col] = m[col][row] as f64;
        }
        aug[4 + row] = 1.0;
    }

    for pivot in 0..4 {
        let best = (pivot..4)
            .max_by(|&i, &j| a[i][pivot].abs().total_cmp(&a[j][pivot].abs()))
            .unwrap_or(pivot);
        if a[best][pivot].abs() < 1e-12 {
            return None;
        }
        a.swap(pivot, best);

        let inv = 1.0 / a[pivot][pivot];
        for value in a[pivot].iter_mut() {
            *value *= inv;
        }

        for row in 0..4 {
            if row == pivot {
                continue;
            }
            let factor = a[row][pivot];
            if factor == 0.0 {
                continue;
            }
            for col in 0..8 {
                a[row][col] -= factor * a[pivot][col];
            }
        }
    }

    let mut out = [[0.0f32; 4]; 4];
    for (row, aug) in a.iter().enumerate() {
        for col in 0..4 {
            out[col][row] = aug[4 + col] as f32;
        }
    }
    Some(out)
}

/// Element-wise comparison within `epsilon`
pub fn mat4_abs_diff_eq(a: &Mat4, b: &Mat4, epsilon: f32) -> bool {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() <= epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_moves_points_not_directions() {
        let m = mat4_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mat4_transform_point(&m, Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mat4_transform_direction(&m, Vec3::X), Vec3::X);
    }

    #[test]
    fn test_multiplication_order() {
        // Scale first, then translate
        let m = mat4_mul(
            &mat4_translation(Vec3::new(10.0, 0.0, 0.0)),
            &mat4_scale(Vec3::splat(2.0)),
        );
        let p = mat4_transform_point(&m, Vec3::new(1.0, 1.0, 1.0));
        assert!(p.abs_diff_eq(&Vec3::new(12.0, 2.0, 2.0), 1e-6));
    }

    #[test]
    fn test_rotation_y_turns_x_toward_negative_z() {
        let m = mat4_rotation_y(90.0);
        let v = mat4_transform_direction(&m, Vec3::X);
        assert!(v.abs_diff_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = mat4_mul(
            &mat4_translation(Vec3::new(3.0, -2.0, 5.0)),
            &mat4_mul(&mat4_rotation_x(30.0), &mat4_scale(Vec3::new(2.0, 3.0, 4.0))),
        );
        let inv = mat4_inverse(&m).unwrap();
        assert!(mat4_abs_diff_eq(&mat4_mul(&m, &inv), &IDENTITY, 1e-5));
        assert!(mat4_abs_diff_eq(&mat4_mul(&inv, &m), &IDENTITY, 1e-5));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        assert!(mat4_inverse(&mat4_scale(Vec3::new(1.0, 0.0, 1.0))).is_none());
    }

    #[test]
    fn test_transpose() {
        let m = mat4_translation(Vec3::new(1.0, 2.0, 3.0));
        let t = mat4_transpose(&m);
        assert_eq!(t[0][3], 1.0);
        assert_eq!(t[1][3], 2.0);
        assert_eq!(t[2][3], 3.0);
        assert_eq!(mat4_transpose(&t), m);
    }
}
