//! Directional sun light and its shadow projection

use crate::camera::{look_at, orthographic};
use umbra_core::matrix::{mat4_mul, Mat4, IDENTITY};
use umbra_core::{Color, Vec3};
use umbra_scene::LightDef;

/// A directional light modeled as a point far away looking at the origin.
///
/// Only the direction of `position` matters for lighting. The shadow
/// frustum is a fixed `[-size, size]` square orthographic box.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Half-extent of the orthographic shadow box
    pub size: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 10.0, 0.0),
            color: Color::WHITE,
            intensity: 1.0,
            size: 15.0,
            near: 0.1,
            far: 30.0,
        }
    }
}

impl DirectionalLight {
    pub fn from_def(def: &LightDef) -> Self {
        Self {
            position: def.position,
            color: Color::from(def.color),
            intensity: def.intensity,
            size: def.size,
            near: def.near,
            far: def.far,
        }
    }

    /// Unit vector from the light towards the scene
    pub fn direction(&self) -> Vec3 {
        (-self.position).try_normalized().unwrap_or(-Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        orthographic(
            -self.size, self.size, -self.size, self.size, self.near, self.far,
        )
    }

    /// Look from the light position at the world origin with +Y up, or +Z up
    /// when the light sits directly overhead.
    pub fn view_matrix(&self) -> Mat4 {
        let eye = if self.position.length_squared() > 1e-12 {
            self.position
        } else {
            Vec3::Y
        };
        look_at(eye, Vec3::ZERO, Vec3::Y)
            .or_else(|_| look_at(eye, Vec3::ZERO, Vec3::Z))
            .unwrap_or(IDENTITY)
    }

    /// `projection · view`, OpenGL depth convention
    pub fn light_space_matrix(&self) -> Mat4 {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }
}

/// Moves the sun along a circle above the scene
#[derive(Debug, Clone)]
pub struct DayNightCycle {
    /// Current angle in radians
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    /// Radians per second of automatic advance; zero means manual only
    pub speed: f32,
    /// Set once the angle has changed; until then the light keeps its
    /// declared position
    moved: bool,
}

impl Default for DayNightCycle {
    fn default() -> Self {
        Self {
            angle: 0.0,
            radius: 5.0,
            height: 10.0,
            speed: 0.0,
            moved: false,
        }
    }
}

impl DayNightCycle {
    pub fn from_def(def: &LightDef) -> Self {
        Self {
            angle: def.position.z.atan2(def.position.x),
            radius: def
                .orbit_radius
                .unwrap_or_else(|| def.position.x.hypot(def.position.z)),
            height: def.position.y,
            speed: def.cycle_speed,
            moved: false,
        }
    }

    /// Position on the orbit for the current angle
    pub fn position(&self) -> Vec3 {
        let (s, c) = self.angle.sin_cos();
        Vec3::new(c * self.radius, self.height, s * self.radius)
    }

    /// Nudge the cycle forwards (positive) or backwards
    pub fn step(&mut self, radians: f32) {
        if radians != 0.0 {
            self.angle = (self.angle + radians).rem_euclid(std::f32::consts::TAU);
            self.moved = true;
        }
    }

    /// Advance by `speed * dt` and, once the cycle has turned, move the light
    pub fn update(&mut self, dt: f32, light: &mut DirectionalLight) {
        if self.speed != 0.0 {
            self.step(self.speed * dt);
        }
        if self.moved {
            light.position = self.position();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::matrix::mat4_transform_point;

    #[test]
    fn test_direction_points_at_origin() {
        let light = DirectionalLight::default();
        let expected = Vec3::new(-5.0, -10.0, 0.0).normalized();
        assert!(light.direction().abs_diff_eq(&expected, 1e-6));
    }

    #[test]
    fn test_origin_projects_to_center() {
        let light = DirectionalLight::default();
        let ndc = mat4_transform_point(&light.light_space_matrix(), Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_closer_points_have_smaller_depth() {
        let light = DirectionalLight::default();
        let m = light.light_space_matrix();
        let toward_light = light.position.normalized();
        let near = mat4_transform_point(&m, toward_light * 2.0);
        let far = mat4_transform_point(&m, -toward_light * 2.0);
        assert!(near.z < far.z);
    }

    #[test]
    fn test_overhead_light_has_valid_view() {
        let light = DirectionalLight {
            position: Vec3::new(0.0, 10.0, 0.0),
            ..Default::default()
        };
        let m = light.light_space_matrix();
        assert!(m.iter().flatten().all(|v| v.is_finite()));
        let ndc = mat4_transform_point(&m, Vec3::new(0.0, 0.0, 0.0));
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }

    #[test]
    fn test_day_night_cycle_orbits() {
        let mut cycle = DayNightCycle::default();
        let mut light = DirectionalLight::default();
        cycle.update(0.0, &mut light);
        assert!(light.position.abs_diff_eq(&Vec3::new(5.0, 10.0, 0.0), 1e-5));

        cycle.step(std::f32::consts::FRAC_PI_2);
        cycle.update(0.0, &mut light);
        assert!(light.position.abs_diff_eq(&Vec3::new(0.0, 10.0, 5.0), 1e-5));

        cycle.step(-std::f32::consts::PI);
        assert!(cycle.angle >= 0.0);
        assert!(cycle.position().abs_diff_eq(&Vec3::new(0.0, 10.0, -5.0), 1e-5));
    }

    #[test]
    fn test_idle_cycle_keeps_declared_position() {
        let def = LightDef {
            position: Vec3::new(10.0, 20.0, 10.0),
            ..Default::default()
        };
        let mut light = DirectionalLight::from_def(&def);
        let mut cycle = DayNightCycle::from_def(&def);
        let before = light.light_space_matrix();
        for _ in 0..3 {
            cycle.update(0.016, &mut light);
        }
        assert_eq!(light.position, def.position);
        assert_eq!(light.light_space_matrix(), before);
    }

    #[test]
    fn test_cycle_orbits_at_declared_distance() {
        let def = LightDef {
            position: Vec3::new(10.0, 20.0, 10.0),
            ..Default::default()
        };
        let mut light = DirectionalLight::from_def(&def);
        let mut cycle = DayNightCycle::from_def(&def);

        // A full turn lands back on the declared position
        cycle.step(std::f32::consts::TAU);
        cycle.update(0.0, &mut light);
        assert!(light.position.abs_diff_eq(&def.position, 1e-3), "{:?}", light.position);

        cycle.step(std::f32::consts::FRAC_PI_2);
        cycle.update(0.0, &mut light);
        let radius = light.position.x.hypot(light.position.z);
        assert!((radius - 200f32.sqrt()).abs() < 1e-3);
        assert_eq!(light.position.y, 20.0);
    }

    #[test]
    fn test_explicit_orbit_radius_wins() {
        let def = LightDef {
            position: Vec3::new(10.0, 20.0, 0.0),
            orbit_radius: Some(3.0),
            cycle_speed: 1.0,
            ..Default::default()
        };
        let mut light = DirectionalLight::from_def(&def);
        let mut cycle = DayNightCycle::from_def(&def);
        cycle.update(0.5, &mut light);
        let radius = light.position.x.hypot(light.position.z);
        assert!((radius - 3.0).abs() < 1e-4);
    }
}
