//! Typed per-frame behaviors and one-time setup steps
//!
//! Scene documents attach behaviors by kind, each with its own parameters:
//!
//! ```toml
//! [[meshes.windmill.behaviors]]
//! kind = "rotate_over_time"
//! axis = [0.0, 0.0, 1.0]
//! degrees_per_second = 45.0
//! ```

use serde::{Deserialize, Serialize};
use umbra_core::{Transform, Vec3};

fn default_axis() -> Vec3 {
    Vec3::Y
}
fn default_degrees_per_second() -> f32 {
    10.0
}

/// A per-frame update applied to an entity's transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    /// Spin about a local axis
    RotateOverTime {
        #[serde(default = "default_axis")]
        axis: Vec3,
        #[serde(default = "default_degrees_per_second")]
        degrees_per_second: f32,
    },
    /// Sinusoidal vertical motion around the rest position
    Bob { amplitude: f32, frequency: f32 },
    /// Circle `center` in the XZ plane
    Orbit {
        center: Vec3,
        radius: f32,
        #[serde(default = "default_degrees_per_second")]
        degrees_per_second: f32,
    },
    /// Keep local +Z pointed at the camera (billboard icons)
    FaceCamera,
}

/// Inputs a behavior may read during an update
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext {
    /// Seconds since the previous frame
    pub dt: f32,
    /// Seconds since the scene started
    pub time: f32,
    pub camera_position: Vec3,
    /// Transform the entity was loaded with
    pub rest: Transform,
}

impl Behavior {
    /// Advance `transform` by one frame
    pub fn apply(&self, transform: &mut Transform, ctx: &BehaviorContext) {
        match self {
            Behavior::RotateOverTime {
                axis,
                degrees_per_second,
            } => {
                if let Err(e) = transform.rotate_axis(*axis, degrees_per_second * ctx.dt) {
                    log::warn!("rotate_over_time skipped: {}", e);
                }
            }
            Behavior::Bob {
                amplitude,
                frequency,
            } => {
                let phase = std::f32::consts::TAU * frequency * ctx.time;
                transform.position.y = ctx.rest.position.y + amplitude * phase.sin();
            }
            Behavior::Orbit {
                center,
                radius,
                degrees_per_second,
            } => {
                let angle = (degrees_per_second * ctx.time).to_radians();
                transform.position = Vec3::new(
                    center.x + angle.cos() * radius,
                    transform.position.y,
                    center.z + angle.sin() * radius,
                );
            }
            Behavior::FaceCamera => {
                // Camera directly above or below: keep the previous orientation
                if let Err(e) = transform.look_at_self(ctx.camera_position, Vec3::Y) {
                    log::debug!("face_camera skipped: {}", e);
                }
            }
        }
    }
}

/// Geometry edits run once after a mesh is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SetupStep {
    RecalculateNormals,
    /// Translate vertices so the bounds are centered on the origin
    CenterPivot,
}
