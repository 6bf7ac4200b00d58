//! Umbra Core - Foundational types for the Umbra renderer
//!
//! This crate provides the math kernel that every other Umbra crate depends on:
//! - `Vec3`, `Color` - Small fixed-size value types
//! - `Quaternion` - Unit-quaternion rotation algebra
//! - `Transform` - Position / rotation / scale with `T · R · S` composition
//! - `Mat4` helpers - Column-major 4x4 matrices (`m[col][row]`)
//! - Error types and Result alias

mod error;
pub mod matrix;
mod quaternion;
mod transform;
mod types;

pub use error::{Result, UmbraError};
pub use matrix::Mat4;
pub use quaternion::Quaternion;
pub use transform::Transform;
pub use types::{Color, Vec3};
