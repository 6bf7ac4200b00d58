//! Umbra Viewer - interactive window for Umbra scenes
//!
//! Provides the `ViewerApp` application handler plus the input, clock and
//! camera controller pieces it is built from.

mod app;
pub mod clock;
pub mod controller;
pub mod input;

pub use app::{ViewerApp, ViewerOptions};
pub use clock::FrameClock;
pub use controller::FreeLookController;
pub use input::InputState;
