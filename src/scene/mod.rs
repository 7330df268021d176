//! Camera and input-driven camera control.

pub mod camera;
pub mod controller;

pub use camera::Camera;
pub use controller::{DragMode, OrbitController, WheelAction};
