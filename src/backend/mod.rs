//! Device backends.
//!
//! [`GlBackend`] is the raw call surface (see [`traits`]); [`Gl46Backend`]
//! drives a real driver through `glow`, [`HeadlessBackend`] emulates the
//! object model on the CPU for tests and driver-free development.

pub mod gl46;
pub mod headless;
pub mod traits;
pub mod types;

pub use gl46::Gl46Backend;
pub use headless::{AttribRecord, HeadlessBackend, TexParamState};
pub use traits::GlBackend;
