//! # glkit
//!
//! A thin resource-ownership and mesh-batching layer over the OpenGL 4.x
//! object model.
//!
//! The crate wraps the device's handle-based objects (buffers, textures,
//! framebuffers, programs, meshes, queries) in move-only owners with
//! exactly-once destruction, and adds one algorithmic core:
//! [`Mesh::combine`](mesh::Mesh::combine), which merges independently
//! built meshes into one device-resident vertex/index buffer pair drawn
//! with a single multi-draw-indirect dispatch.
//!
//! The raw device API sits behind the [`backend::GlBackend`] trait:
//! [`backend::Gl46Backend`] drives a real driver, while
//! [`backend::HeadlessBackend`] emulates the object model on the CPU so
//! everything above it runs (and is tested) without a GPU.
//!
//! ## Example
//!
//! ```
//! use glkit::prelude::*;
//!
//! let ctx = Context::headless();
//! let torus = glkit::asset_io::make_torus(&ctx, 1.0, 0.3, 16).unwrap();
//! let sphere = glkit::asset_io::make_sphere(&ctx, 16).unwrap();
//!
//! let mut combined = Mesh::combine(&[&torus.mesh, &sphere.mesh]).unwrap();
//! combined.set_instance_counts(&[4, 1]).unwrap();
//! combined.draw();
//! ```

pub mod asset_io;
pub mod backend;
pub mod context;
pub mod error;
pub mod handle;
pub mod mesh;
pub mod resources;
pub mod scene;
pub mod viewport;

pub use backend::types;
pub use context::Context;
pub use error::{GraphicsError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for consumers.
pub mod prelude {
    pub use crate::backend::types::*;
    pub use crate::context::Context;
    pub use crate::error::GraphicsError;
    pub use crate::mesh::{Mesh, SubMesh, VertexAttribute};
    pub use crate::resources::{
        Buffer, Framebuffer, Program, Query, Shader, Texture, TextureOptions, UniformValue,
    };
    pub use crate::scene::{Camera, DragMode, OrbitController, WheelAction};
    pub use crate::viewport::{Viewport, Viewport3D};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
