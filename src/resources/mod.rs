//! Resource wrappers over device objects.

pub mod buffer;
pub mod framebuffer;
pub mod query;
pub mod shader;
pub mod texture;

pub use buffer::Buffer;
pub use framebuffer::Framebuffer;
pub use query::Query;
pub use shader::{Program, Shader, UniformValue};
pub use texture::{Texture, TextureOptions};
