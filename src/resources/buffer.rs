//! Linear device memory.

use bytemuck::Pod;

use crate::backend::types::{BufferTarget, BufferUsage, ObjectKind};
use crate::context::Context;
use crate::error::Result;
use crate::handle::GlObject;

/// A GPU buffer: one owned device object, a logical byte size and a default
/// binding target.
///
/// Contents are mutated through sub-range uploads or device-side copies;
/// the size is fixed at creation.
pub struct Buffer {
    gl: GlObject,
    target: BufferTarget,
    size: usize,
}

impl Buffer {
    /// Allocate `size` bytes of device storage, optionally seeded with
    /// `data`.
    pub fn new(
        ctx: &Context,
        target: BufferTarget,
        size: usize,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> Result<Self> {
        if let Some(data) = data {
            assert!(
                data.len() <= size,
                "seed data ({} bytes) exceeds buffer size ({size} bytes)",
                data.len()
            );
        }
        let gl = GlObject::create(ctx, ObjectKind::Buffer)?;
        let backend = ctx.backend();
        backend.bind_buffer(target, gl.id());
        backend.buffer_data(target, size, data, usage);
        Ok(Self { gl, target, size })
    }

    /// Allocate a buffer sized and seeded from a typed slice.
    pub fn from_slice<T: Pod>(
        ctx: &Context,
        target: BufferTarget,
        values: &[T],
        usage: BufferUsage,
    ) -> Result<Self> {
        let bytes = bytemuck::cast_slice(values);
        Self::new(ctx, target, bytes.len(), Some(bytes), usage)
    }

    /// Overwrite `[offset, offset + data.len())` with `data`.
    ///
    /// The range must lie within the buffer; violating it is an API-level
    /// undefined-behavior condition, so it aborts here instead.
    pub fn upload(&self, data: &[u8], offset: usize) {
        assert!(
            offset + data.len() <= self.size,
            "upload range [{}, {}) outside buffer of size {}",
            offset,
            offset + data.len(),
            self.size
        );
        let backend = self.gl.context().backend();
        backend.bind_buffer(self.target, self.gl.id());
        backend.buffer_sub_data(self.target, offset, data);
    }

    /// Overwrite from a typed slice.
    pub fn upload_slice<T: Pod>(&self, values: &[T], offset: usize) {
        self.upload(bytemuck::cast_slice(values), offset);
    }

    /// Device-side copy of `size` bytes into `dst`, never staging through
    /// host memory.
    pub fn copy_to(&self, dst: &Buffer, dst_offset: usize, src_offset: usize, size: usize) {
        assert!(
            src_offset + size <= self.size,
            "copy source range outside buffer of size {}",
            self.size
        );
        assert!(
            dst_offset + size <= dst.size,
            "copy destination range outside buffer of size {}",
            dst.size
        );
        let backend = self.gl.context().backend();
        backend.bind_buffer(BufferTarget::CopyRead, self.gl.id());
        backend.bind_buffer(BufferTarget::CopyWrite, dst.gl.id());
        backend.copy_buffer_sub_data(src_offset, dst_offset, size);
    }

    /// Copy this whole buffer into `dst` at `dst_offset`.
    pub fn copy_all_to(&self, dst: &Buffer, dst_offset: usize) {
        self.copy_to(dst, dst_offset, 0, self.size);
    }

    /// Bind to the buffer's own target.
    pub fn bind(&self) {
        self.gl.context().backend().bind_buffer(self.target, self.gl.id());
    }

    /// Bind to an arbitrary target.
    pub fn bind_as(&self, target: BufferTarget) {
        self.gl.context().backend().bind_buffer(target, self.gl.id());
    }

    /// Bind as a shader-storage region at `index`. Used for externally
    /// managed per-instance data consumed by multi-draw shaders.
    pub fn bind_as_storage(&self, index: u32) {
        self.gl
            .context()
            .backend()
            .bind_buffer_base(BufferTarget::ShaderStorage, index, self.gl.id());
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn id(&self) -> u32 {
        self.gl.id()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.gl.id())
            .field("target", &self.target)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_data() {
        let ctx = Context::headless();
        let buffer =
            Buffer::from_slice(&ctx, BufferTarget::Vertex, &[1.0f32, 2.0, 3.0], BufferUsage::StaticDraw)
                .unwrap();
        assert_eq!(buffer.size(), 12);
        assert_eq!(buffer.target(), BufferTarget::Vertex);
    }

    #[test]
    fn test_partial_upload() {
        let ctx = Context::headless();
        let buffer = Buffer::new(&ctx, BufferTarget::Vertex, 8, None, BufferUsage::DynamicDraw).unwrap();
        buffer.upload(&[7, 7], 6);
    }

    #[test]
    #[should_panic(expected = "outside buffer of size")]
    fn test_out_of_range_upload_aborts() {
        let ctx = Context::headless();
        let buffer = Buffer::new(&ctx, BufferTarget::Vertex, 8, None, BufferUsage::StaticDraw).unwrap();
        buffer.upload(&[0u8; 4], 6);
    }

    #[test]
    #[should_panic(expected = "copy destination range")]
    fn test_out_of_range_copy_aborts() {
        let ctx = Context::headless();
        let a = Buffer::new(&ctx, BufferTarget::Vertex, 8, None, BufferUsage::StaticDraw).unwrap();
        let b = Buffer::new(&ctx, BufferTarget::Vertex, 4, None, BufferUsage::StaticDraw).unwrap();
        a.copy_to(&b, 0, 0, 8);
    }
}
