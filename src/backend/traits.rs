//! The device API boundary.
//!
//! [`GlBackend`] mirrors the stateful, handle-based call surface of the
//! underlying graphics API: objects are named by plain `u32` identifiers
//! (0 is the null object), state-changing calls act on whatever object is
//! bound to the relevant target, and correctness depends on binding the
//! right target before each acting call. The public wrappers own that
//! bind-then-act choreography; callers never see binding state.
//!
//! Two implementations exist: [`Gl46Backend`](super::Gl46Backend) issues
//! real driver calls, [`HeadlessBackend`](super::HeadlessBackend) emulates
//! enough of the model on the CPU to run the test suite without a GPU.

use crate::backend::types::*;
use crate::error::Result;
use crate::resources::UniformValue;

/// Raw device call surface.
///
/// Identifier conventions: `0` is the null object everywhere. Binding the
/// null object is legal (it unbinds); acting through a null binding is a
/// caller error that real drivers report through the error queue and the
/// headless backend reports by panicking.
pub trait GlBackend {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    // Object lifecycle

    /// Create one device object of the given kind. Returns 0 on failure.
    fn create_object(&self, kind: ObjectKind) -> u32;

    /// Destroy one device object. Passing an identifier that is not live is
    /// a caller error.
    fn delete_object(&self, kind: ObjectKind, id: u32);

    /// Pop one pending device error, if any.
    fn poll_error(&self) -> Option<DeviceError>;

    // Buffers

    fn bind_buffer(&self, target: BufferTarget, id: u32);

    /// Allocate storage for the buffer bound to `target`, optionally seeded
    /// with `data`.
    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, usage: BufferUsage);

    /// Overwrite a sub-range of the buffer bound to `target`.
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);

    /// Device-side copy between the buffers bound to the copy-read and
    /// copy-write targets. Never stages through host memory.
    fn copy_buffer_sub_data(&self, src_offset: usize, dst_offset: usize, size: usize);

    /// Bind the buffer to an indexed binding point (uniform/storage).
    fn bind_buffer_base(&self, target: BufferTarget, index: u32, id: u32);

    // Vertex arrays

    fn bind_vertex_array(&self, id: u32);

    /// Configure one attribute of the bound vertex array, sourcing from the
    /// buffer currently bound to the vertex target. Integer scalar types
    /// configure integer (non-converted) inputs.
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        channels: u32,
        scalar: ScalarType,
        normalized: bool,
        stride: u32,
        offset: u32,
    );

    fn enable_vertex_attrib(&self, index: u32);

    // Textures

    fn bind_texture(&self, target: TextureTarget, id: u32);

    fn active_texture(&self, slot: u32);

    /// Allocate immutable storage for the texture bound to `desc.target`.
    fn tex_storage(&self, desc: &TextureStorage) -> Result<()>;

    /// Upload one layer/face worth of pixels to the bound texture.
    fn tex_sub_image(&self, upload: &TextureUpload, data: &[u8]);

    /// Set one sampling-state parameter on the bound texture.
    fn tex_parameter(&self, target: TextureTarget, parameter: TexParameter);

    fn pixel_store(&self, parameter: PixelStore);

    fn generate_mipmap(&self, target: TextureTarget);

    // Renderbuffers

    fn bind_renderbuffer(&self, id: u32);

    /// Allocate depth/stencil storage for the bound renderbuffer,
    /// multisampled when `sample_count > 1`.
    fn renderbuffer_storage(&self, format: DepthFormat, sample_count: u32, width: u32, height: u32);

    // Framebuffers

    fn bind_framebuffer(&self, target: FramebufferTarget, id: u32);

    /// Attach the renderbuffer as the depth attachment of the bound
    /// framebuffer.
    fn framebuffer_renderbuffer_depth(&self, renderbuffer: u32);

    /// Attach a texture as color attachment `color_index` of the bound
    /// framebuffer.
    fn framebuffer_texture(&self, color_index: u32, tex_target: TextureTarget, texture: u32, level: u32);

    /// Select the color attachments subsequent draws write, in order.
    fn draw_buffers(&self, color_indices: &[u32]);

    /// Select the color attachment subsequent readbacks and blits source.
    fn read_buffer(&self, color_index: u32);

    fn check_framebuffer_status(&self, target: FramebufferTarget) -> FramebufferStatus;

    fn clear_color(&self, rgba: [f32; 4]);

    /// Clear the selected planes of the draw-bound framebuffer.
    fn clear(&self, mask: ClearMask);

    /// Typed clear of a single color draw buffer.
    fn clear_color_buffer(&self, draw_buffer: u32, value: ClearValue);

    fn clear_depth_buffer(&self, value: f32);

    /// Synchronous readback from the read-bound framebuffer's selected
    /// attachment. Stalls until prior commands touching the region finish.
    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: PixelFormat,
        scalar: ScalarType,
        dst: &mut [u8],
    );

    /// Rectangle copy (with format conversion and multisample resolve) from
    /// the read-bound to the draw-bound framebuffer. Rects are
    /// `[x0, y0, x1, y1]`.
    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], mask: ClearMask, filter: BlitFilter);

    // Shaders and programs

    /// Hand the source to the device and compile. Returns the compile
    /// status; diagnostics are fetched separately.
    fn compile_shader(&self, shader: u32, source: &str) -> bool;

    fn shader_info_log(&self, shader: u32) -> String;

    fn attach_shader(&self, program: u32, shader: u32);

    fn detach_shader(&self, program: u32, shader: u32);

    /// Link the program. Returns the link status.
    fn link_program(&self, program: u32) -> bool;

    fn program_info_log(&self, program: u32) -> String;

    fn use_program(&self, id: u32);

    /// Resolve `name` on the program (no caching anywhere) and set the
    /// uniform on the currently used program. Returns whether the name
    /// resolved to a live location.
    fn set_uniform(&self, program: u32, name: &str, value: &UniformValue) -> bool;

    // Queries

    fn begin_query(&self, target: QueryTarget, id: u32);

    fn end_query(&self, target: QueryTarget);

    /// Non-blocking result poll. `None` while the result is not available.
    fn query_result(&self, id: u32) -> Option<u64>;

    // Draws and fixed-function state

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32);

    /// Indexed draw from the bound vertex array and index buffer.
    fn draw_elements(&self, mode: PrimitiveMode, count: i32, index_type: IndexType, offset: usize);

    /// One dispatch covering `draw_count` tightly packed
    /// [`DrawElementsIndirectCommand`] records in the bound indirect buffer.
    fn multi_draw_elements_indirect(&self, mode: PrimitiveMode, index_type: IndexType, draw_count: u32);

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32);

    fn enable(&self, capability: Capability);

    fn disable(&self, capability: Capability);
}
