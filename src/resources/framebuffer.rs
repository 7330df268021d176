//! Render-target aggregates.
//!
//! A framebuffer owns zero or one depth renderbuffer and an append-only,
//! ordered list of color textures. Width, height and sample count are fixed
//! at construction and shared by every attachment. The "default" instance
//! owns no device object and stands for the window's own surface.

use crate::backend::types::*;
use crate::context::Context;
use crate::error::Result;
use crate::handle::GlObject;
use crate::resources::texture::{Texture, TextureOptions};

/// A render-target aggregate.
pub struct Framebuffer {
    ctx: Context,
    /// `None` for the window surface.
    gl: Option<GlObject>,
    depth: Option<GlObject>,
    color_attachments: Vec<Texture>,
    sample_count: u32,
    width: u32,
    height: u32,
}

impl Framebuffer {
    /// Create an empty render-target container.
    pub fn new(ctx: &Context, width: u32, height: u32, sample_count: u32) -> Result<Self> {
        let gl = GlObject::create(ctx, ObjectKind::Framebuffer)?;
        Ok(Self {
            ctx: ctx.clone(),
            gl: Some(gl),
            depth: None,
            color_attachments: Vec::new(),
            sample_count: sample_count.max(1),
            width,
            height,
        })
    }

    /// The window's own surface. Binding and clearing operate on the
    /// implicit system framebuffer; attachments cannot be added.
    pub fn default_surface(ctx: &Context, width: u32, height: u32) -> Self {
        Self {
            ctx: ctx.clone(),
            gl: None,
            depth: None,
            color_attachments: Vec::new(),
            sample_count: 1,
            width,
            height,
        }
    }

    /// Allocate and attach one depth renderbuffer sized to this
    /// framebuffer, multisampled to match it.
    pub fn set_depth_attachment(&mut self, format: DepthFormat) -> Result<&mut Self> {
        let gl = self.gl.as_ref().expect("depth attachment on the default surface");
        let depth = GlObject::create(&self.ctx, ObjectKind::Renderbuffer)?;
        let backend = self.ctx.backend();
        backend.bind_renderbuffer(depth.id());
        backend.renderbuffer_storage(format, self.sample_count, self.width, self.height);
        backend.bind_framebuffer(FramebufferTarget::ReadDraw, gl.id());
        backend.framebuffer_renderbuffer_depth(depth.id());
        self.depth = Some(depth);
        Ok(self)
    }

    /// Allocate one more color texture and attach it at the next sequential
    /// index. Attachment order is append-only and determines draw-buffer
    /// binding order.
    ///
    /// Once a depth attachment exists, fixed sample locations and automatic
    /// alignment are forced so multisampled attachments stay consistent.
    pub fn add_color_attachment(
        &mut self,
        format: InternalFormat,
        target: TextureTarget,
        mut options: TextureOptions,
    ) -> Result<&mut Self> {
        let gl = self.gl.as_ref().expect("color attachment on the default surface");
        if self.depth.is_some() {
            options |= TextureOptions::FIXED_SAMPLE_LOCATIONS | TextureOptions::AUTOMATIC_ALIGNMENT;
        }
        let texture = match target {
            TextureTarget::CubeMap => {
                Texture::make_cubemap(&self.ctx, format, self.width, self.height, 1, options)?
            }
            _ => Texture::make_2d(
                &self.ctx,
                format,
                self.width,
                self.height,
                1,
                self.sample_count,
                None,
                options,
            )?,
        };
        let index = self.color_attachments.len() as u32;
        let backend = self.ctx.backend();
        backend.bind_framebuffer(FramebufferTarget::ReadDraw, gl.id());
        backend.framebuffer_texture(index, texture.target(), texture.id(), 0);
        self.color_attachments.push(texture);
        Ok(self)
    }

    /// Bind for both reading and drawing.
    pub fn bind(&self) {
        self.ctx
            .backend()
            .bind_framebuffer(FramebufferTarget::ReadDraw, self.id());
    }

    /// Bind as the read target and select one color attachment as the
    /// readback/blit source.
    pub fn bind_read(&self, index: u32) {
        let backend = self.ctx.backend();
        backend.bind_framebuffer(FramebufferTarget::Read, self.id());
        if self.gl.is_some() {
            backend.read_buffer(index);
        }
    }

    /// Bind as the draw target with exactly one attachment active. Useful
    /// for clearing or rendering a single plane of a multi-target
    /// framebuffer, e.g. an object-ID pass beside color.
    pub fn bind_draw_single(&self, index: u32) {
        let backend = self.ctx.backend();
        backend.bind_framebuffer(FramebufferTarget::Draw, self.id());
        if self.gl.is_some() {
            assert!(
                (index as usize) < self.color_attachments.len(),
                "draw bind of missing attachment {index}"
            );
            backend.draw_buffers(&[index]);
        }
    }

    /// Bind as the draw target with every attachment active, in append
    /// order.
    pub fn bind_draw_all(&self) {
        let backend = self.ctx.backend();
        backend.bind_framebuffer(FramebufferTarget::Draw, self.id());
        if self.gl.is_some() {
            assert!(
                !self.color_attachments.is_empty(),
                "draw bind of framebuffer with no attachments"
            );
            let indices: Vec<u32> = (0..self.color_attachments.len() as u32).collect();
            backend.draw_buffers(&indices);
        }
    }

    /// Clear color and/or depth planes of every active attachment.
    pub fn clear(&self, rgba: [f32; 4], mask: ClearMask) {
        self.bind_draw_all();
        let backend = self.ctx.backend();
        backend.clear_color(rgba);
        backend.clear(mask);
    }

    /// Typed clear of one color attachment. The value variant must match
    /// the attachment's component type.
    pub fn clear_color_attachment(&self, index: u32, value: ClearValue) {
        let attachment = &self.color_attachments[index as usize];
        let scalar = attachment.pixel_info().scalar;
        let matches = matches!(
            (&value, scalar),
            (ClearValue::F32(_), ScalarType::U8 | ScalarType::F16 | ScalarType::F32)
                | (ClearValue::I32(_), ScalarType::I8 | ScalarType::I16 | ScalarType::I32)
                | (ClearValue::U32(_), ScalarType::U8 | ScalarType::U16 | ScalarType::U32)
        );
        assert!(
            matches,
            "clear value {value:?} does not match attachment scalar {scalar:?}"
        );
        self.bind_draw_single(index);
        self.ctx.backend().clear_color_buffer(0, value);
    }

    /// Clear the depth plane.
    pub fn clear_depth(&self, value: f32) {
        self.ctx
            .backend()
            .bind_framebuffer(FramebufferTarget::Draw, self.id());
        self.ctx.backend().clear_depth_buffer(value);
    }

    /// Copy a pixel region of one attachment into host memory, using that
    /// attachment's own format and component type. Stalls until pending
    /// work on the region completes.
    pub fn readback(&self, dst: &mut [u8], x: i32, y: i32, width: u32, height: u32, index: u32) {
        let attachment = &self.color_attachments[index as usize];
        let info = attachment.pixel_info();
        assert!(
            dst.len() >= (width * height) as usize * info.bytes_per_pixel(),
            "readback destination smaller than {}x{} region",
            width,
            height
        );
        self.bind_read(index);
        self.ctx
            .backend()
            .read_pixels(x, y, width, height, info.format, info.scalar, dst);
    }

    /// Read back attachment `index` in full.
    pub fn readback_full(&self, dst: &mut [u8], index: u32) {
        self.readback(dst, 0, 0, self.width, self.height, index);
    }

    /// Device-side, format-converting full-surface copy into `dst`. This is
    /// the only legal way to resolve a multisampled attachment into a
    /// single-sampled one.
    pub fn blit_to(&self, dst: &Framebuffer, dst_index: u32, filter: BlitFilter, src_index: u32) {
        self.blit_region_to(
            dst,
            [0, 0, dst.width as i32, dst.height as i32],
            dst_index,
            filter,
            [0, 0, self.width as i32, self.height as i32],
            src_index,
        );
    }

    /// Rectangle variant of [`Framebuffer::blit_to`]. Rects are
    /// `[x0, y0, x1, y1]`.
    pub fn blit_region_to(
        &self,
        dst: &Framebuffer,
        dst_rect: [i32; 4],
        dst_index: u32,
        filter: BlitFilter,
        src_rect: [i32; 4],
        src_index: u32,
    ) {
        self.bind_read(src_index);
        dst.bind_draw_single(dst_index);
        self.ctx
            .backend()
            .blit_framebuffer(src_rect, dst_rect, ClearMask::COLOR, filter);
    }

    /// Completeness status as reported by the device.
    pub fn status(&self) -> FramebufferStatus {
        self.bind();
        self.ctx.backend().check_framebuffer_status(FramebufferTarget::ReadDraw)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_attachments(&self) -> &[Texture] {
        &self.color_attachments
    }

    /// Whether this is the window surface instance.
    pub fn is_default_surface(&self) -> bool {
        self.gl.is_none()
    }

    /// Raw identifier; 0 for the window surface.
    pub fn id(&self) -> u32 {
        self.gl.as_ref().map_or(0, |gl| gl.id())
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id())
            .field("size", &(self.width, self.height))
            .field("samples", &self.sample_count)
            .field("color_attachments", &self.color_attachments.len())
            .field("has_depth", &self.depth.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_order_is_sequential() {
        let ctx = Context::headless();
        let mut fb = Framebuffer::new(&ctx, 16, 16, 1).unwrap();
        fb.set_depth_attachment(DepthFormat::Depth32).unwrap();
        fb.add_color_attachment(InternalFormat::Rgba8, TextureTarget::T2d, TextureOptions::default())
            .unwrap();
        fb.add_color_attachment(InternalFormat::R32I, TextureTarget::T2d, TextureOptions::default())
            .unwrap();
        assert_eq!(fb.color_attachments().len(), 2);
        assert_eq!(fb.color_attachments()[1].internal_format(), InternalFormat::R32I);
        assert!(fb.status().is_complete());
    }

    #[test]
    fn test_default_surface_has_no_object() {
        let ctx = Context::headless();
        let fb = Framebuffer::default_surface(&ctx, 640, 480);
        assert!(fb.is_default_surface());
        assert_eq!(fb.id(), 0);
        // Binding and clearing the system surface are valid no-ops headless.
        fb.clear([0.0, 0.0, 0.0, 1.0], ClearMask::COLOR | ClearMask::DEPTH);
    }

    #[test]
    fn test_typed_clear_and_readback() {
        let ctx = Context::headless();
        let mut fb = Framebuffer::new(&ctx, 2, 2, 1).unwrap();
        fb.add_color_attachment(InternalFormat::R32I, TextureTarget::T2d, TextureOptions::default())
            .unwrap();
        fb.clear_color_attachment(0, ClearValue::I32([7, 0, 0, 0]));
        let mut out = [0u8; 2 * 2 * 4];
        fb.readback_full(&mut out, 0);
        let ids: Vec<i32> = out
            .chunks_exact(4)
            .map(|chunk| i32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(ids, vec![7, 7, 7, 7]);
    }

    #[test]
    #[should_panic(expected = "does not match attachment scalar")]
    fn test_mismatched_clear_value_aborts() {
        let ctx = Context::headless();
        let mut fb = Framebuffer::new(&ctx, 2, 2, 1).unwrap();
        fb.add_color_attachment(InternalFormat::R32I, TextureTarget::T2d, TextureOptions::default())
            .unwrap();
        fb.clear_color_attachment(0, ClearValue::F32([0.0; 4]));
    }
}
