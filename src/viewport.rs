//! Per-window render targets.
//!
//! A [`Viewport`] owns a (possibly multisampled) framebuffer and, when
//! multisampling is active, a second single-sampled resolve framebuffer
//! with the same attachment list. Both are reallocated lazily, only when
//! the requested dimensions or sample count actually change.
//! [`Viewport::final_framebuffer`] is the only framebuffer ever handed to
//! presentation or readback.

use crate::backend::types::{BlitFilter, DepthFormat, InternalFormat, TextureTarget};
use crate::context::Context;
use crate::error::Result;
use crate::resources::{Framebuffer, TextureOptions};
use crate::scene::{Camera, OrbitController};

/// A named render target with optional multisampling and resolve.
pub struct Viewport {
    ctx: Context,
    name: String,
    framebuffer: Framebuffer,
    resolve_framebuffer: Option<Framebuffer>,
    sample_count: u32,
    additional_attachments: Vec<InternalFormat>,
}

impl Viewport {
    /// Create a 1x1 single-sampled viewport; callers resize it to the real
    /// surface once known. Every framebuffer gets a depth attachment, an
    /// RGBA8 color attachment and one attachment per `additional` format.
    pub fn new(ctx: &Context, name: impl Into<String>, additional: &[InternalFormat]) -> Result<Self> {
        let additional = additional.to_vec();
        let framebuffer = Self::build_framebuffer(ctx, 1, 1, 1, &additional)?;
        Ok(Self {
            ctx: ctx.clone(),
            name: name.into(),
            framebuffer,
            resolve_framebuffer: None,
            sample_count: 1,
            additional_attachments: additional,
        })
    }

    fn build_framebuffer(
        ctx: &Context,
        width: u32,
        height: u32,
        sample_count: u32,
        additional: &[InternalFormat],
    ) -> Result<Framebuffer> {
        let mut framebuffer = Framebuffer::new(ctx, width, height, sample_count)?;
        framebuffer.set_depth_attachment(DepthFormat::Depth32)?;
        framebuffer.add_color_attachment(
            InternalFormat::Rgba8,
            TextureTarget::T2d,
            TextureOptions::default(),
        )?;
        for format in additional {
            framebuffer.add_color_attachment(*format, TextureTarget::T2d, TextureOptions::default())?;
        }
        Ok(framebuffer)
    }

    /// Reallocate render targets iff `width`/`height`/`sample_count`
    /// changed. Requests are clamped to at least 1.
    pub fn resize(&mut self, width: u32, height: u32, sample_count: u32) -> Result<()> {
        let width = width.max(1);
        let height = height.max(1);
        let sample_count = sample_count.max(1);

        if self.framebuffer.width() == width
            && self.framebuffer.height() == height
            && self.framebuffer.sample_count() == sample_count
        {
            return Ok(());
        }

        log::debug!(
            "viewport '{}' resized to {width}x{height}x{sample_count}",
            self.name
        );
        self.sample_count = sample_count;
        self.framebuffer =
            Self::build_framebuffer(&self.ctx, width, height, sample_count, &self.additional_attachments)?;
        self.resolve_framebuffer = if sample_count > 1 {
            Some(Self::build_framebuffer(
                &self.ctx,
                width,
                height,
                1,
                &self.additional_attachments,
            )?)
        } else {
            None
        };
        Ok(())
    }

    /// Per-frame update: adopt the requested size at the current sample
    /// count.
    pub fn update(&mut self, requested_width: u32, requested_height: u32) -> Result<()> {
        self.resize(requested_width, requested_height, self.sample_count)
    }

    /// Resolve every color attachment into the single-sampled framebuffer.
    /// No-op without multisampling.
    pub fn resolve(&self) {
        if let Some(resolve) = &self.resolve_framebuffer {
            for index in 0..self.framebuffer.color_attachments().len() as u32 {
                self.framebuffer.blit_to(resolve, index, BlitFilter::Nearest, index);
            }
        }
    }

    /// The framebuffer shown to the presentation layer or read back from:
    /// the resolve target when multisampling is active, else the primary.
    pub fn final_framebuffer(&self) -> &Framebuffer {
        self.resolve_framebuffer.as_ref().unwrap_or(&self.framebuffer)
    }

    /// The framebuffer rendering happens into.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A viewport with an orbiting perspective camera.
pub struct Viewport3D {
    pub viewport: Viewport,
    pub camera: Camera,
    pub controller: OrbitController,
}

impl Viewport3D {
    pub fn new(ctx: &Context, name: impl Into<String>, additional: &[InternalFormat]) -> Result<Self> {
        Ok(Self {
            viewport: Viewport::new(ctx, name, additional)?,
            camera: Camera::default(),
            controller: OrbitController::default(),
        })
    }

    /// Resize render targets and keep the camera aspect in step.
    pub fn resize(&mut self, width: u32, height: u32, sample_count: u32) -> Result<()> {
        self.viewport.resize(width, height, sample_count)?;
        self.camera
            .set_viewport_size(self.viewport.framebuffer().width() as f32, self.viewport.framebuffer().height() as f32);
        self.camera.update();
        Ok(())
    }

    pub fn final_framebuffer(&self) -> &Framebuffer {
        self.viewport.final_framebuffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sampled_final_is_primary() {
        let ctx = Context::headless();
        let mut viewport = Viewport::new(&ctx, "main", &[]).unwrap();
        viewport.resize(4, 4, 1).unwrap();
        assert_eq!(viewport.final_framebuffer().id(), viewport.framebuffer().id());
        assert_eq!(viewport.final_framebuffer().width(), 4);
    }

    #[test]
    fn test_multisampled_final_is_resolve_target() {
        let ctx = Context::headless();
        let mut viewport = Viewport::new(&ctx, "main", &[]).unwrap();
        viewport.resize(4, 4, 4).unwrap();
        assert_ne!(viewport.final_framebuffer().id(), viewport.framebuffer().id());
        assert_eq!(viewport.framebuffer().sample_count(), 4);
        assert_eq!(viewport.final_framebuffer().sample_count(), 1);
    }

    #[test]
    fn test_resize_is_lazy() {
        let ctx = Context::headless();
        let mut viewport = Viewport::new(&ctx, "main", &[]).unwrap();
        viewport.resize(8, 8, 1).unwrap();
        let id = viewport.framebuffer().id();
        viewport.resize(8, 8, 1).unwrap();
        assert_eq!(viewport.framebuffer().id(), id, "unchanged resize reallocated");
        viewport.resize(16, 8, 1).unwrap();
        assert_ne!(viewport.framebuffer().id(), id);
    }

    #[test]
    fn test_zero_request_clamps() {
        let ctx = Context::headless();
        let mut viewport = Viewport::new(&ctx, "main", &[]).unwrap();
        viewport.update(0, 0).unwrap();
        assert_eq!(viewport.framebuffer().width(), 1);
        assert_eq!(viewport.framebuffer().height(), 1);
    }
}
