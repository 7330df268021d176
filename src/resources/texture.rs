//! Multi-dimensional device image storage.
//!
//! Dimensions and format are fixed at creation (immutable storage); only
//! contents and sampling state may change afterwards. A texture with more
//! than one sample cannot be sampled by shaders and must be resolved
//! through a framebuffer blit.

use bitflags::bitflags;

use crate::backend::types::*;
use crate::context::Context;
use crate::error::{GraphicsError, Result};
use crate::handle::GlObject;

bitflags! {
    /// Storage-allocation and transfer policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureOptions: u32 {
        /// Relax pixel transfer alignment when rows are not 4-byte aligned.
        const AUTOMATIC_ALIGNMENT = 1 << 1;
        /// Allocate storage for a full mip chain instead of one level.
        const ALLOCATE_MIPMAP = 1 << 2;
        /// Allocate the chain and fill it from level 0 after upload.
        const GENERATE_MIPMAP = (1 << 2) | (1 << 3);
        /// Identical sample positions in every texel (multisampled only).
        const FIXED_SAMPLE_LOCATIONS = 1 << 4;
    }
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions::AUTOMATIC_ALIGNMENT
    }
}

/// A device texture and its fixed shape.
pub struct Texture {
    gl: GlObject,
    target: TextureTarget,
    info: PixelInfo,
    width: u32,
    height: u32,
    depth: u32,
    array_size: u32,
    sample_count: u32,
}

impl Texture {
    /// 1D texture, arrayed when `array_size > 1`.
    pub fn make_1d(
        ctx: &Context,
        format: InternalFormat,
        width: u32,
        array_size: u32,
        data: Option<&[u8]>,
        options: TextureOptions,
    ) -> Result<Self> {
        let target = if array_size > 1 {
            TextureTarget::T1dArray
        } else {
            TextureTarget::T1d
        };
        Self::make(ctx, target, format, array_size, 1, width, 1, 1, data, options)
    }

    /// 2D texture, arrayed and/or multisampled by the corresponding counts.
    pub fn make_2d(
        ctx: &Context,
        format: InternalFormat,
        width: u32,
        height: u32,
        array_size: u32,
        sample_count: u32,
        data: Option<&[u8]>,
        options: TextureOptions,
    ) -> Result<Self> {
        let target = match (sample_count > 1, array_size > 1) {
            (true, true) => TextureTarget::T2dMultisampleArray,
            (true, false) => TextureTarget::T2dMultisample,
            (false, true) => TextureTarget::T2dArray,
            (false, false) => TextureTarget::T2d,
        };
        Self::make(
            ctx,
            target,
            format,
            array_size,
            sample_count,
            width,
            height,
            1,
            data,
            options,
        )
    }

    /// 3D texture.
    pub fn make_3d(
        ctx: &Context,
        format: InternalFormat,
        width: u32,
        height: u32,
        depth: u32,
        data: Option<&[u8]>,
        options: TextureOptions,
    ) -> Result<Self> {
        Self::make(
            ctx,
            TextureTarget::T3d,
            format,
            1,
            1,
            width,
            height,
            depth,
            data,
            options,
        )
    }

    /// Cubemap, arrayed when `array_size > 1`. Faces are uploaded
    /// individually afterwards.
    pub fn make_cubemap(
        ctx: &Context,
        format: InternalFormat,
        width: u32,
        height: u32,
        array_size: u32,
        options: TextureOptions,
    ) -> Result<Self> {
        let target = if array_size > 1 {
            TextureTarget::CubeMapArray
        } else {
            TextureTarget::CubeMap
        };
        Self::make(ctx, target, format, array_size, 1, width, height, 1, None, options)
    }

    #[allow(clippy::too_many_arguments)]
    fn make(
        ctx: &Context,
        target: TextureTarget,
        format: InternalFormat,
        array_size: u32,
        sample_count: u32,
        width: u32,
        height: u32,
        depth: u32,
        data: Option<&[u8]>,
        options: TextureOptions,
    ) -> Result<Self> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "zero-sized texture {width}x{height}x{depth}"
            )));
        }
        let info = format.describe();
        let gl = GlObject::create(ctx, ObjectKind::Texture)?;
        let backend = ctx.backend();
        backend.bind_texture(target, gl.id());

        if options.contains(TextureOptions::AUTOMATIC_ALIGNMENT)
            && (info.scalar_size() as u32 * info.channel_count * width) % 4 != 0
        {
            backend.pixel_store(PixelStore::PackAlignment(1));
            backend.pixel_store(PixelStore::UnpackAlignment(1));
        }

        let texture = Self {
            gl,
            target,
            info,
            width,
            height,
            depth,
            array_size,
            sample_count,
        };

        let levels = if options.contains(TextureOptions::ALLOCATE_MIPMAP) {
            match target {
                TextureTarget::T1d | TextureTarget::T1dArray => texture.lod_count_1d(),
                TextureTarget::T3d => texture.lod_count_3d(),
                _ => texture.lod_count_2d(),
            }
        } else {
            1
        };
        backend.tex_storage(&TextureStorage {
            target,
            levels,
            format,
            width,
            height,
            depth,
            array_size,
            sample_count,
            fixed_sample_locations: options.contains(TextureOptions::FIXED_SAMPLE_LOCATIONS),
        })?;

        if let Some(data) = data {
            assert!(
                !target.is_multisampled(),
                "initial pixel upload to a multisampled texture"
            );
            texture.upload(data, 0, 0, None);
        }
        if options.contains(TextureOptions::GENERATE_MIPMAP) && !target.is_multisampled() {
            backend.generate_mipmap(target);
        }

        ctx.poll_errors();
        Ok(texture)
    }

    /// Rebind this texture to its target.
    pub fn bind(&self) -> &Self {
        self.backend().bind_texture(self.target, self.gl.id());
        self
    }

    /// Bind to a numbered sampler slot.
    pub fn bind_as_sampler(&self, slot: u32) {
        assert!(
            self.sample_count <= 1,
            "multisampled texture bound as a sampler; resolve it first"
        );
        let backend = self.backend();
        backend.active_texture(slot);
        backend.bind_texture(self.target, self.gl.id());
    }

    /// Set coordinate wrapping. The R direction only applies to 3D shapes.
    pub fn set_wrapping(&self, s: WrapMode, t: WrapMode, r: WrapMode) -> &Self {
        self.bind();
        let backend = self.backend();
        backend.tex_parameter(self.target, TexParameter::WrapS(s));
        backend.tex_parameter(self.target, TexParameter::WrapT(t));
        if self.depth > 1 {
            backend.tex_parameter(self.target, TexParameter::WrapR(r));
        }
        self
    }

    /// Set magnification/minification filters.
    pub fn set_filtering(&self, mag: FilterMode, min: FilterMode) -> &Self {
        self.bind();
        let backend = self.backend();
        backend.tex_parameter(self.target, TexParameter::MagFilter(mag));
        backend.tex_parameter(self.target, TexParameter::MinFilter(min));
        self
    }

    /// Remap returned channels at sample time without touching storage.
    pub fn set_swizzling(&self, swizzle: [Swizzle; 4]) -> &Self {
        self.bind();
        self.backend()
            .tex_parameter(self.target, TexParameter::SwizzleRgba(swizzle));
        self
    }

    /// Set the border color used by [`WrapMode::ClampToBorder`].
    pub fn set_border_color(&self, rgba: [f32; 4]) -> &Self {
        self.bind();
        self.backend()
            .tex_parameter(self.target, TexParameter::BorderColor(rgba));
        self
    }

    /// Set pack/unpack row alignment for transfers involving this texture.
    pub fn set_alignment(&self, pack: i32, unpack: i32) -> &Self {
        self.bind();
        let backend = self.backend();
        backend.pixel_store(PixelStore::PackAlignment(pack));
        backend.pixel_store(PixelStore::UnpackAlignment(unpack));
        self
    }

    /// Upload one level/layer/face worth of tightly packed pixels in the
    /// texture's own external format.
    pub fn upload(&self, data: &[u8], level: u32, layer: u32, face: Option<CubeFace>) -> &Self {
        assert!(
            !self.target.is_multisampled(),
            "pixel upload to a multisampled texture"
        );
        if matches!(self.target, TextureTarget::CubeMap | TextureTarget::CubeMapArray) {
            assert!(face.is_some(), "cubemap upload requires a face");
        }
        self.bind();
        self.backend().tex_sub_image(
            &TextureUpload {
                target: self.target,
                level,
                layer,
                face,
                width: self.width >> level,
                height: self.height >> level,
                depth: self.depth >> level,
                format: self.info.format,
                scalar: self.info.scalar,
            },
            data,
        );
        self
    }

    /// Fill the allocated mip chain from level 0.
    pub fn generate_mipmap(&self) {
        assert!(
            !self.target.is_multisampled(),
            "mipmap generation on a multisampled texture"
        );
        self.bind();
        self.backend().generate_mipmap(self.target);
    }

    pub fn lod_count_1d(&self) -> u32 {
        (self.width as f32).log2().floor() as u32 + 1
    }

    pub fn lod_count_2d(&self) -> u32 {
        (self.width.max(self.height) as f32).log2().floor() as u32 + 1
    }

    pub fn lod_count_3d(&self) -> u32 {
        (self.width.max(self.height).max(self.depth) as f32).log2().floor() as u32 + 1
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn internal_format(&self) -> InternalFormat {
        self.info.internal_format
    }

    /// The resolved {format, scalar, channel count} triple.
    pub fn pixel_info(&self) -> PixelInfo {
        self.info
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn id(&self) -> u32 {
        self.gl.id()
    }

    fn backend(&self) -> &dyn crate::backend::GlBackend {
        self.gl.context().backend()
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.gl.id())
            .field("target", &self.target)
            .field("format", &self.info.internal_format)
            .field("size", &(self.width, self.height, self.depth))
            .field("samples", &self.sample_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_resolution() {
        let ctx = Context::headless();
        let plain = Texture::make_2d(&ctx, InternalFormat::Rgba8, 8, 8, 1, 1, None, TextureOptions::default())
            .unwrap();
        assert_eq!(plain.target(), TextureTarget::T2d);

        let ms = Texture::make_2d(&ctx, InternalFormat::Rgba8, 8, 8, 1, 4, None, TextureOptions::default())
            .unwrap();
        assert_eq!(ms.target(), TextureTarget::T2dMultisample);
        assert_eq!(ms.sample_count(), 4);

        let arr = Texture::make_2d(&ctx, InternalFormat::Rgba8, 8, 8, 6, 1, None, TextureOptions::default())
            .unwrap();
        assert_eq!(arr.target(), TextureTarget::T2dArray);
    }

    #[test]
    fn test_lod_counts() {
        let ctx = Context::headless();
        let tex = Texture::make_2d(
            &ctx,
            InternalFormat::Rgba8,
            640,
            480,
            1,
            1,
            None,
            TextureOptions::default(),
        )
        .unwrap();
        // floor(log2(640)) + 1
        assert_eq!(tex.lod_count_2d(), 10);

        let one = Texture::make_2d(&ctx, InternalFormat::R8, 1, 1, 1, 1, None, TextureOptions::default())
            .unwrap();
        assert_eq!(one.lod_count_2d(), 1);
    }

    #[test]
    fn test_zero_size_rejected() {
        let ctx = Context::headless();
        let result = Texture::make_2d(&ctx, InternalFormat::Rgba8, 0, 4, 1, 1, None, TextureOptions::default());
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "multisampled texture bound as a sampler")]
    fn test_multisampled_sampling_aborts() {
        let ctx = Context::headless();
        let ms = Texture::make_2d(&ctx, InternalFormat::Rgba8, 8, 8, 1, 4, None, TextureOptions::default())
            .unwrap();
        ms.bind_as_sampler(0);
    }
}
