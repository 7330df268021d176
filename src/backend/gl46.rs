//! Driver-backed backend.
//!
//! Maps the [`GlBackend`](super::GlBackend) call surface onto real driver
//! calls through `glow`. All unsafety of the crate is confined to this
//! file; every method is a direct translation plus enum conversion, with
//! no state of its own beyond the `glow` context.
//!
//! One mapping note: the portable call surface has no 1D storage entry
//! points, so 1D and 1D-array targets are expressed as 2D targets with a
//! height of 1. The public texture API keeps 1D semantics.

use std::num::NonZeroU32;

use glow::HasContext;

use crate::backend::traits::GlBackend;
use crate::backend::types::*;
use crate::error::{GraphicsError, Result};
use crate::resources::UniformValue;

/// Backend driving an OpenGL 4.x context.
pub struct Gl46Backend {
    gl: glow::Context,
}

impl Gl46Backend {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Build the context from a symbol loader (window toolkit, EGL, ...).
    ///
    /// # Safety
    ///
    /// The loader must return valid function pointers for the context that
    /// is current on this thread.
    pub unsafe fn from_loader(loader: impl FnMut(&str) -> *const std::ffi::c_void) -> Self {
        Self::new(unsafe { glow::Context::from_loader_function(loader) })
    }

    /// The wrapped `glow` context, for interop with presentation layers.
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

fn non_zero(id: u32) -> NonZeroU32 {
    NonZeroU32::new(id).expect("null identifier in acting call")
}

fn buffer(id: u32) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(id).map(glow::NativeBuffer)
}

fn texture(id: u32) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id).map(glow::NativeTexture)
}

fn framebuffer(id: u32) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(id).map(glow::NativeFramebuffer)
}

fn renderbuffer(id: u32) -> Option<glow::NativeRenderbuffer> {
    NonZeroU32::new(id).map(glow::NativeRenderbuffer)
}

fn vertex_array(id: u32) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(id).map(glow::NativeVertexArray)
}

fn program(id: u32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id).map(glow::NativeProgram)
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::Uniform => glow::UNIFORM_BUFFER,
        BufferTarget::ShaderStorage => glow::SHADER_STORAGE_BUFFER,
        BufferTarget::DrawIndirect => glow::DRAW_INDIRECT_BUFFER,
        BufferTarget::CopyRead => glow::COPY_READ_BUFFER,
        BufferTarget::CopyWrite => glow::COPY_WRITE_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn scalar_type(scalar: ScalarType) -> u32 {
    match scalar {
        ScalarType::I8 => glow::BYTE,
        ScalarType::U8 => glow::UNSIGNED_BYTE,
        ScalarType::I16 => glow::SHORT,
        ScalarType::U16 => glow::UNSIGNED_SHORT,
        ScalarType::I32 => glow::INT,
        ScalarType::U32 => glow::UNSIGNED_INT,
        ScalarType::F16 => glow::HALF_FLOAT,
        ScalarType::F32 => glow::FLOAT,
        ScalarType::F64 => glow::DOUBLE,
    }
}

fn internal_format(format: InternalFormat) -> u32 {
    match format {
        InternalFormat::R8 => glow::R8,
        InternalFormat::R32F => glow::R32F,
        InternalFormat::R32I => glow::R32I,
        InternalFormat::Rg32I => glow::RG32I,
        InternalFormat::Rg32F => glow::RG32F,
        InternalFormat::Rgb8 => glow::RGB8,
        InternalFormat::Rgb32I => glow::RGB32I,
        InternalFormat::Rgb32F => glow::RGB32F,
        InternalFormat::Rgba8 => glow::RGBA8,
        InternalFormat::Rgba32F => glow::RGBA32F,
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Red => glow::RED,
        PixelFormat::RedInteger => glow::RED_INTEGER,
        PixelFormat::Rg => glow::RG,
        PixelFormat::RgInteger => glow::RG_INTEGER,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::RgbInteger => glow::RGB_INTEGER,
        PixelFormat::Rgba => glow::RGBA,
    }
}

fn depth_format(format: DepthFormat) -> u32 {
    match format {
        DepthFormat::Depth32 => glow::DEPTH_COMPONENT32,
        DepthFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::T1d => glow::TEXTURE_2D,
        TextureTarget::T1dArray => glow::TEXTURE_2D_ARRAY,
        TextureTarget::T2d => glow::TEXTURE_2D,
        TextureTarget::T2dArray => glow::TEXTURE_2D_ARRAY,
        TextureTarget::T2dMultisample => glow::TEXTURE_2D_MULTISAMPLE,
        TextureTarget::T2dMultisampleArray => glow::TEXTURE_2D_MULTISAMPLE_ARRAY,
        TextureTarget::T3d => glow::TEXTURE_3D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
        TextureTarget::CubeMapArray => glow::TEXTURE_CUBE_MAP_ARRAY,
    }
}

fn wrap_mode(mode: WrapMode) -> i32 {
    (match mode {
        WrapMode::Repeat => glow::REPEAT,
        WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        WrapMode::ClampToBorder => glow::CLAMP_TO_BORDER,
        WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filter_mode(filter: FilterMode) -> i32 {
    (match filter {
        FilterMode::Nearest => glow::NEAREST,
        FilterMode::Linear => glow::LINEAR,
        FilterMode::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        FilterMode::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        FilterMode::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        FilterMode::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn swizzle(source: Swizzle) -> i32 {
    (match source {
        Swizzle::Red => glow::RED,
        Swizzle::Green => glow::GREEN,
        Swizzle::Blue => glow::BLUE,
        Swizzle::Alpha => glow::ALPHA,
        Swizzle::Zero => glow::ZERO,
        Swizzle::One => glow::ONE,
    }) as i32
}

fn framebuffer_target(target: FramebufferTarget) -> u32 {
    match target {
        FramebufferTarget::ReadDraw => glow::FRAMEBUFFER,
        FramebufferTarget::Read => glow::READ_FRAMEBUFFER,
        FramebufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
    }
}

fn clear_mask(mask: ClearMask) -> u32 {
    let mut bits = 0;
    if mask.contains(ClearMask::COLOR) {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.contains(ClearMask::DEPTH) {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    if mask.contains(ClearMask::STENCIL) {
        bits |= glow::STENCIL_BUFFER_BIT;
    }
    bits
}

fn primitive_mode(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Points => glow::POINTS,
        PrimitiveMode::Lines => glow::LINES,
        PrimitiveMode::LineStrip => glow::LINE_STRIP,
        PrimitiveMode::Triangles => glow::TRIANGLES,
        PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn index_type(ty: IndexType) -> u32 {
    match ty {
        IndexType::U16 => glow::UNSIGNED_SHORT,
        IndexType::U32 => glow::UNSIGNED_INT,
    }
}

fn query_target(target: QueryTarget) -> u32 {
    match target {
        QueryTarget::TimeElapsed => glow::TIME_ELAPSED,
        QueryTarget::SamplesPassed => glow::SAMPLES_PASSED,
        QueryTarget::PrimitivesGenerated => glow::PRIMITIVES_GENERATED,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::Multisample => glow::MULTISAMPLE,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

fn cube_face(face: CubeFace) -> u32 {
    glow::TEXTURE_CUBE_MAP_POSITIVE_X + face.index()
}

impl GlBackend for Gl46Backend {
    fn name(&self) -> &'static str {
        "opengl-4.x"
    }

    fn create_object(&self, kind: ObjectKind) -> u32 {
        let created: std::result::Result<u32, String> = unsafe {
            match kind {
                ObjectKind::Buffer => self.gl.create_buffer().map(|b| b.0.get()),
                ObjectKind::Framebuffer => self.gl.create_framebuffer().map(|f| f.0.get()),
                ObjectKind::Query => self.gl.create_query().map(|q| q.0.get()),
                ObjectKind::Program => self.gl.create_program().map(|p| p.0.get()),
                ObjectKind::Renderbuffer => self.gl.create_renderbuffer().map(|r| r.0.get()),
                ObjectKind::Shader(stage) => {
                    self.gl.create_shader(shader_stage(stage)).map(|s| s.0.get())
                }
                ObjectKind::Texture => self.gl.create_texture().map(|t| t.0.get()),
                ObjectKind::VertexArray => self.gl.create_vertex_array().map(|v| v.0.get()),
            }
        };
        match created {
            Ok(id) => id,
            Err(message) => {
                log::error!("device object creation failed ({kind:?}): {message}");
                0
            }
        }
    }

    fn delete_object(&self, kind: ObjectKind, id: u32) {
        let id = non_zero(id);
        unsafe {
            match kind {
                ObjectKind::Buffer => self.gl.delete_buffer(glow::NativeBuffer(id)),
                ObjectKind::Framebuffer => self.gl.delete_framebuffer(glow::NativeFramebuffer(id)),
                ObjectKind::Query => self.gl.delete_query(glow::NativeQuery(id)),
                ObjectKind::Program => self.gl.delete_program(glow::NativeProgram(id)),
                ObjectKind::Renderbuffer => self.gl.delete_renderbuffer(glow::NativeRenderbuffer(id)),
                ObjectKind::Shader(_) => self.gl.delete_shader(glow::NativeShader(id)),
                ObjectKind::Texture => self.gl.delete_texture(glow::NativeTexture(id)),
                ObjectKind::VertexArray => self.gl.delete_vertex_array(glow::NativeVertexArray(id)),
            }
        }
    }

    fn poll_error(&self) -> Option<DeviceError> {
        let code = unsafe { self.gl.get_error() };
        match code {
            glow::NO_ERROR => None,
            glow::INVALID_ENUM => Some(DeviceError::InvalidEnum),
            glow::INVALID_VALUE => Some(DeviceError::InvalidValue),
            glow::INVALID_OPERATION => Some(DeviceError::InvalidOperation),
            glow::INVALID_FRAMEBUFFER_OPERATION => Some(DeviceError::InvalidFramebufferOperation),
            glow::OUT_OF_MEMORY => Some(DeviceError::OutOfMemory),
            glow::STACK_OVERFLOW => Some(DeviceError::StackOverflow),
            glow::STACK_UNDERFLOW => Some(DeviceError::StackUnderflow),
            other => {
                log::warn!("unmapped device error code {other:#x}");
                Some(DeviceError::InvalidOperation)
            }
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer(id)) }
    }

    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        let target = buffer_target(target);
        let usage = buffer_usage(usage);
        unsafe {
            match data {
                Some(data) if data.len() == size => self.gl.buffer_data_u8_slice(target, data, usage),
                Some(data) => {
                    self.gl.buffer_data_size(target, size as i32, usage);
                    self.gl.buffer_sub_data_u8_slice(target, 0, data);
                }
                None => self.gl.buffer_data_size(target, size as i32, usage),
            }
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(buffer_target(target), offset as i32, data)
        }
    }

    fn copy_buffer_sub_data(&self, src_offset: usize, dst_offset: usize, size: usize) {
        unsafe {
            self.gl.copy_buffer_sub_data(
                glow::COPY_READ_BUFFER,
                glow::COPY_WRITE_BUFFER,
                src_offset as i32,
                dst_offset as i32,
                size as i32,
            )
        }
    }

    fn bind_buffer_base(&self, target: BufferTarget, index: u32, id: u32) {
        unsafe {
            self.gl
                .bind_buffer_base(buffer_target(target), index, buffer(id))
        }
    }

    fn bind_vertex_array(&self, id: u32) {
        unsafe { self.gl.bind_vertex_array(vertex_array(id)) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        channels: u32,
        scalar: ScalarType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        let ty = scalar_type(scalar);
        unsafe {
            if scalar.is_integer() && !normalized {
                self.gl
                    .vertex_attrib_pointer_i32(index, channels as i32, ty, stride as i32, offset as i32);
            } else {
                self.gl.vertex_attrib_pointer_f32(
                    index,
                    channels as i32,
                    ty,
                    normalized,
                    stride as i32,
                    offset as i32,
                );
            }
        }
    }

    fn enable_vertex_attrib(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn bind_texture(&self, target: TextureTarget, id: u32) {
        unsafe { self.gl.bind_texture(texture_target(target), texture(id)) }
    }

    fn active_texture(&self, slot: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + slot) }
    }

    fn tex_storage(&self, desc: &TextureStorage) -> Result<()> {
        let format = internal_format(desc.format);
        let levels = desc.levels as i32;
        let target = texture_target(desc.target);
        unsafe {
            match desc.target {
                TextureTarget::T1d => {
                    self.gl
                        .tex_storage_2d(target, levels, format, desc.width as i32, 1)
                }
                TextureTarget::T1dArray => self.gl.tex_storage_3d(
                    target,
                    levels,
                    format,
                    desc.width as i32,
                    1,
                    desc.array_size as i32,
                ),
                TextureTarget::T2d | TextureTarget::CubeMap => self.gl.tex_storage_2d(
                    target,
                    levels,
                    format,
                    desc.width as i32,
                    desc.height as i32,
                ),
                TextureTarget::T2dArray => self.gl.tex_storage_3d(
                    target,
                    levels,
                    format,
                    desc.width as i32,
                    desc.height as i32,
                    desc.array_size as i32,
                ),
                TextureTarget::CubeMapArray => self.gl.tex_storage_3d(
                    target,
                    levels,
                    format,
                    desc.width as i32,
                    desc.height as i32,
                    (desc.array_size * 6) as i32,
                ),
                TextureTarget::T3d => self.gl.tex_storage_3d(
                    target,
                    levels,
                    format,
                    desc.width as i32,
                    desc.height as i32,
                    desc.depth as i32,
                ),
                TextureTarget::T2dMultisample => self.gl.tex_storage_2d_multisample(
                    target,
                    desc.sample_count as i32,
                    format,
                    desc.width as i32,
                    desc.height as i32,
                    desc.fixed_sample_locations,
                ),
                TextureTarget::T2dMultisampleArray => {
                    return Err(GraphicsError::FeatureNotSupported(
                        "multisampled array storage".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn tex_sub_image(&self, upload: &TextureUpload, data: &[u8]) {
        let format = pixel_format(upload.format);
        let ty = scalar_type(upload.scalar);
        let level = upload.level as i32;
        let (w, h, d) = (upload.width as i32, upload.height as i32, upload.depth as i32);
        let pixels = glow::PixelUnpackData::Slice(data);
        unsafe {
            match upload.target {
                TextureTarget::T1d => {
                    self.gl
                        .tex_sub_image_2d(glow::TEXTURE_2D, level, 0, 0, w, 1, format, ty, pixels)
                }
                TextureTarget::T1dArray => self.gl.tex_sub_image_3d(
                    glow::TEXTURE_2D_ARRAY,
                    level,
                    0,
                    0,
                    upload.layer as i32,
                    w,
                    1,
                    1,
                    format,
                    ty,
                    pixels,
                ),
                TextureTarget::T2d => {
                    self.gl
                        .tex_sub_image_2d(glow::TEXTURE_2D, level, 0, 0, w, h, format, ty, pixels)
                }
                TextureTarget::CubeMap => {
                    let face = upload.face.expect("cubemap upload without a face");
                    self.gl
                        .tex_sub_image_2d(cube_face(face), level, 0, 0, w, h, format, ty, pixels)
                }
                TextureTarget::T2dArray => self.gl.tex_sub_image_3d(
                    glow::TEXTURE_2D_ARRAY,
                    level,
                    0,
                    0,
                    upload.layer as i32,
                    w,
                    h,
                    1,
                    format,
                    ty,
                    pixels,
                ),
                TextureTarget::CubeMapArray => {
                    let face = upload.face.expect("cubemap upload without a face");
                    self.gl.tex_sub_image_3d(
                        glow::TEXTURE_CUBE_MAP_ARRAY,
                        level,
                        0,
                        0,
                        (upload.layer * 6 + face.index()) as i32,
                        w,
                        h,
                        1,
                        format,
                        ty,
                        pixels,
                    )
                }
                TextureTarget::T3d => self
                    .gl
                    .tex_sub_image_3d(glow::TEXTURE_3D, level, 0, 0, 0, w, h, d, format, ty, pixels),
                TextureTarget::T2dMultisample | TextureTarget::T2dMultisampleArray => {
                    unreachable!("upload to multisampled storage")
                }
            }
        }
    }

    fn tex_parameter(&self, target: TextureTarget, parameter: TexParameter) {
        let target = texture_target(target);
        unsafe {
            match parameter {
                TexParameter::WrapS(mode) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_WRAP_S, wrap_mode(mode))
                }
                TexParameter::WrapT(mode) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_WRAP_T, wrap_mode(mode))
                }
                TexParameter::WrapR(mode) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_WRAP_R, wrap_mode(mode))
                }
                TexParameter::MinFilter(filter) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, filter_mode(filter))
                }
                TexParameter::MagFilter(filter) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, filter_mode(filter))
                }
                TexParameter::SwizzleRgba(sources) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_SWIZZLE_R, swizzle(sources[0]));
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_SWIZZLE_G, swizzle(sources[1]));
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_SWIZZLE_B, swizzle(sources[2]));
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_SWIZZLE_A, swizzle(sources[3]));
                }
                TexParameter::BorderColor(rgba) => {
                    self.gl
                        .tex_parameter_f32_slice(target, glow::TEXTURE_BORDER_COLOR, &rgba)
                }
            }
        }
    }

    fn pixel_store(&self, parameter: PixelStore) {
        unsafe {
            match parameter {
                PixelStore::PackAlignment(value) => {
                    self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, value)
                }
                PixelStore::UnpackAlignment(value) => {
                    self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, value)
                }
            }
        }
    }

    fn generate_mipmap(&self, target: TextureTarget) {
        unsafe { self.gl.generate_mipmap(texture_target(target)) }
    }

    fn bind_renderbuffer(&self, id: u32) {
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer(id)) }
    }

    fn renderbuffer_storage(&self, format: DepthFormat, sample_count: u32, width: u32, height: u32) {
        let format = depth_format(format);
        unsafe {
            if sample_count > 1 {
                self.gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    sample_count as i32,
                    format,
                    width as i32,
                    height as i32,
                );
            } else {
                self.gl
                    .renderbuffer_storage(glow::RENDERBUFFER, format, width as i32, height as i32);
            }
        }
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, id: u32) {
        unsafe {
            self.gl
                .bind_framebuffer(framebuffer_target(target), framebuffer(id))
        }
    }

    fn framebuffer_renderbuffer_depth(&self, rb: u32) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                renderbuffer(rb),
            )
        }
    }

    fn framebuffer_texture(&self, color_index: u32, tex_target: TextureTarget, tex: u32, level: u32) {
        let attachment = glow::COLOR_ATTACHMENT0 + color_index;
        unsafe {
            match tex_target {
                TextureTarget::CubeMap | TextureTarget::CubeMapArray => self.gl.framebuffer_texture(
                    glow::FRAMEBUFFER,
                    attachment,
                    texture(tex),
                    level as i32,
                ),
                _ => self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    texture_target(tex_target),
                    texture(tex),
                    level as i32,
                ),
            }
        }
    }

    fn draw_buffers(&self, color_indices: &[u32]) {
        let buffers: Vec<u32> = color_indices.iter().map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
        unsafe { self.gl.draw_buffers(&buffers) }
    }

    fn read_buffer(&self, color_index: u32) {
        unsafe { self.gl.read_buffer(glow::COLOR_ATTACHMENT0 + color_index) }
    }

    fn check_framebuffer_status(&self, target: FramebufferTarget) -> FramebufferStatus {
        let status = unsafe { self.gl.check_framebuffer_status(framebuffer_target(target)) };
        match status {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            glow::FRAMEBUFFER_UNDEFINED => FramebufferStatus::Undefined,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => FramebufferStatus::IncompleteReadBuffer,
            glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => FramebufferStatus::IncompleteMultisample,
            glow::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => FramebufferStatus::IncompleteLayerTargets,
            _ => FramebufferStatus::Unsupported,
        }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear(&self, mask: ClearMask) {
        unsafe { self.gl.clear(clear_mask(mask)) }
    }

    fn clear_color_buffer(&self, draw_buffer: u32, value: ClearValue) {
        unsafe {
            match value {
                ClearValue::F32(values) => {
                    self.gl.clear_buffer_f32_slice(glow::COLOR, draw_buffer, &values)
                }
                ClearValue::I32(values) => {
                    self.gl.clear_buffer_i32_slice(glow::COLOR, draw_buffer, &values)
                }
                ClearValue::U32(values) => {
                    self.gl.clear_buffer_u32_slice(glow::COLOR, draw_buffer, &values)
                }
            }
        }
    }

    fn clear_depth_buffer(&self, value: f32) {
        unsafe { self.gl.clear_buffer_f32_slice(glow::DEPTH, 0, &[value]) }
    }

    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: PixelFormat,
        scalar: ScalarType,
        dst: &mut [u8],
    ) {
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                width as i32,
                height as i32,
                pixel_format(format),
                scalar_type(scalar),
                glow::PixelPackData::Slice(dst),
            )
        }
    }

    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], mask: ClearMask, filter: BlitFilter) {
        let filter = match filter {
            BlitFilter::Nearest => glow::NEAREST,
            BlitFilter::Linear => glow::LINEAR,
        };
        unsafe {
            self.gl.blit_framebuffer(
                src[0],
                src[1],
                src[2],
                src[3],
                dst[0],
                dst[1],
                dst[2],
                dst[3],
                clear_mask(mask),
                filter,
            )
        }
    }

    fn compile_shader(&self, shader: u32, source: &str) -> bool {
        let shader = glow::NativeShader(non_zero(shader));
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: u32) -> String {
        unsafe { self.gl.get_shader_info_log(glow::NativeShader(non_zero(shader))) }
    }

    fn attach_shader(&self, p: u32, s: u32) {
        unsafe {
            self.gl
                .attach_shader(glow::NativeProgram(non_zero(p)), glow::NativeShader(non_zero(s)))
        }
    }

    fn detach_shader(&self, p: u32, s: u32) {
        unsafe {
            self.gl
                .detach_shader(glow::NativeProgram(non_zero(p)), glow::NativeShader(non_zero(s)))
        }
    }

    fn link_program(&self, p: u32) -> bool {
        let p = glow::NativeProgram(non_zero(p));
        unsafe {
            self.gl.link_program(p);
            self.gl.get_program_link_status(p)
        }
    }

    fn program_info_log(&self, p: u32) -> String {
        unsafe { self.gl.get_program_info_log(glow::NativeProgram(non_zero(p))) }
    }

    fn use_program(&self, id: u32) {
        unsafe { self.gl.use_program(program(id)) }
    }

    fn set_uniform(&self, p: u32, name: &str, value: &UniformValue) -> bool {
        let p = glow::NativeProgram(non_zero(p));
        unsafe {
            let location = self.gl.get_uniform_location(p, name);
            let found = location.is_some();
            let location = location.as_ref();
            match value {
                UniformValue::F32(v) => self.gl.uniform_1_f32(location, *v),
                UniformValue::I32(v) => self.gl.uniform_1_i32(location, *v),
                UniformValue::U32(v) => self.gl.uniform_1_u32(location, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    self.gl
                        .uniform_matrix_3_f32_slice(location, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(location, false, &m.to_cols_array())
                }
            }
            found
        }
    }

    fn begin_query(&self, target: QueryTarget, id: u32) {
        unsafe {
            self.gl
                .begin_query(query_target(target), glow::NativeQuery(non_zero(id)))
        }
    }

    fn end_query(&self, target: QueryTarget) {
        unsafe { self.gl.end_query(query_target(target)) }
    }

    fn query_result(&self, id: u32) -> Option<u64> {
        let query = glow::NativeQuery(non_zero(id));
        unsafe {
            let available = self
                .gl
                .get_query_parameter_u32(query, glow::QUERY_RESULT_AVAILABLE);
            if available == 0 {
                None
            } else {
                Some(self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT) as u64)
            }
        }
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(primitive_mode(mode), first, count) }
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: i32, ty: IndexType, offset: usize) {
        unsafe {
            self.gl
                .draw_elements(primitive_mode(mode), count, index_type(ty), offset as i32)
        }
    }

    fn multi_draw_elements_indirect(&self, mode: PrimitiveMode, ty: IndexType, draw_count: u32) {
        unsafe {
            self.gl.multi_draw_elements_indirect_offset(
                primitive_mode(mode),
                index_type(ty),
                0,
                draw_count as i32,
                0,
            )
        }
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) }
    }

    fn enable(&self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }
}
