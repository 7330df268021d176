//! Common types shared between backends.
//!
//! Everything here is plain data: enums naming device objects and state,
//! the pixel-format descriptor table, and the indirect draw command record.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::error::GraphicsError;

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

/// The kinds of device objects a backend can create and destroy.
///
/// Shader creation needs the stage up front, so the kind carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Framebuffer,
    Query,
    Program,
    Renderbuffer,
    Shader(ShaderStage),
    Texture,
    VertexArray,
}

/// Object class, i.e. [`ObjectKind`] with creation payloads erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Buffer,
    Framebuffer,
    Query,
    Program,
    Renderbuffer,
    Shader,
    Texture,
    VertexArray,
}

impl ObjectKind {
    pub fn class(&self) -> ObjectClass {
        match self {
            ObjectKind::Buffer => ObjectClass::Buffer,
            ObjectKind::Framebuffer => ObjectClass::Framebuffer,
            ObjectKind::Query => ObjectClass::Query,
            ObjectKind::Program => ObjectClass::Program,
            ObjectKind::Renderbuffer => ObjectClass::Renderbuffer,
            ObjectKind::Shader(_) => ObjectClass::Shader,
            ObjectKind::Texture => ObjectClass::Texture,
            ObjectKind::VertexArray => ObjectClass::VertexArray,
        }
    }
}

/// Buffer binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
    ShaderStorage,
    DrawIndirect,
    CopyRead,
    CopyWrite,
}

/// Buffer usage hint passed at allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Scalar component types for vertex attributes and pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F16,
    F32,
    F64,
}

impl ScalarType {
    /// Size of one scalar in bytes.
    pub fn size(&self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 | ScalarType::F16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    /// Whether attribute data of this type feeds integer shader inputs.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::I8
                | ScalarType::U8
                | ScalarType::I16
                | ScalarType::U16
                | ScalarType::I32
                | ScalarType::U32
        )
    }
}

/// Sized internal texture formats supported by the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    R8,
    R32F,
    R32I,
    Rg32I,
    Rg32F,
    Rgb8,
    Rgb32I,
    Rgb32F,
    Rgba8,
    Rgba32F,
}

/// External (client-visible) pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    RedInteger,
    Rg,
    RgInteger,
    Rgb,
    RgbInteger,
    Rgba,
}

/// Resolved description of an internal format: the external format,
/// component scalar type, channel count and per-scalar byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelInfo {
    pub internal_format: InternalFormat,
    pub format: PixelFormat,
    pub scalar: ScalarType,
    pub channel_count: u32,
}

impl PixelInfo {
    pub fn scalar_size(&self) -> usize {
        self.scalar.size()
    }

    /// Bytes occupied by one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        self.channel_count as usize * self.scalar.size()
    }
}

impl InternalFormat {
    /// Look up the descriptor for this format.
    ///
    /// The table is total over the enum, so the lookup cannot fail; it is
    /// kept as one method so every construction site resolves the triple
    /// through the same place.
    pub fn describe(&self) -> PixelInfo {
        let (format, scalar, channel_count) = match self {
            InternalFormat::R8 => (PixelFormat::Red, ScalarType::U8, 1),
            InternalFormat::R32F => (PixelFormat::Red, ScalarType::F32, 1),
            InternalFormat::R32I => (PixelFormat::RedInteger, ScalarType::I32, 1),
            InternalFormat::Rg32I => (PixelFormat::RgInteger, ScalarType::I32, 2),
            InternalFormat::Rg32F => (PixelFormat::Rg, ScalarType::F32, 2),
            InternalFormat::Rgb8 => (PixelFormat::Rgb, ScalarType::U8, 3),
            InternalFormat::Rgb32I => (PixelFormat::RgbInteger, ScalarType::I32, 3),
            InternalFormat::Rgb32F => (PixelFormat::Rgb, ScalarType::F32, 3),
            InternalFormat::Rgba8 => (PixelFormat::Rgba, ScalarType::U8, 4),
            InternalFormat::Rgba32F => (PixelFormat::Rgba, ScalarType::F32, 4),
        };
        PixelInfo {
            internal_format: *self,
            format,
            scalar,
            channel_count,
        }
    }

    /// Pick a format for tightly packed 8-bit image data.
    pub fn from_channel_count(channels: u32) -> Result<InternalFormat, GraphicsError> {
        match channels {
            1 => Ok(InternalFormat::R8),
            3 => Ok(InternalFormat::Rgb8),
            4 => Ok(InternalFormat::Rgba8),
            other => Err(GraphicsError::FeatureNotSupported(format!(
                "no sized format for {other}-channel 8-bit pixels"
            ))),
        }
    }
}

/// Depth/stencil renderbuffer formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFormat {
    #[default]
    Depth32,
    Depth24Stencil8,
}

/// Texture target kinds. The 1D/2D/cubemap constructors resolve these from
/// array size and sample count; 3D is always plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    T1d,
    T1dArray,
    T2d,
    T2dArray,
    T2dMultisample,
    T2dMultisampleArray,
    T3d,
    CubeMap,
    CubeMapArray,
}

impl TextureTarget {
    pub fn is_multisampled(&self) -> bool {
        matches!(
            self,
            TextureTarget::T2dMultisample | TextureTarget::T2dMultisampleArray
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            TextureTarget::T1dArray
                | TextureTarget::T2dArray
                | TextureTarget::T2dMultisampleArray
                | TextureTarget::CubeMapArray
        )
    }
}

/// One face of a cubemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(&self) -> u32 {
        *self as u32
    }
}

/// Texture coordinate wrap modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
    ClampToBorder,
    MirroredRepeat,
}

/// Texture minification/magnification filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// Channel sources for texture swizzling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Swizzle {
    Red,
    Green,
    Blue,
    Alpha,
    Zero,
    One,
}

impl Swizzle {
    /// The identity mapping.
    pub const IDENTITY: [Swizzle; 4] =
        [Swizzle::Red, Swizzle::Green, Swizzle::Blue, Swizzle::Alpha];
}

/// One texture sampling-state parameter with its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TexParameter {
    WrapS(WrapMode),
    WrapT(WrapMode),
    WrapR(WrapMode),
    MinFilter(FilterMode),
    MagFilter(FilterMode),
    SwizzleRgba([Swizzle; 4]),
    BorderColor([f32; 4]),
}

/// Pixel transfer alignment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelStore {
    PackAlignment(i32),
    UnpackAlignment(i32),
}

/// Immutable texture storage allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureStorage {
    pub target: TextureTarget,
    pub levels: u32,
    pub format: InternalFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub sample_count: u32,
    pub fixed_sample_locations: bool,
}

/// A sub-image upload request. Uploads always cover a whole layer/face at
/// the given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureUpload {
    pub target: TextureTarget,
    pub level: u32,
    pub layer: u32,
    pub face: Option<CubeFace>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: PixelFormat,
    pub scalar: ScalarType,
}

/// Framebuffer binding points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Both read and draw.
    ReadDraw,
    Read,
    Draw,
}

/// Completeness status reported by the device for a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Undefined,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteReadBuffer,
    Unsupported,
    IncompleteMultisample,
    IncompleteLayerTargets,
}

impl FramebufferStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}

bitflags! {
    /// Which planes a clear or blit touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Typed clear value for a single color attachment. The variant must match
/// the attachment's component type; mismatches are undefined at the device
/// level, so the wrappers check where they can.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    F32([f32; 4]),
    I32([i32; 4]),
    U32([u32; 4]),
}

/// Filtering applied by framebuffer blits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlitFilter {
    #[default]
    Nearest,
    Linear,
}

/// Primitive assembly modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Index element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size(&self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Asynchronous query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    TimeElapsed,
    SamplesPassed,
    PrimitivesGenerated,
}

/// Fixed-function capabilities toggled by the demo harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Multisample,
}

/// Error codes polled from the device. Advisory only; the layer logs them
/// and continues (no automatic recovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    OutOfMemory,
    StackOverflow,
    StackUnderflow,
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceError::InvalidEnum => "invalid enum",
            DeviceError::InvalidValue => "invalid value",
            DeviceError::InvalidOperation => "invalid operation",
            DeviceError::InvalidFramebufferOperation => "invalid framebuffer operation",
            DeviceError::OutOfMemory => "out of device memory",
            DeviceError::StackOverflow => "stack overflow",
            DeviceError::StackUnderflow => "stack underflow",
        };
        f.write_str(name)
    }
}

/// Arguments for one indexed indirect draw.
///
/// The struct is `#[repr(C)]` and matches the device layout consumed by
/// multi-draw-indirect: 20 bytes, 4-byte aligned, one record per submesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DrawElementsIndirectCommand {
    /// Number of indices to draw.
    pub index_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// Offset (in indices) of the first index.
    pub first_index: u32,
    /// Value added to each index before fetching vertices.
    pub base_vertex: u32,
    /// Instance ID of the first instance; always zero in this layer.
    pub base_instance: u32,
}

impl DrawElementsIndirectCommand {
    /// Size of one record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_info_table() {
        let info = InternalFormat::Rgba8.describe();
        assert_eq!(info.format, PixelFormat::Rgba);
        assert_eq!(info.scalar, ScalarType::U8);
        assert_eq!(info.channel_count, 4);
        assert_eq!(info.bytes_per_pixel(), 4);

        let info = InternalFormat::Rg32F.describe();
        assert_eq!(info.scalar, ScalarType::F32);
        assert_eq!(info.bytes_per_pixel(), 8);

        let info = InternalFormat::R32I.describe();
        assert_eq!(info.format, PixelFormat::RedInteger);
        assert_eq!(info.scalar_size(), 4);
    }

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(ScalarType::U8.size(), 1);
        assert_eq!(ScalarType::F16.size(), 2);
        assert_eq!(ScalarType::F32.size(), 4);
        assert_eq!(ScalarType::F64.size(), 8);
        assert!(ScalarType::I32.is_integer());
        assert!(!ScalarType::F32.is_integer());
    }

    #[test]
    fn test_indirect_command_layout() {
        assert_eq!(DrawElementsIndirectCommand::SIZE, 20);
        let cmd = DrawElementsIndirectCommand {
            index_count: 6,
            instance_count: 2,
            first_index: 3,
            base_vertex: 4,
            base_instance: 0,
        };
        let bytes = bytemuck::bytes_of(&cmd);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &6u32.to_ne_bytes());
    }

    #[test]
    fn test_format_from_channel_count() {
        assert_eq!(
            InternalFormat::from_channel_count(4).unwrap(),
            InternalFormat::Rgba8
        );
        assert!(InternalFormat::from_channel_count(2).is_err());
    }
}
