//! CPU emulation backend.
//!
//! Implements [`GlBackend`] without a GPU: object lifetimes, binding
//! points, buffer byte stores, texture parameter state and framebuffer
//! pixel planes are all tracked in host memory. Device-side buffer copies,
//! clears, blits (including multisample resolve) and readbacks operate on
//! those stores, so the test suite can observe the exact bytes the real
//! backend would move.
//!
//! The emulation is deliberately strict: acting through an unbound target,
//! destroying a dead object, reallocating immutable storage or uploading to
//! a multisampled texture panics instead of degrading, which turns contract
//! violations into test failures.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::backend::traits::GlBackend;
use crate::backend::types::*;
use crate::error::{GraphicsError, Result};
use crate::resources::UniformValue;

/// Recorded vertex attribute configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribRecord {
    pub buffer: u32,
    pub channels: u32,
    pub scalar: ScalarType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

/// Full sampling-state of one texture, with device defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TexParamState {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub swizzle: [Swizzle; 4],
    pub border_color: [f32; 4],
}

impl Default for TexParamState {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            wrap_r: WrapMode::Repeat,
            min_filter: FilterMode::NearestMipmapLinear,
            mag_filter: FilterMode::Linear,
            swizzle: Swizzle::IDENTITY,
            border_color: [0.0; 4],
        }
    }
}

#[derive(Default)]
struct BufferStore {
    bytes: Vec<u8>,
    allocated: bool,
}

#[derive(Default)]
struct TextureStore {
    storage: Option<TextureStorage>,
    info: Option<PixelInfo>,
    params: TexParamState,
    /// Sample-interleaved level-0 pixels for 2D-shaped targets:
    /// `((y * w + x) * samples + s) * bpp`.
    pixels: Option<Vec<u8>>,
}

#[derive(Default)]
struct RenderbufferStore {
    format: Option<DepthFormat>,
    sample_count: u32,
}

#[derive(Default)]
struct FramebufferStore {
    color: HashMap<u32, u32>,
    depth: Option<u32>,
    draw_buffers: Vec<u32>,
    read_buffer: u32,
}

#[derive(Default)]
struct ShaderStore {
    compiled: bool,
    log: String,
}

#[derive(Default)]
struct ProgramStore {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Default)]
struct QueryStore {
    in_flight: bool,
    value: Option<u64>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    live: HashMap<(ObjectClass, u32), ()>,
    created_total: usize,
    destroyed_total: usize,
    errors: Vec<DeviceError>,

    buffer_bindings: HashMap<BufferTarget, u32>,
    texture_bindings: HashMap<TextureTarget, u32>,
    bound_vertex_array: u32,
    bound_renderbuffer: u32,
    read_framebuffer: u32,
    draw_framebuffer: u32,
    current_program: u32,
    active_queries: HashMap<QueryTarget, u32>,
    clear_color_state: [f32; 4],
    query_counter: u64,

    buffers: HashMap<u32, BufferStore>,
    vertex_arrays: HashMap<u32, HashMap<u32, AttribRecord>>,
    textures: HashMap<u32, TextureStore>,
    renderbuffers: HashMap<u32, RenderbufferStore>,
    framebuffers: HashMap<u32, FramebufferStore>,
    shaders: HashMap<u32, ShaderStore>,
    programs: HashMap<u32, ProgramStore>,
    queries: HashMap<u32, QueryStore>,
}

/// The CPU emulation backend.
pub struct HeadlessBackend {
    state: RefCell<State>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
        }
    }

    // Inspection surface used by the test suite.

    /// Number of currently live device objects.
    pub fn live_object_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Number of live objects of one class.
    pub fn live_count_of(&self, class: ObjectClass) -> usize {
        self.state
            .borrow()
            .live
            .keys()
            .filter(|(c, _)| *c == class)
            .count()
    }

    pub fn created_total(&self) -> usize {
        self.state.borrow().created_total
    }

    pub fn destroyed_total(&self) -> usize {
        self.state.borrow().destroyed_total
    }

    /// Snapshot of a buffer's device-side bytes.
    pub fn buffer_bytes(&self, id: u32) -> Vec<u8> {
        self.state
            .borrow()
            .buffers
            .get(&id)
            .unwrap_or_else(|| panic!("no buffer #{id}"))
            .bytes
            .clone()
    }

    /// Snapshot of a texture's sampling state.
    pub fn texture_parameters(&self, id: u32) -> TexParamState {
        self.state
            .borrow()
            .textures
            .get(&id)
            .unwrap_or_else(|| panic!("no texture #{id}"))
            .params
            .clone()
    }

    /// Recorded attribute layout of a vertex array, sorted by index.
    pub fn vertex_layout(&self, vao: u32) -> Vec<(u32, AttribRecord)> {
        let state = self.state.borrow();
        let attribs = state
            .vertex_arrays
            .get(&vao)
            .unwrap_or_else(|| panic!("no vertex array #{vao}"));
        let mut out: Vec<_> = attribs.iter().map(|(i, r)| (*i, *r)).collect();
        out.sort_by_key(|(i, _)| *i);
        out
    }

    /// Last value recorded for a uniform, if any.
    pub fn program_uniform(&self, program: u32, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|store| store.uniforms.get(name).copied())
    }

    /// Push a fake device error, for exercising the polling path.
    pub fn push_error(&self, error: DeviceError) {
        self.state.borrow_mut().errors.push(error);
    }

    // Internals

    fn alloc_id(state: &mut State, class: ObjectClass) -> u32 {
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert((class, id), ());
        state.created_total += 1;
        id
    }

    fn bound_buffer(state: &State, target: BufferTarget) -> u32 {
        match state.buffer_bindings.get(&target) {
            Some(&id) if id != 0 => id,
            _ => panic!("acting call with no buffer bound to {target:?}"),
        }
    }

    fn bound_texture(state: &State, target: TextureTarget) -> u32 {
        match state.texture_bindings.get(&target) {
            Some(&id) if id != 0 => id,
            _ => panic!("acting call with no texture bound to {target:?}"),
        }
    }

    fn plane_len(storage: &TextureStorage, info: &PixelInfo) -> usize {
        storage.width as usize
            * storage.height.max(1) as usize
            * storage.sample_count.max(1) as usize
            * info.bytes_per_pixel()
    }

    /// Decode one pixel's sample to four f64 channels.
    fn decode(info: &PixelInfo, bytes: &[u8]) -> [f64; 4] {
        let mut out = [0.0; 4];
        let size = info.scalar.size();
        for c in 0..info.channel_count as usize {
            let s = &bytes[c * size..(c + 1) * size];
            out[c] = match info.scalar {
                ScalarType::U8 => s[0] as f64 / 255.0,
                ScalarType::F32 => f32::from_ne_bytes(s.try_into().unwrap()) as f64,
                ScalarType::I32 => i32::from_ne_bytes(s.try_into().unwrap()) as f64,
                ScalarType::U32 => u32::from_ne_bytes(s.try_into().unwrap()) as f64,
                other => panic!("headless decode of {other:?} pixels"),
            };
        }
        out
    }

    fn encode(info: &PixelInfo, value: [f64; 4]) -> Vec<u8> {
        let mut out = Vec::with_capacity(info.bytes_per_pixel());
        for c in 0..info.channel_count as usize {
            match info.scalar {
                ScalarType::U8 => out.push((value[c].clamp(0.0, 1.0) * 255.0).round() as u8),
                ScalarType::F32 => out.extend_from_slice(&(value[c] as f32).to_ne_bytes()),
                ScalarType::I32 => out.extend_from_slice(&(value[c] as i32).to_ne_bytes()),
                ScalarType::U32 => out.extend_from_slice(&(value[c] as u32).to_ne_bytes()),
                other => panic!("headless encode of {other:?} pixels"),
            }
        }
        out
    }

    /// Fill every sample of a color attachment with one value.
    fn fill_attachment(state: &mut State, texture: u32, value: [f64; 4]) {
        let store = state
            .textures
            .get_mut(&texture)
            .unwrap_or_else(|| panic!("no texture #{texture}"));
        let info = store.info.expect("attachment without storage");
        let encoded = Self::encode(&info, value);
        if let Some(pixels) = store.pixels.as_mut() {
            for chunk in pixels.chunks_exact_mut(encoded.len()) {
                chunk.copy_from_slice(&encoded);
            }
        }
    }

    fn color_attachment_of(state: &State, framebuffer: u32, index: u32) -> u32 {
        *state
            .framebuffers
            .get(&framebuffer)
            .unwrap_or_else(|| panic!("no framebuffer #{framebuffer}"))
            .color
            .get(&index)
            .unwrap_or_else(|| panic!("framebuffer #{framebuffer} has no color attachment {index}"))
    }
}

impl GlBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_object(&self, kind: ObjectKind) -> u32 {
        let mut state = self.state.borrow_mut();
        let class = kind.class();
        let id = Self::alloc_id(&mut state, class);
        match class {
            ObjectClass::Buffer => {
                state.buffers.insert(id, BufferStore::default());
            }
            ObjectClass::VertexArray => {
                state.vertex_arrays.insert(id, HashMap::new());
            }
            ObjectClass::Texture => {
                state.textures.insert(id, TextureStore::default());
            }
            ObjectClass::Renderbuffer => {
                state.renderbuffers.insert(id, RenderbufferStore::default());
            }
            ObjectClass::Framebuffer => {
                state.framebuffers.insert(id, FramebufferStore::default());
            }
            ObjectClass::Shader => {
                state.shaders.insert(id, ShaderStore::default());
            }
            ObjectClass::Program => {
                state.programs.insert(id, ProgramStore::default());
            }
            ObjectClass::Query => {
                state.queries.insert(id, QueryStore::default());
            }
        }
        id
    }

    fn delete_object(&self, kind: ObjectKind, id: u32) {
        let mut state = self.state.borrow_mut();
        let class = kind.class();
        if state.live.remove(&(class, id)).is_none() {
            panic!("destroy of dead or foreign {class:?} #{id}");
        }
        state.destroyed_total += 1;
        // Stores are kept so tests can still inspect bytes after drops.
    }

    fn poll_error(&self) -> Option<DeviceError> {
        let mut state = self.state.borrow_mut();
        if state.errors.is_empty() {
            None
        } else {
            Some(state.errors.remove(0))
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        self.state.borrow_mut().buffer_bindings.insert(target, id);
    }

    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, _usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        let mut bytes = vec![0u8; size];
        if let Some(data) = data {
            assert!(data.len() <= size, "seed data larger than buffer");
            bytes[..data.len()].copy_from_slice(data);
        }
        let store = state.buffers.get_mut(&id).unwrap();
        store.bytes = bytes;
        store.allocated = true;
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        let store = state.buffers.get_mut(&id).unwrap();
        assert!(store.allocated, "sub-data upload to unallocated buffer #{id}");
        assert!(
            offset + data.len() <= store.bytes.len(),
            "upload range [{}, {}) outside buffer #{id} of size {}",
            offset,
            offset + data.len(),
            store.bytes.len()
        );
        store.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    fn copy_buffer_sub_data(&self, src_offset: usize, dst_offset: usize, size: usize) {
        let mut state = self.state.borrow_mut();
        let src = Self::bound_buffer(&state, BufferTarget::CopyRead);
        let dst = Self::bound_buffer(&state, BufferTarget::CopyWrite);
        let chunk = {
            let store = state.buffers.get(&src).unwrap();
            assert!(
                src_offset + size <= store.bytes.len(),
                "copy source range outside buffer #{src}"
            );
            store.bytes[src_offset..src_offset + size].to_vec()
        };
        let store = state.buffers.get_mut(&dst).unwrap();
        assert!(
            dst_offset + size <= store.bytes.len(),
            "copy destination range outside buffer #{dst}"
        );
        store.bytes[dst_offset..dst_offset + size].copy_from_slice(&chunk);
    }

    fn bind_buffer_base(&self, target: BufferTarget, _index: u32, id: u32) {
        assert!(
            matches!(target, BufferTarget::Uniform | BufferTarget::ShaderStorage),
            "indexed bind on non-indexed target {target:?}"
        );
        self.state.borrow_mut().buffer_bindings.insert(target, id);
    }

    fn bind_vertex_array(&self, id: u32) {
        self.state.borrow_mut().bound_vertex_array = id;
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
        let mut state = self.state.borrow_mut();
        let vao = state.bound_vertex_array;
        assert_ne!(vao, 0, "attribute pointer with no vertex array bound");
        let buffer = Self::bound_buffer(&state, BufferTarget::Vertex);
        state.vertex_arrays.get_mut(&vao).unwrap().insert(
            index,
            AttribRecord {
                buffer,
                channels,
                scalar,
                normalized,
                stride,
                offset,
            },
        );
    }

    fn enable_vertex_attrib(&self, _index: u32) {}

    fn bind_texture(&self, target: TextureTarget, id: u32) {
        self.state.borrow_mut().texture_bindings.insert(target, id);
    }

    fn active_texture(&self, _slot: u32) {}

    fn tex_storage(&self, desc: &TextureStorage) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_texture(&state, desc.target);
        let info = desc.format.describe();
        let store = state.textures.get_mut(&id).unwrap();
        assert!(
            store.storage.is_none(),
            "immutable storage of texture #{id} reallocated"
        );
        if desc.width == 0 || (desc.height == 0 && desc.target != TextureTarget::T1d) {
            return Err(GraphicsError::InvalidParameter(format!(
                "zero-sized texture storage {}x{}",
                desc.width, desc.height
            )));
        }
        store.storage = Some(*desc);
        store.info = Some(info);
        store.pixels = match desc.target {
            TextureTarget::T2d | TextureTarget::T2dMultisample | TextureTarget::CubeMap => {
                Some(vec![0u8; Self::plane_len(desc, &info)])
            }
            _ => None,
        };
        Ok(())
    }

    fn tex_sub_image(&self, upload: &TextureUpload, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_texture(&state, upload.target);
        let store = state.textures.get_mut(&id).unwrap();
        let storage = store.storage.expect("upload to texture without storage");
        assert!(
            storage.sample_count <= 1,
            "upload to multisampled texture #{id}"
        );
        let info = store.info.unwrap();
        assert_eq!(info.format, upload.format, "upload format mismatch");
        assert_eq!(info.scalar, upload.scalar, "upload scalar type mismatch");
        if upload.level == 0 {
            if let Some(pixels) = store.pixels.as_mut() {
                assert!(
                    data.len() <= pixels.len(),
                    "upload larger than texture #{id} storage"
                );
                pixels[..data.len()].copy_from_slice(data);
            }
        }
    }

    fn tex_parameter(&self, target: TextureTarget, parameter: TexParameter) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_texture(&state, target);
        let params = &mut state.textures.get_mut(&id).unwrap().params;
        match parameter {
            TexParameter::WrapS(mode) => params.wrap_s = mode,
            TexParameter::WrapT(mode) => params.wrap_t = mode,
            TexParameter::WrapR(mode) => params.wrap_r = mode,
            TexParameter::MinFilter(filter) => params.min_filter = filter,
            TexParameter::MagFilter(filter) => params.mag_filter = filter,
            TexParameter::SwizzleRgba(swizzle) => params.swizzle = swizzle,
            TexParameter::BorderColor(rgba) => params.border_color = rgba,
        }
    }

    fn pixel_store(&self, _parameter: PixelStore) {}

    fn generate_mipmap(&self, target: TextureTarget) {
        let state = self.state.borrow();
        Self::bound_texture(&state, target);
    }

    fn bind_renderbuffer(&self, id: u32) {
        self.state.borrow_mut().bound_renderbuffer = id;
    }

    fn renderbuffer_storage(&self, format: DepthFormat, sample_count: u32, _width: u32, _height: u32) {
        let mut state = self.state.borrow_mut();
        let id = state.bound_renderbuffer;
        assert_ne!(id, 0, "renderbuffer storage with no renderbuffer bound");
        let store = state.renderbuffers.get_mut(&id).unwrap();
        store.format = Some(format);
        store.sample_count = sample_count;
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, id: u32) {
        let mut state = self.state.borrow_mut();
        match target {
            FramebufferTarget::ReadDraw => {
                state.read_framebuffer = id;
                state.draw_framebuffer = id;
            }
            FramebufferTarget::Read => state.read_framebuffer = id,
            FramebufferTarget::Draw => state.draw_framebuffer = id,
        }
    }

    fn framebuffer_renderbuffer_depth(&self, renderbuffer: u32) {
        let mut state = self.state.borrow_mut();
        let fb = state.draw_framebuffer;
        assert_ne!(fb, 0, "depth attachment on the default surface");
        state.framebuffers.get_mut(&fb).unwrap().depth = Some(renderbuffer);
    }

    fn framebuffer_texture(&self, color_index: u32, _tex_target: TextureTarget, texture: u32, _level: u32) {
        let mut state = self.state.borrow_mut();
        let fb = state.draw_framebuffer;
        assert_ne!(fb, 0, "color attachment on the default surface");
        state
            .framebuffers
            .get_mut(&fb)
            .unwrap()
            .color
            .insert(color_index, texture);
    }

    fn draw_buffers(&self, color_indices: &[u32]) {
        let mut state = self.state.borrow_mut();
        let fb = state.draw_framebuffer;
        if fb != 0 {
            state.framebuffers.get_mut(&fb).unwrap().draw_buffers = color_indices.to_vec();
        }
    }

    fn read_buffer(&self, color_index: u32) {
        let mut state = self.state.borrow_mut();
        let fb = state.read_framebuffer;
        if fb != 0 {
            state.framebuffers.get_mut(&fb).unwrap().read_buffer = color_index;
        }
    }

    fn check_framebuffer_status(&self, target: FramebufferTarget) -> FramebufferStatus {
        let state = self.state.borrow();
        let fb = match target {
            FramebufferTarget::Read => state.read_framebuffer,
            _ => state.draw_framebuffer,
        };
        if fb == 0 {
            return FramebufferStatus::Complete;
        }
        let store = state.framebuffers.get(&fb).unwrap();
        if store.color.is_empty() && store.depth.is_none() {
            return FramebufferStatus::MissingAttachment;
        }
        let depth_samples = match store.depth {
            Some(rb) => {
                let rb_store = &state.renderbuffers[&rb];
                if rb_store.format.is_none() {
                    return FramebufferStatus::IncompleteAttachment;
                }
                Some(rb_store.sample_count.max(1))
            }
            None => None,
        };
        // Every attachment must agree on the sample count.
        for texture in store.color.values() {
            let storage = match state.textures[texture].storage {
                Some(storage) => storage,
                None => return FramebufferStatus::IncompleteAttachment,
            };
            if let Some(depth_samples) = depth_samples {
                if storage.sample_count.max(1) != depth_samples {
                    return FramebufferStatus::IncompleteMultisample;
                }
            }
        }
        FramebufferStatus::Complete
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.state.borrow_mut().clear_color_state = rgba;
    }

    fn clear(&self, mask: ClearMask) {
        let mut state = self.state.borrow_mut();
        let fb = state.draw_framebuffer;
        if fb == 0 || !mask.contains(ClearMask::COLOR) {
            return;
        }
        let value = state.clear_color_state.map(|c| c as f64);
        let targets: Vec<u32> = {
            let store = state.framebuffers.get(&fb).unwrap();
            store
                .draw_buffers
                .iter()
                .map(|i| Self::color_attachment_of(&state, fb, *i))
                .collect()
        };
        for texture in targets {
            Self::fill_attachment(&mut state, texture, value);
        }
    }

    fn clear_color_buffer(&self, draw_buffer: u32, value: ClearValue) {
        let mut state = self.state.borrow_mut();
        let fb = state.draw_framebuffer;
        assert_ne!(fb, 0, "typed clear on the default surface");
        let index = *state
            .framebuffers
            .get(&fb)
            .unwrap()
            .draw_buffers
            .get(draw_buffer as usize)
            .unwrap_or_else(|| panic!("draw buffer {draw_buffer} not selected"));
        let texture = Self::color_attachment_of(&state, fb, index);
        let info = state.textures[&texture].info.expect("attachment without storage");
        let channels = match (value, info.scalar) {
            (ClearValue::F32(v), ScalarType::U8 | ScalarType::F32) => v.map(|c| c as f64),
            (ClearValue::I32(v), ScalarType::I32) => v.map(|c| c as f64),
            (ClearValue::U32(v), ScalarType::U32) => v.map(|c| c as f64),
            (value, scalar) => panic!("clear value {value:?} does not match {scalar:?} attachment"),
        };
        Self::fill_attachment(&mut state, texture, channels);
    }

    fn clear_depth_buffer(&self, _value: f32) {}

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
        let state = self.state.borrow();
        let fb = state.read_framebuffer;
        assert_ne!(fb, 0, "headless readback from the default surface");
        let index = state.framebuffers[&fb].read_buffer;
        let texture = Self::color_attachment_of(&state, fb, index);
        let store = &state.textures[&texture];
        let info = store.info.expect("attachment without storage");
        assert_eq!(info.format, format, "readback format mismatch");
        assert_eq!(info.scalar, scalar, "readback scalar type mismatch");
        let storage = store.storage.unwrap();
        assert_eq!(storage.sample_count.max(1), 1, "readback from multisampled attachment");
        let pixels = store.pixels.as_ref().expect("attachment without pixel plane");
        let bpp = info.bytes_per_pixel();
        assert!(
            dst.len() >= (width * height) as usize * bpp,
            "readback destination too small"
        );
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                let sx = x + col;
                let sy = y + row;
                let dst_start = ((row as usize * width as usize) + col as usize) * bpp;
                let out = &mut dst[dst_start..dst_start + bpp];
                if sx < 0 || sy < 0 || sx >= storage.width as i32 || sy >= storage.height as i32 {
                    out.fill(0);
                    continue;
                }
                let src_start = ((sy as usize * storage.width as usize) + sx as usize) * bpp;
                out.copy_from_slice(&pixels[src_start..src_start + bpp]);
            }
        }
    }

    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], mask: ClearMask, filter: BlitFilter) {
        if !mask.contains(ClearMask::COLOR) {
            return;
        }
        let _ = filter; // sample averaging below is filter-independent
        let mut state = self.state.borrow_mut();
        let (read_fb, draw_fb) = (state.read_framebuffer, state.draw_framebuffer);
        assert_ne!(read_fb, 0, "headless blit from the default surface");
        let src_tex = Self::color_attachment_of(&state, read_fb, state.framebuffers[&read_fb].read_buffer);
        if draw_fb == 0 {
            return; // window surface is not stored
        }
        let dst_index = *state.framebuffers[&draw_fb]
            .draw_buffers
            .first()
            .expect("blit with no draw buffer selected");
        let dst_tex = Self::color_attachment_of(&state, draw_fb, dst_index);

        let (src_storage, src_info, src_pixels) = {
            let store = &state.textures[&src_tex];
            (
                store.storage.unwrap(),
                store.info.unwrap(),
                store.pixels.clone().expect("blit source without pixel plane"),
            )
        };
        let (dst_storage, dst_info) = {
            let store = &state.textures[&dst_tex];
            (store.storage.unwrap(), store.info.unwrap())
        };

        let src_bpp = src_info.bytes_per_pixel();
        let src_samples = src_storage.sample_count.max(1) as usize;
        let src_width = src[2] - src[0];
        let src_height = src[3] - src[1];
        let dst_width = dst[2] - dst[0];
        let dst_height = dst[3] - dst[1];
        if src_width <= 0 || src_height <= 0 || dst_width <= 0 || dst_height <= 0 {
            return;
        }

        let dst_samples = dst_storage.sample_count.max(1) as usize;
        let dst_bpp = dst_info.bytes_per_pixel();
        let mut writes: Vec<(usize, Vec<u8>)> = Vec::new();
        for dy in 0..dst_height {
            for dx in 0..dst_width {
                // Nearest source pixel; all source samples averaged (resolve).
                let sx = src[0] + (dx * src_width) / dst_width;
                let sy = src[1] + (dy * src_height) / dst_height;
                if sx < 0 || sy < 0 || sx >= src_storage.width as i32 || sy >= src_storage.height as i32 {
                    continue;
                }
                let mut accum = [0.0f64; 4];
                for s in 0..src_samples {
                    let start =
                        (((sy as usize * src_storage.width as usize) + sx as usize) * src_samples + s) * src_bpp;
                    let texel = Self::decode(&src_info, &src_pixels[start..start + src_bpp]);
                    for c in 0..4 {
                        accum[c] += texel[c];
                    }
                }
                for c in accum.iter_mut() {
                    *c /= src_samples as f64;
                }
                let encoded = Self::encode(&dst_info, accum);
                let px = dst[0] + dx;
                let py = dst[1] + dy;
                if px < 0 || py < 0 || px >= dst_storage.width as i32 || py >= dst_storage.height as i32 {
                    continue;
                }
                for s in 0..dst_samples {
                    let start =
                        (((py as usize * dst_storage.width as usize) + px as usize) * dst_samples + s) * dst_bpp;
                    writes.push((start, encoded.clone()));
                }
            }
        }
        let dst_store = state.textures.get_mut(&dst_tex).unwrap();
        let pixels = dst_store.pixels.as_mut().expect("blit destination without pixel plane");
        for (start, bytes) in writes {
            pixels[start..start + bytes.len()].copy_from_slice(&bytes);
        }
    }

    fn compile_shader(&self, shader: u32, source: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let store = state.shaders.get_mut(&shader).unwrap();
        if source.trim().is_empty() {
            store.compiled = false;
            store.log = "error: empty shader source".to_string();
        } else {
            store.compiled = true;
            store.log.clear();
        }
        store.compiled
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state.borrow().shaders[&shader].log.clone()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.programs.get_mut(&program).unwrap().attached.push(shader);
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        let attached = &mut state.programs.get_mut(&program).unwrap().attached;
        attached.retain(|s| *s != shader);
    }

    fn link_program(&self, program: u32) -> bool {
        let mut state = self.state.borrow_mut();
        let all_compiled = {
            let store = &state.programs[&program];
            !store.attached.is_empty()
                && store
                    .attached
                    .iter()
                    .all(|s| state.shaders.get(s).is_some_and(|sh| sh.compiled))
        };
        let store = state.programs.get_mut(&program).unwrap();
        store.linked = all_compiled;
        store.log = if all_compiled {
            String::new()
        } else {
            "error: link failed, attached shader did not compile".to_string()
        };
        all_compiled
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state.borrow().programs[&program].log.clone()
    }

    fn use_program(&self, id: u32) {
        self.state.borrow_mut().current_program = id;
    }

    fn set_uniform(&self, program: u32, name: &str, value: &UniformValue) -> bool {
        let mut state = self.state.borrow_mut();
        assert_eq!(
            state.current_program, program,
            "uniform set on a program that is not in use"
        );
        state
            .programs
            .get_mut(&program)
            .unwrap()
            .uniforms
            .insert(name.to_string(), *value);
        true
    }

    fn begin_query(&self, target: QueryTarget, id: u32) {
        let mut state = self.state.borrow_mut();
        assert!(
            !state.active_queries.contains_key(&target),
            "nested query on {target:?}"
        );
        state.active_queries.insert(target, id);
    }

    fn end_query(&self, target: QueryTarget) {
        let mut state = self.state.borrow_mut();
        let id = state
            .active_queries
            .remove(&target)
            .unwrap_or_else(|| panic!("end of inactive query target {target:?}"));
        state.query_counter += 1;
        let value = state.query_counter * 128;
        let store = state.queries.get_mut(&id).unwrap();
        // Results become visible one poll later, modeling GPU latency.
        store.in_flight = true;
        store.value = Some(value);
    }

    fn query_result(&self, id: u32) -> Option<u64> {
        let mut state = self.state.borrow_mut();
        let store = state.queries.get_mut(&id).unwrap();
        if store.in_flight {
            store.in_flight = false;
            None
        } else {
            store.value
        }
    }

    fn draw_arrays(&self, _mode: PrimitiveMode, _first: i32, _count: i32) {
        let state = self.state.borrow();
        assert_ne!(state.bound_vertex_array, 0, "draw with no vertex array bound");
    }

    fn draw_elements(&self, _mode: PrimitiveMode, _count: i32, _index_type: IndexType, _offset: usize) {
        let state = self.state.borrow();
        assert_ne!(state.bound_vertex_array, 0, "draw with no vertex array bound");
        Self::bound_buffer(&state, BufferTarget::Index);
    }

    fn multi_draw_elements_indirect(&self, _mode: PrimitiveMode, _index_type: IndexType, draw_count: u32) {
        let state = self.state.borrow();
        assert_ne!(state.bound_vertex_array, 0, "draw with no vertex array bound");
        Self::bound_buffer(&state, BufferTarget::Index);
        let indirect = Self::bound_buffer(&state, BufferTarget::DrawIndirect);
        let len = state.buffers[&indirect].bytes.len();
        assert!(
            len >= draw_count as usize * DrawElementsIndirectCommand::SIZE,
            "indirect buffer holds {} bytes, {} draws requested",
            len,
            draw_count
        );
    }

    fn set_viewport(&self, _x: i32, _y: i32, _width: u32, _height: u32) {}

    fn enable(&self, _capability: Capability) {}

    fn disable(&self, _capability: Capability) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_lifecycle() {
        let backend = HeadlessBackend::new();
        let id = backend.create_object(ObjectKind::Buffer);
        assert_ne!(id, 0);
        assert_eq!(backend.live_object_count(), 1);
        backend.delete_object(ObjectKind::Buffer, id);
        assert_eq!(backend.live_object_count(), 0);
        assert_eq!(backend.created_total(), 1);
        assert_eq!(backend.destroyed_total(), 1);
    }

    #[test]
    #[should_panic(expected = "destroy of dead or foreign")]
    fn test_double_destroy_panics() {
        let backend = HeadlessBackend::new();
        let id = backend.create_object(ObjectKind::Texture);
        backend.delete_object(ObjectKind::Texture, id);
        backend.delete_object(ObjectKind::Texture, id);
    }

    #[test]
    #[should_panic(expected = "no buffer bound")]
    fn test_act_without_bind_panics() {
        let backend = HeadlessBackend::new();
        backend.create_object(ObjectKind::Buffer);
        backend.buffer_data(BufferTarget::Vertex, 16, None, BufferUsage::StaticDraw);
    }

    #[test]
    fn test_buffer_copy_moves_bytes() {
        let backend = HeadlessBackend::new();
        let a = backend.create_object(ObjectKind::Buffer);
        let b = backend.create_object(ObjectKind::Buffer);
        backend.bind_buffer(BufferTarget::Vertex, a);
        backend.buffer_data(BufferTarget::Vertex, 4, Some(&[1, 2, 3, 4]), BufferUsage::StaticDraw);
        backend.bind_buffer(BufferTarget::Vertex, b);
        backend.buffer_data(BufferTarget::Vertex, 8, None, BufferUsage::StaticDraw);
        backend.bind_buffer(BufferTarget::CopyRead, a);
        backend.bind_buffer(BufferTarget::CopyWrite, b);
        backend.copy_buffer_sub_data(0, 4, 4);
        assert_eq!(backend.buffer_bytes(b), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_query_result_latency() {
        let backend = HeadlessBackend::new();
        let q = backend.create_object(ObjectKind::Query);
        backend.begin_query(QueryTarget::TimeElapsed, q);
        backend.end_query(QueryTarget::TimeElapsed);
        assert_eq!(backend.query_result(q), None);
        assert!(backend.query_result(q).is_some());
    }
}
