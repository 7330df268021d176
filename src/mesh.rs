//! Device-resident meshes and mesh combination.
//!
//! A [`Mesh`] owns one vertex-array object, one interleaved vertex buffer,
//! one index buffer, a submesh table with a parallel per-submesh instance
//! count table, and a derived indirect-draw-command buffer. The command
//! buffer is regenerated whenever submeshes or instance counts change, so
//! it can never be read stale.
//!
//! [`Mesh::combine`] merges N independently built meshes into one
//! device-resident mesh: buffers are concatenated with device-side copies
//! (never staging through host memory), submeshes are re-based by the
//! running index/vertex offsets, and drawing the result issues exactly one
//! multi-draw-indirect dispatch covering all submeshes. That single
//! dispatch is the point: per-submesh driver overhead collapses to O(1).

use bytemuck::Pod;

use crate::backend::types::*;
use crate::context::Context;
use crate::error::Result;
use crate::handle::GlObject;
use crate::resources::Buffer;

/// Fixed layout of one vertex attribute: scalar type, channel count and
/// integer-normalization flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub scalar: ScalarType,
    pub channels: u32,
    pub normalized: bool,
}

impl AttributeLayout {
    /// Bytes one vertex contributes to this attribute.
    pub fn size(&self) -> usize {
        self.channels as usize * self.scalar.size()
    }
}

/// One externally separate attribute array handed to
/// [`Mesh::set_vertex_attributes`] for interleaving.
pub struct VertexAttribute<'a> {
    data: &'a [u8],
    layout: AttributeLayout,
}

impl<'a> VertexAttribute<'a> {
    pub fn new(data: &'a [u8], scalar: ScalarType, channels: u32) -> Self {
        let layout = AttributeLayout {
            scalar,
            channels,
            normalized: false,
        };
        assert!(channels > 0, "attribute with zero channels");
        assert!(
            !data.is_empty() && data.len() % layout.size() == 0,
            "attribute data ({} bytes) is not a whole number of {}-byte vertices",
            data.len(),
            layout.size()
        );
        Self { data, layout }
    }

    /// Reinterpret a typed slice as attribute data.
    pub fn from_slice<T: Pod>(values: &'a [T], scalar: ScalarType, channels: u32) -> Self {
        Self::new(bytemuck::cast_slice(values), scalar, channels)
    }

    /// Mark integer data as normalized on fetch.
    pub fn normalized(mut self) -> Self {
        self.layout.normalized = true;
        self
    }

    fn vertex_count(&self) -> u32 {
        (self.data.len() / self.layout.size()) as u32
    }
}

/// One contiguous drawable range within the shared index/vertex buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// Number of indices in the range.
    pub index_count: u32,
    /// Offset (in indices) of the range's first index.
    pub first_index: u32,
    /// Value added to every fetched index.
    pub base_vertex: u32,
}

/// Device vertex/index storage plus draw metadata.
pub struct Mesh {
    ctx: Context,
    vao: GlObject,
    vertex_buffer: Option<Buffer>,
    index_buffer: Option<Buffer>,
    indirect_buffer: Option<Buffer>,
    primitive: Option<PrimitiveMode>,
    index_type: Option<IndexType>,
    vertex_count: u32,
    index_count: u32,
    layouts: Vec<AttributeLayout>,
    submeshes: Vec<SubMesh>,
    instance_counts: Vec<u32>,
}

impl Mesh {
    pub fn new(ctx: &Context) -> Result<Self> {
        let vao = GlObject::create(ctx, ObjectKind::VertexArray)?;
        Ok(Self {
            ctx: ctx.clone(),
            vao,
            vertex_buffer: None,
            index_buffer: None,
            indirect_buffer: None,
            primitive: None,
            index_type: None,
            vertex_count: 0,
            index_count: 0,
            layouts: Vec::new(),
            submeshes: Vec::new(),
            instance_counts: Vec::new(),
        })
    }

    /// Interleave the given attribute arrays into one vertex buffer and
    /// configure one attribute binding per array, in order.
    ///
    /// Every array must describe the same number of vertices.
    pub fn set_vertex_attributes(&mut self, attributes: &[VertexAttribute]) -> Result<&mut Self> {
        assert!(!attributes.is_empty(), "mesh with no vertex attributes");

        let vertex_count = attributes[0].vertex_count();
        for attribute in attributes {
            assert_eq!(
                attribute.vertex_count(),
                vertex_count,
                "attribute arrays disagree on vertex count"
            );
        }

        let stride: usize = attributes.iter().map(|a| a.layout.size()).sum();
        let mut staging = vec![0u8; stride * vertex_count as usize];
        let mut offset = 0usize;
        for attribute in attributes {
            let chunk = attribute.layout.size();
            for v in 0..vertex_count as usize {
                let dst = v * stride + offset;
                staging[dst..dst + chunk].copy_from_slice(&attribute.data[v * chunk..(v + 1) * chunk]);
            }
            offset += chunk;
        }

        let buffer = Buffer::new(
            &self.ctx,
            BufferTarget::Vertex,
            staging.len(),
            Some(&staging),
            BufferUsage::StaticDraw,
        )?;

        let backend = self.ctx.backend();
        backend.bind_vertex_array(self.vao.id());
        buffer.bind();
        let mut offset = 0u32;
        for (index, attribute) in attributes.iter().enumerate() {
            backend.vertex_attrib_pointer(
                index as u32,
                attribute.layout.channels,
                attribute.layout.scalar,
                attribute.layout.normalized,
                stride as u32,
                offset,
            );
            backend.enable_vertex_attrib(index as u32);
            offset += attribute.layout.size() as u32;
        }

        self.vertex_buffer = Some(buffer);
        self.vertex_count = vertex_count;
        self.layouts = attributes.iter().map(|a| a.layout).collect();
        Ok(self)
    }

    /// Upload 32-bit indices and record one submesh spanning the whole
    /// buffer.
    pub fn set_indices(&mut self, primitive: PrimitiveMode, indices: &[u32]) -> Result<&mut Self> {
        self.set_index_bytes(primitive, bytemuck::cast_slice(indices), IndexType::U32)
    }

    /// Upload 16-bit indices and record one submesh spanning the whole
    /// buffer.
    pub fn set_indices_u16(&mut self, primitive: PrimitiveMode, indices: &[u16]) -> Result<&mut Self> {
        self.set_index_bytes(primitive, bytemuck::cast_slice(indices), IndexType::U16)
    }

    fn set_index_bytes(
        &mut self,
        primitive: PrimitiveMode,
        bytes: &[u8],
        index_type: IndexType,
    ) -> Result<&mut Self> {
        assert!(!bytes.is_empty(), "empty index data");
        let count = (bytes.len() / index_type.size()) as u32;

        let backend = self.ctx.backend();
        backend.bind_vertex_array(self.vao.id());
        self.index_buffer = Some(Buffer::new(
            &self.ctx,
            BufferTarget::Index,
            bytes.len(),
            Some(bytes),
            BufferUsage::StaticDraw,
        )?);
        self.primitive = Some(primitive);
        self.index_type = Some(index_type);
        self.index_count = count;
        self.submeshes = vec![SubMesh {
            index_count: count,
            first_index: 0,
            base_vertex: 0,
        }];
        self.instance_counts = vec![1];
        if self.indirect_buffer.is_some() {
            self.rebuild_indirect()?;
        }
        Ok(self)
    }

    /// Replace the per-submesh instance counts and regenerate the indirect
    /// command buffer. `counts` must have exactly one entry per submesh.
    pub fn set_instance_counts(&mut self, counts: &[u32]) -> Result<&mut Self> {
        assert_eq!(
            counts.len(),
            self.submeshes.len(),
            "{} instance counts for {} submeshes",
            counts.len(),
            self.submeshes.len()
        );
        self.instance_counts = counts.to_vec();
        self.rebuild_indirect()?;
        Ok(self)
    }

    /// Re-derive the indirect commands from the submesh and instance-count
    /// tables: one fixed-layout record per submesh, in submesh order.
    fn rebuild_indirect(&mut self) -> Result<()> {
        let commands: Vec<DrawElementsIndirectCommand> = self
            .submeshes
            .iter()
            .zip(&self.instance_counts)
            .map(|(submesh, &instance_count)| DrawElementsIndirectCommand {
                index_count: submesh.index_count,
                instance_count,
                first_index: submesh.first_index,
                base_vertex: submesh.base_vertex,
                base_instance: 0,
            })
            .collect();
        self.indirect_buffer = Some(Buffer::from_slice(
            &self.ctx,
            BufferTarget::DrawIndirect,
            &commands,
            BufferUsage::StaticDraw,
        )?);
        Ok(())
    }

    /// Build one mesh from N sources sharing the same attribute layout,
    /// primitive type and index type.
    ///
    /// Vertex and index buffers are concatenated on the device at
    /// accumulated byte offsets; each source submesh is re-based by the
    /// running index and vertex totals, preserving relative order. Submesh
    /// identity in the result is positional: concatenation order is the
    /// only source of truth for per-object bookkeeping.
    pub fn combine(meshes: &[&Mesh]) -> Result<Mesh> {
        assert!(!meshes.is_empty(), "combine of zero meshes");
        let first = meshes[0];
        assert!(!first.layouts.is_empty(), "combine of meshes without attributes");

        let mut vertex_bytes = 0usize;
        let mut index_bytes = 0usize;
        let mut submesh_total = 0usize;
        for mesh in meshes {
            assert_eq!(
                mesh.layouts, first.layouts,
                "combined meshes must declare identical attributes in identical order"
            );
            assert_eq!(
                mesh.primitive, first.primitive,
                "combined meshes must share a primitive type"
            );
            assert_eq!(
                mesh.index_type, first.index_type,
                "combined meshes must share an index type"
            );
            let vb = mesh.vertex_buffer.as_ref().expect("combine source without vertices");
            let ib = mesh.index_buffer.as_ref().expect("combine source without indices");
            assert_eq!(
                mesh.instance_counts.len(),
                mesh.submeshes.len(),
                "combine source with undefined instance counts"
            );
            vertex_bytes += vb.size();
            index_bytes += ib.size();
            submesh_total += mesh.submeshes.len();
        }

        let ctx = &first.ctx;
        let mut dst = Mesh::new(ctx)?;
        dst.primitive = first.primitive;
        dst.index_type = first.index_type;
        dst.layouts = first.layouts.clone();

        let index_buffer = Buffer::new(ctx, BufferTarget::Index, index_bytes, None, BufferUsage::StaticDraw)?;
        let vertex_buffer =
            Buffer::new(ctx, BufferTarget::Vertex, vertex_bytes, None, BufferUsage::StaticDraw)?;

        // The combined vertex array fetches from the combined buffer with
        // the shared layout.
        let backend = ctx.backend();
        backend.bind_vertex_array(dst.vao.id());
        vertex_buffer.bind();
        let stride: usize = first.layouts.iter().map(|l| l.size()).sum();
        let mut offset = 0u32;
        for (index, layout) in first.layouts.iter().enumerate() {
            backend.vertex_attrib_pointer(
                index as u32,
                layout.channels,
                layout.scalar,
                layout.normalized,
                stride as u32,
                offset,
            );
            backend.enable_vertex_attrib(index as u32);
            offset += layout.size() as u32;
        }

        let mut submeshes = Vec::with_capacity(submesh_total);
        let mut instance_counts = Vec::with_capacity(submesh_total);
        let mut dst_index_offset = 0usize; // bytes into the combined index buffer
        let mut dst_vertex_offset = 0usize; // bytes into the combined vertex buffer
        let mut base_vertex = 0u32; // vertices accumulated so far
        let mut first_index = 0u32; // indices accumulated so far
        for mesh in meshes {
            for submesh in &mesh.submeshes {
                submeshes.push(SubMesh {
                    index_count: submesh.index_count,
                    first_index: first_index + submesh.first_index,
                    base_vertex: base_vertex + submesh.base_vertex,
                });
            }
            instance_counts.extend_from_slice(&mesh.instance_counts);

            let src_indices = mesh.index_buffer.as_ref().unwrap();
            src_indices.copy_all_to(&index_buffer, dst_index_offset);
            dst_index_offset += src_indices.size();

            let src_vertices = mesh.vertex_buffer.as_ref().unwrap();
            src_vertices.copy_all_to(&vertex_buffer, dst_vertex_offset);
            dst_vertex_offset += src_vertices.size();

            base_vertex += mesh.vertex_count;
            first_index += mesh.index_count;
        }

        dst.vertex_buffer = Some(vertex_buffer);
        dst.index_buffer = Some(index_buffer);
        dst.vertex_count = base_vertex;
        dst.index_count = first_index;
        dst.submeshes = submeshes;
        dst.set_instance_counts(&instance_counts)?;
        Ok(dst)
    }

    /// Draw with the recorded primitive type.
    ///
    /// With an indirect buffer present this is a single multi-draw-indirect
    /// dispatch covering every submesh; otherwise a plain indexed (or
    /// array) draw.
    pub fn draw(&self) {
        let primitive = self.primitive.expect("draw of a mesh with no primitive type");
        self.draw_with(primitive);
    }

    /// Draw with an explicit primitive type.
    pub fn draw_with(&self, primitive: PrimitiveMode) {
        let backend = self.ctx.backend();
        backend.bind_vertex_array(self.vao.id());
        if let Some(index_buffer) = &self.index_buffer {
            index_buffer.bind();
            let index_type = self.index_type.expect("indexed mesh without index type");
            if let Some(indirect) = &self.indirect_buffer {
                indirect.bind();
                backend.multi_draw_elements_indirect(primitive, index_type, self.submeshes.len() as u32);
            } else {
                backend.draw_elements(primitive, self.index_count as i32, index_type, 0);
            }
        } else {
            backend.draw_arrays(primitive, 0, self.index_count as i32);
        }
    }

    /// Non-indexed draw of `vertex_count` vertices; used for attribute-less
    /// full-screen geometry.
    pub fn draw_arrays(&self, primitive: PrimitiveMode, vertex_count: u32) {
        let backend = self.ctx.backend();
        backend.bind_vertex_array(self.vao.id());
        backend.draw_arrays(primitive, 0, vertex_count as i32);
    }

    /// Bytes of one interleaved vertex.
    pub fn vertex_stride(&self) -> usize {
        self.layouts.iter().map(|l| l.size()).sum()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn instance_counts(&self) -> &[u32] {
        &self.instance_counts
    }

    pub fn attribute_layouts(&self) -> &[AttributeLayout] {
        &self.layouts
    }

    pub fn primitive(&self) -> Option<PrimitiveMode> {
        self.primitive
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.index_type
    }

    pub fn vertex_buffer(&self) -> Option<&Buffer> {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&Buffer> {
        self.index_buffer.as_ref()
    }

    pub fn indirect_buffer(&self) -> Option<&Buffer> {
        self.indirect_buffer.as_ref()
    }

    /// Raw vertex-array identifier.
    pub fn id(&self) -> u32 {
        self.vao.id()
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vao", &self.vao.id())
            .field("vertices", &self.vertex_count)
            .field("indices", &self.index_count)
            .field("submeshes", &self.submeshes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(ctx: &Context, z: f32) -> Mesh {
        let positions = [[0.0f32, 0.0, z], [1.0, 0.0, z], [0.0, 1.0, z]];
        let uvs = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let mut mesh = Mesh::new(ctx).unwrap();
        mesh.set_vertex_attributes(&[
            VertexAttribute::from_slice(&positions, ScalarType::F32, 3),
            VertexAttribute::from_slice(&uvs, ScalarType::F32, 2),
        ])
        .unwrap()
        .set_indices(PrimitiveMode::Triangles, &[0, 1, 2])
        .unwrap();
        mesh
    }

    #[test]
    fn test_interleaved_stride() {
        let ctx = Context::headless();
        let mesh = triangle(&ctx, 0.0);
        assert_eq!(mesh.vertex_stride(), 20);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.submesh_count(), 1);
        assert_eq!(mesh.instance_counts(), &[1]);
    }

    #[test]
    #[should_panic(expected = "disagree on vertex count")]
    fn test_unequal_attribute_counts_abort() {
        let ctx = Context::headless();
        let positions = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.0f32, 0.0], [1.0, 0.0]];
        let mut mesh = Mesh::new(&ctx).unwrap();
        let _ = mesh.set_vertex_attributes(&[
            VertexAttribute::from_slice(&positions, ScalarType::F32, 3),
            VertexAttribute::from_slice(&uvs, ScalarType::F32, 2),
        ]);
    }

    #[test]
    #[should_panic(expected = "instance counts for")]
    fn test_instance_count_size_mismatch_aborts() {
        let ctx = Context::headless();
        let mut mesh = triangle(&ctx, 0.0);
        let _ = mesh.set_instance_counts(&[1, 2]);
    }

    #[test]
    #[should_panic(expected = "identical attributes")]
    fn test_heterogeneous_combine_aborts() {
        let ctx = Context::headless();
        let a = triangle(&ctx, 0.0);

        let positions = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut b = Mesh::new(&ctx).unwrap();
        b.set_vertex_attributes(&[VertexAttribute::from_slice(&positions, ScalarType::F32, 3)])
            .unwrap()
            .set_indices(PrimitiveMode::Triangles, &[0, 1, 2])
            .unwrap();

        let _ = Mesh::combine(&[&a, &b]);
    }

    #[test]
    fn test_combine_counts() {
        let ctx = Context::headless();
        let a = triangle(&ctx, 0.0);
        let b = triangle(&ctx, 1.0);
        let combined = Mesh::combine(&[&a, &b]).unwrap();
        assert_eq!(combined.submesh_count(), 2);
        assert_eq!(combined.vertex_count(), 6);
        assert_eq!(combined.index_count(), 6);
        assert_eq!(combined.submeshes()[1].base_vertex, 3);
        assert_eq!(combined.submeshes()[1].first_index, 3);
    }
}
