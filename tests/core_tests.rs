//! Integration tests over the headless backend.
//!
//! These exercise the observable device-side effects of the wrapper layer:
//! the exact bytes moved by mesh combination, the derived indirect command
//! tables, resource lifetimes, and the framebuffer resolve path.

mod common;

use common::headless_context;

use glkit::prelude::*;

fn triangle_mesh(ctx: &Context, base: f32) -> Mesh {
    let positions = [
        [base, 0.0f32, 0.0],
        [base + 1.0, 0.0, 0.0],
        [base, 1.0, 0.0],
    ];
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

fn decode_commands(bytes: &[u8]) -> Vec<DrawElementsIndirectCommand> {
    bytes
        .chunks_exact(DrawElementsIndirectCommand::SIZE)
        .map(|chunk| {
            let field = |i: usize| u32::from_ne_bytes(chunk[i * 4..i * 4 + 4].try_into().unwrap());
            DrawElementsIndirectCommand {
                index_count: field(0),
                instance_count: field(1),
                first_index: field(2),
                base_vertex: field(3),
                base_instance: field(4),
            }
        })
        .collect()
}

#[test]
fn test_interleaving_produces_strided_vertex_buffer() {
    let (ctx, backend) = headless_context();
    let mesh = triangle_mesh(&ctx, 0.0);

    let bytes = backend.buffer_bytes(mesh.vertex_buffer().unwrap().id());
    assert_eq!(bytes.len(), 3 * 20);
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap()))
        .collect();
    // Vertex 1: position (1, 0, 0) then uv (1, 0).
    assert_eq!(&floats[5..10], &[1.0, 0.0, 0.0, 1.0, 0.0]);

    // One attribute binding per array, at the matching byte offset.
    let layout = backend.vertex_layout(mesh.id());
    assert_eq!(layout.len(), 2);
    assert_eq!(layout[0].1.offset, 0);
    assert_eq!(layout[0].1.stride, 20);
    assert_eq!(layout[1].1.offset, 12);
    assert_eq!(layout[1].1.channels, 2);
}

#[test]
fn test_combine_concatenates_buffers_device_side() {
    let (ctx, backend) = headless_context();
    let a = triangle_mesh(&ctx, 0.0);
    let b = triangle_mesh(&ctx, 10.0);

    let a_vertices = backend.buffer_bytes(a.vertex_buffer().unwrap().id());
    let b_vertices = backend.buffer_bytes(b.vertex_buffer().unwrap().id());
    let a_indices = backend.buffer_bytes(a.index_buffer().unwrap().id());
    let b_indices = backend.buffer_bytes(b.index_buffer().unwrap().id());

    let combined = Mesh::combine(&[&a, &b]).unwrap();

    let mut expected_vertices = a_vertices.clone();
    expected_vertices.extend_from_slice(&b_vertices);
    assert_eq!(
        backend.buffer_bytes(combined.vertex_buffer().unwrap().id()),
        expected_vertices
    );

    let mut expected_indices = a_indices.clone();
    expected_indices.extend_from_slice(&b_indices);
    assert_eq!(
        backend.buffer_bytes(combined.index_buffer().unwrap().id()),
        expected_indices
    );

    assert_eq!(combined.vertex_count(), a.vertex_count() + b.vertex_count());
    assert_eq!(combined.index_count(), a.index_count() + b.index_count());
}

#[test]
fn test_combine_rebases_submeshes_positionally() {
    let (ctx, _) = headless_context();
    let a = triangle_mesh(&ctx, 0.0);
    let b = triangle_mesh(&ctx, 1.0);
    let c = triangle_mesh(&ctx, 2.0);

    let combined = Mesh::combine(&[&a, &b, &c]).unwrap();
    assert_eq!(combined.submesh_count(), 3);

    // First input keeps its offsets; later inputs shift by the running
    // index/vertex totals, in concatenation order.
    let submeshes = combined.submeshes();
    assert_eq!(submeshes[0].first_index, 0);
    assert_eq!(submeshes[0].base_vertex, 0);
    assert_eq!(submeshes[1].first_index, a.index_count());
    assert_eq!(submeshes[1].base_vertex, a.vertex_count());
    assert_eq!(submeshes[2].first_index, a.index_count() + b.index_count());
    assert_eq!(submeshes[2].base_vertex, a.vertex_count() + b.vertex_count());
}

#[test]
fn test_combined_instance_counts_follow_submesh_order() {
    let (ctx, backend) = headless_context();
    let mut a = triangle_mesh(&ctx, 0.0);
    let mut b = triangle_mesh(&ctx, 1.0);
    a.set_instance_counts(&[1]).unwrap();
    b.set_instance_counts(&[2]).unwrap();

    let combined = Mesh::combine(&[&a, &b]).unwrap();
    assert_eq!(combined.instance_counts(), &[1, 2]);

    let commands = decode_commands(&backend.buffer_bytes(combined.indirect_buffer().unwrap().id()));
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].instance_count, 1);
    assert_eq!(commands[0].base_vertex, 0);
    assert_eq!(commands[0].first_index, 0);
    assert_eq!(commands[1].instance_count, 2);
    assert_eq!(commands[1].base_vertex, 3);
    assert_eq!(commands[1].first_index, 3);
    assert!(commands.iter().all(|cmd| cmd.base_instance == 0));
}

#[test]
fn test_instance_counts_commute_with_combine() {
    let (ctx, backend) = headless_context();

    // Counts applied before combining...
    let mut a = triangle_mesh(&ctx, 0.0);
    let mut b = triangle_mesh(&ctx, 1.0);
    a.set_instance_counts(&[3]).unwrap();
    b.set_instance_counts(&[5]).unwrap();
    let before = Mesh::combine(&[&a, &b]).unwrap();
    let table_before = backend.buffer_bytes(before.indirect_buffer().unwrap().id());

    // ...or after, produce identical indirect command tables.
    let c = triangle_mesh(&ctx, 0.0);
    let d = triangle_mesh(&ctx, 1.0);
    let mut after = Mesh::combine(&[&c, &d]).unwrap();
    after.set_instance_counts(&[3, 5]).unwrap();
    let table_after = backend.buffer_bytes(after.indirect_buffer().unwrap().id());

    assert_eq!(table_before, table_after);
}

#[test]
fn test_indirect_table_never_stale_after_count_change() {
    let (ctx, backend) = headless_context();
    let mut mesh = triangle_mesh(&ctx, 0.0);
    mesh.set_instance_counts(&[7]).unwrap();
    let commands = decode_commands(&backend.buffer_bytes(mesh.indirect_buffer().unwrap().id()));
    assert_eq!(commands[0].instance_count, 7);

    mesh.set_instance_counts(&[9]).unwrap();
    let commands = decode_commands(&backend.buffer_bytes(mesh.indirect_buffer().unwrap().id()));
    assert_eq!(commands[0].instance_count, 9);
}

#[test]
fn test_every_object_is_destroyed_exactly_once() {
    let (ctx, backend) = headless_context();
    {
        let a = triangle_mesh(&ctx, 0.0);
        let b = triangle_mesh(&ctx, 1.0);
        let combined = Mesh::combine(&[&a, &b]).unwrap();
        combined.draw();

        let mut viewport = Viewport::new(&ctx, "leak-check", &[InternalFormat::R32I]).unwrap();
        viewport.resize(8, 8, 4).unwrap();

        let _query = Query::new(&ctx, QueryTarget::TimeElapsed).unwrap();
        let _texture = Texture::make_2d(
            &ctx,
            InternalFormat::Rgba8,
            4,
            4,
            1,
            1,
            None,
            TextureOptions::default(),
        )
        .unwrap();
    }
    // The headless backend panics on double-destroy; reaching this point
    // with an empty live set means exactly-once destruction held.
    assert_eq!(backend.live_object_count(), 0);
    assert_eq!(backend.created_total(), backend.destroyed_total());
    assert!(backend.created_total() > 10);
}

#[test]
fn test_lod_count_matches_formula_and_is_monotonic() {
    let (ctx, _) = headless_context();
    let mut previous = 0;
    for size in [1u32, 2, 3, 4, 7, 8, 9, 64, 100, 512, 1000] {
        let texture = Texture::make_2d(
            &ctx,
            InternalFormat::Rgba8,
            size,
            size / 2 + 1,
            1,
            1,
            None,
            TextureOptions::default(),
        )
        .unwrap();
        let expected = (size.max(size / 2 + 1) as f32).log2().floor() as u32 + 1;
        assert_eq!(texture.lod_count_2d(), expected, "size {size}");
        assert!(texture.lod_count_2d() >= previous);
        previous = texture.lod_count_2d();
    }
}

#[test]
fn test_single_sampled_viewport_needs_no_resolve_target() {
    let (ctx, _) = headless_context();
    let mut viewport = Viewport::new(&ctx, "plain", &[]).unwrap();
    viewport.resize(4, 4, 1).unwrap();
    // Without multisampling the final framebuffer is the render target
    // itself; no resolve framebuffer is allocated.
    assert_eq!(viewport.final_framebuffer().id(), viewport.framebuffer().id());
    viewport.resolve(); // no-op
    assert_eq!(viewport.final_framebuffer().id(), viewport.framebuffer().id());
}

#[test]
fn test_multisample_resolve_readback_returns_filtered_value() {
    let (ctx, _) = headless_context();
    let mut viewport = Viewport::new(&ctx, "msaa", &[]).unwrap();
    viewport.resize(4, 4, 4).unwrap();

    viewport
        .framebuffer()
        .clear([0.25, 0.5, 0.75, 1.0], ClearMask::COLOR | ClearMask::DEPTH);
    viewport.resolve();

    let resolve = viewport.final_framebuffer();
    assert_eq!(resolve.sample_count(), 1);
    let mut pixels = vec![0u8; 4 * 4 * 4];
    resolve.readback_full(&mut pixels, 0);
    for pixel in pixels.chunks_exact(4) {
        assert_eq!(pixel, &[64, 128, 191, 255]);
    }
}

#[test]
fn test_sampling_state_setters_are_idempotent() {
    let (ctx, backend) = headless_context();
    let texture = Texture::make_2d(
        &ctx,
        InternalFormat::Rgba8,
        16,
        16,
        1,
        1,
        None,
        TextureOptions::default(),
    )
    .unwrap();

    texture
        .set_wrapping(WrapMode::ClampToEdge, WrapMode::MirroredRepeat, WrapMode::Repeat)
        .set_filtering(FilterMode::Linear, FilterMode::LinearMipmapLinear)
        .set_swizzling([Swizzle::Red, Swizzle::Red, Swizzle::Red, Swizzle::One])
        .set_border_color([1.0, 0.0, 0.0, 1.0]);
    let once = backend.texture_parameters(texture.id());

    // Same calls again, different order: device state must be unchanged.
    texture
        .set_border_color([1.0, 0.0, 0.0, 1.0])
        .set_swizzling([Swizzle::Red, Swizzle::Red, Swizzle::Red, Swizzle::One])
        .set_filtering(FilterMode::Linear, FilterMode::LinearMipmapLinear)
        .set_wrapping(WrapMode::ClampToEdge, WrapMode::MirroredRepeat, WrapMode::Repeat);
    let twice = backend.texture_parameters(texture.id());

    assert_eq!(once, twice);
}

#[test]
fn test_uniforms_are_set_by_name_through_the_value_variant() {
    let (ctx, backend) = headless_context();
    let vertex = Shader::compile(&ctx, ShaderStage::Vertex, "#version 460 core\nvoid main() {}").unwrap();
    assert!(vertex.compiled());
    let program = Program::link(&ctx, &[&vertex]).unwrap();
    assert!(program.linked());
    assert!(program.log().is_empty());

    program
        .set_uniform("exposure", 1.5f32)
        .set_uniform("object_id", 7i32);
    assert_eq!(
        backend.program_uniform(program.id(), "exposure"),
        Some(UniformValue::F32(1.5))
    );
    assert_eq!(
        backend.program_uniform(program.id(), "object_id"),
        Some(UniformValue::I32(7))
    );
    assert_eq!(backend.program_uniform(program.id(), "missing"), None);
}

#[test]
fn test_device_errors_are_drained_by_polling() {
    let (ctx, backend) = headless_context();
    assert_eq!(ctx.poll_errors(), 0);
    backend.push_error(DeviceError::InvalidOperation);
    backend.push_error(DeviceError::OutOfMemory);
    // Advisory only: both errors are logged and drained, nothing aborts.
    assert_eq!(ctx.poll_errors(), 2);
    assert_eq!(ctx.poll_errors(), 0);
}

#[test]
fn test_integer_attachment_supports_typed_clear_and_picking_readback() {
    let (ctx, _) = headless_context();
    let mut viewport = Viewport::new(&ctx, "picking", &[InternalFormat::R32I]).unwrap();
    viewport.resize(8, 8, 1).unwrap();

    // The object-ID pass clears its own attachment without touching color.
    let framebuffer = viewport.framebuffer();
    framebuffer.clear_color_attachment(1, ClearValue::I32([42, 0, 0, 0]));

    let mut pixel = [0u8; 4];
    framebuffer.readback(&mut pixel, 3, 3, 1, 1, 1);
    assert_eq!(i32::from_ne_bytes(pixel), 42);
}
