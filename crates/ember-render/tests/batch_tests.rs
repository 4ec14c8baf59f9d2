//! Accumulator behavior against a recording mock backend: capacity-driven
//! flushes, slot assignment, partial uploads, and fallback policies.

use glam::{Mat4, Vec2, Vec3};

use ember_render::backend::PrimitiveKind;
use ember_render::batch::{BatchAccumulator, BatchLimits, INVALID_TEXTURE_COLOR};
use ember_render::color::Color;
use ember_render::vertex::{CircleVertex, GlyphQuad, QuadVertex};
use ember_test_utils::{BackendCall, MockBackend};

fn small_limits(max_quads: u32) -> BatchLimits {
    BatchLimits {
        max_quads,
        ..BatchLimits::default()
    }
}

fn quad_vertices(batch: &BatchAccumulator<MockBackend>) -> Vec<QuadVertex> {
    bytemuck::cast_slice(batch.buffers().bytes_to_upload(PrimitiveKind::Quad)).to_vec()
}

fn glyph_at_origin() -> GlyphQuad {
    GlyphQuad {
        positions: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ],
        tex_coords: [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ],
    }
}

#[test]
fn quad_overflow_flushes_before_the_triggering_write() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, small_limits(2));

    batch.draw_quad(&mut backend, &Mat4::IDENTITY, Color::WHITE, -1);
    batch.draw_quad(&mut backend, &Mat4::IDENTITY, Color::WHITE, -1);
    assert_eq!(backend.count_uploads(PrimitiveKind::Quad), 0);

    // Third quad would need indices 13..18 of a 12-index budget.
    batch.draw_quad(&mut backend, &Mat4::IDENTITY, Color::WHITE, -1);
    assert_eq!(backend.count_uploads(PrimitiveKind::Quad), 1);
    assert!(backend.calls().contains(&BackendCall::DrawIndexed {
        kind: PrimitiveKind::Quad,
        index_count: 12,
    }));
    assert_eq!(batch.buffers().quad_index_count(), 6);

    batch.flush_and_reset(&mut backend);
    assert!(backend.calls().contains(&BackendCall::DrawIndexed {
        kind: PrimitiveKind::Quad,
        index_count: 6,
    }));

    let stats = batch.stats();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.quad_count, 3);
    assert_eq!(stats.total_vertex_count(), 12);
    assert_eq!(stats.total_index_count(), 18);
}

#[test]
fn flush_uploads_only_the_written_prefix() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());

    for _ in 0..3 {
        batch.draw_quad(&mut backend, &Mat4::IDENTITY, Color::RED, -1);
    }
    batch.flush_and_reset(&mut backend);

    let expected = 3 * 4 * std::mem::size_of::<QuadVertex>();
    assert!(backend.calls().contains(&BackendCall::UploadVertices {
        kind: PrimitiveKind::Quad,
        byte_len: expected,
    }));
}

#[test]
fn repeated_texture_reuses_its_slot() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());
    let texture = backend.create_texture(16, 16);

    for _ in 0..2 {
        batch.draw_textured_quad(
            &mut backend,
            &Mat4::IDENTITY,
            Some(&texture),
            ember_render::QUAD_TEX_COORDS,
            Vec2::ONE,
            Color::WHITE,
            -1,
        );
    }

    let vertices = quad_vertices(&batch);
    assert_eq!(vertices.len(), 8);
    assert!(vertices.iter().all(|v| v.tex_index == 1));

    batch.flush_and_reset(&mut backend);
    // Slot order: white at 0, the texture at 1, nothing else.
    assert_eq!(backend.bound_textures(), vec![(0, 0), (1, texture_id(&texture))]);
}

fn texture_id(texture: &ember_test_utils::MockTexture) -> u64 {
    use ember_render::backend::BatchTexture;
    texture.id()
}

#[test]
fn slot_exhaustion_forces_a_flush_and_retry() {
    let mut backend = MockBackend::new();
    let limits = BatchLimits {
        max_texture_slots: 4,
        ..BatchLimits::default()
    };
    let mut batch = BatchAccumulator::new(&backend, limits);

    let textures: Vec<_> = (0..4).map(|_| backend.create_texture(8, 8)).collect();
    for texture in &textures {
        batch.draw_textured_quad(
            &mut backend,
            &Mat4::IDENTITY,
            Some(texture),
            ember_render::QUAD_TEX_COORDS,
            Vec2::ONE,
            Color::WHITE,
            -1,
        );
    }

    // Three textures filled slots 1..3; the fourth flushed and restarted.
    assert_eq!(backend.count_uploads(PrimitiveKind::Quad), 1);
    let vertices = quad_vertices(&batch);
    assert_eq!(vertices.len(), 4);
    assert!(vertices.iter().all(|v| v.tex_index == 1));
}

#[test]
fn missing_texture_draws_the_placeholder_color() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());

    batch.draw_textured_quad(
        &mut backend,
        &Mat4::IDENTITY,
        None,
        ember_render::QUAD_TEX_COORDS,
        Vec2::ONE,
        Color::WHITE,
        7,
    );

    let vertices = quad_vertices(&batch);
    assert_eq!(vertices.len(), 4);
    for vertex in &vertices {
        assert_eq!(vertex.color, INVALID_TEXTURE_COLOR.to_array());
        assert_eq!(vertex.tex_index, 0);
        assert_eq!(vertex.entity_id, 7);
    }
}

#[test]
fn circle_vertices_span_local_unit_circle() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());

    batch.draw_circle(&mut backend, &Mat4::IDENTITY, Color::GREEN, 1.0, 0.005, -1);

    let vertices: Vec<CircleVertex> =
        bytemuck::cast_slice(batch.buffers().bytes_to_upload(PrimitiveKind::Circle)).to_vec();
    assert_eq!(vertices.len(), 4);
    assert_eq!(vertices[0].local_position, [-1.0, -1.0, 0.0]);
    assert_eq!(vertices[2].local_position, [1.0, 1.0, 0.0]);
    assert_eq!(batch.buffers().circle_index_count(), 6);
}

#[test]
fn lines_flush_by_vertex_count() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, small_limits(1));

    // Budget is 4 line vertices; the third segment forces a flush.
    for i in 0..3 {
        let y = i as f32;
        batch.draw_line(
            &mut backend,
            Vec3::new(0.0, y, 0.0),
            Vec3::new(1.0, y, 0.0),
            Color::BLUE,
            -1,
        );
    }

    assert!(backend.calls().contains(&BackendCall::DrawLines { vertex_count: 4 }));
    assert_eq!(batch.buffers().line_vertex_count(), 2);
}

#[test]
fn glyph_run_with_different_atlas_flushes_first() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());
    let atlas_a = backend.create_texture(64, 64);
    let atlas_b = backend.create_texture(64, 64);

    let glyphs = [glyph_at_origin(); 2];
    batch.draw_glyph_run(&mut backend, &atlas_a, &glyphs, Color::WHITE, -1);
    assert_eq!(backend.count_uploads(PrimitiveKind::Text), 0);

    batch.draw_glyph_run(&mut backend, &atlas_b, &glyphs, Color::WHITE, -1);
    // Atlas A's glyphs flushed with A bound at slot 0.
    assert_eq!(backend.count_uploads(PrimitiveKind::Text), 1);
    assert_eq!(backend.bound_textures(), vec![(0, texture_id(&atlas_a))]);
    assert_eq!(batch.buffers().text_index_count(), 12);

    batch.flush_and_reset(&mut backend);
    assert_eq!(
        backend.bound_textures(),
        vec![(0, texture_id(&atlas_a)), (0, texture_id(&atlas_b))]
    );
}

#[test]
fn empty_flush_issues_no_draws() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::<MockBackend>::new(&backend, BatchLimits::default());

    batch.flush_and_reset(&mut backend);
    assert!(backend.calls().is_empty());
    assert_eq!(batch.stats().draw_calls, 0);
}

#[test]
fn each_nonempty_kind_counts_one_draw_call() {
    let mut backend = MockBackend::new();
    let mut batch = BatchAccumulator::new(&backend, BatchLimits::default());

    batch.draw_quad(&mut backend, &Mat4::IDENTITY, Color::WHITE, -1);
    batch.draw_circle(&mut backend, &Mat4::IDENTITY, Color::WHITE, 1.0, 0.005, -1);
    batch.draw_line(&mut backend, Vec3::ZERO, Vec3::X, Color::WHITE, -1);
    let atlas = backend.create_texture(64, 64);
    batch.draw_glyph_run(&mut backend, &atlas, &[glyph_at_origin()], Color::WHITE, -1);

    batch.flush_and_reset(&mut backend);
    assert_eq!(batch.stats().draw_calls, 4);
    assert_eq!(batch.stats().quad_count, 1);
}
