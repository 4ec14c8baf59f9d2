//! Frame controller behavior: scene lifecycle, shader readiness gating,
//! camera uploads, and the ergonomic draw overloads.

use glam::{Mat4, Vec2, Vec3};

use ember_render::backend::PrimitiveKind;
use ember_render::batch::BatchLimits;
use ember_render::color::Color;
use ember_render::renderer::{Renderer2D, VIEW_PROJECTION_UNIFORM};
use ember_test_utils::{BackendCall, MockBackend};

fn ready_renderer(limits: BatchLimits) -> Renderer2D<MockBackend> {
    let mut renderer = Renderer2D::new(MockBackend::new(), limits);
    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer
}

#[test]
fn begin_scene_fails_while_shaders_compile() {
    let backend = MockBackend::with_manual_shaders();
    let mut renderer = Renderer2D::new(backend, BatchLimits::default());

    assert!(!renderer.is_ready());
    assert!(!renderer.begin_scene(Mat4::IDENTITY));

    // Draws between a failed begin_scene and end_scene are no-ops.
    renderer.draw_quad(Vec2::ZERO, Vec2::ONE, Color::WHITE);
    renderer.end_scene();
    assert_eq!(renderer.backend().count_uploads(PrimitiveKind::Quad), 0);
    assert_eq!(renderer.backend().count_indexed_draws(PrimitiveKind::Quad), 0);

    renderer.backend_mut().complete_shader_loads();
    assert!(renderer.begin_scene(Mat4::IDENTITY));
    assert!(renderer.is_ready());
}

#[test]
fn begin_scene_uploads_the_camera_to_every_shader() {
    let renderer = ready_renderer(BatchLimits::default());

    let uploads = renderer.backend().uniform_uploads();
    assert_eq!(uploads.len(), 4);
    let mut kinds: Vec<PrimitiveKind> = uploads.iter().map(|(kind, _, _)| *kind).collect();
    kinds.sort_by_key(|kind| kind.index());
    assert_eq!(kinds, PrimitiveKind::ALL);
    for (_, name, value) in &uploads {
        assert_eq!(name, VIEW_PROJECTION_UNIFORM);
        assert_eq!(*value, Mat4::IDENTITY);
    }
}

#[test]
fn end_scene_flushes_each_nonempty_kind_once() {
    let mut renderer = ready_renderer(BatchLimits::default());

    renderer.draw_quad(Vec2::ZERO, Vec2::ONE, Color::WHITE);
    renderer.draw_circle(&Mat4::IDENTITY, Color::RED, 1.0, 0.005, -1);
    renderer.draw_line(Vec3::ZERO, Vec3::X, Color::BLUE, -1);
    renderer.end_scene();

    let backend = renderer.backend();
    assert_eq!(backend.count_uploads(PrimitiveKind::Quad), 1);
    assert_eq!(backend.count_uploads(PrimitiveKind::Circle), 1);
    assert_eq!(backend.count_line_draws(), 1);
    assert_eq!(renderer.stats().draw_calls, 3);

    // Nothing further happens on a second end_scene.
    renderer.end_scene();
    assert_eq!(renderer.stats().draw_calls, 3);
}

#[test]
fn small_batch_splits_into_two_draw_calls() {
    let mut renderer = ready_renderer(BatchLimits {
        max_quads: 2,
        ..BatchLimits::default()
    });

    for _ in 0..3 {
        renderer.draw_quad(Vec2::ZERO, Vec2::ONE, Color::WHITE);
    }
    renderer.end_scene();

    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.quad_count, 3);

    renderer.reset_stats();
    assert_eq!(renderer.stats().draw_calls, 0);
}

#[test]
fn rect_is_four_line_segments() {
    let mut renderer = ready_renderer(BatchLimits::default());

    renderer.draw_rect(Vec3::ZERO, Vec2::new(2.0, 2.0), Color::GREEN, -1);
    renderer.end_scene();

    assert!(
        renderer
            .backend()
            .calls()
            .contains(&BackendCall::DrawLines { vertex_count: 8 })
    );
}

#[test]
fn rotated_quad_moves_corners() {
    let mut renderer = ready_renderer(BatchLimits::default());

    renderer.draw_rotated_quad(
        Vec2::ZERO,
        Vec2::ONE,
        std::f32::consts::FRAC_PI_2,
        Color::WHITE,
    );
    renderer.end_scene();
    assert_eq!(renderer.stats().quad_count, 1);
}

#[test]
fn begin_scene_reentry_flushes_the_open_scene() {
    let mut renderer = ready_renderer(BatchLimits::default());

    renderer.draw_quad(Vec2::ZERO, Vec2::ONE, Color::WHITE);
    assert!(renderer.begin_scene(Mat4::IDENTITY));

    // The quad from the first scene was not lost.
    assert_eq!(renderer.backend().count_uploads(PrimitiveKind::Quad), 1);
    assert_eq!(renderer.stats().quad_count, 1);
}

#[test]
fn dropping_a_renderer_with_unfinished_loads_returns() {
    let backend = MockBackend::with_manual_shaders();
    let renderer = Renderer2D::new(backend, BatchLimits::default());
    // The backend still owns the load senders; drop must not wait on them.
    drop(renderer);
}

#[test]
fn reload_keeps_the_old_shader_serving() {
    let backend = MockBackend::with_manual_shaders();
    let mut renderer = Renderer2D::new(backend, BatchLimits::default());
    renderer.backend_mut().complete_shader_loads();
    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer.end_scene();

    renderer.reload_shader(PrimitiveKind::Quad);
    // Replacement still pending: the previous shader keeps frames going.
    assert!(renderer.is_ready());
    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer.end_scene();

    renderer.backend_mut().complete_shader_loads();
    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer.end_scene();

    let loads = renderer
        .backend()
        .calls()
        .iter()
        .filter(|call| matches!(call, BackendCall::LoadShader { .. }))
        .count();
    assert_eq!(loads, 5);
}

#[test]
fn line_width_is_stored_and_forwarded() {
    let mut renderer = ready_renderer(BatchLimits::default());
    assert_eq!(renderer.line_width(), 2.0);

    renderer.set_line_width(4.0);
    assert_eq!(renderer.line_width(), 4.0);
    assert!(
        renderer
            .backend()
            .calls()
            .contains(&BackendCall::SetLineWidth { width: 4.0 })
    );
}

#[test]
fn subtexture_quad_uses_the_cell_coordinates() {
    let mut renderer = ready_renderer(BatchLimits::default());
    let atlas = renderer.backend_mut().create_texture(64, 64);
    let sub = ember_render::SubTexture::from_coords(
        atlas,
        Vec2::new(1.0, 1.0),
        Vec2::new(32.0, 32.0),
        Vec2::ONE,
    );

    renderer.draw_subtexture_quad(Vec2::ZERO, Vec2::ONE, &sub, Vec2::ONE, Color::WHITE);
    renderer.end_scene();

    assert_eq!(renderer.stats().quad_count, 1);
    // White at slot 0, the atlas at slot 1.
    let bound = renderer.backend().bound_textures();
    assert_eq!(bound.len(), 2);
    assert_eq!(bound[0].0, 0);
    assert_eq!(bound[1].0, 1);
}
