//! Text drawing through the batched renderer with a mock backend.

use glam::Mat4;

use ember_render::backend::{BatchTexture, PrimitiveKind};
use ember_render::batch::BatchLimits;
use ember_render::renderer::Renderer2D;
use ember_test_utils::{BackendCall, MockBackend};
use ember_text::{DrawText, Font, FontMetrics, Glyph, GlyphBounds, TextStyle};

fn test_font(atlas: Option<ember_test_utils::MockTexture>) -> Font<ember_test_utils::MockTexture> {
    let mut font = Font::new(
        FontMetrics {
            ascender: 0.75,
            descender: -0.25,
            line_height: 1.2,
        },
        atlas,
    )
    .unwrap();
    font.add_glyph(
        'A',
        Glyph {
            advance: 1.0,
            plane_bounds: GlyphBounds {
                left: 0.0,
                bottom: 0.0,
                right: 1.0,
                top: 1.0,
            },
            atlas_bounds: GlyphBounds {
                left: 0.0,
                bottom: 0.0,
                right: 10.0,
                top: 10.0,
            },
        },
    );
    font
}

#[test]
fn draw_text_batches_one_quad_per_glyph() {
    let mut renderer = Renderer2D::new(MockBackend::new(), BatchLimits::default());
    let atlas = renderer.backend_mut().create_texture(100, 100);
    let atlas_id = atlas.id();
    let font = test_font(Some(atlas));

    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer.draw_text(&font, "AAA", &TextStyle::default(), &Mat4::IDENTITY, -1);
    renderer.end_scene();

    let backend = renderer.backend();
    assert_eq!(backend.count_uploads(PrimitiveKind::Text), 1);
    assert!(backend.calls().contains(&BackendCall::DrawIndexed {
        kind: PrimitiveKind::Text,
        index_count: 18,
    }));
    assert_eq!(backend.bound_textures(), vec![(0, atlas_id)]);
}

#[test]
fn draw_text_without_an_atlas_renders_nothing() {
    let mut renderer = Renderer2D::new(MockBackend::new(), BatchLimits::default());
    let font = test_font(None);

    assert!(renderer.begin_scene(Mat4::IDENTITY));
    renderer.draw_text(&font, "AAA", &TextStyle::default(), &Mat4::IDENTITY, -1);
    renderer.end_scene();

    assert_eq!(renderer.backend().count_uploads(PrimitiveKind::Text), 0);
    assert_eq!(renderer.stats().draw_calls, 0);
}
