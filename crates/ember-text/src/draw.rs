//! Text drawing on top of the batched renderer.

use glam::Mat4;

use ember_render::backend::RenderBackend;
use ember_render::renderer::Renderer2D;

use crate::font::Font;
use crate::layout::{TextStyle, layout_text};

/// Extension trait adding string drawing to [`Renderer2D`].
pub trait DrawText<B: RenderBackend> {
    /// Lay out and draw `text`. Renders nothing while the font's atlas is
    /// still loading.
    fn draw_text(
        &mut self,
        font: &Font<B::Texture>,
        text: &str,
        style: &TextStyle,
        transform: &Mat4,
        entity_id: i32,
    );
}

impl<B: RenderBackend> DrawText<B> for Renderer2D<B> {
    fn draw_text(
        &mut self,
        font: &Font<B::Texture>,
        text: &str,
        style: &TextStyle,
        transform: &Mat4,
        entity_id: i32,
    ) {
        let Some(run) = layout_text(font, text, style, transform) else {
            return;
        };
        self.draw_glyph_run(&run.atlas, &run.glyphs, style.color, entity_id);
    }
}
