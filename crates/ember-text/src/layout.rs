//! Deterministic glyph layout.
//!
//! Turns a string, font, and style into positioned glyph quads. Layout is a
//! pure function of its inputs; the renderer decides what to do with the
//! resulting run.

use ember_core::profiling::profile_function;
use glam::{Mat4, Vec2, Vec4};

use ember_render::backend::BatchTexture;
use ember_render::color::Color;
use ember_render::vertex::GlyphQuad;

use crate::font::Font;

/// Tab stops are this many space advances wide.
pub const TAB_SIZE: f32 = 4.0;

/// Glyph substituted for characters the font has no entry for.
pub const FALLBACK_CHARACTER: char = '?';

/// Per-call text styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    /// Extra horizontal advance per glyph pair, in font units.
    pub kerning: f32,
    /// Extra vertical distance between lines, in font units.
    pub line_spacing: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            kerning: 0.0,
            line_spacing: 0.0,
        }
    }
}

/// A laid-out string: the atlas its glyphs sample from plus one quad per
/// visible glyph.
pub struct GlyphRun<T: BatchTexture> {
    pub atlas: T,
    pub glyphs: Vec<GlyphQuad>,
}

impl<T: BatchTexture> GlyphRun<T> {
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Lay out `text` against `font`, producing transformed glyph quads.
///
/// Returns `None` when the font's atlas texture is not loaded yet; the
/// caller renders nothing for this string. A character missing from the font
/// falls back to [`FALLBACK_CHARACTER`]; if that glyph is missing too, the
/// remainder of the string is abandoned.
pub fn layout_text<T: BatchTexture>(
    font: &Font<T>,
    text: &str,
    style: &TextStyle,
    transform: &Mat4,
) -> Option<GlyphRun<T>> {
    profile_function!();

    let Some(atlas) = font.atlas() else {
        tracing::trace!("Layout skipped: font atlas not loaded");
        return None;
    };
    let atlas_size = Vec2::new(atlas.width() as f32, atlas.height() as f32);

    let metrics = font.metrics();
    let scale = 1.0 / (metrics.ascender - metrics.descender);

    let mut glyphs = Vec::new();
    let mut x = 0.0_f32;
    let mut y = 0.0_f32;

    let mut chars = text.chars().peekable();
    while let Some(character) = chars.next() {
        match character {
            '\r' => continue,
            '\n' => {
                x = 0.0;
                y -= scale * (metrics.line_height + style.line_spacing);
                continue;
            }
            '\t' => {
                x += scale * (font.space_advance() + style.kerning) * TAB_SIZE;
                continue;
            }
            _ => {}
        }

        let Some(glyph) = font
            .glyph(character)
            .or_else(|| font.glyph(FALLBACK_CHARACTER))
        else {
            tracing::warn!(
                "Font has neither {:?} nor the fallback glyph, abandoning layout",
                character
            );
            break;
        };

        let uv_min = Vec2::new(glyph.atlas_bounds.left, glyph.atlas_bounds.bottom) / atlas_size;
        let uv_max = Vec2::new(glyph.atlas_bounds.right, glyph.atlas_bounds.top) / atlas_size;

        let plane_min = Vec2::new(glyph.plane_bounds.left, glyph.plane_bounds.bottom) * scale
            + Vec2::new(x, y);
        let plane_max =
            Vec2::new(glyph.plane_bounds.right, glyph.plane_bounds.top) * scale + Vec2::new(x, y);

        // Bottom-left, top-left, top-right, bottom-right, matching the
        // shared quad index winding.
        let corners = [
            Vec2::new(plane_min.x, plane_min.y),
            Vec2::new(plane_min.x, plane_max.y),
            Vec2::new(plane_max.x, plane_max.y),
            Vec2::new(plane_max.x, plane_min.y),
        ];
        let tex_coords = [
            Vec2::new(uv_min.x, uv_min.y),
            Vec2::new(uv_min.x, uv_max.y),
            Vec2::new(uv_max.x, uv_max.y),
            Vec2::new(uv_max.x, uv_min.y),
        ];
        let positions = corners
            .map(|corner| (*transform * Vec4::new(corner.x, corner.y, 0.0, 1.0)).truncate());

        glyphs.push(GlyphQuad {
            positions,
            tex_coords,
        });

        let mut advance = glyph.advance;
        if let Some(&next) = chars.peek() {
            if let Some(pair) = font.pair_advance(character, next) {
                advance = pair;
            } else if let Some(pair) = font.pair_advance(character, ' ') {
                advance = pair;
            }
        }
        x += scale * (advance + style.kerning);
    }

    Some(GlyphRun {
        atlas: atlas.clone(),
        glyphs,
    })
}
