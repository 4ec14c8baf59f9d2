//! Font data: per-glyph metrics, pair advances, and the atlas texture.

use ahash::AHashMap;

use ember_render::backend::BatchTexture;

use crate::error::FontError;

/// Vertical font metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascender: f32,
    pub descender: f32,
    pub line_height: f32,
}

/// A rectangle in either atlas pixels or glyph plane units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphBounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

/// One glyph's layout data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    /// Quad bounds in plane space, relative to the cursor baseline.
    pub plane_bounds: GlyphBounds,
    /// Quad bounds in atlas pixels.
    pub atlas_bounds: GlyphBounds,
}

/// A font ready for layout: metrics, glyph table, pair advances, and the
/// atlas texture the glyphs sample from.
///
/// The atlas is optional so a font can exist before its texture finishes
/// loading; layout against an atlas-less font simply produces nothing.
#[derive(Debug)]
pub struct Font<T: BatchTexture> {
    metrics: FontMetrics,
    glyphs: AHashMap<char, Glyph>,
    pair_advances: AHashMap<(char, char), f32>,
    atlas: Option<T>,
}

impl<T: BatchTexture> Font<T> {
    pub fn new(metrics: FontMetrics, atlas: Option<T>) -> Result<Self, FontError> {
        if metrics.ascender <= metrics.descender {
            return Err(FontError::InvalidMetrics {
                ascender: metrics.ascender,
                descender: metrics.descender,
            });
        }
        Ok(Self {
            metrics,
            glyphs: AHashMap::new(),
            pair_advances: AHashMap::new(),
            atlas,
        })
    }

    pub fn add_glyph(&mut self, character: char, glyph: Glyph) {
        self.glyphs.insert(character, glyph);
    }

    /// Register a pair-specific advance (kerning pair) for `first` followed
    /// by `second`.
    pub fn add_pair_advance(&mut self, first: char, second: char, advance: f32) {
        self.pair_advances.insert((first, second), advance);
    }

    pub fn set_atlas(&mut self, atlas: T) {
        self.atlas = Some(atlas);
    }

    pub fn glyph(&self, character: char) -> Option<&Glyph> {
        self.glyphs.get(&character)
    }

    pub fn pair_advance(&self, first: char, second: char) -> Option<f32> {
        self.pair_advances.get(&(first, second)).copied()
    }

    /// The space glyph's advance, used for tab stops. Zero if the font has
    /// no space glyph.
    pub fn space_advance(&self) -> f32 {
        self.glyph(' ').map(|glyph| glyph.advance).unwrap_or(0.0)
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn atlas(&self) -> Option<&T> {
        self.atlas.as_ref()
    }
}
