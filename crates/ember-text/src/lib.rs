//! Text layout and drawing for the batched 2D renderer.
//!
//! Fonts carry per-glyph metrics and a distance-field atlas texture;
//! [`layout_text`] shapes a string into transformed glyph quads, and
//! [`DrawText`] feeds runs into the renderer's text batch.

mod draw;
mod error;
mod font;
mod layout;

pub use draw::DrawText;
pub use error::FontError;
pub use font::{Font, FontMetrics, Glyph, GlyphBounds};
pub use layout::{FALLBACK_CHARACTER, GlyphRun, TAB_SIZE, TextStyle, layout_text};
