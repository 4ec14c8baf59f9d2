//! The batch accumulator: the stateful core of the 2D renderer.
//!
//! Draw calls append vertex records into per-kind arenas and resolve texture
//! slots; when a write would exceed a buffer's capacity or the slot table
//! fills up, the accumulator flushes the current batch to the backend and
//! resets before the triggering write proceeds. Capacity exhaustion is
//! ordinary control flow here, never an error.

use ember_core::profiling::profile_function;
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::backend::{BatchTexture, PrimitiveKind, RenderBackend};
use crate::color::Color;
use crate::geometry::GeometryBuffers;
use crate::slots::{SlotsExhausted, TextureSlotTable};
use crate::vertex::{CircleVertex, GlyphQuad, LineVertex, QuadVertex, TextVertex};

/// Color substituted when a textured draw arrives without a texture.
/// An explicit fallback policy, not an error.
pub const INVALID_TEXTURE_COLOR: Color = Color::MAGENTA;

/// Unit quad corner offsets, multiplied by the caller's transform.
pub const QUAD_POSITIONS: [Vec4; 4] = [
    Vec4::new(-0.5, -0.5, 0.0, 1.0),
    Vec4::new(0.5, -0.5, 0.0, 1.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
    Vec4::new(-0.5, 0.5, 0.0, 1.0),
];

/// Default texture coordinates covering the unit square, matching
/// [`QUAD_POSITIONS`] corner for corner.
pub const QUAD_TEX_COORDS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Capacity limits, fixed for the accumulator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum quads per batch; vertex and index capacities derive from it.
    pub max_quads: u32,
    /// Texture slots per batch, including the reserved white slot 0.
    pub max_texture_slots: u32,
}

impl BatchLimits {
    pub const fn max_vertices(&self) -> u32 {
        self.max_quads * 4
    }

    pub const fn max_indices(&self) -> u32 {
        self.max_quads * 6
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_quads: 10_000,
            max_texture_slots: 32,
        }
    }
}

/// Frame diagnostics. Reset only on explicit request, not per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Draw calls issued, counted once per non-empty kind at flush time.
    pub draw_calls: u32,
    /// Quads written, counted per draw.
    pub quad_count: u32,
}

impl Statistics {
    pub fn total_vertex_count(&self) -> u32 {
        self.quad_count * 4
    }

    pub fn total_index_count(&self) -> u32 {
        self.quad_count * 6
    }
}

/// Accumulates draw requests into geometry buffers and decides when a flush
/// is mandatory.
///
/// Explicitly constructed and owned by the renderer (no global batch state),
/// so tests can drive independent instances. Single-threaded by design: all
/// methods run on the frame thread.
pub struct BatchAccumulator<B: RenderBackend> {
    limits: BatchLimits,
    buffers: GeometryBuffers,
    slots: TextureSlotTable<B::Texture>,
    /// Font atlas bound for the current batch; only one per flush.
    font_atlas: Option<B::Texture>,
    stats: Statistics,
}

impl<B: RenderBackend> BatchAccumulator<B> {
    pub fn new(backend: &B, limits: BatchLimits) -> Self {
        Self {
            limits,
            buffers: GeometryBuffers::new(&limits),
            slots: TextureSlotTable::new(backend.white_texture(), limits.max_texture_slots as usize),
            font_atlas: None,
            stats: Statistics::default(),
        }
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    pub fn buffers(&self) -> &GeometryBuffers {
        &self.buffers
    }

    pub fn stats(&self) -> Statistics {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = Statistics::default();
    }

    /// Rewind buffers and slot table for a fresh batch.
    pub fn reset(&mut self) {
        self.buffers.reset();
        self.slots.reset();
        self.font_atlas = None;
    }

    /// Draw a solid-color quad.
    pub fn draw_quad(&mut self, backend: &mut B, transform: &Mat4, color: Color, entity_id: i32) {
        self.ensure_quad_capacity(backend);
        let slot = self.slots.resolve_none();
        self.write_quad(transform, color, QUAD_TEX_COORDS, slot, Vec2::ONE, entity_id);
    }

    /// Draw a textured quad with explicit texture coordinates.
    ///
    /// A missing texture is redirected to [`INVALID_TEXTURE_COLOR`] so a
    /// half-loaded scene still renders something visible.
    pub fn draw_textured_quad(
        &mut self,
        backend: &mut B,
        transform: &Mat4,
        texture: Option<&B::Texture>,
        tex_coords: [Vec2; 4],
        tiling_factor: Vec2,
        tint: Color,
        entity_id: i32,
    ) {
        let Some(texture) = texture else {
            tracing::trace!("textured quad without a texture, drawing placeholder color");
            self.draw_quad(backend, transform, INVALID_TEXTURE_COLOR, entity_id);
            return;
        };

        self.ensure_quad_capacity(backend);
        let slot = self.resolve_slot(backend, texture);
        self.write_quad(transform, tint, tex_coords, slot, tiling_factor, entity_id);
    }

    /// Draw an SDF circle occupying the transformed unit quad.
    pub fn draw_circle(
        &mut self,
        backend: &mut B,
        transform: &Mat4,
        color: Color,
        thickness: f32,
        fade: f32,
        entity_id: i32,
    ) {
        self.ensure_circle_capacity(backend);
        for corner in QUAD_POSITIONS {
            let world = *transform * corner;
            self.buffers.circles.push(CircleVertex {
                world_position: [world.x, world.y, world.z],
                local_position: [corner.x * 2.0, corner.y * 2.0, corner.z * 2.0],
                color: color.to_array(),
                thickness,
                fade,
                entity_id,
            });
        }
        self.buffers.circle_index_count += 6;
    }

    /// Draw a line segment between two world-space points.
    pub fn draw_line(
        &mut self,
        backend: &mut B,
        start: Vec3,
        end: Vec3,
        color: Color,
        entity_id: i32,
    ) {
        self.ensure_line_capacity(backend);
        for position in [start, end] {
            self.buffers.lines.push(LineVertex {
                position: position.to_array(),
                color: color.to_array(),
                entity_id,
            });
        }
    }

    /// Draw a run of laid-out glyphs sampled from `atlas`.
    ///
    /// Only one font atlas may be bound per flush; a run using a different
    /// atlas than the batch's current one forces a flush before any of its
    /// vertices are written.
    pub fn draw_glyph_run(
        &mut self,
        backend: &mut B,
        atlas: &B::Texture,
        glyphs: &[GlyphQuad],
        color: Color,
        entity_id: i32,
    ) {
        if glyphs.is_empty() {
            return;
        }

        if let Some(bound) = &self.font_atlas {
            if bound.id() != atlas.id() {
                self.flush_and_reset(backend);
            }
        }

        for glyph in glyphs {
            self.ensure_text_capacity(backend);
            // A capacity flush clears the binding, so re-establish it per glyph.
            if self.font_atlas.is_none() {
                self.font_atlas = Some(atlas.clone());
            }
            for corner in 0..4 {
                self.buffers.text.push(TextVertex {
                    position: glyph.positions[corner].to_array(),
                    color: color.to_array(),
                    tex_coord: glyph.tex_coords[corner].to_array(),
                    entity_id,
                });
            }
            self.buffers.text_index_count += 6;
        }
    }

    /// Upload and draw every non-empty kind, then reset for the next batch.
    pub fn flush_and_reset(&mut self, backend: &mut B) {
        self.flush(backend);
        self.reset();
    }

    fn flush(&mut self, backend: &mut B) {
        profile_function!();

        if self.buffers.quad_index_count > 0 {
            backend.upload_vertices(PrimitiveKind::Quad, self.buffers.quads.bytes());
            for (slot, texture) in self.slots.iter() {
                backend.bind_texture(slot, texture);
            }
            backend.draw_indexed(PrimitiveKind::Quad, self.buffers.quad_index_count);
            self.stats.draw_calls += 1;
        }

        if self.buffers.circle_index_count > 0 {
            backend.upload_vertices(PrimitiveKind::Circle, self.buffers.circles.bytes());
            backend.draw_indexed(PrimitiveKind::Circle, self.buffers.circle_index_count);
            self.stats.draw_calls += 1;
        }

        if !self.buffers.lines.is_empty() {
            backend.upload_vertices(PrimitiveKind::Line, self.buffers.lines.bytes());
            backend.draw_lines(self.buffers.lines.len() as u32);
            self.stats.draw_calls += 1;
        }

        if self.buffers.text_index_count > 0 {
            backend.upload_vertices(PrimitiveKind::Text, self.buffers.text.bytes());
            if let Some(atlas) = &self.font_atlas {
                backend.bind_texture(0, atlas);
            }
            backend.draw_indexed(PrimitiveKind::Text, self.buffers.text_index_count);
            self.stats.draw_calls += 1;
        }
    }

    fn ensure_quad_capacity(&mut self, backend: &mut B) {
        if self.buffers.quad_index_count + 6 > self.limits.max_indices() {
            self.flush_and_reset(backend);
        }
    }

    fn ensure_circle_capacity(&mut self, backend: &mut B) {
        if self.buffers.circle_index_count + 6 > self.limits.max_indices() {
            self.flush_and_reset(backend);
        }
    }

    fn ensure_line_capacity(&mut self, backend: &mut B) {
        if self.buffers.lines.len() as u32 + 2 > self.limits.max_vertices() {
            self.flush_and_reset(backend);
        }
    }

    fn ensure_text_capacity(&mut self, backend: &mut B) {
        if self.buffers.text_index_count + 6 > self.limits.max_indices() {
            self.flush_and_reset(backend);
        }
    }

    /// Resolve a slot, flushing once if the table is full. After a flush the
    /// freshly reset table always has room.
    fn resolve_slot(&mut self, backend: &mut B, texture: &B::Texture) -> i32 {
        match self.slots.resolve(texture) {
            Ok(slot) => slot,
            Err(SlotsExhausted) => {
                self.flush_and_reset(backend);
                match self.slots.resolve(texture) {
                    Ok(slot) => slot,
                    Err(SlotsExhausted) => {
                        debug_assert!(false, "slot table full immediately after reset");
                        self.slots.resolve_none()
                    }
                }
            }
        }
    }

    fn write_quad(
        &mut self,
        transform: &Mat4,
        color: Color,
        tex_coords: [Vec2; 4],
        tex_index: i32,
        tiling_factor: Vec2,
        entity_id: i32,
    ) {
        for corner in 0..4 {
            let position = *transform * QUAD_POSITIONS[corner];
            self.buffers.quads.push(QuadVertex {
                position: [position.x, position.y, position.z],
                color: color.to_array(),
                tex_coord: tex_coords[corner].to_array(),
                tex_index,
                tiling_factor: tiling_factor.to_array(),
                entity_id,
            });
        }
        self.buffers.quad_index_count += 6;
        self.stats.quad_count += 1;
    }
}
