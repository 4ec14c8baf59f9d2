//! CPU-side vertex storage for the current batch.
//!
//! Each primitive kind owns a fixed-capacity arena with a write cursor.
//! Capacity checks are the accumulator's job (`ensure_*_capacity`); writes
//! here only `debug_assert!` the invariant, so a write past capacity is a
//! batching-logic defect, never silently truncated.

use bytemuck::Pod;

use crate::backend::PrimitiveKind;
use crate::batch::BatchLimits;
use crate::vertex::{CircleVertex, LineVertex, QuadVertex, TextVertex};

/// A pre-allocated vertex array with a write cursor.
///
/// Allocated once at renderer init; `clear` resets the cursor without
/// releasing storage, so steady-state frames never reallocate.
pub struct VertexArena<V: Pod> {
    data: Vec<V>,
    capacity: usize,
}

impl<V: Pod> VertexArena<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one record at the cursor.
    ///
    /// Precondition: the caller has verified capacity for this write.
    #[inline]
    pub fn push(&mut self, vertex: V) {
        debug_assert!(
            self.data.len() < self.capacity,
            "vertex write past arena capacity ({})",
            self.capacity
        );
        self.data.push(vertex);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The written prefix as bytes; exactly what a flush uploads.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// The four per-kind arenas plus per-kind index/primitive counters.
pub struct GeometryBuffers {
    pub(crate) quads: VertexArena<QuadVertex>,
    pub(crate) quad_index_count: u32,
    pub(crate) circles: VertexArena<CircleVertex>,
    pub(crate) circle_index_count: u32,
    pub(crate) lines: VertexArena<LineVertex>,
    pub(crate) text: VertexArena<TextVertex>,
    pub(crate) text_index_count: u32,
}

impl GeometryBuffers {
    pub fn new(limits: &BatchLimits) -> Self {
        let max_vertices = limits.max_vertices() as usize;
        Self {
            quads: VertexArena::new(max_vertices),
            quad_index_count: 0,
            circles: VertexArena::new(max_vertices),
            circle_index_count: 0,
            lines: VertexArena::new(max_vertices),
            text: VertexArena::new(max_vertices),
            text_index_count: 0,
        }
    }

    /// Rewind every cursor and counter. No error conditions.
    pub fn reset(&mut self) {
        self.quads.clear();
        self.quad_index_count = 0;
        self.circles.clear();
        self.circle_index_count = 0;
        self.lines.clear();
        self.text.clear();
        self.text_index_count = 0;
    }

    /// Byte range a flush would upload for `kind` (partial buffer upload:
    /// sparse frames transfer proportionally less data).
    pub fn bytes_to_upload(&self, kind: PrimitiveKind) -> &[u8] {
        match kind {
            PrimitiveKind::Quad => self.quads.bytes(),
            PrimitiveKind::Circle => self.circles.bytes(),
            PrimitiveKind::Line => self.lines.bytes(),
            PrimitiveKind::Text => self.text.bytes(),
        }
    }

    pub fn quad_index_count(&self) -> u32 {
        self.quad_index_count
    }

    pub fn circle_index_count(&self) -> u32 {
        self.circle_index_count
    }

    pub fn line_vertex_count(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn text_index_count(&self) -> u32 {
        self.text_index_count
    }
}
