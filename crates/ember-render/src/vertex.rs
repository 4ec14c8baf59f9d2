//! Per-kind vertex records for the batched renderer.
//!
//! Field order and types are a contract with the fixed-format GPU buffers:
//! once a vertex buffer is allocated, these layouts must not change. Sizes
//! are pinned with `static_assertions` so an accidental field edit fails to
//! compile rather than corrupting uploads.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use static_assertions::const_assert_eq;

/// Vertex record for textured/solid quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
    /// Texture slot sampled by the fragment shader; 0 is the white texture.
    pub tex_index: i32,
    pub tiling_factor: [f32; 2],
    /// Owner entity for editor picking; -1 when unowned.
    pub entity_id: i32,
}

/// Vertex record for SDF circles rendered as quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CircleVertex {
    pub world_position: [f32; 3],
    /// Corner position in the unit circle's local space, range [-1, 1].
    pub local_position: [f32; 3],
    pub color: [f32; 4],
    pub thickness: f32,
    pub fade: f32,
    pub entity_id: i32,
}

/// Vertex record for line-list primitives.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub entity_id: i32,
}

/// Vertex record for SDF text glyphs sampled from the font atlas.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
    pub entity_id: i32,
}

const_assert_eq!(std::mem::size_of::<QuadVertex>(), 52);
const_assert_eq!(std::mem::size_of::<CircleVertex>(), 52);
const_assert_eq!(std::mem::size_of::<LineVertex>(), 32);
const_assert_eq!(std::mem::size_of::<TextVertex>(), 40);

impl QuadVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x4, // color
            2 => Float32x2, // tex_coord
            3 => Sint32,    // tex_index
            4 => Float32x2, // tiling_factor
            5 => Sint32,    // entity_id
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

impl CircleVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            0 => Float32x3, // world_position
            1 => Float32x3, // local_position
            2 => Float32x4, // color
            3 => Float32,   // thickness
            4 => Float32,   // fade
            5 => Sint32,    // entity_id
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

impl LineVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x4, // color
            2 => Sint32,    // entity_id
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

impl TextVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x4, // color
            2 => Float32x2, // tex_coord
            3 => Sint32,    // entity_id
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

/// One positioned glyph quad produced by text layout.
///
/// Corners follow the shared quad index winding: bottom-left, top-left,
/// top-right, bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub positions: [Vec3; 4],
    pub tex_coords: [Vec2; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_records_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 13 * 4);
        assert_eq!(std::mem::size_of::<CircleVertex>(), 13 * 4);
        assert_eq!(std::mem::size_of::<LineVertex>(), 8 * 4);
        assert_eq!(std::mem::size_of::<TextVertex>(), 10 * 4);
    }

    #[test]
    fn layouts_cover_full_stride() {
        for layout in [
            QuadVertex::layout(),
            CircleVertex::layout(),
            LineVertex::layout(),
            TextVertex::layout(),
        ] {
            let last = layout.attributes.last().unwrap();
            let end = last.offset + last.format.size();
            assert_eq!(end, layout.array_stride);
        }
    }
}
