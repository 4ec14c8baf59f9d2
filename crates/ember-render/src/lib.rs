//! Batched 2D rendering.
//!
//! The crate splits into a backend-agnostic batching core (accumulator,
//! geometry buffers, texture slot table, frame controller) and a wgpu
//! backend that implements the [`RenderBackend`] seam for real GPUs.

pub mod backend;
pub mod batch;
pub mod color;
pub mod geometry;
pub mod renderer;
pub mod shader;
pub mod slots;
pub mod subtexture;
pub mod vertex;
pub mod wgpu_backend;

pub use backend::{BatchTexture, PrimitiveKind, RenderBackend, Shader};
pub use batch::{
    BatchAccumulator, BatchLimits, INVALID_TEXTURE_COLOR, QUAD_POSITIONS, QUAD_TEX_COORDS,
    Statistics,
};
pub use color::Color;
pub use renderer::{Renderer2D, VIEW_PROJECTION_UNIFORM};
pub use shader::{ShaderError, ShaderPoll, ShaderSlot, ShaderSource, ShaderTask};
pub use slots::{SlotsExhausted, TextureSlotTable};
pub use subtexture::SubTexture;
pub use vertex::{CircleVertex, GlyphQuad, LineVertex, QuadVertex, TextVertex};
pub use wgpu_backend::{WgpuBackend, WgpuBackendError, WgpuTexture};
