//! The backend seam consumed by the batching core.
//!
//! The accumulator and frame controller are written against [`RenderBackend`]
//! so the same batching logic drives the wgpu implementation in production
//! and a recording mock in tests. Associated types keep texture and shader
//! handles concrete per backend with no downcasting.

use glam::Mat4;

use crate::shader::ShaderTask;

/// The four primitive kinds accumulated into separate vertex buffers, each
/// with its own shader pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Quad,
    Circle,
    Line,
    Text,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Quad,
        PrimitiveKind::Circle,
        PrimitiveKind::Line,
        PrimitiveKind::Text,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveKind::Quad => write!(f, "quad"),
            PrimitiveKind::Circle => write!(f, "circle"),
            PrimitiveKind::Line => write!(f, "line"),
            PrimitiveKind::Text => write!(f, "text"),
        }
    }
}

/// A texture handle usable in the batch's slot table.
///
/// Handles are expected to be cheap to clone (reference-counted). Identity
/// for slot reuse is by [`id`](BatchTexture::id), which must be stable and
/// unique per underlying texture.
pub trait BatchTexture: Clone {
    fn id(&self) -> u64;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// A compiled shader exposing uniform upload directly.
///
/// Pipeline binding is the backend's concern; the batching core only pushes
/// uniform data (the scene's view-projection matrix) through this trait.
pub trait Shader {
    fn set_mat4(&self, name: &str, value: Mat4);
}

/// The rendering backend contract the batcher flushes into.
///
/// All methods are driven from the frame thread. A flush translates to:
/// upload the written byte range per non-empty kind, bind the batch's
/// textures in slot order, then issue one indexed (or line) draw per kind.
pub trait RenderBackend {
    type Texture: BatchTexture;
    type Shader: Shader;

    /// Kick off asynchronous creation of the shader for `kind`.
    ///
    /// Source loading runs on a background thread; GPU-side finalization
    /// happens on the frame thread when the returned task is polled ready.
    fn load_shader(&mut self, kind: PrimitiveKind) -> ShaderTask<Self::Shader>;

    /// The 1x1 white texture occupying the reserved slot 0.
    fn white_texture(&self) -> Self::Texture;

    /// Upload the written prefix of a geometry buffer. `bytes` is exactly
    /// the live range; unused tail capacity is never transferred.
    fn upload_vertices(&mut self, kind: PrimitiveKind, bytes: &[u8]);

    /// Bind `texture` to `slot` for the next draw.
    fn bind_texture(&mut self, slot: u32, texture: &Self::Texture);

    /// Issue an indexed draw over the shared quad index pattern.
    fn draw_indexed(&mut self, kind: PrimitiveKind, index_count: u32);

    /// Issue a line-list draw.
    fn draw_lines(&mut self, vertex_count: u32);

    fn set_line_width(&mut self, width: f32);
}
