//! Mock implementation of the render backend for testing.
//!
//! Records every backend operation without touching a GPU, so tests can
//! assert on upload sizes, texture bindings, and draw ordering.

use std::sync::Arc;
use std::sync::mpsc;

use glam::Mat4;
use parking_lot::Mutex;

use ember_render::backend::{BatchTexture, PrimitiveKind, RenderBackend, Shader};
use ember_render::shader::{ShaderError, ShaderSource, ShaderTask};

/// Records a backend operation for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    LoadShader { kind: PrimitiveKind },
    UploadVertices { kind: PrimitiveKind, byte_len: usize },
    BindTexture { slot: u32, texture_id: u64 },
    DrawIndexed { kind: PrimitiveKind, index_count: u32 },
    DrawLines { vertex_count: u32 },
    SetLineWidth { width: f32 },
}

/// A mock texture handle: identity plus dimensions, nothing behind it.
#[derive(Debug, Clone)]
pub struct MockTexture {
    id: u64,
    width: u32,
    height: u32,
}

impl BatchTexture for MockTexture {
    fn id(&self) -> u64 {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// A mock shader that records uniform uploads into the backend's shared log.
pub struct MockShader {
    kind: PrimitiveKind,
    uniforms: Arc<Mutex<Vec<(PrimitiveKind, String, Mat4)>>>,
}

impl Shader for MockShader {
    fn set_mat4(&self, name: &str, value: Mat4) {
        self.uniforms.lock().push((self.kind, name.to_string(), value));
    }
}

type ShaderResult = Result<ShaderSource, ShaderError>;

/// Mock implementation of [`RenderBackend`].
///
/// By default shader loads complete on the first poll. Construct with
/// [`MockBackend::with_manual_shaders`] to keep them pending until the test
/// calls [`complete_shader_loads`](MockBackend::complete_shader_loads), which
/// exercises the not-yet-ready frame path.
pub struct MockBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    uniforms: Arc<Mutex<Vec<(PrimitiveKind, String, Mat4)>>>,
    pending_loads: Vec<(PrimitiveKind, mpsc::Sender<ShaderResult>)>,
    manual_shaders: bool,
    next_texture_id: u64,
    white: MockTexture,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            uniforms: Arc::new(Mutex::new(Vec::new())),
            pending_loads: Vec::new(),
            manual_shaders: false,
            next_texture_id: 1,
            white: MockTexture {
                id: 0,
                width: 1,
                height: 1,
            },
        }
    }

    /// Shader loads stay pending until [`complete_shader_loads`] is called.
    ///
    /// [`complete_shader_loads`]: MockBackend::complete_shader_loads
    pub fn with_manual_shaders() -> Self {
        Self {
            manual_shaders: true,
            ..Self::new()
        }
    }

    /// Mint a texture with a fresh identity.
    pub fn create_texture(&mut self, width: u32, height: u32) -> MockTexture {
        let id = self.next_texture_id;
        self.next_texture_id += 1;
        MockTexture { id, width, height }
    }

    /// Deliver every pending shader load. The shaders become ready on the
    /// renderer's next poll.
    pub fn complete_shader_loads(&mut self) {
        for (kind, tx) in self.pending_loads.drain(..) {
            let _ = tx.send(Ok(ShaderSource {
                label: format!("mock_{}_shader", kind),
                code: String::new(),
            }));
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count_uploads(&self, kind: PrimitiveKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, BackendCall::UploadVertices { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn count_indexed_draws(&self, kind: PrimitiveKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, BackendCall::DrawIndexed { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn count_line_draws(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, BackendCall::DrawLines { .. }))
            .count()
    }

    /// Texture bindings recorded since the last clear, as (slot, texture id).
    pub fn bound_textures(&self) -> Vec<(u32, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::BindTexture { slot, texture_id } => Some((*slot, *texture_id)),
                _ => None,
            })
            .collect()
    }

    /// Uniform uploads recorded by every mock shader.
    pub fn uniform_uploads(&self) -> Vec<(PrimitiveKind, String, Mat4)> {
        self.uniforms.lock().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for MockBackend {
    type Texture = MockTexture;
    type Shader = MockShader;

    fn load_shader(&mut self, kind: PrimitiveKind) -> ShaderTask<MockShader> {
        self.calls.lock().push(BackendCall::LoadShader { kind });

        let (tx, rx) = mpsc::channel();
        if self.manual_shaders {
            self.pending_loads.push((kind, tx));
        } else {
            let _ = tx.send(Ok(ShaderSource {
                label: format!("mock_{}_shader", kind),
                code: String::new(),
            }));
        }

        let uniforms = self.uniforms.clone();
        ShaderTask::from_channel(rx, move |_source| Ok(MockShader { kind, uniforms }))
    }

    fn white_texture(&self) -> MockTexture {
        self.white.clone()
    }

    fn upload_vertices(&mut self, kind: PrimitiveKind, bytes: &[u8]) {
        self.calls.lock().push(BackendCall::UploadVertices {
            kind,
            byte_len: bytes.len(),
        });
    }

    fn bind_texture(&mut self, slot: u32, texture: &MockTexture) {
        self.calls.lock().push(BackendCall::BindTexture {
            slot,
            texture_id: texture.id(),
        });
    }

    fn draw_indexed(&mut self, kind: PrimitiveKind, index_count: u32) {
        self.calls
            .lock()
            .push(BackendCall::DrawIndexed { kind, index_count });
    }

    fn draw_lines(&mut self, vertex_count: u32) {
        self.calls.lock().push(BackendCall::DrawLines { vertex_count });
    }

    fn set_line_width(&mut self, width: f32) {
        self.calls.lock().push(BackendCall::SetLineWidth { width });
    }
}
