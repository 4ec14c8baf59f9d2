//! The wgpu implementation of the batching backend.
//!
//! Flushes record draw commands (vertex upload + bind groups + draw) without
//! touching a render pass; [`WgpuBackend::render`] replays them into the
//! caller's pass. Each flush writes into its own pooled vertex buffer so a
//! frame with multiple flushes never overwrites geometry the GPU has not
//! consumed yet.

mod pipeline;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use parking_lot::Mutex;

use crate::backend::{BatchTexture, PrimitiveKind, RenderBackend, Shader};
use crate::batch::BatchLimits;
use crate::renderer::VIEW_PROJECTION_UNIFORM;
use crate::shader::{ShaderError, ShaderSource, ShaderTask};

const QUAD_SHADER: &str = include_str!("../shaders/quad.wgsl");
const CIRCLE_SHADER: &str = include_str!("../shaders/circle.wgsl");
const LINE_SHADER: &str = include_str!("../shaders/line.wgsl");
const TEXT_SHADER: &str = include_str!("../shaders/text.wgsl");

/// Errors from backend construction.
#[derive(Debug)]
pub enum WgpuBackendError {
    /// No compatible adapter was found.
    AdapterUnavailable,

    /// The adapter does not expose the features the batch shaders need.
    MissingFeatures(wgpu::Features),

    /// Device creation failed.
    DeviceRequest(String),
}

impl std::fmt::Display for WgpuBackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WgpuBackendError::AdapterUnavailable => write!(f, "No compatible GPU adapter found"),
            WgpuBackendError::MissingFeatures(features) => {
                write!(f, "Adapter is missing required features: {:?}", features)
            }
            WgpuBackendError::DeviceRequest(msg) => {
                write!(f, "Failed to create GPU device: {}", msg)
            }
        }
    }
}

impl std::error::Error for WgpuBackendError {}

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

struct TextureInner {
    id: u64,
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// A reference-counted GPU texture handle.
#[derive(Clone)]
pub struct WgpuTexture {
    inner: Arc<TextureInner>,
}

impl WgpuTexture {
    /// Wrap an existing texture, taking a fresh identity.
    pub fn from_raw(texture: wgpu::Texture, view: wgpu::TextureView, width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                texture,
                view,
                width,
                height,
            }),
        }
    }

    /// Upload RGBA8 pixel data into a new texture.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        label: Option<&str>,
    ) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self::from_raw(texture, view, width, height)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.inner.view
    }
}

impl BatchTexture for WgpuTexture {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn width(&self) -> u32 {
        self.inner.width
    }

    fn height(&self) -> u32 {
        self.inner.height
    }
}

/// Shader handle: uniform uploads go straight through the queue into the
/// shared camera buffer.
pub struct WgpuShader {
    queue: wgpu::Queue,
    camera_buffer: wgpu::Buffer,
}

impl Shader for WgpuShader {
    fn set_mat4(&self, name: &str, value: Mat4) {
        if name == VIEW_PROJECTION_UNIFORM {
            self.queue
                .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&value));
        } else {
            tracing::warn!("Unknown mat4 uniform: {}", name);
        }
    }
}

type PipelineRegistry = [Option<wgpu::RenderPipeline>; 4];

/// Pool of full-capacity vertex buffers for one primitive kind. One buffer
/// per flush within a frame; `reset` makes them all reusable again.
struct VertexBufferPool {
    kind: PrimitiveKind,
    buffers: Vec<Arc<wgpu::Buffer>>,
    in_use: usize,
}

impl VertexBufferPool {
    fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            buffers: Vec::new(),
            in_use: 0,
        }
    }

    fn acquire(&mut self, device: &wgpu::Device, limits: &BatchLimits) -> Arc<wgpu::Buffer> {
        if self.in_use == self.buffers.len() {
            self.buffers
                .push(Arc::new(pipeline::create_vertex_buffer(device, self.kind, limits)));
        }
        let buffer = self.buffers[self.in_use].clone();
        self.in_use += 1;
        buffer
    }

    fn reset(&mut self) {
        self.in_use = 0;
    }
}

enum DrawCommand {
    Indexed {
        kind: PrimitiveKind,
        vertex_buffer: Arc<wgpu::Buffer>,
        bind_group: Option<wgpu::BindGroup>,
        index_count: u32,
    },
    Lines {
        vertex_buffer: Arc<wgpu::Buffer>,
        vertex_count: u32,
    },
}

/// The production [`RenderBackend`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    limits: BatchLimits,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    texture_array_layout: wgpu::BindGroupLayout,
    atlas_layout: wgpu::BindGroupLayout,
    pipeline_layouts: [wgpu::PipelineLayout; 4],
    pipelines: Arc<Mutex<PipelineRegistry>>,
    index_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    white: WgpuTexture,
    vertex_pools: [VertexBufferPool; 4],
    staged: [Option<Arc<wgpu::Buffer>>; 4],
    pending_textures: Vec<(u32, WgpuTexture)>,
    commands: Vec<DrawCommand>,
    line_width: f32,
}

impl WgpuBackend {
    /// Features the batch shaders require beyond the wgpu baseline.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::TEXTURE_BINDING_ARRAY
            | wgpu::Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
    }

    /// Create a backend with no surface, rendering to offscreen targets.
    pub fn new_headless(limits: BatchLimits) -> Result<Self, WgpuBackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .map_err(|_| WgpuBackendError::AdapterUnavailable)?;
        Self::from_adapter(&adapter, wgpu::TextureFormat::Rgba8UnormSrgb, limits)
    }

    /// Create a backend on an already selected adapter.
    pub fn from_adapter(
        adapter: &wgpu::Adapter,
        surface_format: wgpu::TextureFormat,
        limits: BatchLimits,
    ) -> Result<Self, WgpuBackendError> {
        let required = Self::required_features();
        let missing = required - adapter.features();
        if !missing.is_empty() {
            return Err(WgpuBackendError::MissingFeatures(missing));
        }
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("batch_renderer_device"),
            required_features: required,
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| WgpuBackendError::DeviceRequest(e.to_string()))?;
        Ok(Self::new(device, queue, surface_format, limits))
    }

    /// Create a backend on an existing device and queue.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        limits: BatchLimits,
    ) -> Self {
        let camera_buffer = pipeline::create_camera_buffer(&device);
        let camera_layout = pipeline::create_camera_bind_group_layout(&device);
        let camera_bind_group =
            pipeline::create_camera_bind_group(&device, &camera_layout, &camera_buffer);

        let texture_array_layout =
            pipeline::create_texture_array_bind_group_layout(&device, limits.max_texture_slots);
        let atlas_layout = pipeline::create_atlas_bind_group_layout(&device);

        let pipeline_layouts = PrimitiveKind::ALL.map(|kind| {
            let groups: Vec<&wgpu::BindGroupLayout> = match kind {
                PrimitiveKind::Quad => vec![&camera_layout, &texture_array_layout],
                PrimitiveKind::Text => vec![&camera_layout, &atlas_layout],
                PrimitiveKind::Circle | PrimitiveKind::Line => vec![&camera_layout],
            };
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("batch_{}_layout", kind)),
                bind_group_layouts: &groups,
                push_constant_ranges: &[],
            })
        });

        let index_buffer = pipeline::create_quad_index_buffer(&device, &queue, limits.max_quads);
        let sampler = pipeline::create_batch_sampler(&device);
        let (white_texture, white_view) = pipeline::create_white_texture(&device, &queue);
        let white = WgpuTexture::from_raw(white_texture, white_view, 1, 1);

        Self {
            device,
            queue,
            surface_format,
            limits,
            camera_buffer,
            camera_bind_group,
            texture_array_layout,
            atlas_layout,
            pipeline_layouts,
            pipelines: Arc::new(Mutex::new([None, None, None, None])),
            index_buffer,
            sampler,
            white,
            vertex_pools: PrimitiveKind::ALL.map(VertexBufferPool::new),
            staged: [None, None, None, None],
            pending_textures: Vec::new(),
            commands: Vec::new(),
            line_width: 1.0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    /// Upload RGBA8 pixels into a batch-ready texture.
    pub fn create_texture(&self, width: u32, height: u32, pixels: &[u8], label: Option<&str>) -> WgpuTexture {
        WgpuTexture::from_rgba8(&self.device, &self.queue, width, height, pixels, label)
    }

    /// Discard recorded commands and recycle vertex buffers. Call once per
    /// frame before the first `begin_scene`.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
        for pool in &mut self.vertex_pools {
            pool.reset();
        }
        self.staged = [None, None, None, None];
        self.pending_textures.clear();
    }

    /// Replay recorded draw commands into a render pass.
    pub fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let pipelines = self.pipelines.lock();
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for command in self.commands.drain(..) {
            match command {
                DrawCommand::Indexed {
                    kind,
                    vertex_buffer,
                    bind_group,
                    index_count,
                } => {
                    let Some(render_pipeline) = &pipelines[kind.index()] else {
                        tracing::warn!("Dropping {} draw: pipeline not ready", kind);
                        continue;
                    };
                    pass.set_pipeline(render_pipeline);
                    if let Some(bind_group) = &bind_group {
                        pass.set_bind_group(1, bind_group, &[]);
                    }
                    pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    pass.draw_indexed(0..index_count, 0, 0..1);
                }
                DrawCommand::Lines {
                    vertex_buffer,
                    vertex_count,
                } => {
                    let Some(render_pipeline) = &pipelines[PrimitiveKind::Line.index()] else {
                        tracing::warn!("Dropping line draw: pipeline not ready");
                        continue;
                    };
                    pass.set_pipeline(render_pipeline);
                    pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    pass.draw(0..vertex_count, 0..1);
                }
            }
        }
    }

    fn take_staged(&mut self, kind: PrimitiveKind) -> Option<Arc<wgpu::Buffer>> {
        let staged = self.staged[kind.index()].take();
        if staged.is_none() {
            tracing::warn!("{} draw issued without a vertex upload", kind);
        }
        staged
    }

    fn quad_bind_group(&self) -> wgpu::BindGroup {
        // The binding array expects exactly max_texture_slots views; unused
        // slots get the white texture.
        let mut views: Vec<&wgpu::TextureView> =
            vec![self.white.view(); self.limits.max_texture_slots as usize];
        for (slot, texture) in &self.pending_textures {
            if let Some(entry) = views.get_mut(*slot as usize) {
                *entry = texture.view();
            }
        }
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("batch_texture_array_bg"),
            layout: &self.texture_array_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureViewArray(&views),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn atlas_bind_group(&self) -> wgpu::BindGroup {
        let atlas = self
            .pending_textures
            .first()
            .map(|(_, texture)| texture)
            .unwrap_or(&self.white);
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("batch_atlas_bg"),
            layout: &self.atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(atlas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

fn shader_code(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Quad => QUAD_SHADER,
        PrimitiveKind::Circle => CIRCLE_SHADER,
        PrimitiveKind::Line => LINE_SHADER,
        PrimitiveKind::Text => TEXT_SHADER,
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = WgpuTexture;
    type Shader = WgpuShader;

    fn load_shader(&mut self, kind: PrimitiveKind) -> ShaderTask<WgpuShader> {
        let code = shader_code(kind);
        let label = format!("batch_{}_shader", kind);

        let device = self.device.clone();
        let queue = self.queue.clone();
        let camera_buffer = self.camera_buffer.clone();
        let pipeline_layout = self.pipeline_layouts[kind.index()].clone();
        let pipelines = self.pipelines.clone();
        let surface_format = self.surface_format;

        ShaderTask::spawn(
            move || {
                Ok(ShaderSource {
                    label,
                    code: code.to_string(),
                })
            },
            move |source| {
                device.push_error_scope(wgpu::ErrorFilter::Validation);
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&source.label),
                    source: wgpu::ShaderSource::Wgsl(source.code.into()),
                });
                let render_pipeline = pipeline::create_batch_pipeline(
                    &device,
                    kind,
                    &module,
                    &pipeline_layout,
                    surface_format,
                );
                if let Some(error) = pollster::block_on(device.pop_error_scope()) {
                    return Err(ShaderError::CompileFailed(error.to_string()));
                }
                pipelines.lock()[kind.index()] = Some(render_pipeline);
                Ok(WgpuShader {
                    queue: queue.clone(),
                    camera_buffer: camera_buffer.clone(),
                })
            },
        )
    }

    fn white_texture(&self) -> WgpuTexture {
        self.white.clone()
    }

    fn upload_vertices(&mut self, kind: PrimitiveKind, bytes: &[u8]) {
        let buffer = self.vertex_pools[kind.index()].acquire(&self.device, &self.limits);
        self.queue.write_buffer(&buffer, 0, bytes);
        self.staged[kind.index()] = Some(buffer);
    }

    fn bind_texture(&mut self, slot: u32, texture: &WgpuTexture) {
        self.pending_textures.push((slot, texture.clone()));
    }

    fn draw_indexed(&mut self, kind: PrimitiveKind, index_count: u32) {
        let Some(vertex_buffer) = self.take_staged(kind) else {
            self.pending_textures.clear();
            return;
        };
        let bind_group = match kind {
            PrimitiveKind::Quad => Some(self.quad_bind_group()),
            PrimitiveKind::Text => Some(self.atlas_bind_group()),
            PrimitiveKind::Circle | PrimitiveKind::Line => None,
        };
        self.pending_textures.clear();
        self.commands.push(DrawCommand::Indexed {
            kind,
            vertex_buffer,
            bind_group,
            index_count,
        });
    }

    fn draw_lines(&mut self, vertex_count: u32) {
        let Some(vertex_buffer) = self.take_staged(PrimitiveKind::Line) else {
            return;
        };
        self.commands.push(DrawCommand::Lines {
            vertex_buffer,
            vertex_count,
        });
    }

    fn set_line_width(&mut self, width: f32) {
        // wgpu rasterizes lines at a fixed 1px; remember the request so a
        // future geometry-expanded line path can honor it.
        if width != self.line_width {
            tracing::debug!("Line width {} requested; backend draws 1px lines", width);
        }
        self.line_width = width;
    }
}
