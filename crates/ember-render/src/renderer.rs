//! The public frame/scene API of the 2D renderer.
//!
//! [`Renderer2D`] owns the backend, the batch accumulator, and the four
//! shader slots. `begin_scene`/`end_scene` bracket a batch; the ergonomic
//! draw overloads compose transforms and delegate to the accumulator's
//! canonical matrix-based calls.

use ember_core::profiling::profile_function;
use glam::{Mat4, Vec2, Vec3};

use crate::backend::{PrimitiveKind, RenderBackend, Shader};
use crate::batch::{BatchAccumulator, BatchLimits, QUAD_POSITIONS, QUAD_TEX_COORDS, Statistics};
use crate::color::Color;
use crate::shader::ShaderSlot;
use crate::subtexture::SubTexture;
use crate::vertex::GlyphQuad;

/// Uniform name every batch shader exposes for the camera matrix.
pub const VIEW_PROJECTION_UNIFORM: &str = "u_view_projection";

/// The 2D batched renderer.
///
/// Single-threaded: all methods run on the frame thread. The only background
/// work is shader compilation, polled at `begin_scene`; until all four
/// shaders are ready, `begin_scene` fails and draw calls are no-ops.
pub struct Renderer2D<B: RenderBackend> {
    backend: B,
    batch: BatchAccumulator<B>,
    shaders: [ShaderSlot<B::Shader>; 4],
    line_width: f32,
    in_scene: bool,
}

impl<B: RenderBackend> Renderer2D<B> {
    pub fn new(backend: B, limits: BatchLimits) -> Self {
        Self::with_backend(backend, limits)
    }

    fn with_backend(mut backend: B, limits: BatchLimits) -> Self {
        let shaders =
            PrimitiveKind::ALL.map(|kind| ShaderSlot::loading(kind, backend.load_shader(kind)));
        let batch = BatchAccumulator::new(&backend, limits);
        backend.set_line_width(2.0);
        Self {
            backend,
            batch,
            shaders,
            line_width: 2.0,
            in_scene: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn batch(&self) -> &BatchAccumulator<B> {
        &self.batch
    }

    /// Whether all four shaders have finished compiling. Does not poll.
    pub fn is_ready(&self) -> bool {
        self.shaders.iter().all(ShaderSlot::is_ready)
    }

    /// Begin a scene with the given view-projection matrix.
    ///
    /// Polls in-flight shader compiles first. Returns `false` without
    /// touching accumulator state while any required shader is still
    /// loading; the caller should skip rendering this frame.
    pub fn begin_scene(&mut self, view_projection: Mat4) -> bool {
        profile_function!();

        for slot in &mut self.shaders {
            slot.poll();
        }
        if !self.is_ready() {
            tracing::debug!("begin_scene skipped: shaders still compiling");
            return false;
        }

        if self.in_scene {
            tracing::warn!("begin_scene while a scene is active, flushing previous scene");
            self.batch.flush_and_reset(&mut self.backend);
        }

        for slot in &self.shaders {
            if let Some(shader) = slot.get() {
                shader.set_mat4(VIEW_PROJECTION_UNIFORM, view_projection);
            }
        }

        self.batch.reset();
        self.in_scene = true;
        true
    }

    /// Flush whatever the scene accumulated.
    pub fn end_scene(&mut self) {
        profile_function!();

        if !self.in_scene {
            return;
        }
        self.batch.flush_and_reset(&mut self.backend);
        self.in_scene = false;
    }

    // --- Plain quads ---

    pub fn draw_quad(&mut self, position: Vec2, size: Vec2, color: Color) {
        self.draw_quad_at(position.extend(0.0), size, color);
    }

    pub fn draw_quad_at(&mut self, position: Vec3, size: Vec2, color: Color) {
        let transform = compose_transform(position, size, 0.0);
        self.draw_quad_transformed(&transform, color, -1);
    }

    pub fn draw_rotated_quad(&mut self, position: Vec2, size: Vec2, rotation: f32, color: Color) {
        self.draw_rotated_quad_at(position.extend(0.0), size, rotation, color);
    }

    pub fn draw_rotated_quad_at(
        &mut self,
        position: Vec3,
        size: Vec2,
        rotation: f32,
        color: Color,
    ) {
        let transform = compose_transform(position, size, rotation);
        self.draw_quad_transformed(&transform, color, -1);
    }

    /// Canonical solid-quad draw.
    pub fn draw_quad_transformed(&mut self, transform: &Mat4, color: Color, entity_id: i32) {
        if !self.in_scene {
            return;
        }
        self.batch
            .draw_quad(&mut self.backend, transform, color, entity_id);
    }

    // --- Textured quads ---

    pub fn draw_textured_quad(
        &mut self,
        position: Vec2,
        size: Vec2,
        texture: Option<&B::Texture>,
        tiling_factor: Vec2,
        tint: Color,
    ) {
        let transform = compose_transform(position.extend(0.0), size, 0.0);
        self.draw_textured_quad_transformed(&transform, texture, tiling_factor, tint, -1);
    }

    pub fn draw_rotated_textured_quad(
        &mut self,
        position: Vec3,
        size: Vec2,
        rotation: f32,
        texture: Option<&B::Texture>,
        tiling_factor: Vec2,
        tint: Color,
    ) {
        let transform = compose_transform(position, size, rotation);
        self.draw_textured_quad_transformed(&transform, texture, tiling_factor, tint, -1);
    }

    /// Canonical textured-quad draw. `None` renders the placeholder color.
    pub fn draw_textured_quad_transformed(
        &mut self,
        transform: &Mat4,
        texture: Option<&B::Texture>,
        tiling_factor: Vec2,
        tint: Color,
        entity_id: i32,
    ) {
        if !self.in_scene {
            return;
        }
        self.batch.draw_textured_quad(
            &mut self.backend,
            transform,
            texture,
            QUAD_TEX_COORDS,
            tiling_factor,
            tint,
            entity_id,
        );
    }

    // --- Sub-texture (atlas cell) quads ---

    pub fn draw_subtexture_quad(
        &mut self,
        position: Vec2,
        size: Vec2,
        subtexture: &SubTexture<B::Texture>,
        tiling_factor: Vec2,
        tint: Color,
    ) {
        let transform = compose_transform(position.extend(0.0), size, 0.0);
        self.draw_subtexture_quad_transformed(&transform, subtexture, tiling_factor, tint, -1);
    }

    pub fn draw_subtexture_quad_transformed(
        &mut self,
        transform: &Mat4,
        subtexture: &SubTexture<B::Texture>,
        tiling_factor: Vec2,
        tint: Color,
        entity_id: i32,
    ) {
        if !self.in_scene {
            return;
        }
        self.batch.draw_textured_quad(
            &mut self.backend,
            transform,
            Some(subtexture.texture()),
            subtexture.tex_coords(),
            tiling_factor,
            tint,
            entity_id,
        );
    }

    // --- Circles ---

    pub fn draw_circle(
        &mut self,
        transform: &Mat4,
        color: Color,
        thickness: f32,
        fade: f32,
        entity_id: i32,
    ) {
        if !self.in_scene {
            return;
        }
        self.batch
            .draw_circle(&mut self.backend, transform, color, thickness, fade, entity_id);
    }

    // --- Lines and rects ---

    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Color, entity_id: i32) {
        if !self.in_scene {
            return;
        }
        self.batch
            .draw_line(&mut self.backend, start, end, color, entity_id);
    }

    /// Axis-aligned rectangle outline built from four lines.
    pub fn draw_rect(&mut self, position: Vec3, size: Vec2, color: Color, entity_id: i32) {
        let half = size * 0.5;
        let p0 = position + Vec3::new(-half.x, -half.y, 0.0);
        let p1 = position + Vec3::new(half.x, -half.y, 0.0);
        let p2 = position + Vec3::new(half.x, half.y, 0.0);
        let p3 = position + Vec3::new(-half.x, half.y, 0.0);
        self.draw_line(p0, p1, color, entity_id);
        self.draw_line(p1, p2, color, entity_id);
        self.draw_line(p2, p3, color, entity_id);
        self.draw_line(p3, p0, color, entity_id);
    }

    /// Rectangle outline under an arbitrary transform.
    pub fn draw_rect_transformed(&mut self, transform: &Mat4, color: Color, entity_id: i32) {
        let corners = QUAD_POSITIONS.map(|corner| (*transform * corner).truncate());
        for i in 0..4 {
            self.draw_line(corners[i], corners[(i + 1) % 4], color, entity_id);
        }
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
        self.backend.set_line_width(width);
    }

    // --- Text ---

    /// Draw a run of glyphs laid out by the text crate.
    pub fn draw_glyph_run(
        &mut self,
        atlas: &B::Texture,
        glyphs: &[GlyphQuad],
        color: Color,
        entity_id: i32,
    ) {
        if !self.in_scene {
            return;
        }
        self.batch
            .draw_glyph_run(&mut self.backend, atlas, glyphs, color, entity_id);
    }

    // --- Statistics and shader lifecycle ---

    pub fn stats(&self) -> Statistics {
        self.batch.stats()
    }

    pub fn reset_stats(&mut self) {
        self.batch.reset_stats();
    }

    /// Recompile one shader stage. The old shader keeps serving frames
    /// until the replacement finishes.
    pub fn reload_shader(&mut self, kind: PrimitiveKind) {
        let task = self.backend.load_shader(kind);
        self.shaders[kind.index()].reload(task);
    }
}

impl<B: RenderBackend> Drop for Renderer2D<B> {
    fn drop(&mut self) {
        // Wait out in-flight compiles so no loader thread outlives the
        // backend resources it would finalize against.
        for slot in &mut self.shaders {
            slot.shutdown();
        }
    }
}

fn compose_transform(position: Vec3, size: Vec2, rotation: f32) -> Mat4 {
    let mut transform = Mat4::from_translation(position);
    if rotation != 0.0 {
        transform *= Mat4::from_rotation_z(rotation);
    }
    transform * Mat4::from_scale(Vec3::new(size.x, size.y, 1.0))
}
