use glam::Mat4;

use super::{Drawable, UniformBlock};
use crate::backend::{
    BlendMode, GraphicsBackend, PassDesc, PipelineDesc, PipelineId, SharedBackend,
};
use crate::check_backend;
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::texture::TextureAsset;

/// Vertices per queued item: two triangles, no vertex buffer.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// A pipeline, a depth attachment and a per-frame queue of drawables.
///
/// Lifecycle: [`new`](Self::new) → [`init`](Self::init) → any number of
/// [`render`](Self::render) calls → [`release`](Self::release) (or drop).
/// Items are drawn in the order they were queued, with whichever shader
/// program is bound at the time `render` runs.
pub struct RenderPass<B: GraphicsBackend> {
    backend: SharedBackend<B>,
    config: RenderConfig,
    name: String,
    size: (u32, u32),
    pipeline: Option<PipelineId>,
    depth: Option<TextureAsset>,
    queue: Vec<Drawable>,
}

impl<B: GraphicsBackend> RenderPass<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        Self::with_config(backend, RenderConfig::default())
    }

    pub fn with_config(backend: SharedBackend<B>, config: RenderConfig) -> Self {
        Self {
            backend,
            config,
            name: String::new(),
            size: (0, 0),
            pipeline: None,
            depth: None,
            queue: Vec::new(),
        }
    }

    /// Allocate the depth attachment and build the pipeline for `format`.
    ///
    /// The pipeline uses alpha blending and a depth test and is validated
    /// against the currently bound program. On failure everything created so
    /// far is destroyed and the pass stays unusable.
    pub fn init(&mut self, format: B::Format, width: u32, height: u32, name: &str) -> Result<()> {
        if self.is_ready() {
            return Err(RenderError::PipelineCreation(format!(
                "render pass '{}' is already initialised",
                self.name
            )));
        }
        self.name = name.to_string();
        if width == 0 || height == 0 {
            log::error!("render pass '{name}': invalid size {width}x{height}");
            return Err(RenderError::PipelineCreation(format!(
                "render pass '{name}' needs a non-zero size, got {width}x{height}"
            )));
        }

        let mut gpu = self.backend.borrow_mut();
        let Some(program) = gpu.current_program() else {
            return Err(RenderError::PipelineCreation(format!(
                "render pass '{name}': no shader program bound"
            )));
        };

        let mut depth = TextureAsset::depth(&mut *gpu, &format!("{name}-depth"), width, height)
            .map_err(|err| RenderError::PipelineCreation(err.to_string()))?;

        let desc = PipelineDesc {
            label: name,
            color_format: format,
            blend: BlendMode::Alpha,
            depth_test: true,
            program,
        };
        let pipeline = match gpu.create_pipeline(&desc) {
            Ok(pipeline) => pipeline,
            Err(log) => {
                log::error!("render pass '{name}': pipeline creation failed: {log}");
                depth.release(&mut *gpu);
                return Err(RenderError::PipelineCreation(log));
            }
        };
        check_backend!(&mut *gpu);
        drop(gpu);

        self.pipeline = Some(pipeline);
        self.depth = Some(depth);
        self.size = (width, height);
        log::debug!("render pass '{name}' initialised at {width}x{height} ({format:?})");
        Ok(())
    }

    /// Queue an item for the next [`render`](Self::render).
    pub fn push(&mut self, drawable: Drawable) {
        self.queue.push(drawable);
    }

    /// The pending queue, for callers that build it in bulk.
    pub fn queue(&mut self) -> &mut Vec<Drawable> {
        &mut self.queue
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Encode one draw per queued item into `commands`, then empty the queue.
    ///
    /// Each item binds its texture to slot 0, uploads a [`UniformBlock`] to
    /// uniform slot 0 and draws [`QUAD_VERTEX_COUNT`] vertices. Nothing is
    /// submitted; the caller owns `commands`.
    pub fn render(
        &mut self,
        commands: &mut B::CommandBuffer,
        target: &B::RenderTarget,
        camera: &Mat4,
    ) -> Result<()> {
        let (Some(pipeline), Some(depth)) = (self.pipeline, self.depth.as_ref()) else {
            log::warn!(
                "render pass '{}' is not initialised; discarding {} queued items",
                self.name,
                self.queue.len()
            );
            self.queue.clear();
            return Err(RenderError::PassNotReady {
                name: self.name.clone(),
            });
        };

        let max = self.config.max_draws_per_pass;
        if self.queue.len() > max {
            log::warn!(
                "render pass '{}': dropping {} items over the {max}-draw limit",
                self.name,
                self.queue.len() - max
            );
        }

        let mut gpu = self.backend.borrow_mut();
        gpu.begin_pass(&PassDesc {
            label: &self.name,
            pipeline,
            depth: depth.handle(),
            clear_color: self.config.clear_color,
        });

        for item in self.queue.drain(..).take(max) {
            gpu.bind_texture(0, item.texture);
            let block = UniformBlock::new(camera, &item.transform, &item.region, item.tint);
            gpu.push_uniforms(0, block.as_bytes());
            gpu.draw(QUAD_VERTEX_COUNT);
        }
        gpu.end_pass(commands, target);

        match check_backend!(&mut *gpu) {
            Some(code) if self.config.strict_backend_errors => Err(RenderError::BackendState {
                code,
                file: file!(),
                line: line!(),
            }),
            _ => Ok(()),
        }
    }

    /// Destroy the pipeline and depth attachment. Safe to call repeatedly.
    pub fn release(&mut self) {
        let backend = self.backend.clone();
        let mut gpu = backend.borrow_mut();
        self.release_with(&mut *gpu);
    }

    fn release_with(&mut self, gpu: &mut B) {
        self.queue.clear();
        let was_ready = self.is_ready();
        if let Some(pipeline) = self.pipeline.take() {
            gpu.destroy_pipeline(pipeline);
        }
        if let Some(mut depth) = self.depth.take() {
            depth.release(gpu);
        }
        if was_ready {
            log::debug!("render pass '{}' released", self.name);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some() && self.depth.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size passed to the last successful `init`.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Camera matrix mapping target pixels to clip space, origin at the top
    /// left and y pointing down.
    pub fn pixel_projection(&self) -> Mat4 {
        let (width, height) = self.size;
        Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
    }

    pub fn depth(&self) -> Option<&TextureAsset> {
        self.depth.as_ref()
    }

    pub fn pipeline(&self) -> Option<PipelineId> {
        self.pipeline
    }
}

impl<B: GraphicsBackend> Drop for RenderPass<B> {
    fn drop(&mut self) {
        let backend = self.backend.clone();
        let borrowed = backend.try_borrow_mut();
        match borrowed {
            Ok(mut gpu) => self.release_with(&mut *gpu),
            Err(_) if self.is_ready() => {
                log::warn!("backend busy while dropping render pass '{}'", self.name);
            }
            Err(_) => {}
        };
    }
}
