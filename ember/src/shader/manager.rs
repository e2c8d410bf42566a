use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{ShaderAsset, ShaderId, ShaderOrigin, DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};
use crate::backend::{
    GraphicsBackend, ProgramId, ResourceCounts, ShaderStage, SharedBackend, StageId, UniformValue,
};
use crate::check_backend;
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};

/// Registry of linked shader programs.
///
/// A built-in default program is compiled at construction and is always
/// available: [`disable`](Self::disable) rebinds it, so some program is bound
/// at all times. Its vertex stage is kept compiled and reused by every load
/// that does not provide its own vertex source.
pub struct ShaderManager<B: GraphicsBackend> {
    backend: SharedBackend<B>,
    config: RenderConfig,
    shaders: HashMap<ShaderId, ShaderAsset>,
    default_id: ShaderId,
    default_vertex: Option<StageId>,
    next_id: u32,
}

impl<B: GraphicsBackend> ShaderManager<B> {
    /// Create a manager with the default configuration and bind the default program.
    pub fn new(backend: SharedBackend<B>) -> Result<Self> {
        Self::with_config(backend, RenderConfig::default())
    }

    pub fn with_config(backend: SharedBackend<B>, config: RenderConfig) -> Result<Self> {
        let mut manager = Self {
            backend,
            config,
            shaders: HashMap::new(),
            default_id: ShaderId(0),
            default_vertex: None,
            next_id: 0,
        };

        let vertex = manager
            .backend
            .borrow_mut()
            .compile_stage(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .map_err(|log| compile_failed(ShaderStage::Vertex, log))?;
        manager.default_vertex = Some(vertex);

        let (program, counts) = manager.link_sources(None, DEFAULT_FRAGMENT_SOURCE)?;
        manager.default_id = manager.register(
            ShaderOrigin::Inline {
                name: "default".to_string(),
            },
            program,
            counts,
            None,
            DEFAULT_FRAGMENT_SOURCE.to_string(),
        );

        {
            let mut gpu = manager.backend.borrow_mut();
            gpu.use_program(program);
            check_backend!(&mut *gpu);
        }
        log::debug!("default shader ready as {}", manager.default_id);
        Ok(manager)
    }

    /// Load a shader from source files.
    ///
    /// With no vertex path the default vertex stage is reused.
    pub fn load(&mut self, vertex: Option<&Path>, fragment: &Path) -> Result<ShaderId> {
        let vertex_source = vertex.map(read_source).transpose()?;
        let fragment_source = read_source(fragment)?;

        let (program, counts) = self.link_sources(vertex_source.as_deref(), &fragment_source)?;
        let id = self.register(
            ShaderOrigin::Files {
                vertex: vertex.map(Path::to_path_buf),
                fragment: fragment.to_path_buf(),
            },
            program,
            counts,
            vertex_source,
            fragment_source,
        );
        log::info!("loaded shader {id} from {}", fragment.display());
        Ok(id)
    }

    /// Compile and link a shader from in-memory source text.
    pub fn load_from_str(&mut self, vertex: Option<&str>, fragment: &str) -> Result<ShaderId> {
        let (program, counts) = self.link_sources(vertex, fragment)?;
        let name = format!("inline-{}", self.next_id);
        let id = self.register(
            ShaderOrigin::Inline { name },
            program,
            counts,
            vertex.map(str::to_string),
            fragment.to_string(),
        );
        log::debug!("loaded inline shader {id}");
        Ok(id)
    }

    /// Bind a shader for subsequent draws.
    pub fn enable(&mut self, id: ShaderId) -> Result<()> {
        let program = self.program(id)?;
        let mut gpu = self.backend.borrow_mut();
        gpu.use_program(program);
        check_backend!(&mut *gpu);
        Ok(())
    }

    /// Rebind the default program.
    pub fn disable(&mut self) {
        let Some(program) = self.shaders.get(&self.default_id).map(|s| s.program) else {
            return;
        };
        let mut gpu = self.backend.borrow_mut();
        gpu.use_program(program);
        check_backend!(&mut *gpu);
    }

    pub fn set_bool(&mut self, id: ShaderId, name: &str, value: bool) -> Result<()> {
        self.set_uniform(id, name, UniformValue::Bool(value))
    }

    pub fn set_int(&mut self, id: ShaderId, name: &str, value: i32) -> Result<()> {
        self.set_uniform(id, name, UniformValue::Int(value))
    }

    pub fn set_float(&mut self, id: ShaderId, name: &str, value: f32) -> Result<()> {
        self.set_uniform(id, name, UniformValue::Float(value))
    }

    pub fn set_vec4(&mut self, id: ShaderId, name: &str, value: [f32; 4]) -> Result<()> {
        self.set_uniform(id, name, UniformValue::Vec4(value))
    }

    /// Recompile a shader from its origin and swap the program in place.
    ///
    /// File shaders are re-read from disk; inline shaders reuse their text.
    /// On failure the previous program stays registered and bound.
    pub fn reload(&mut self, id: ShaderId) -> Result<()> {
        let asset = self.shaders.get(&id).ok_or(RenderError::UnknownShader(id))?;
        let (vertex_source, fragment_source) = match &asset.origin {
            ShaderOrigin::Files { vertex, fragment } => (
                vertex.as_deref().map(read_source).transpose()?,
                read_source(fragment)?,
            ),
            ShaderOrigin::Inline { .. } => {
                (asset.vertex_source.clone(), asset.fragment_source.clone())
            }
        };

        let (program, counts) = match self.link_sources(vertex_source.as_deref(), &fragment_source)
        {
            Ok(linked) => linked,
            Err(err) => {
                log::warn!("reload of shader {id} failed, keeping previous program");
                return Err(err);
            }
        };

        let Some(asset) = self.shaders.get_mut(&id) else {
            return Err(RenderError::UnknownShader(id));
        };
        let old = std::mem::replace(&mut asset.program, program);
        asset.counts = counts;
        asset.vertex_source = vertex_source;
        asset.fragment_source = fragment_source;

        let mut gpu = self.backend.borrow_mut();
        if gpu.current_program() == Some(old) {
            gpu.use_program(program);
        }
        gpu.destroy_program(old);
        check_backend!(&mut *gpu);
        log::info!("reloaded shader {id}");
        Ok(())
    }

    /// Destroy a shader. If it was bound, the default program is bound instead.
    pub fn unload(&mut self, id: ShaderId) -> Result<()> {
        if id == self.default_id {
            return Err(RenderError::DefaultShaderPinned);
        }
        let asset = self.shaders.remove(&id).ok_or(RenderError::UnknownShader(id))?;
        let default_program = self.program(self.default_id)?;

        let mut gpu = self.backend.borrow_mut();
        if gpu.current_program() == Some(asset.program) {
            gpu.use_program(default_program);
        }
        gpu.destroy_program(asset.program);
        check_backend!(&mut *gpu);
        log::debug!("unloaded shader {id}");
        Ok(())
    }

    pub fn asset(&self, id: ShaderId) -> Option<&ShaderAsset> {
        self.shaders.get(&id)
    }

    /// The registered shader whose program is currently bound.
    pub fn current(&self) -> Option<ShaderId> {
        let bound = self.backend.borrow().current_program()?;
        self.shaders
            .values()
            .find(|asset| asset.program == bound)
            .map(|asset| asset.id)
    }

    pub fn default_shader(&self) -> ShaderId {
        self.default_id
    }

    /// Number of registered shaders, the default included.
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn backend(&self) -> &SharedBackend<B> {
        &self.backend
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn program(&self, id: ShaderId) -> Result<ProgramId> {
        self.shaders
            .get(&id)
            .map(|asset| asset.program)
            .ok_or(RenderError::UnknownShader(id))
    }

    fn set_uniform(&mut self, id: ShaderId, name: &str, value: UniformValue) -> Result<()> {
        let program = self.program(id)?;
        let mut gpu = self.backend.borrow_mut();
        match gpu.uniform_location(program, name) {
            Some(location) => gpu.set_uniform(program, location, value),
            None if self.config.validate_uniforms => {
                log::warn!("shader {id} has no uniform named '{name}'");
            }
            None => log::trace!("shader {id}: ignoring unknown uniform '{name}'"),
        }
        check_backend!(&mut *gpu);
        Ok(())
    }

    /// Compile the given stages and link them into a program.
    ///
    /// Stages compiled here are destroyed once linking finishes, whatever the
    /// outcome. The stored default vertex stage is never destroyed here.
    fn link_sources(&self, vertex: Option<&str>, fragment: &str) -> Result<(ProgramId, ResourceCounts)> {
        let mut gpu = self.backend.borrow_mut();

        let vertex_stage = vertex
            .map(|source| gpu.compile_stage(ShaderStage::Vertex, source))
            .transpose()
            .map_err(|log| compile_failed(ShaderStage::Vertex, log))?;

        let fragment_stage = match gpu.compile_stage(ShaderStage::Fragment, fragment) {
            Ok(stage) => stage,
            Err(log) => {
                if let Some(stage) = vertex_stage {
                    gpu.destroy_stage(stage);
                }
                return Err(compile_failed(ShaderStage::Fragment, log));
            }
        };

        let Some(vertex_for_link) = vertex_stage.or(self.default_vertex) else {
            gpu.destroy_stage(fragment_stage);
            return Err(RenderError::ShaderLink {
                log: "no vertex stage available".to_string(),
            });
        };
        let linked = gpu.link_program(vertex_for_link, fragment_stage);

        if let Some(stage) = vertex_stage {
            gpu.destroy_stage(stage);
        }
        gpu.destroy_stage(fragment_stage);

        let program = linked.map_err(|log| {
            log::error!("shader program failed to link:\n{log}");
            RenderError::ShaderLink { log }
        })?;
        let counts = gpu.resource_counts(program);
        log::debug!("linked program {} ({counts:?})", program.raw());
        Ok((program, counts))
    }

    fn register(
        &mut self,
        origin: ShaderOrigin,
        program: ProgramId,
        counts: ResourceCounts,
        vertex_source: Option<String>,
        fragment_source: String,
    ) -> ShaderId {
        let id = ShaderId(self.next_id);
        self.next_id += 1;
        self.shaders.insert(
            id,
            ShaderAsset {
                id,
                program,
                origin,
                counts,
                vertex_source,
                fragment_source,
            },
        );
        id
    }
}

impl<B: GraphicsBackend> Drop for ShaderManager<B> {
    fn drop(&mut self) {
        let Ok(mut gpu) = self.backend.try_borrow_mut() else {
            log::warn!("backend busy while dropping shader manager; leaking programs");
            return;
        };
        for (_, asset) in self.shaders.drain() {
            gpu.destroy_program(asset.program);
        }
        if let Some(stage) = self.default_vertex.take() {
            gpu.destroy_stage(stage);
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        log::error!("failed to read shader source {}: {source}", path.display());
        RenderError::ResourceRead {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn compile_failed(stage: ShaderStage, log: String) -> RenderError {
    log::error!("{stage} shader failed to compile:\n{log}");
    RenderError::ShaderCompile { stage, log }
}
