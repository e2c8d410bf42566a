//! In-memory backend for unit tests.
//!
//! Compiles and links with the same `naga` front end as [`WgpuBackend`](super::WgpuBackend),
//! but never touches a GPU: every draw is recorded together with the uniform
//! block it was issued with.

use std::collections::{HashMap, VecDeque};

use super::reflect::{self, ProgramLayout, StageInfo};
use super::{
    BackendErrorCode, GraphicsBackend, HandleAllocator, PassDesc, PipelineDesc, PipelineId,
    ProgramId, ResourceCounts, ShaderStage, StageId, TextureDesc, TextureId, TextureUsage,
    UniformLocation, UniformValue,
};
use crate::render::UniformBlock;

/// One `draw` call as the device would have executed it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedDraw {
    pub pass: String,
    pub program: ProgramId,
    pub pipeline: PipelineId,
    pub texture: TextureId,
    pub depth: TextureId,
    pub target: u32,
    pub uniforms: UniformBlock,
    pub vertex_count: u32,
}

struct Program {
    layout: ProgramLayout,
    params: Vec<u8>,
}

struct OpenPass {
    label: String,
    pipeline: PipelineId,
    depth: TextureId,
    texture: Option<TextureId>,
    uniforms: Option<UniformBlock>,
    draws: Vec<RecordedDraw>,
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    handles: HandleAllocator,
    stages: HashMap<StageId, StageInfo>,
    programs: HashMap<ProgramId, Program>,
    textures: HashMap<TextureId, (TextureUsage, u32, u32)>,
    pipelines: HashMap<PipelineId, ProgramId>,
    current: Option<ProgramId>,
    pass: Option<OpenPass>,
    errors: VecDeque<BackendErrorCode>,
    /// Fail the next `create_pipeline` call.
    pub fail_next_pipeline: bool,
    /// Fail every depth attachment allocation.
    pub fail_depth: bool,
    pub passes_begun: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    pub fn has_program(&self, program: ProgramId) -> bool {
        self.programs.contains_key(&program)
    }

    pub fn has_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|&(_, w, h)| (w, h))
    }

    /// Current bytes of a program's parameter block.
    pub fn param_bytes(&self, program: ProgramId) -> Option<&[u8]> {
        let program = self.programs.get(&program)?;
        program.layout.params.as_ref()?;
        Some(&program.params)
    }

    /// Queue an error code as if the device had raised it.
    pub fn inject_error(&mut self, code: BackendErrorCode) {
        self.errors.push_back(code);
    }

    pub fn pending_errors(&self) -> usize {
        self.errors.len()
    }

    fn report(&mut self, code: BackendErrorCode) {
        self.errors.push_back(code);
    }
}

impl GraphicsBackend for RecordingBackend {
    type CommandBuffer = Vec<RecordedDraw>;
    type RenderTarget = u32;
    type Format = u32;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageId, String> {
        let info = reflect::compile(stage, source)?;
        let id = self.handles.stage()?;
        self.stages.insert(id, info);
        Ok(id)
    }

    fn destroy_stage(&mut self, stage: StageId) {
        if self.stages.remove(&stage).is_none() {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String> {
        let (Some(v), Some(f)) = (self.stages.get(&vertex), self.stages.get(&fragment)) else {
            return Err("attached stage does not exist".to_string());
        };
        let layout = reflect::link(v, f)?;
        let params = vec![0; layout.params.as_ref().map_or(0, |p| p.size as usize)];

        let id = self.handles.program()?;
        self.programs.insert(id, Program { layout, params });
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            self.report(BackendErrorCode::InvalidValue);
        } else if self.current == Some(program) {
            self.current = None;
        }
    }

    fn resource_counts(&self, program: ProgramId) -> ResourceCounts {
        self.programs
            .get(&program)
            .map(|p| p.layout.counts)
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let params = self.programs.get(&program)?.layout.params.as_ref()?;
        params
            .field_index(name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let encoded = self.programs.get_mut(&program).and_then(|p| {
            let field = p.layout.params.as_ref()?.fields.get(location.0 as usize)?;
            let bytes = reflect::encode_param(field.kind, value)?;
            let offset = field.offset as usize;
            p.params[offset..offset + bytes.len()].copy_from_slice(&bytes);
            Some(())
        });
        if encoded.is_none() {
            self.report(BackendErrorCode::InvalidOperation);
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.current = Some(program);
        } else {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc<'_>,
        rgba: Option<&[u8]>,
    ) -> Result<TextureId, String> {
        if desc.width == 0 || desc.height == 0 {
            return Err(format!("texture '{}' has zero size", desc.label));
        }
        if desc.usage == TextureUsage::DepthAttachment && self.fail_depth {
            return Err("out of depth attachments".to_string());
        }
        if let Some(data) = rgba {
            if data.len() != desc.width as usize * desc.height as usize * 4 {
                return Err(format!("texture '{}' has the wrong pixel count", desc.label));
            }
        }
        let id = self.handles.texture()?;
        self.textures.insert(id, (desc.usage, desc.width, desc.height));
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, u32>) -> Result<PipelineId, String> {
        if std::mem::take(&mut self.fail_next_pipeline) {
            return Err(format!("pipeline '{}' rejected", desc.label));
        }
        if !self.programs.contains_key(&desc.program) {
            return Err(format!("unknown program {}", desc.program.raw()));
        }
        let id = self.handles.pipeline()?;
        self.pipelines.insert(id, desc.program);
        Ok(id)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        if self.pipelines.remove(&pipeline).is_none() {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn begin_pass(&mut self, pass: &PassDesc<'_>) {
        if self.pass.is_some() {
            self.report(BackendErrorCode::InvalidOperation);
        }
        self.passes_begun += 1;
        self.pass = Some(OpenPass {
            label: pass.label.to_string(),
            pipeline: pass.pipeline,
            depth: pass.depth,
            texture: None,
            uniforms: None,
            draws: Vec::new(),
        });
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        let sampled = matches!(self.textures.get(&texture), Some((TextureUsage::Sampled, ..)));
        match self.pass.as_mut() {
            Some(pass) if slot == 0 && sampled => pass.texture = Some(texture),
            Some(_) => self.report(BackendErrorCode::InvalidValue),
            None => self.report(BackendErrorCode::InvalidOperation),
        }
    }

    fn push_uniforms(&mut self, slot: u32, data: &[u8]) {
        let valid = slot == 0 && data.len() == std::mem::size_of::<UniformBlock>();
        match self.pass.as_mut() {
            Some(pass) if valid => pass.uniforms = Some(bytemuck::pod_read_unaligned(data)),
            Some(_) => self.report(BackendErrorCode::InvalidValue),
            None => self.report(BackendErrorCode::InvalidOperation),
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        let Some(program) = self.current else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let Some(pass) = self.pass.as_mut() else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let (Some(texture), Some(uniforms)) = (pass.texture, pass.uniforms) else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        pass.draws.push(RecordedDraw {
            pass: pass.label.clone(),
            program,
            pipeline: pass.pipeline,
            texture,
            depth: pass.depth,
            target: 0,
            uniforms,
            vertex_count,
        });
    }

    fn end_pass(&mut self, commands: &mut Vec<RecordedDraw>, target: &u32) {
        let Some(pass) = self.pass.take() else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        if !self.pipelines.contains_key(&pass.pipeline) || !self.textures.contains_key(&pass.depth)
        {
            self.report(BackendErrorCode::InvalidFramebufferOperation);
            return;
        }
        commands.extend(pass.draws.into_iter().map(|draw| RecordedDraw {
            target: *target,
            ..draw
        }));
    }

    fn poll_error(&mut self) -> Option<BackendErrorCode> {
        self.errors.pop_front()
    }
}
