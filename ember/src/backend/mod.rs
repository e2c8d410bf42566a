//! Graphics backend abstraction.
//!
//! The shader manager and render passes never talk to a GPU API directly;
//! they go through [`GraphicsBackend`]. The production implementation is
//! [`WgpuBackend`]. All handles are plain ids owned by whoever created them:
//! the creator is responsible for the matching `destroy_*` call.
//!
//! The backend is shared between the shader manager and every render pass as
//! a [`SharedBackend`] (`Rc<RefCell<_>>`). The underlying graphics context is
//! not reentrant, and `Rc` keeps the whole thing on one thread.

mod reflect;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod recording;

use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroU32;
use std::rc::Rc;

pub use wgpu_backend::{WgpuBackend, DEPTH_FORMAT};

/// A backend shared by the shader manager and render passes.
pub type SharedBackend<B> = Rc<RefCell<B>>;

/// Wrap a backend for sharing.
pub fn share<B: GraphicsBackend>(backend: B) -> SharedBackend<B> {
    Rc::new(RefCell::new(backend))
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Raw id value. Never zero.
            pub fn raw(self) -> u32 {
                self.0.get()
            }
        }
    };
}

handle_type!(
    /// A compiled, unlinked shader stage.
    StageId
);
handle_type!(
    /// A linked shader program.
    ProgramId
);
handle_type!(
    /// A pipeline state object (format, blend and depth configuration).
    PipelineId
);
handle_type!(
    /// A texture (sampled image or depth attachment).
    TextureId
);

/// Hands out non-zero ids. Ids are never reused within one backend: once
/// the 32-bit space is used up, allocation fails.
#[derive(Debug)]
pub(crate) struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    fn next(&mut self) -> Result<NonZeroU32, String> {
        let id = NonZeroU32::new(self.next).ok_or_else(|| "handle ids exhausted".to_string())?;
        self.next = self.next.checked_add(1).unwrap_or(0);
        Ok(id)
    }

    pub(crate) fn stage(&mut self) -> Result<StageId, String> {
        self.next().map(StageId)
    }

    pub(crate) fn program(&mut self) -> Result<ProgramId, String> {
        self.next().map(ProgramId)
    }

    pub(crate) fn pipeline(&mut self) -> Result<PipelineId, String> {
        self.next().map(PipelineId)
    }

    pub(crate) fn texture(&mut self) -> Result<TextureId, String> {
        self.next().map(TextureId)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Resources a linked program declares, summed over both stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub samplers: u32,
    pub uniform_buffers: u32,
    pub storage_buffers: u32,
    pub storage_textures: u32,
}

/// Location of a named uniform inside a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec4([f32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureUsage {
    /// RGBA8 texture sampled by shaders.
    Sampled,
    /// Depth attachment for a render pass.
    DepthAttachment,
}

#[derive(Clone, Debug)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub usage: TextureUsage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Straight alpha blending (`src * a + dst * (1 - a)`).
    Alpha,
    /// No blending.
    Replace,
}

/// Fixed state for a pipeline object.
///
/// `program` is the program the pipeline is validated against at creation
/// time. Draws recorded later use whatever program is current.
#[derive(Clone, Debug)]
pub struct PipelineDesc<'a, F> {
    pub label: &'a str,
    pub color_format: F,
    pub blend: BlendMode,
    pub depth_test: bool,
    pub program: ProgramId,
}

/// Everything needed to open a render pass on the backend.
#[derive(Clone, Debug)]
pub struct PassDesc<'a> {
    pub label: &'a str,
    pub pipeline: PipelineId,
    pub depth: TextureId,
    pub clear_color: Option<[f32; 4]>,
}

/// Generic device error codes, reported through [`GraphicsBackend::poll_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendErrorCode {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    InvalidFramebufferOperation,
    Unknown(u32),
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorCode::InvalidEnum => f.write_str("INVALID_ENUM"),
            BackendErrorCode::InvalidValue => f.write_str("INVALID_VALUE"),
            BackendErrorCode::InvalidOperation => f.write_str("INVALID_OPERATION"),
            BackendErrorCode::StackOverflow => f.write_str("STACK_OVERFLOW"),
            BackendErrorCode::StackUnderflow => f.write_str("STACK_UNDERFLOW"),
            BackendErrorCode::OutOfMemory => f.write_str("OUT_OF_MEMORY"),
            BackendErrorCode::InvalidFramebufferOperation => {
                f.write_str("INVALID_FRAMEBUFFER_OPERATION")
            }
            BackendErrorCode::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// GPU operations consumed by the shader manager and render passes.
///
/// Compile and link failures return the backend's diagnostic log as the
/// error. Operations on stale or unknown handles are not fatal: they record a
/// [`BackendErrorCode`] for the next [`poll_error`](Self::poll_error) and do
/// nothing.
pub trait GraphicsBackend {
    /// Where draw commands are recorded.
    type CommandBuffer;
    /// The color target passes draw into.
    type RenderTarget: ?Sized;
    /// Color target format.
    type Format: Copy + fmt::Debug;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageId, String>;
    fn destroy_stage(&mut self, stage: StageId);
    fn link_program(&mut self, vertex: StageId, fragment: StageId) -> Result<ProgramId, String>;
    fn destroy_program(&mut self, program: ProgramId);
    fn resource_counts(&self, program: ProgramId) -> ResourceCounts;

    /// `None` when the program declares no uniform with that name.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue);
    /// Make `program` current for subsequent draws.
    fn use_program(&mut self, program: ProgramId);
    fn current_program(&self) -> Option<ProgramId>;

    /// Create a texture. `rgba` holds initial pixels for sampled textures.
    fn create_texture(&mut self, desc: &TextureDesc<'_>, rgba: Option<&[u8]>)
        -> Result<TextureId, String>;
    fn destroy_texture(&mut self, texture: TextureId);
    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, Self::Format>)
        -> Result<PipelineId, String>;
    fn destroy_pipeline(&mut self, pipeline: PipelineId);

    fn begin_pass(&mut self, pass: &PassDesc<'_>);
    fn bind_texture(&mut self, slot: u32, texture: TextureId);
    fn push_uniforms(&mut self, slot: u32, data: &[u8]);
    fn draw(&mut self, vertex_count: u32);
    /// Encode everything recorded since `begin_pass` into `commands`.
    fn end_pass(&mut self, commands: &mut Self::CommandBuffer, target: &Self::RenderTarget);

    /// Pop the oldest pending error code, if any.
    fn poll_error(&mut self) -> Option<BackendErrorCode>;
}

/// Drain every pending backend error, logging each with its call site.
///
/// Returns the first code so strict callers can turn it into an error.
/// Use through [`check_backend!`](crate::check_backend) to capture the caller's file and line.
pub fn drain_errors<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    file: &'static str,
    line: u32,
) -> Option<BackendErrorCode> {
    let mut first = None;
    while let Some(code) = backend.poll_error() {
        log::error!("backend error in {file} at line {line}: {code}");
        first.get_or_insert(code);
    }
    first
}

/// Poll and log backend errors at the current source location.
#[macro_export]
macro_rules! check_backend {
    ($backend:expr) => {
        $crate::backend::drain_errors($backend, file!(), line!())
    };
}
