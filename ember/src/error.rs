use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{BackendErrorCode, ShaderStage};
use crate::shader::ShaderId;

/// Errors reported by the shader manager and render passes.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A shader or texture file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    ResourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single shader stage failed to compile. `log` is the backend diagnostic.
    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// Both stages compiled but the program failed to link.
    #[error("shader program failed to link:\n{log}")]
    ShaderLink { log: String },

    /// A render pass could not allocate its pipeline or depth attachment.
    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// A driver-reported error code, surfaced only in strict mode.
    #[error("backend error {code} at {file}:{line}")]
    BackendState {
        code: BackendErrorCode,
        file: &'static str,
        line: u32,
    },

    /// `render` was called on a pass that is not initialised (or was released).
    #[error("render pass '{name}' is not initialised")]
    PassNotReady { name: String },

    /// The shader id does not refer to a registered program.
    #[error("unknown shader {0}")]
    UnknownShader(ShaderId),

    /// The built-in default program backs `disable` and is never unloaded.
    #[error("the default shader cannot be unloaded")]
    DefaultShaderPinned,

    /// Texture creation or decoding failed.
    #[error("texture error: {0}")]
    Texture(String),

    #[error("invalid render config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
