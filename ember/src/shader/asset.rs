use std::path::PathBuf;

use super::ShaderId;
use crate::backend::{ProgramId, ResourceCounts};

/// Where a shader's source text came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderOrigin {
    /// Loaded from disk. `vertex` is `None` when the default vertex stage was used.
    Files {
        vertex: Option<PathBuf>,
        fragment: PathBuf,
    },
    /// Compiled from in-memory text.
    Inline { name: String },
}

/// A linked shader program registered with the [`ShaderManager`](super::ShaderManager).
///
/// An asset only exists once both stages compiled and the program linked.
#[derive(Clone, Debug)]
pub struct ShaderAsset {
    pub(crate) id: ShaderId,
    pub(crate) program: ProgramId,
    pub(crate) origin: ShaderOrigin,
    pub(crate) counts: ResourceCounts,
    pub(crate) vertex_source: Option<String>,
    pub(crate) fragment_source: String,
}

impl ShaderAsset {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// Backend program handle. Replaced when the shader is reloaded.
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn origin(&self) -> &ShaderOrigin {
        &self.origin
    }

    /// Resources declared by the linked program.
    pub fn counts(&self) -> ResourceCounts {
        self.counts
    }

    pub fn sampler_count(&self) -> u32 {
        self.counts.samplers
    }

    pub fn uniform_buffer_count(&self) -> u32 {
        self.counts.uniform_buffers
    }

    pub fn storage_buffer_count(&self) -> u32 {
        self.counts.storage_buffers
    }

    pub fn storage_texture_count(&self) -> u32 {
        self.counts.storage_textures
    }

    /// Vertex source text, or `None` if the default vertex stage was used.
    pub fn vertex_source(&self) -> Option<&str> {
        self.vertex_source.as_deref()
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }
}
