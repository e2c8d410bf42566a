//! Shader programs: loading, binding, uniforms and hot-reload.

mod asset;
mod manager;

use std::fmt;

pub use asset::{ShaderAsset, ShaderOrigin};
pub use manager::ShaderManager;

/// Vertex stage of the built-in program: a textured, tinted quad driven by
/// the per-draw [`UniformBlock`](crate::render::UniformBlock).
pub const DEFAULT_VERTEX_SOURCE: &str = include_str!("default.vert.wgsl");

/// Fragment stage of the built-in program: texture sample times tint.
pub const DEFAULT_FRAGMENT_SOURCE: &str = include_str!("default.frag.wgsl");

/// Identifies a shader registered with a [`ShaderManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub(crate) u32);

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
