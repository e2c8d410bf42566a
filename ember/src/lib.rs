//! Ember - shader program management and render passes for a small wgpu engine.
//!
//! A [`ShaderManager`] turns WGSL source into linked programs and always keeps
//! a built-in default program bound. A [`RenderPass`] owns a pipeline and a
//! depth attachment and turns a per-frame queue of [`Drawable`]s into draw
//! commands, packing one [`UniformBlock`] per item. Both talk to the GPU
//! through a [`GraphicsBackend`]; [`WgpuBackend`] is the production one.

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod shader;
pub mod texture;

pub use crate::backend::{share, GraphicsBackend, SharedBackend, WgpuBackend};
pub use crate::config::RenderConfig;
pub use crate::error::{RenderError, Result};
pub use crate::logging::{init_logging, LoggingConfig};
pub use crate::render::{Drawable, RenderPass, SpriteRegion, UniformBlock};
pub use crate::shader::{ShaderAsset, ShaderId, ShaderManager};
pub use crate::texture::TextureAsset;
pub use glam::{Mat4, Vec2};
