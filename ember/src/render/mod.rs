//! Render passes and the per-draw data they upload.

mod drawable;
mod pass;
mod uniforms;

pub use drawable::{Drawable, SpriteRegion};
pub use pass::{RenderPass, QUAD_VERTEX_COUNT};
pub use uniforms::{UniformBlock, UNIFORM_BLOCK_SIZE};
