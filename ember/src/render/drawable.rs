use glam::{Mat4, Quat, Vec2};

use crate::backend::TextureId;
use crate::texture::TextureAsset;

/// The part of a texture a quad shows, as five UV corners plus a flip flag.
///
/// Corners are ordered for the built-in quad: top-left, top-right,
/// bottom-right (twice, shared by both triangles), bottom-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteRegion {
    /// Non-zero components mirror the quad on that axis.
    pub flipped: [f32; 2],
    pub corners: [[f32; 2]; 5],
}

impl SpriteRegion {
    /// The whole texture, unflipped.
    pub const FULL: Self = Self {
        flipped: [0.0, 0.0],
        corners: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 1.0]],
    };

    /// Normalised sub-rectangle with its top-left at (`x`, `y`).
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        let right = x + width;
        let bottom = y + height;
        Self {
            flipped: [0.0, 0.0],
            corners: [[x, y], [right, y], [right, bottom], [right, bottom], [x, bottom]],
        }
    }

    /// Pixel rectangle inside a `texture_width` x `texture_height` atlas.
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    ) -> Self {
        let tw = texture_width.max(1) as f32;
        let th = texture_height.max(1) as f32;
        Self::from_rect(
            x as f32 / tw,
            y as f32 / th,
            width as f32 / tw,
            height as f32 / th,
        )
    }

    #[must_use]
    pub fn flipped(mut self, horizontal: bool, vertical: bool) -> Self {
        self.flipped = [f32::from(u8::from(horizontal)), f32::from(u8::from(vertical))];
        self
    }

    pub fn is_flipped_x(&self) -> bool {
        self.flipped[0] != 0.0
    }

    pub fn is_flipped_y(&self) -> bool {
        self.flipped[1] != 0.0
    }
}

impl Default for SpriteRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// One item in a render pass queue: a textured quad.
#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    pub texture: TextureId,
    /// Model matrix applied to the unit quad centred on the origin.
    pub transform: Mat4,
    pub region: SpriteRegion,
    /// Multiplicative tint. `None` draws opaque white.
    pub tint: Option<[f32; 4]>,
}

impl Drawable {
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            transform: Mat4::IDENTITY,
            region: SpriteRegion::FULL,
            tint: None,
        }
    }

    /// A quad showing the whole texture at its pixel size times `scale`,
    /// rotated by `rotation` radians and centred on `position`.
    pub fn sprite(texture: &TextureAsset, position: Vec2, scale: Vec2, rotation: f32) -> Self {
        let size = texture.size() * scale;
        Self {
            transform: Mat4::from_scale_rotation_translation(
                size.extend(1.0),
                Quat::from_rotation_z(rotation),
                position.extend(0.0),
            ),
            ..Self::new(texture.handle())
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: SpriteRegion) -> Self {
        self.region = region;
        self
    }

    #[must_use]
    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = Some(tint);
        self
    }
}
