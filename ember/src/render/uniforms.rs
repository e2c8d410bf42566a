use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::drawable::SpriteRegion;

/// Per-draw uniform data, laid out exactly as `DrawUniforms` in the
/// built-in vertex shader (`@group(0) @binding(0)`).
///
/// | field   | offset |
/// |---------|--------|
/// | camera  | 0      |
/// | model   | 64     |
/// | flipped | 128    |
/// | uv0..4  | 136    |
/// | tint    | 176    |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub camera: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Non-zero components mirror the quad on that axis.
    pub flipped: [f32; 2],
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
    pub uv2: [f32; 2],
    pub uv3: [f32; 2],
    pub uv4: [f32; 2],
    pub tint: [f32; 4],
}

pub const UNIFORM_BLOCK_SIZE: usize = 192;

const _: () = assert!(std::mem::size_of::<UniformBlock>() == UNIFORM_BLOCK_SIZE);

impl UniformBlock {
    pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    pub fn new(camera: &Mat4, model: &Mat4, region: &SpriteRegion, tint: Option<[f32; 4]>) -> Self {
        let [uv0, uv1, uv2, uv3, uv4] = region.corners;
        Self {
            camera: camera.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            flipped: region.flipped,
            uv0,
            uv1,
            uv2,
            uv3,
            uv4,
            tint: tint.unwrap_or(Self::WHITE),
        }
    }

    pub fn corners(&self) -> [[f32; 2]; 5] {
        [self.uv0, self.uv1, self.uv2, self.uv3, self.uv4]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self::new(&Mat4::IDENTITY, &Mat4::IDENTITY, &SpriteRegion::FULL, None)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::offset_of;

    use glam::Vec3;
    use wgpu::naga;

    use super::*;
    use crate::shader::DEFAULT_VERTEX_SOURCE;

    #[test]
    fn field_offsets_follow_uniform_layout_rules() {
        assert_eq!(offset_of!(UniformBlock, camera), 0);
        assert_eq!(offset_of!(UniformBlock, model), 64);
        assert_eq!(offset_of!(UniformBlock, flipped), 128);
        assert_eq!(offset_of!(UniformBlock, uv0), 136);
        assert_eq!(offset_of!(UniformBlock, uv4), 168);
        assert_eq!(offset_of!(UniformBlock, tint), 176);
    }

    #[test]
    fn matches_builtin_shader_struct() {
        let module = naga::front::wgsl::parse_str(DEFAULT_VERTEX_SOURCE).unwrap();
        let (_, ty) = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("DrawUniforms"))
            .unwrap();
        let naga::TypeInner::Struct { members, span } = &ty.inner else {
            panic!("DrawUniforms is not a struct");
        };

        assert_eq!(*span as usize, UNIFORM_BLOCK_SIZE);
        let offsets: Vec<_> = members.iter().map(|m| m.offset as usize).collect();
        assert_eq!(
            offsets,
            [
                offset_of!(UniformBlock, camera),
                offset_of!(UniformBlock, model),
                offset_of!(UniformBlock, flipped),
                offset_of!(UniformBlock, uv0),
                offset_of!(UniformBlock, uv1),
                offset_of!(UniformBlock, uv2),
                offset_of!(UniformBlock, uv3),
                offset_of!(UniformBlock, uv4),
                offset_of!(UniformBlock, tint),
            ]
        );
    }

    #[test]
    fn packs_transform_region_and_tint() {
        let model = Mat4::from_translation(Vec3::new(3.0, 4.0, 0.0));
        let region = SpriteRegion::from_rect(0.25, 0.5, 0.25, 0.5).flipped(true, false);
        let block = UniformBlock::new(&Mat4::IDENTITY, &model, &region, Some([0.5, 0.25, 1.0, 0.75]));

        assert_eq!(Mat4::from_cols_array_2d(&block.model), model);
        assert_eq!(block.flipped, [1.0, 0.0]);
        assert_eq!(block.corners(), region.corners);
        assert_eq!(block.tint, [0.5, 0.25, 1.0, 0.75]);

        let bytes = block.as_bytes();
        let tint: [f32; 4] = bytemuck::pod_read_unaligned(&bytes[176..192]);
        assert_eq!(tint, block.tint);
        let translation: [f32; 2] = bytemuck::pod_read_unaligned(&bytes[64 + 48..64 + 56]);
        assert_eq!(translation, [3.0, 4.0]);
    }

    #[test]
    fn default_is_identity_and_white() {
        let block = UniformBlock::default();
        assert_eq!(Mat4::from_cols_array_2d(&block.camera), Mat4::IDENTITY);
        assert_eq!(Mat4::from_cols_array_2d(&block.model), Mat4::IDENTITY);
        assert_eq!(block.tint, UniformBlock::WHITE);
        assert_eq!(block.flipped, [0.0, 0.0]);
    }
}
