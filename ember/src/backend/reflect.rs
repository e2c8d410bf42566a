//! WGSL stage compilation and program linking on top of `naga`.
//!
//! This is the device-independent half of [`WgpuBackend`](super::WgpuBackend):
//! parse + validate a stage, then check that two stages form a usable program
//! and reflect the program's parameter block. No GPU is needed.
//!
//! Binding contract every program must follow:
//!
//! | group | binding | resource                                    |
//! |-------|---------|---------------------------------------------|
//! | 0     | 0       | per-draw uniform block (dynamic offset)     |
//! | 0     | 1       | `texture_2d<f32>` bound per draw            |
//! | 0     | 2       | filtering sampler                           |
//! | 1     | 0       | optional program parameter block (uniform)  |

use std::collections::BTreeMap;

use wgpu::naga;

use super::{ResourceCounts, ShaderStage, UniformValue};
use crate::render::UNIFORM_BLOCK_SIZE;

pub(crate) const DRAW_GROUP: u32 = 0;
pub(crate) const PARAMS_GROUP: u32 = 1;

/// A parsed and validated stage.
#[derive(Debug)]
pub(crate) struct StageInfo {
    pub stage: ShaderStage,
    pub module: naga::Module,
    pub entry_point: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParamKind {
    Int,
    Uint,
    Float,
    Vec4,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParamField {
    pub name: String,
    pub offset: u32,
    pub kind: ParamKind,
}

/// Reflected `@group(1) @binding(0)` uniform struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParamBlockLayout {
    /// Buffer size in bytes, rounded up to 16.
    pub size: u32,
    pub fields: Vec<ParamField>,
}

impl ParamBlockLayout {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ProgramLayout {
    pub counts: ResourceCounts,
    pub params: Option<ParamBlockLayout>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResourceClass {
    Uniform,
    Storage,
    SampledTexture,
    StorageTexture,
    Sampler,
}

pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<StageInfo, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("validation error: {}", e.as_inner()))?;

    let wanted = naga_stage(stage);
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("no @{stage} entry point"))?;

    Ok(StageInfo {
        stage,
        module,
        entry_point,
    })
}

pub(crate) fn link(vertex: &StageInfo, fragment: &StageInfo) -> Result<ProgramLayout, String> {
    if vertex.stage != ShaderStage::Vertex {
        return Err(format!("{} stage attached as vertex stage", vertex.stage));
    }
    if fragment.stage != ShaderStage::Fragment {
        return Err(format!("{} stage attached as fragment stage", fragment.stage));
    }

    let produced = interface_locations(vertex, false);
    let consumed = interface_locations(fragment, true);
    for (location, input) in &consumed {
        match produced.get(location) {
            None => {
                return Err(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                ))
            }
            Some(output) if output != input => {
                return Err(format!(
                    "fragment input @location({location}) is {input:?} but the vertex stage writes {output:?}"
                ))
            }
            Some(_) => {}
        }
    }

    for info in [vertex, fragment] {
        if let Some(size) = draw_block_size(&info.module) {
            if size as usize > UNIFORM_BLOCK_SIZE {
                return Err(format!(
                    "{} stage per-draw block is {size} bytes, at most {UNIFORM_BLOCK_SIZE} are supplied",
                    info.stage
                ));
            }
        }
    }

    let mut resources = BTreeMap::new();
    for info in [vertex, fragment] {
        for (group, binding, class) in resource_bindings(&info.module) {
            check_binding(group, binding, class)?;
            if let Some(previous) = resources.insert((group, binding), class) {
                if previous != class {
                    return Err(format!(
                        "@group({group}) @binding({binding}) declared with different types"
                    ));
                }
            }
        }
    }

    let mut counts = ResourceCounts::default();
    for class in resources.values() {
        match class {
            ResourceClass::Uniform => counts.uniform_buffers += 1,
            ResourceClass::Storage => counts.storage_buffers += 1,
            ResourceClass::StorageTexture => counts.storage_textures += 1,
            ResourceClass::Sampler => counts.samplers += 1,
            ResourceClass::SampledTexture => {}
        }
    }

    let params = match (param_block(&vertex.module), param_block(&fragment.module)) {
        (Some(v), Some(f)) if v != f => {
            return Err("parameter block layout differs between stages".to_string())
        }
        (v, f) => f.or(v),
    };

    Ok(ProgramLayout { counts, params })
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// `@location`s written by a vertex entry point or read by a fragment one,
/// with their types.
fn interface_locations(info: &StageInfo, inputs: bool) -> BTreeMap<u32, naga::TypeInner> {
    let mut locations = BTreeMap::new();
    let Some(ep) = info
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == info.entry_point)
    else {
        return locations;
    };

    let types = &info.module.types;
    let mut collect = |ty: naga::Handle<naga::Type>, binding: Option<&naga::Binding>| {
        match binding {
            Some(naga::Binding::Location { location, .. }) => {
                locations.insert(*location, types[ty].inner.clone());
            }
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &types[ty].inner {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                            locations.insert(*location, types[member.ty].inner.clone());
                        }
                    }
                }
            }
        }
    };

    if inputs {
        for arg in &ep.function.arguments {
            collect(arg.ty, arg.binding.as_ref());
        }
    } else if let Some(result) = &ep.function.result {
        collect(result.ty, result.binding.as_ref());
    }

    locations
}

fn resource_bindings(module: &naga::Module) -> Vec<(u32, u32, ResourceClass)> {
    module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            let class = match var.space {
                naga::AddressSpace::Uniform => ResourceClass::Uniform,
                naga::AddressSpace::Storage { .. } => ResourceClass::Storage,
                naga::AddressSpace::Handle => match &module.types[var.ty].inner {
                    naga::TypeInner::Sampler { .. } => ResourceClass::Sampler,
                    naga::TypeInner::Image {
                        class: naga::ImageClass::Storage { .. },
                        ..
                    } => ResourceClass::StorageTexture,
                    _ => ResourceClass::SampledTexture,
                },
                _ => return None,
            };
            Some((binding.group, binding.binding, class))
        })
        .collect()
}

fn check_binding(group: u32, binding: u32, class: ResourceClass) -> Result<(), String> {
    let allowed = matches!(
        (group, binding, class),
        (DRAW_GROUP, 0, ResourceClass::Uniform)
            | (DRAW_GROUP, 1, ResourceClass::SampledTexture)
            | (DRAW_GROUP, 2, ResourceClass::Sampler)
            | (PARAMS_GROUP, 0, ResourceClass::Uniform)
    );
    if allowed {
        Ok(())
    } else {
        Err(format!(
            "unsupported resource {class:?} at @group({group}) @binding({binding})"
        ))
    }
}

/// Size of the `@group(0) @binding(0)` uniform declared by a stage.
fn draw_block_size(module: &naga::Module) -> Option<u32> {
    module.global_variables.iter().find_map(|(_, var)| {
        let binding = var.binding.as_ref()?;
        let is_draw = var.space == naga::AddressSpace::Uniform
            && binding.group == DRAW_GROUP
            && binding.binding == 0;
        is_draw.then(|| module.types[var.ty].inner.size(module.to_ctx()))
    })
}

fn param_block(module: &naga::Module) -> Option<ParamBlockLayout> {
    let var = module.global_variables.iter().find_map(|(_, var)| {
        let binding = var.binding.as_ref()?;
        let is_params = var.space == naga::AddressSpace::Uniform
            && binding.group == PARAMS_GROUP
            && binding.binding == 0;
        is_params.then_some(var)
    })?;

    let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
        return None;
    };

    let fields = members
        .iter()
        .filter_map(|member| {
            let name = member.name.clone()?;
            let kind = param_kind(&module.types[member.ty].inner)?;
            Some(ParamField {
                name,
                offset: member.offset,
                kind,
            })
        })
        .collect();

    Some(ParamBlockLayout {
        size: span.div_ceil(16) * 16,
        fields,
    })
}

fn param_kind(inner: &naga::TypeInner) -> Option<ParamKind> {
    match inner {
        naga::TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            naga::ScalarKind::Sint => Some(ParamKind::Int),
            naga::ScalarKind::Uint => Some(ParamKind::Uint),
            naga::ScalarKind::Float => Some(ParamKind::Float),
            _ => None,
        },
        naga::TypeInner::Vector {
            size: naga::VectorSize::Quad,
            scalar,
        } if scalar.kind == naga::ScalarKind::Float && scalar.width == 4 => Some(ParamKind::Vec4),
        _ => None,
    }
}

/// Bytes to write for `value` into a field of `kind`, or `None` on a type
/// mismatch. Booleans are stored as 0/1 integers.
pub(crate) fn encode_param(kind: ParamKind, value: UniformValue) -> Option<Vec<u8>> {
    let bytes = match (kind, value) {
        (ParamKind::Int, UniformValue::Int(v)) => bytemuck::bytes_of(&v).to_vec(),
        (ParamKind::Int, UniformValue::Bool(b)) => bytemuck::bytes_of(&i32::from(b)).to_vec(),
        (ParamKind::Uint, UniformValue::Bool(b)) => bytemuck::bytes_of(&u32::from(b)).to_vec(),
        (ParamKind::Uint, UniformValue::Int(v)) => {
            bytemuck::bytes_of(&u32::try_from(v).ok()?).to_vec()
        }
        (ParamKind::Float, UniformValue::Float(v)) => bytemuck::bytes_of(&v).to_vec(),
        (ParamKind::Vec4, UniformValue::Vec4(v)) => bytemuck::cast_slice(&v).to_vec(),
        _ => return None,
    };
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};

    const TINTED_FRAGMENT: &str = r#"
struct Params {
    strength: f32,
    mode: i32,
    flags: u32,
    color: vec4<f32>,
}

@group(0) @binding(1) var sprite_texture: texture_2d<f32>;
@group(0) @binding(2) var sprite_sampler: sampler;
@group(1) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(@location(0) uv: vec2<f32>, @location(1) tint: vec4<f32>) -> @location(0) vec4<f32> {
    let base = textureSample(sprite_texture, sprite_sampler, uv) * tint;
    return mix(base, params.color, params.strength);
}
"#;

    const OVERSIZED_VERTEX: &str = r#"
struct Wide {
    rows: array<vec4<f32>, 16>,
}

@group(0) @binding(0) var<uniform> wide: Wide;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var out: VertexOutput;
    out.position = wide.rows[index % 16u];
    out.uv = out.position.xy;
    out.tint = wide.rows[0];
    return out;
}
"#;

    fn default_vertex() -> StageInfo {
        compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap()
    }

    #[test]
    fn default_sources_compile_and_link() {
        let vertex = default_vertex();
        let fragment = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();
        assert_eq!(vertex.entry_point, "vs_main");
        assert_eq!(fragment.entry_point, "fs_main");

        let layout = link(&vertex, &fragment).unwrap();
        assert_eq!(layout.counts.uniform_buffers, 1);
        assert_eq!(layout.counts.samplers, 1);
        assert_eq!(layout.counts.storage_buffers, 0);
        assert!(layout.params.is_none());
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let log = compile(ShaderStage::Fragment, "@fragment fn fs_main( {").unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn missing_entry_point_is_compile_error() {
        let log = compile(ShaderStage::Vertex, DEFAULT_FRAGMENT_SOURCE).unwrap_err();
        assert!(log.contains("@vertex"), "{log}");
    }

    #[test]
    fn params_block_is_reflected() {
        let fragment = compile(ShaderStage::Fragment, TINTED_FRAGMENT).unwrap();
        let layout = link(&default_vertex(), &fragment).unwrap();
        let params = layout.params.unwrap();

        assert_eq!(params.size, 32);
        let names: Vec<_> = params.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["strength", "mode", "flags", "color"]);
        assert_eq!(params.fields[0].kind, ParamKind::Float);
        assert_eq!(params.fields[1].kind, ParamKind::Int);
        assert_eq!(params.fields[2].kind, ParamKind::Uint);
        assert_eq!(params.fields[3].kind, ParamKind::Vec4);
        assert_eq!(params.fields[3].offset, 16);
        assert_eq!(layout.counts.uniform_buffers, 2);
    }

    #[test]
    fn unwritten_fragment_input_fails_link() {
        let fragment = compile(
            ShaderStage::Fragment,
            r#"
@fragment
fn fs_main(@location(5) extra: vec4<f32>) -> @location(0) vec4<f32> {
    return extra;
}
"#,
        )
        .unwrap();
        let log = link(&default_vertex(), &fragment).unwrap_err();
        assert!(log.contains("@location(5)"), "{log}");
    }

    #[test]
    fn mismatched_interface_type_fails_link() {
        let fragment = compile(
            ShaderStage::Fragment,
            r#"
@fragment
fn fs_main(@location(0) uv: vec4<f32>) -> @location(0) vec4<f32> {
    return uv;
}
"#,
        )
        .unwrap();
        let log = link(&default_vertex(), &fragment).unwrap_err();
        assert!(log.contains("@location(0)"), "{log}");
    }

    #[test]
    fn oversized_draw_block_fails_link() {
        let vertex = compile(ShaderStage::Vertex, OVERSIZED_VERTEX).unwrap();
        let fragment = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();
        let log = link(&vertex, &fragment).unwrap_err();
        assert!(log.contains("256 bytes"), "{log}");
    }

    #[test]
    fn storage_buffer_outside_contract_fails_link() {
        let fragment = compile(
            ShaderStage::Fragment,
            r#"
@group(2) @binding(0) var<storage, read> values: array<vec4<f32>>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return values[0];
}
"#,
        )
        .unwrap();
        let log = link(&default_vertex(), &fragment).unwrap_err();
        assert!(log.contains("@group(2)"), "{log}");
    }

    #[test]
    fn param_encoding_follows_field_kind() {
        assert_eq!(
            encode_param(ParamKind::Int, UniformValue::Bool(true)),
            Some(1i32.to_ne_bytes().to_vec())
        );
        assert_eq!(
            encode_param(ParamKind::Uint, UniformValue::Int(7)),
            Some(7u32.to_ne_bytes().to_vec())
        );
        assert_eq!(encode_param(ParamKind::Uint, UniformValue::Int(-1)), None);
        assert_eq!(encode_param(ParamKind::Float, UniformValue::Int(1)), None);
        assert_eq!(
            encode_param(ParamKind::Vec4, UniformValue::Vec4([1.0, 2.0, 3.0, 4.0]))
                .map(|bytes| bytes.len()),
            Some(16)
        );
    }

    #[test]
    fn swapped_stages_fail_link() {
        let fragment = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();
        let log = link(&fragment, &default_vertex()).unwrap_err();
        assert!(log.contains("attached as vertex"), "{log}");
    }
}
