use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use wgpu::util::DeviceExt;
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Buffer,
    BufferBindingType, BufferUsages, ColorTargetState, ColorWrites, CommandEncoder, Extent3d,
    FilterMode, FragmentState, LoadOp, MultisampleState, Operations, Origin3d,
    PipelineLayoutDescriptor, PrimitiveState, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, Sampler, SamplerBindingType,
    SamplerDescriptor, ShaderModule, ShaderModuleDescriptor, ShaderSource, ShaderStages,
    TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect, TextureDescriptor,
    TextureDimension, TextureFormat, TextureSampleType, TextureUsages, TextureView,
    TextureViewDescriptor, TextureViewDimension, VertexState,
};

use super::reflect::{self, ParamBlockLayout, DRAW_GROUP, PARAMS_GROUP};
use super::{
    BackendErrorCode, BlendMode, GraphicsBackend, HandleAllocator, PassDesc, PipelineDesc,
    PipelineId, ProgramId, ResourceCounts, ShaderStage, StageId, TextureDesc, TextureId,
    TextureUsage, UniformLocation, UniformValue,
};
use crate::render::UniformBlock;

/// Format of every depth attachment created by this backend.
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

struct CompiledStage {
    info: reflect::StageInfo,
    module: ShaderModule,
}

/// Program parameter block (`@group(1) @binding(0)`).
struct ParamBlock {
    layout: ParamBlockLayout,
    buffer: Buffer,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
}

struct LinkedProgram {
    vertex: ShaderModule,
    vertex_entry: String,
    fragment: ShaderModule,
    fragment_entry: String,
    counts: ResourceCounts,
    params: Option<ParamBlock>,
}

struct TextureEntry {
    texture: Texture,
    view: TextureView,
    sampler: Option<Sampler>,
    usage: TextureUsage,
}

/// Fixed pipeline state plus one `RenderPipeline` per program drawn with it.
struct PipelineEntry {
    label: String,
    color_format: TextureFormat,
    blend: BlendMode,
    depth_test: bool,
    variants: HashMap<ProgramId, RenderPipeline>,
}

struct PendingDraw {
    program: ProgramId,
    texture: TextureId,
    uniform_offset: u32,
    vertex_count: u32,
}

/// State recorded between `begin_pass` and `end_pass`.
struct OpenPass {
    label: String,
    pipeline: PipelineId,
    depth: TextureId,
    clear_color: Option<[f32; 4]>,
    texture: Option<TextureId>,
    uniform_offset: Option<u32>,
    /// Per-draw uniform blocks, each padded to `uniform_stride`.
    uniforms: Vec<u8>,
    draws: Vec<PendingDraw>,
}

/// [`GraphicsBackend`] on top of `wgpu`. Shader source is WGSL.
///
/// Draws are deferred: `draw` only records, and `end_pass` uploads the pass's
/// uniform blocks in one buffer and encodes a single `wgpu` render pass.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    handles: HandleAllocator,
    stages: HashMap<StageId, CompiledStage>,
    programs: HashMap<ProgramId, LinkedProgram>,
    textures: HashMap<TextureId, TextureEntry>,
    pipelines: HashMap<PipelineId, PipelineEntry>,
    draw_layout: BindGroupLayout,
    uniform_stride: u64,
    current_program: Option<ProgramId>,
    pass: Option<OpenPass>,
    errors_tx: Sender<BackendErrorCode>,
    errors_rx: Receiver<BackendErrorCode>,
}

impl WgpuBackend {
    /// Wrap an existing device. Uncaptured `wgpu` errors are routed to
    /// [`GraphicsBackend::poll_error`] instead of panicking.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let (errors_tx, errors_rx) = crossbeam_channel::unbounded();

        let sender = errors_tx.clone();
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            let code = match &error {
                wgpu::Error::OutOfMemory { .. } => BackendErrorCode::OutOfMemory,
                wgpu::Error::Validation { .. } => BackendErrorCode::InvalidOperation,
                _ => BackendErrorCode::Unknown(0),
            };
            log::error!("wgpu: {error}");
            let _ = sender.send(code);
        }));

        let draw_layout = create_draw_layout(&device);
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment).max(1);
        let block_size = std::mem::size_of::<UniformBlock>() as u64;
        let uniform_stride = block_size.div_ceil(alignment) * alignment;

        Self {
            device,
            queue,
            handles: HandleAllocator::new(),
            stages: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            draw_layout,
            uniform_stride,
            current_program: None,
            pass: None,
            errors_tx,
            errors_rx,
        }
    }

    /// Request an adapter and device without a surface.
    pub fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("ember-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// View of a texture created through this backend.
    pub fn texture_view(&self, texture: TextureId) -> Option<&TextureView> {
        self.textures.get(&texture).map(|entry| &entry.view)
    }

    fn report(&self, code: BackendErrorCode) {
        log::trace!("recording backend error {code}");
        let _ = self.errors_tx.send(code);
    }

    /// Build the `RenderPipeline` for `program` under `pipeline`'s fixed state.
    fn ensure_variant(&mut self, pipeline: PipelineId, program: ProgramId) -> Result<(), String> {
        let Some(linked) = self.programs.get(&program) else {
            return Err(format!("unknown program {}", program.raw()));
        };
        let Some(entry) = self.pipelines.get_mut(&pipeline) else {
            return Err(format!("unknown pipeline {}", pipeline.raw()));
        };
        if entry.variants.contains_key(&program) {
            return Ok(());
        }

        let mut layouts = vec![&self.draw_layout];
        if let Some(params) = &linked.params {
            layouts.push(&params.bind_group_layout);
        }
        let layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(entry.label.as_str()),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let blend = match entry.blend {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Replace => None,
        };
        let depth_compare = if entry.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        };

        let errors_before = self.errors_rx.len();
        let render_pipeline = self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(entry.label.as_str()),
            layout: Some(&layout),
            vertex: VertexState {
                module: &linked.vertex,
                entry_point: Some(linked.vertex_entry.as_str()),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &linked.fragment,
                entry_point: Some(linked.fragment_entry.as_str()),
                targets: &[Some(ColorTargetState {
                    format: entry.color_format,
                    blend,
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // No culling: flipped quads reverse their winding.
            primitive: PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: entry.depth_test,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if self.errors_rx.len() > errors_before {
            return Err(format!(
                "device rejected pipeline '{}' for program {}",
                entry.label,
                program.raw()
            ));
        }

        entry.variants.insert(program, render_pipeline);
        Ok(())
    }

    fn create_param_block(&self, layout: ParamBlockLayout) -> ParamBlock {
        let size = u64::from(layout.size.max(16));
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember-program-params"),
            size,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("ember-program-params-layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size),
                },
                count: None,
            }],
        });

        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("ember-program-params"),
            layout: &bind_group_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        ParamBlock {
            layout,
            buffer,
            bind_group_layout,
            bind_group,
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    type CommandBuffer = CommandEncoder;
    type RenderTarget = TextureView;
    type Format = TextureFormat;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageId, String> {
        let info = reflect::compile(stage, source)?;
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "ember-vertex-stage",
                ShaderStage::Fragment => "ember-fragment-stage",
            }),
            source: ShaderSource::Wgsl(source.into()),
        });

        let id = self.handles.stage()?;
        self.stages.insert(id, CompiledStage { info, module });
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
        let layout = reflect::link(&v.info, &f.info)?;

        // Modules are reference counted; the program keeps its own handles so
        // the stage objects can be destroyed right after linking.
        let program = LinkedProgram {
            vertex: v.module.clone(),
            vertex_entry: v.info.entry_point.clone(),
            fragment: f.module.clone(),
            fragment_entry: f.info.entry_point.clone(),
            counts: layout.counts,
            params: None,
        };
        let params = layout.params.map(|params| self.create_param_block(params));

        let id = self.handles.program()?;
        self.programs.insert(id, LinkedProgram { params, ..program });
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            self.report(BackendErrorCode::InvalidValue);
            return;
        }
        for entry in self.pipelines.values_mut() {
            entry.variants.remove(&program);
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn resource_counts(&self, program: ProgramId) -> ResourceCounts {
        self.programs
            .get(&program)
            .map(|linked| linked.counts)
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let params = self.programs.get(&program)?.params.as_ref()?;
        params
            .layout
            .field_index(name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let Some(params) = self
            .programs
            .get_mut(&program)
            .and_then(|linked| linked.params.as_mut())
        else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let Some(field) = params.layout.fields.get(location.0 as usize) else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let Some(bytes) = reflect::encode_param(field.kind, value) else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };

        self.queue
            .write_buffer(&params.buffer, u64::from(field.offset), &bytes);
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.programs.contains_key(&program) {
            self.current_program = Some(program);
        } else {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc<'_>,
        rgba: Option<&[u8]>,
    ) -> Result<TextureId, String> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 {
            return Err(format!("texture '{}' has zero size", desc.label));
        }
        if desc.width > max || desc.height > max {
            return Err(format!(
                "texture '{}' is {}x{}, device maximum is {max}",
                desc.label, desc.width, desc.height
            ));
        }

        let size = Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let (format, usage) = match desc.usage {
            TextureUsage::Sampled => (
                TextureFormat::Rgba8UnormSrgb,
                TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            ),
            TextureUsage::DepthAttachment => (DEPTH_FORMAT, TextureUsages::RENDER_ATTACHMENT),
        };

        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let sampler = match desc.usage {
            TextureUsage::Sampled => {
                if let Some(data) = rgba {
                    let expected = desc.width as usize * desc.height as usize * 4;
                    if data.len() != expected {
                        return Err(format!(
                            "texture '{}' expects {expected} bytes of RGBA8, got {}",
                            desc.label,
                            data.len()
                        ));
                    }
                    self.queue.write_texture(
                        TexelCopyTextureInfo {
                            texture: &texture,
                            mip_level: 0,
                            origin: Origin3d::ZERO,
                            aspect: TextureAspect::All,
                        },
                        data,
                        TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(4 * desc.width),
                            rows_per_image: Some(desc.height),
                        },
                        size,
                    );
                }
                Some(self.device.create_sampler(&SamplerDescriptor {
                    label: Some("ember-sprite-sampler"),
                    address_mode_u: AddressMode::ClampToEdge,
                    address_mode_v: AddressMode::ClampToEdge,
                    address_mode_w: AddressMode::ClampToEdge,
                    mag_filter: FilterMode::Linear,
                    min_filter: FilterMode::Linear,
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    ..Default::default()
                }))
            }
            TextureUsage::DepthAttachment => None,
        };

        let view = texture.create_view(&TextureViewDescriptor::default());
        let id = self.handles.texture()?;
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                sampler,
                usage: desc.usage,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(entry) => entry.texture.destroy(),
            None => self.report(BackendErrorCode::InvalidValue),
        }
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, TextureFormat>) -> Result<PipelineId, String> {
        let id = self.handles.pipeline()?;
        self.pipelines.insert(
            id,
            PipelineEntry {
                label: desc.label.to_string(),
                color_format: desc.color_format,
                blend: desc.blend,
                depth_test: desc.depth_test,
                variants: HashMap::new(),
            },
        );

        if let Err(log) = self.ensure_variant(id, desc.program) {
            self.pipelines.remove(&id);
            return Err(log);
        }
        Ok(id)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        if self.pipelines.remove(&pipeline).is_none() {
            self.report(BackendErrorCode::InvalidValue);
        }
    }

    fn begin_pass(&mut self, pass: &PassDesc<'_>) {
        if self.pass.is_some() {
            log::warn!("begin_pass '{}' while another pass is open; discarding it", pass.label);
            self.report(BackendErrorCode::InvalidOperation);
        }
        self.pass = Some(OpenPass {
            label: pass.label.to_string(),
            pipeline: pass.pipeline,
            depth: pass.depth,
            clear_color: pass.clear_color,
            texture: None,
            uniform_offset: None,
            uniforms: Vec::new(),
            draws: Vec::new(),
        });
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        let sampled = matches!(
            self.textures.get(&texture),
            Some(TextureEntry {
                usage: TextureUsage::Sampled,
                ..
            })
        );
        match self.pass.as_mut() {
            Some(pass) if slot == 0 && sampled => pass.texture = Some(texture),
            Some(pass) => {
                pass.texture = None;
                self.report(BackendErrorCode::InvalidValue);
            }
            None => self.report(BackendErrorCode::InvalidOperation),
        }
    }

    fn push_uniforms(&mut self, slot: u32, data: &[u8]) {
        let stride = self.uniform_stride as usize;
        match self.pass.as_mut() {
            Some(pass) if slot == 0 && data.len() == std::mem::size_of::<UniformBlock>() => {
                let offset = pass.uniforms.len();
                pass.uniforms.extend_from_slice(data);
                pass.uniforms.resize(offset + stride, 0);
                pass.uniform_offset = Some(offset as u32);
            }
            Some(pass) => {
                pass.uniform_offset = None;
                self.report(BackendErrorCode::InvalidValue);
            }
            None => self.report(BackendErrorCode::InvalidOperation),
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        let Some(program) = self.current_program else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let Some(pass) = self.pass.as_mut() else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        let (Some(texture), Some(uniform_offset)) = (pass.texture, pass.uniform_offset) else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };
        pass.draws.push(PendingDraw {
            program,
            texture,
            uniform_offset,
            vertex_count,
        });
    }

    fn end_pass(&mut self, encoder: &mut CommandEncoder, target: &TextureView) {
        let Some(mut pass) = self.pass.take() else {
            self.report(BackendErrorCode::InvalidOperation);
            return;
        };

        let mut programs: Vec<ProgramId> = pass.draws.iter().map(|draw| draw.program).collect();
        programs.sort();
        programs.dedup();
        for program in programs {
            if let Err(log) = self.ensure_variant(pass.pipeline, program) {
                log::error!("pass '{}': {log}", pass.label);
                self.report(BackendErrorCode::InvalidOperation);
                pass.draws.retain(|draw| draw.program != program);
            }
        }

        let (Some(pipeline), Some(depth)) = (
            self.pipelines.get(&pass.pipeline),
            self.textures.get(&pass.depth),
        ) else {
            self.report(BackendErrorCode::InvalidFramebufferOperation);
            return;
        };

        let uniform_buffer = (!pass.uniforms.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("ember-draw-uniforms"),
                contents: &pass.uniforms,
                usage: BufferUsages::UNIFORM,
            })
        });

        let block_size = NonZeroU64::new(std::mem::size_of::<UniformBlock>() as u64);
        let mut bind_groups: HashMap<TextureId, BindGroup> = HashMap::new();
        if let Some(buffer) = &uniform_buffer {
            for draw in &pass.draws {
                if bind_groups.contains_key(&draw.texture) {
                    continue;
                }
                let Some(texture) = self.textures.get(&draw.texture) else {
                    continue;
                };
                let Some(sampler) = &texture.sampler else {
                    continue;
                };
                let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
                    label: Some("ember-draw-bind-group"),
                    layout: &self.draw_layout,
                    entries: &[
                        BindGroupEntry {
                            binding: 0,
                            resource: BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: 0,
                                size: block_size,
                            }),
                        },
                        BindGroupEntry {
                            binding: 1,
                            resource: BindingResource::TextureView(&texture.view),
                        },
                        BindGroupEntry {
                            binding: 2,
                            resource: BindingResource::Sampler(sampler),
                        },
                    ],
                });
                bind_groups.insert(draw.texture, bind_group);
            }
        }

        let load = match pass.clear_color {
            Some([r, g, b, a]) => LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(pass.label.as_str()),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            multiview_mask: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for draw in &pass.draws {
            let (Some(variant), Some(bind_group)) = (
                pipeline.variants.get(&draw.program),
                bind_groups.get(&draw.texture),
            ) else {
                continue;
            };
            rpass.set_pipeline(variant);
            rpass.set_bind_group(DRAW_GROUP, bind_group, &[draw.uniform_offset]);
            if let Some(params) = self
                .programs
                .get(&draw.program)
                .and_then(|linked| linked.params.as_ref())
            {
                rpass.set_bind_group(PARAMS_GROUP, &params.bind_group, &[]);
            }
            rpass.draw(0..draw.vertex_count, 0..1);
        }
    }

    fn poll_error(&mut self) -> Option<BackendErrorCode> {
        self.errors_rx.try_recv().ok()
    }
}

fn create_draw_layout(device: &wgpu::Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("ember-draw-bind-group-layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<UniformBlock>() as u64),
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}
