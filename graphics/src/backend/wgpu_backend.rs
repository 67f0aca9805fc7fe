//! Headless wgpu backend.
//!
//! Consumes the WGSL dialect. Device acquisition is the only asynchronous
//! boundary and is blocked on once at startup; everything after that is
//! synchronous queue traffic. Draws land in an offscreen color target.

use std::borrow::Cow;
use std::sync::Arc;

use larkspur_core::mesh::PrimitiveTopology;

use crate::backend::{
    BindingResource, DrawCall, GpuBackend, GpuBindGroup, GpuBuffer, GpuPipeline, GpuTexture,
    PipelineDescriptor,
};
use crate::error::RenderError;
use crate::shader::{ShaderDialect, ShaderStageFlags, UNIFORM_BLOCK_BINDING};
use crate::types::{BufferDescriptor, BufferUsage, TextureDescriptor, TextureFormat};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const TARGET_SIZE: u32 = 512;

/// [`GpuBackend`] over a headless wgpu device.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_view: wgpu::TextureView,
}

impl WgpuBackend {
    /// Acquire an adapter and device, blocking on the async request.
    pub fn new_headless() -> Result<Self, RenderError> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                RenderError::ResourceAcquisition("no compatible adapter found".to_string())
            })?;
        log::trace!("wgpu: adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("larkspur device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|err| RenderError::ResourceAcquisition(err.to_string()))?;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("larkspur offscreen target"),
            size: wgpu::Extent3d {
                width: TARGET_SIZE,
                height: TARGET_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            device,
            queue,
            target_view,
        })
    }

    fn expect_buffer<'a>(buffer: &'a GpuBuffer) -> Result<&'a wgpu::Buffer, RenderError> {
        match buffer {
            GpuBuffer::Wgpu(buffer) => Ok(buffer),
            #[cfg(feature = "dummy")]
            GpuBuffer::Dummy { .. } => Err(RenderError::ResourceAcquisition(
                "dummy buffer handle passed to the wgpu backend".to_string(),
            )),
        }
    }
}

fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsage::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    out
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn stage_visibility(stages: ShaderStageFlags) -> wgpu::ShaderStages {
    let mut out = wgpu::ShaderStages::NONE;
    if stages.contains(ShaderStageFlags::VERTEX) {
        out |= wgpu::ShaderStages::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        out |= wgpu::ShaderStages::FRAGMENT;
    }
    out
}

impl GpuBackend for WgpuBackend {
    fn dialect(&self) -> ShaderDialect {
        ShaderDialect::Wgsl
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, RenderError> {
        log::trace!("wgpu: buffer ({} bytes, {:?})", desc.size, desc.label);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label.as_deref(),
            size: desc.size,
            usage: buffer_usages(desc.usage),
            mapped_at_creation: false,
        });
        Ok(GpuBuffer::Wgpu(Arc::new(buffer)))
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.queue
            .write_buffer(Self::expect_buffer(buffer)?, offset, data);
        Ok(())
    }

    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> Result<GpuTexture, RenderError> {
        if data.len() != desc.data_len() {
            return Err(RenderError::DataShape(format!(
                "texture upload of {} bytes for a {}x{} texture (expected {})",
                data.len(),
                desc.width,
                desc.height,
                desc.data_len()
            )));
        }
        let format = match desc.format {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        };
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel()),
                rows_per_image: Some(desc.height),
            },
            size,
        );
        log::trace!("wgpu: texture ({}x{})", desc.width, desc.height);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: desc.label.as_deref(),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..wgpu::SamplerDescriptor::default()
        });
        Ok(GpuTexture::Wgpu {
            view: Arc::new(view),
            sampler: Arc::new(sampler),
        })
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<GpuPipeline, RenderError> {
        let program = desc.program;
        if program.dialect != ShaderDialect::Wgsl {
            return Err(RenderError::Configuration(
                "the wgpu backend consumes WGSL programs only".to_string(),
            ));
        }

        // One layout entry per binding slot; the shared block's visibility
        // is the union of its members'.
        let mut entries = Vec::with_capacity(program.layout.binding_order.len());
        for (slot, name) in program.layout.binding_order.iter().enumerate() {
            let slots = program
                .layout
                .uniforms
                .iter()
                .filter(|u| u.binding == slot as u32);
            let mut visibility = ShaderStageFlags::empty();
            let mut ty = wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            };
            for uniform in slots {
                visibility |= uniform.visibility;
                if *name != UNIFORM_BLOCK_BINDING {
                    ty = match uniform.ty {
                        crate::shader::ShaderType::Texture2d => wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        crate::shader::ShaderType::Sampler => {
                            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                        }
                        _ => ty,
                    };
                }
            }
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot as u32,
                visibility: stage_visibility(visibility),
                ty,
                count: None,
            });
        }
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: desc.label,
                    entries: &entries,
                });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: desc.label,
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let vertex_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label,
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&program.vertex_source)),
            });
        let fragment_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label,
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&program.fragment_source)),
            });

        let attributes: Vec<wgpu::VertexAttribute> = program
            .layout
            .attributes
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                format: vertex_format(attr.components),
                offset: attr.offset as u64,
                shader_location: attr.location,
            })
            .collect();
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: program.layout.attribute_stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };

        let blend = if desc.transparent {
            Some(wgpu::BlendState::ALPHA_BLENDING)
        } else {
            Some(wgpu::BlendState::REPLACE)
        };
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label,
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[vertex_layout],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(desc.topology),
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        log::trace!("wgpu: pipeline ({:?})", desc.label);
        Ok(GpuPipeline::Wgpu {
            pipeline: Arc::new(pipeline),
            bind_group_layout: Arc::new(bind_group_layout),
        })
    }

    fn create_bind_group(
        &self,
        pipeline: &GpuPipeline,
        resources: &[BindingResource<'_>],
    ) -> Result<GpuBindGroup, RenderError> {
        let layout = match pipeline {
            GpuPipeline::Wgpu {
                bind_group_layout, ..
            } => bind_group_layout,
            #[cfg(feature = "dummy")]
            GpuPipeline::Dummy { .. } => {
                return Err(RenderError::ResourceAcquisition(
                    "dummy pipeline handle passed to the wgpu backend".to_string(),
                ))
            }
        };
        let mut entries = Vec::with_capacity(resources.len());
        for (slot, resource) in resources.iter().enumerate() {
            let resource = match resource {
                BindingResource::Buffer(buffer) => {
                    Self::expect_buffer(buffer)?.as_entire_binding()
                }
                BindingResource::Texture(texture) => match texture {
                    GpuTexture::Wgpu { view, .. } => {
                        wgpu::BindingResource::TextureView(view)
                    }
                    #[cfg(feature = "dummy")]
                    GpuTexture::Dummy { .. } => {
                        return Err(RenderError::ResourceAcquisition(
                            "dummy texture handle passed to the wgpu backend".to_string(),
                        ))
                    }
                },
                BindingResource::Sampler(texture) => match texture {
                    GpuTexture::Wgpu { sampler, .. } => {
                        wgpu::BindingResource::Sampler(sampler)
                    }
                    #[cfg(feature = "dummy")]
                    GpuTexture::Dummy { .. } => {
                        return Err(RenderError::ResourceAcquisition(
                            "dummy texture handle passed to the wgpu backend".to_string(),
                        ))
                    }
                },
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32,
                resource,
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        });
        Ok(GpuBindGroup::Wgpu(Arc::new(bind_group)))
    }

    fn draw(&self, call: &DrawCall<'_>) -> Result<(), RenderError> {
        let pipeline = match call.pipeline {
            GpuPipeline::Wgpu { pipeline, .. } => pipeline,
            #[cfg(feature = "dummy")]
            GpuPipeline::Dummy { .. } => {
                return Err(RenderError::ResourceAcquisition(
                    "dummy pipeline handle passed to the wgpu backend".to_string(),
                ))
            }
        };
        let vertex_buffer = Self::expect_buffer(call.vertex_buffer)?;
        let index_buffer = Self::expect_buffer(call.index_buffer)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("larkspur draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("larkspur pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            if let Some(GpuBindGroup::Wgpu(bind_group)) = call.bind_group {
                pass.set_bind_group(0, bind_group.as_ref(), &[]);
            }
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..call.index_count, 0, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        log::trace!("wgpu: draw ({} indices)", call.index_count);
        Ok(())
    }
}
