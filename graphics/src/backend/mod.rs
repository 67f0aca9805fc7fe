//! GPU backend abstraction.
//!
//! Backends implement [`GpuBackend`] and hand out handle enums. The dummy
//! backend keeps everything in host memory and is the test target; the wgpu
//! backend (feature `wgpu-backend`) drives a headless device.

#[cfg(feature = "dummy")]
pub mod dummy;
#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

#[cfg(feature = "dummy")]
use std::sync::{Arc, Mutex};

use larkspur_core::mesh::PrimitiveTopology;

use crate::error::RenderError;
use crate::shader::{ShaderDialect, ShaderProgram};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// Opaque handle to a GPU buffer.
#[derive(Debug, Clone)]
pub enum GpuBuffer {
    #[cfg(feature = "dummy")]
    Dummy {
        id: u64,
        /// Host-side contents, readable back in tests.
        data: Arc<Mutex<Vec<u8>>>,
    },
    #[cfg(feature = "wgpu-backend")]
    Wgpu(std::sync::Arc<wgpu::Buffer>),
}

/// Opaque handle to a GPU texture (with its view and sampler).
#[derive(Debug, Clone)]
pub enum GpuTexture {
    #[cfg(feature = "dummy")]
    Dummy { id: u64, descriptor: TextureDescriptor },
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        view: std::sync::Arc<wgpu::TextureView>,
        sampler: std::sync::Arc<wgpu::Sampler>,
    },
}

/// Opaque handle to a compiled render pipeline.
#[derive(Debug, Clone)]
pub enum GpuPipeline {
    #[cfg(feature = "dummy")]
    Dummy { id: u64 },
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        pipeline: std::sync::Arc<wgpu::RenderPipeline>,
        bind_group_layout: std::sync::Arc<wgpu::BindGroupLayout>,
    },
}

/// Opaque handle to a bind group.
#[derive(Debug, Clone)]
pub enum GpuBindGroup {
    #[cfg(feature = "dummy")]
    Dummy { id: u64 },
    #[cfg(feature = "wgpu-backend")]
    Wgpu(std::sync::Arc<wgpu::BindGroup>),
}

/// What a pipeline is compiled from.
#[derive(Debug)]
pub struct PipelineDescriptor<'a> {
    pub program: &'a ShaderProgram,
    pub topology: PrimitiveTopology,
    /// Enable alpha blending.
    pub transparent: bool,
    pub label: Option<&'a str>,
}

/// One resource bound into a bind group, in binding-slot order.
#[derive(Debug)]
pub enum BindingResource<'a> {
    Buffer(&'a GpuBuffer),
    Texture(&'a GpuTexture),
    Sampler(&'a GpuTexture),
}

/// One indexed draw.
#[derive(Debug)]
pub struct DrawCall<'a> {
    pub pipeline: &'a GpuPipeline,
    pub bind_group: Option<&'a GpuBindGroup>,
    pub vertex_buffer: &'a GpuBuffer,
    pub index_buffer: &'a GpuBuffer,
    pub index_count: u32,
}

/// The backend contract. All methods are synchronous; device acquisition is
/// the only asynchronous boundary and happens before a backend exists.
pub trait GpuBackend: Send + Sync {
    /// Shader dialect this backend consumes.
    fn dialect(&self) -> ShaderDialect;

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, RenderError>;

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError>;

    /// Create a texture and upload its full contents once.
    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> Result<GpuTexture, RenderError>;

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<GpuPipeline, RenderError>;

    /// Build a bind group from resources listed in binding-slot order.
    fn create_bind_group(
        &self,
        pipeline: &GpuPipeline,
        resources: &[BindingResource<'_>],
    ) -> Result<GpuBindGroup, RenderError>;

    fn draw(&self, call: &DrawCall<'_>) -> Result<(), RenderError>;
}
