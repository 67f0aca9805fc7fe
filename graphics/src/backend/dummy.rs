//! Host-memory backend for tests and headless runs.
//!
//! Buffers live in the handles themselves, so a test can hold onto a
//! handle, drive the renderable, and read the bytes back. Draw calls and
//! buffer writes are counted.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{
    BindingResource, DrawCall, GpuBackend, GpuBindGroup, GpuBuffer, GpuPipeline, GpuTexture,
    PipelineDescriptor,
};
use crate::error::RenderError;
use crate::shader::ShaderDialect;
use crate::types::{BufferDescriptor, TextureDescriptor};

/// In-memory [`GpuBackend`] implementation.
#[derive(Debug)]
pub struct DummyBackend {
    dialect: ShaderDialect,
    next_id: AtomicU64,
    buffer_writes: AtomicUsize,
    draw_calls: AtomicUsize,
}

impl DummyBackend {
    /// The dialect is configurable so both emitters can be exercised
    /// without a device.
    pub fn new(dialect: ShaderDialect) -> Self {
        Self {
            dialect,
            next_id: AtomicU64::new(1),
            buffer_writes: AtomicUsize::new(0),
            draw_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `write_buffer` calls so far.
    pub fn buffer_write_count(&self) -> usize {
        self.buffer_writes.load(Ordering::SeqCst)
    }

    /// Number of draws submitted so far.
    pub fn draw_call_count(&self) -> usize {
        self.draw_calls.load(Ordering::SeqCst)
    }

    /// Read a dummy buffer's current contents.
    pub fn read_buffer(&self, buffer: &GpuBuffer) -> Vec<u8> {
        match buffer {
            GpuBuffer::Dummy { data, .. } => lock(data).clone(),
            #[cfg(feature = "wgpu-backend")]
            GpuBuffer::Wgpu(_) => Vec::new(),
        }
    }

    fn take_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn lock(data: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GpuBackend for DummyBackend {
    fn dialect(&self) -> ShaderDialect {
        self.dialect
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, RenderError> {
        let id = self.take_id();
        log::trace!(
            "dummy: buffer {id} ({} bytes, {:?}, {:?})",
            desc.size,
            desc.usage,
            desc.label
        );
        Ok(GpuBuffer::Dummy {
            id,
            data: Arc::new(Mutex::new(vec![0; desc.size as usize])),
        })
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        match buffer {
            GpuBuffer::Dummy { id, data: store } => {
                let mut store = lock(store);
                let start = offset as usize;
                let end = start + data.len();
                if end > store.len() {
                    return Err(RenderError::DataShape(format!(
                        "write of {} bytes at offset {offset} overruns buffer {id} \
                         ({} bytes)",
                        data.len(),
                        store.len()
                    )));
                }
                store[start..end].copy_from_slice(data);
                self.buffer_writes.fetch_add(1, Ordering::SeqCst);
                log::trace!("dummy: wrote {} bytes at {offset} into buffer {id}", data.len());
                Ok(())
            }
            #[cfg(feature = "wgpu-backend")]
            GpuBuffer::Wgpu(_) => Err(RenderError::ResourceAcquisition(
                "foreign buffer handle passed to the dummy backend".to_string(),
            )),
        }
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
        let id = self.take_id();
        log::trace!("dummy: texture {id} ({}x{})", desc.width, desc.height);
        Ok(GpuTexture::Dummy {
            id,
            descriptor: desc.clone(),
        })
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<GpuPipeline, RenderError> {
        if desc.program.dialect != self.dialect {
            return Err(RenderError::Configuration(format!(
                "{:?} program handed to a {:?} dummy backend",
                desc.program.dialect, self.dialect
            )));
        }
        let id = self.take_id();
        log::trace!("dummy: pipeline {id} ({:?})", desc.label);
        Ok(GpuPipeline::Dummy { id })
    }

    fn create_bind_group(
        &self,
        _pipeline: &GpuPipeline,
        resources: &[BindingResource<'_>],
    ) -> Result<GpuBindGroup, RenderError> {
        let id = self.take_id();
        log::trace!("dummy: bind group {id} ({} resources)", resources.len());
        Ok(GpuBindGroup::Dummy { id })
    }

    fn draw(&self, call: &DrawCall<'_>) -> Result<(), RenderError> {
        self.draw_calls.fetch_add(1, Ordering::SeqCst);
        log::trace!("dummy: draw ({} indices)", call.index_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, TextureFormat};

    #[test]
    fn buffer_contents_read_back() {
        let backend = DummyBackend::new(ShaderDialect::Wgsl);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::UNIFORM))
            .unwrap();
        backend.write_buffer(&buffer, 2, &[1, 2, 3]).unwrap();
        assert_eq!(backend.read_buffer(&buffer), vec![0, 0, 1, 2, 3, 0, 0, 0]);
        assert_eq!(backend.buffer_write_count(), 1);
    }

    #[test]
    fn overrunning_write_rejected() {
        let backend = DummyBackend::new(ShaderDialect::Wgsl);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(4, BufferUsage::VERTEX))
            .unwrap();
        let err = backend.write_buffer(&buffer, 2, &[0; 4]).unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
        assert_eq!(backend.buffer_write_count(), 0);
    }

    #[test]
    fn texture_upload_size_checked() {
        let backend = DummyBackend::new(ShaderDialect::Glsl);
        let desc = TextureDescriptor::new_2d(2, 2, TextureFormat::Rgba8Unorm);
        assert!(backend.create_texture(&desc, &[0; 16]).is_ok());
        assert!(matches!(
            backend.create_texture(&desc, &[0; 12]),
            Err(RenderError::DataShape(_))
        ));
    }

    #[test]
    fn dialect_mismatch_rejected() {
        use crate::shader::ProgramBuilder;
        use larkspur_core::mesh::PrimitiveTopology;

        let backend = DummyBackend::new(ShaderDialect::Glsl);
        let program = ProgramBuilder::new()
            .with_static_color([1.0; 4])
            .build(ShaderDialect::Wgsl)
            .unwrap();
        let err = backend
            .create_pipeline(&PipelineDescriptor {
                program: &program,
                topology: PrimitiveTopology::TriangleList,
                transparent: false,
                label: None,
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }
}
