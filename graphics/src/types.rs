//! Resource descriptor types shared by all backends.

bitflags::bitflags! {
    /// How a buffer will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex attribute data.
        const VERTEX = 1 << 0;
        /// Index data.
        const INDEX = 1 << 1;
        /// Uniform data.
        const UNIFORM = 1 << 2;
        /// Destination of CPU writes.
        const COPY_DST = 1 << 3;
    }
}

/// Describes a GPU buffer to create.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            label: None,
        }
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Texture pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized (the decoded-bitmap format).
    #[default]
    Rgba8Unorm,
}

impl TextureFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Rgba8Unorm => 4,
        }
    }
}

/// Describes a 2D GPU texture to create.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            label: None,
        }
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Expected byte length of one full upload.
    pub fn data_len(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_descriptor_builder() {
        let desc = BufferDescriptor::new(256, BufferUsage::UNIFORM | BufferUsage::COPY_DST)
            .with_label("uniforms");
        assert_eq!(desc.size, 256);
        assert!(desc.usage.contains(BufferUsage::UNIFORM));
        assert_eq!(desc.label.as_deref(), Some("uniforms"));
    }

    #[test]
    fn texture_data_len() {
        let desc = TextureDescriptor::new_2d(4, 2, TextureFormat::Rgba8Unorm);
        assert_eq!(desc.data_len(), 32);
    }
}
