//! Drawable element descriptors.
//!
//! A `DrawableElementAttributes` fully describes a renderable to create:
//! geometry, optional image and bone data, and the flags that select the
//! generated shader program. All shape checks happen in `validate`, before
//! any GPU resource is touched.

use larkspur_core::math::{Vec2, Vec3, Vec4};
use larkspur_core::mesh::PrimitiveTopology;

use crate::error::RenderError;
use crate::types::{TextureDescriptor, TextureFormat};

/// Influences per skinned vertex. Fixed by the generated shader, which
/// blends exactly four bone matrices.
pub const INFLUENCES_PER_VERTEX: usize = 4;

/// A decoded RGBA8 bitmap ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Descriptor for allocating the matching GPU texture.
    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor::new_2d(self.width, self.height, TextureFormat::Rgba8Unorm)
    }

    fn validate(&self, what: &str) -> Result<(), RenderError> {
        let expected = self.descriptor().data_len();
        if self.pixels.len() != expected {
            return Err(RenderError::DataShape(format!(
                "{what} bitmap is {}x{} but holds {} bytes (expected {expected})",
                self.width,
                self.height,
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

/// Image capability: a diffuse bitmap with per-vertex texture coordinates,
/// optionally a displacement map and sprite-sheet animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttributes {
    pub bitmap: TextureData,
    pub texture_coords: Vec<Vec2>,
    pub displacement_map: Option<TextureData>,
    /// Declare the `animation_offset` uniform for sprite-sheet animation.
    pub animate: bool,
}

impl ImageAttributes {
    pub fn new(bitmap: TextureData, texture_coords: Vec<Vec2>) -> Self {
        Self {
            bitmap,
            texture_coords,
            displacement_map: None,
            animate: false,
        }
    }

    pub fn with_displacement_map(mut self, map: TextureData) -> Self {
        self.displacement_map = Some(map);
        self
    }

    pub fn with_animation(mut self) -> Self {
        self.animate = true;
        self
    }
}

/// Skeletal capability: the skeleton shape plus per-vertex skinning data.
///
/// `indices` are stored as `f32` because they travel in a vertex attribute;
/// the shader truncates them back to array indices.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneAttributes {
    /// Number of bones in the skeleton.
    pub count: u32,
    /// Bone indices, `vertex_count * 4` entries.
    pub indices: Vec<f32>,
    /// Blend weights, `vertex_count * 4` entries.
    pub weights: Vec<f32>,
    /// Index of the root bone.
    pub root: usize,
    /// Parent of each bone; the root's entry is never read.
    pub parent_index: Vec<usize>,
}

/// Everything needed to create a renderable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawableElementAttributes {
    pub vertices: Vec<Vec3>,
    /// Explicit index list; a sequential run is derived when absent.
    pub indices: Option<Vec<u32>>,
    /// Per-vertex colors (interpolated-color base mode).
    pub colors: Option<Vec<Vec4>>,
    /// A single flat color baked into the fragment shader.
    pub static_color: Option<[f32; 4]>,
    /// Texture base mode. Takes precedence over colors and static color.
    pub image: Option<ImageAttributes>,
    pub bones: Option<BoneAttributes>,
    /// Static elements skip the per-instance transformation uniform.
    pub is_static: bool,
    /// Declare the perspective projection uniform.
    pub perspective: bool,
    /// Participate in back-to-front transparency ordering.
    pub transparent: bool,
    pub topology: PrimitiveTopology,
}

impl DrawableElementAttributes {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self {
            vertices,
            ..Self::default()
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_static_color(mut self, rgba: [f32; 4]) -> Self {
        self.static_color = Some(rgba);
        self
    }

    pub fn with_image(mut self, image: ImageAttributes) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_bones(mut self, bones: BoneAttributes) -> Self {
        self.bones = Some(bones);
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_perspective(mut self) -> Self {
        self.perspective = true;
        self
    }

    pub fn with_transparency(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Check every shape constraint. Runs once at create time; a failure
    /// aborts creation before any backend resource is allocated.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.vertices.is_empty() {
            return Err(RenderError::DataShape(
                "a drawable element needs at least one vertex".to_string(),
            ));
        }
        let vertex_count = self.vertices.len();

        if let Some(colors) = &self.colors {
            if colors.len() != vertex_count {
                return Err(RenderError::DataShape(format!(
                    "{} colors for {vertex_count} vertices",
                    colors.len()
                )));
            }
        }

        if let Some(image) = &self.image {
            if image.texture_coords.len() != vertex_count {
                return Err(RenderError::DataShape(format!(
                    "{} texture coordinates for {vertex_count} vertices",
                    image.texture_coords.len()
                )));
            }
            image.bitmap.validate("diffuse")?;
            if let Some(map) = &image.displacement_map {
                map.validate("displacement")?;
            }
        }

        if let Some(bones) = &self.bones {
            let expected = vertex_count * INFLUENCES_PER_VERTEX;
            if bones.indices.len() != expected || bones.weights.len() != expected {
                return Err(RenderError::DataShape(format!(
                    "bone indices/weights must both hold {expected} entries \
                     (4 per vertex), got {} and {}",
                    bones.indices.len(),
                    bones.weights.len()
                )));
            }
            if bones.parent_index.len() != bones.count as usize {
                return Err(RenderError::DataShape(format!(
                    "{} parent entries for {} bones",
                    bones.parent_index.len(),
                    bones.count
                )));
            }
            if bones.root >= bones.count as usize {
                return Err(RenderError::DataShape(format!(
                    "root bone {} out of range for {} bones",
                    bones.root, bones.count
                )));
            }
        }

        if let Some(indices) = &self.indices {
            if let Some(&max) = indices.iter().max() {
                if max as usize >= vertex_count {
                    return Err(RenderError::DataShape(format!(
                        "index {max} out of range for {vertex_count} vertices"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larkspur_core::math::Vec3;

    fn triangle() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn empty_vertices_rejected() {
        let err = DrawableElementAttributes::new(Vec::new())
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
    }

    #[test]
    fn bone_shape_must_be_four_per_vertex() {
        let bones = BoneAttributes {
            count: 2,
            indices: vec![0.0; 12],
            weights: vec![0.25; 8], // one vertex short
            root: 0,
            parent_index: vec![0, 0],
        };
        let err = DrawableElementAttributes::new(triangle())
            .with_bones(bones)
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
    }

    #[test]
    fn valid_bone_shape_passes() {
        let bones = BoneAttributes {
            count: 2,
            indices: vec![0.0; 12],
            weights: vec![0.25; 12],
            root: 0,
            parent_index: vec![0, 0],
        };
        DrawableElementAttributes::new(triangle())
            .with_bones(bones)
            .validate()
            .unwrap();
    }

    #[test]
    fn texture_coord_count_must_match() {
        let image = ImageAttributes::new(
            TextureData::new(1, 1, vec![255, 0, 0, 255]),
            vec![Vec2::new(0.0, 0.0); 2],
        );
        let err = DrawableElementAttributes::new(triangle())
            .with_image(image)
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
    }

    #[test]
    fn bitmap_byte_length_checked() {
        let image = ImageAttributes::new(
            TextureData::new(2, 2, vec![0; 15]),
            vec![Vec2::new(0.0, 0.0); 3],
        );
        let err = DrawableElementAttributes::new(triangle())
            .with_image(image)
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let err = DrawableElementAttributes::new(triangle())
            .with_indices(vec![0, 1, 3])
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
    }
}
