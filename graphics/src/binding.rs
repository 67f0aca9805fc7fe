//! Attribute packing and uniform encoding.
//!
//! The packed vertex buffer interleaves per-vertex streams in exact layout
//! order, attribute-major within each vertex. Everything here works purely
//! from the `ProgramLayout` the builder emitted.

use larkspur_core::math::Mat4;
use larkspur_core::mesh::PrimitiveTopology;

use crate::attributes::{DrawableElementAttributes, INFLUENCES_PER_VERTEX};
use crate::error::RenderError;
use crate::shader::layout::align_to;
use crate::shader::ProgramLayout;

/// Uniform block buffers are padded to this boundary at allocation.
pub(crate) const UNIFORM_BLOCK_ALIGN: u32 = 16;

/// Interleave the descriptor's streams into one packed buffer of
/// `vertex_count * attribute_stride` bytes.
pub(crate) fn pack_vertices(
    attrs: &DrawableElementAttributes,
    layout: &ProgramLayout,
) -> Result<Vec<u8>, RenderError> {
    let vertex_count = attrs.vertices.len();
    let floats_per_vertex = (layout.attribute_stride / 4) as usize;
    let mut packed = Vec::with_capacity(vertex_count * floats_per_vertex);

    for i in 0..vertex_count {
        for attr in &layout.attributes {
            match attr.name {
                "vertex_position" => {
                    let v = attrs.vertices[i];
                    packed.extend_from_slice(&[v.x, v.y, v.z]);
                }
                "texture_coords" => {
                    let image = attrs.image.as_ref().ok_or_else(|| {
                        RenderError::DataShape(
                            "program expects texture coordinates but none were given"
                                .to_string(),
                        )
                    })?;
                    let uv = image.texture_coords[i];
                    packed.extend_from_slice(&[uv.x, uv.y]);
                }
                "color" => {
                    let colors = attrs.colors.as_ref().ok_or_else(|| {
                        RenderError::DataShape(
                            "program expects per-vertex colors but none were given".to_string(),
                        )
                    })?;
                    let c = colors[i];
                    packed.extend_from_slice(&[c.x, c.y, c.z, c.w]);
                }
                "bone_indices" | "bone_weights" => {
                    let bones = attrs.bones.as_ref().ok_or_else(|| {
                        RenderError::DataShape(
                            "program expects skinning data but none was given".to_string(),
                        )
                    })?;
                    let stream = if attr.name == "bone_indices" {
                        &bones.indices
                    } else {
                        &bones.weights
                    };
                    let base = i * INFLUENCES_PER_VERTEX;
                    packed.extend_from_slice(&stream[base..base + INFLUENCES_PER_VERTEX]);
                }
                other => {
                    return Err(RenderError::Configuration(format!(
                        "unknown attribute stream {other}"
                    )));
                }
            }
        }
    }

    Ok(bytemuck::cast_slice(&packed).to_vec())
}

/// Explicit indices, or a sequential run over the full vertex list rounded
/// down to whole primitives.
pub(crate) fn index_data(attrs: &DrawableElementAttributes) -> Vec<u32> {
    if let Some(indices) = &attrs.indices {
        return indices.clone();
    }
    let per_primitive = match attrs.topology {
        PrimitiveTopology::TriangleStrip => 1,
        other => other.vertices_per_primitive() as usize,
    };
    let whole = (attrs.vertices.len() / per_primitive) * per_primitive;
    (0..whole as u32).collect()
}

/// Allocation size for the packed uniform block.
pub(crate) fn padded_block_size(uniform_stride: u32) -> u64 {
    align_to(uniform_stride, UNIFORM_BLOCK_ALIGN) as u64
}

/// A matrix encoded column-major for upload.
pub(crate) fn encode_mat4(m: &Mat4) -> [u8; 64] {
    let cols = m.to_cols_array();
    let mut out = [0u8; 64];
    out.copy_from_slice(bytemuck::cast_slice(&cols));
    out
}
