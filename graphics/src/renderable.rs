//! A created renderable instance.
//!
//! Holds the compiled program, its GPU handles, and the instance's current
//! draw options. Uniform updates go through an exhaustive `UniformKind`
//! match and land at the offsets the layout pre-computed.

use std::sync::Arc;

use larkspur_core::math::Vec3;

use crate::backend::{DrawCall, GpuBackend, GpuBindGroup, GpuBuffer, GpuPipeline, GpuTexture};
use crate::binding::encode_mat4;
use crate::error::RenderError;
use crate::shader::{ShaderDialect, ShaderProgram, UniformKind};
use crate::skeleton::{BonePose, Skeleton};
use crate::transform::{resolve_transform, DrawOpt, Projection};

/// A drawable element with its GPU resources and current options.
pub struct Renderable {
    pub(crate) backend: Arc<dyn GpuBackend>,
    pub(crate) program: ShaderProgram,
    pub(crate) pipeline: GpuPipeline,
    pub(crate) bind_group: Option<GpuBindGroup>,
    pub(crate) vertex_buffer: GpuBuffer,
    pub(crate) index_buffer: GpuBuffer,
    pub(crate) index_count: u32,
    pub(crate) uniform_buffer: Option<GpuBuffer>,
    pub(crate) bone_buffer: Option<GpuBuffer>,
    /// Keeps texture handles alive for the lifetime of the bind group.
    pub(crate) textures: Vec<GpuTexture>,
    pub(crate) skeleton: Option<Skeleton>,
    pub(crate) options: DrawOpt,
    pub(crate) transparent: bool,
    pub(crate) bounds_min: Vec3,
    pub(crate) bounds_max: Vec3,
}

impl std::fmt::Debug for Renderable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderable")
            .field("program", &self.program)
            .field("pipeline", &self.pipeline)
            .field("bind_group", &self.bind_group)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("index_count", &self.index_count)
            .field("uniform_buffer", &self.uniform_buffer)
            .field("bone_buffer", &self.bone_buffer)
            .field("textures", &self.textures)
            .field("skeleton", &self.skeleton)
            .field("options", &self.options)
            .field("transparent", &self.transparent)
            .field("bounds_min", &self.bounds_min)
            .field("bounds_max", &self.bounds_max)
            .finish_non_exhaustive()
    }
}

impl Renderable {
    /// The generated program this instance was built against.
    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Current merged draw options.
    pub fn options(&self) -> &DrawOpt {
        &self.options
    }

    pub fn transparent(&self) -> bool {
        self.transparent
    }

    /// The packed vertex buffer handle.
    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    /// The packed uniform block buffer, when any packed uniform exists.
    pub fn uniform_buffer(&self) -> Option<&GpuBuffer> {
        self.uniform_buffer.as_ref()
    }

    /// The bone-matrix buffer, when the program is skeletal.
    pub fn bone_buffer(&self) -> Option<&GpuBuffer> {
        self.bone_buffer.as_ref()
    }

    /// Merge a partial option bag and rewrite the uniforms it touches.
    ///
    /// Only uniforms both touched by the partial and declared by this
    /// instance's program are written; an empty partial issues zero buffer
    /// writes.
    pub fn set_attributes(&mut self, partial: &DrawOpt) -> Result<(), RenderError> {
        let transform_touched = partial.transformation_matrix.is_some()
            || partial.rotation_matrix.is_some()
            || partial.angle.is_some()
            || partial.axis.is_some()
            || partial.translation_matrix.is_some()
            || partial.translation.is_some()
            || partial.scale_matrix.is_some()
            || partial.scale.is_some()
            || partial.camera.is_some();
        let perspective_touched = partial.projection.is_some();
        let animation_touched = partial.animation_vector.is_some();
        let bump_touched = partial.bump_scale.is_some();
        let bones_touched = partial.bones.is_some();

        self.options.merge(partial);

        if transform_touched {
            self.write_uniform(UniformKind::Transformation)?;
        }
        if perspective_touched {
            self.write_uniform(UniformKind::Perspective)?;
        }
        if animation_touched {
            self.write_uniform(UniformKind::AnimationOffset)?;
        }
        if bump_touched {
            self.write_uniform(UniformKind::BumpScale)?;
        }
        if bones_touched {
            self.write_uniform(UniformKind::BoneMatrices)?;
        }
        Ok(())
    }

    /// Submit one indexed draw.
    pub fn draw(&self) -> Result<(), RenderError> {
        self.backend.draw(&DrawCall {
            pipeline: &self.pipeline,
            bind_group: self.bind_group.as_ref(),
            vertex_buffer: &self.vertex_buffer,
            index_buffer: &self.index_buffer,
            index_count: self.index_count,
        })
    }

    /// Write every uniform the program declares. Runs once at creation.
    pub(crate) fn write_all_uniforms(&self) -> Result<(), RenderError> {
        let kinds: Vec<UniformKind> =
            self.program.layout.uniforms.iter().map(|u| u.kind).collect();
        for kind in kinds {
            self.write_uniform(kind)?;
        }
        Ok(())
    }

    /// Recompute and upload one uniform. Undeclared kinds are a silent
    /// no-op; that is what makes `set_to_all` safe across mixed programs.
    fn write_uniform(&self, kind: UniformKind) -> Result<(), RenderError> {
        let Some(slot) = self.program.layout.uniform(kind) else {
            return Ok(());
        };
        match kind {
            UniformKind::Transformation => {
                let world = resolve_transform(&self.options);
                self.write_packed(slot.offset, &encode_mat4(&world))
            }
            UniformKind::Perspective => {
                let matrix = match &self.options.projection {
                    Some(projection) => *projection.matrix(),
                    None => *Projection::new().matrix(),
                };
                self.write_packed(slot.offset, &encode_mat4(&matrix))
            }
            UniformKind::AnimationOffset => {
                let offset = self.options.animation_vector.unwrap_or([0.0, 0.0]);
                self.write_packed(slot.offset, bytemuck::cast_slice(&offset))
            }
            UniformKind::BumpScale => {
                let scale = self.options.bump_scale.unwrap_or(1.0);
                self.write_packed(slot.offset, &scale.to_le_bytes())
            }
            UniformKind::BoneMatrices => {
                let skeleton = self.skeleton.as_ref().ok_or_else(|| {
                    RenderError::Configuration(
                        "program declares bone matrices but no skeleton is attached"
                            .to_string(),
                    )
                })?;
                let pose = self.options.bones.clone().unwrap_or_else(BonePose::rest);
                let matrices = skeleton.skinning_matrices(&pose)?;
                let buffer = self.bone_buffer.as_ref().ok_or_else(|| {
                    RenderError::Configuration("bone-matrix buffer missing".to_string())
                })?;
                self.backend
                    .write_buffer(buffer, 0, bytemuck::cast_slice(&matrices))
            }
            UniformKind::DiffuseTexture
            | UniformKind::DiffuseSampler
            | UniformKind::DisplacementMap
            | UniformKind::DisplacementSampler => Ok(()),
        }
    }

    fn write_packed(&self, offset: u32, bytes: &[u8]) -> Result<(), RenderError> {
        let buffer = self.uniform_buffer.as_ref().ok_or_else(|| {
            RenderError::Configuration("uniform block buffer missing".to_string())
        })?;
        self.backend.write_buffer(buffer, offset as u64, bytes)
    }

    /// Transparency sort key: nearest vertex depth plus the instance's
    /// translation, relative to its camera.
    pub(crate) fn sort_key(&self) -> f32 {
        let camera_z = self
            .options
            .camera
            .as_ref()
            .map(|c| c.position().z)
            .unwrap_or(0.0);
        self.bounds_min.z + self.options.effective_translation().z - camera_z
    }

    /// Coarse visibility test, applied on the raster dialect only. The
    /// bounding extremes and center are offset by the camera-relative
    /// translation and checked against the unit square in X/Y and the
    /// near/far range in Z. An approximation, not a frustum test.
    pub(crate) fn is_visible(&self) -> bool {
        if self.program.dialect != ShaderDialect::Glsl {
            return true;
        }
        let camera_position = self
            .options
            .camera
            .as_ref()
            .map(|c| c.position())
            .unwrap_or_else(Vec3::zeros);
        let offset = self.options.effective_translation() - camera_position;

        let depth_range = self
            .program
            .layout
            .has_uniform(UniformKind::Perspective)
            .then(|| match &self.options.projection {
                Some(p) => (p.near(), p.far()),
                None => {
                    let p = Projection::new();
                    (p.near(), p.far())
                }
            });
        let inside = |p: Vec3| {
            if p.x < -1.0 || p.x > 1.0 || p.y < -1.0 || p.y > 1.0 {
                return false;
            }
            match depth_range {
                Some((near, far)) => p.z >= near && p.z <= far,
                None => true,
            }
        };

        let low = self.bounds_min + offset;
        let high = self.bounds_max + offset;
        let center = (self.bounds_min + self.bounds_max) * 0.5 + offset;
        (inside(low) && inside(high)) || inside(center)
    }
}

impl Drop for Renderable {
    fn drop(&mut self) {
        log::trace!(
            "dropping renderable ({} indices, {} textures)",
            self.index_count,
            self.textures.len()
        );
    }
}
