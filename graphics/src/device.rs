//! Renderable creation.
//!
//! `RenderDevice` turns a validated descriptor into a live `Renderable`:
//! it drives the program builder from the descriptor's capabilities,
//! compiles the program on the backend, allocates and fills every buffer,
//! uploads textures once, binds the skeleton, and performs the initial
//! uniform write. Creation fails fast; nothing is allocated after the
//! first error.

use std::sync::Arc;

use larkspur_core::math::{Axis, Vec3};

use crate::attributes::DrawableElementAttributes;
use crate::backend::{BindingResource, GpuBackend, GpuBuffer, GpuTexture, PipelineDescriptor};
use crate::binding::{index_data, pack_vertices, padded_block_size};
use crate::error::RenderError;
use crate::renderable::Renderable;
use crate::shader::{ProgramBuilder, ShaderDialect, ShaderProgram, UNIFORM_BLOCK_BINDING};
use crate::skeleton::{BonePose, Skeleton};
use crate::transform::DrawOpt;
use crate::types::{BufferDescriptor, BufferUsage};

/// Factory for renderables on one backend.
pub struct RenderDevice {
    backend: Arc<dyn GpuBackend>,
}

impl RenderDevice {
    pub fn new(backend: Arc<dyn GpuBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Create a renderable from a descriptor and its initial draw options.
    pub fn create_renderable(
        &self,
        attrs: &DrawableElementAttributes,
        options: DrawOpt,
    ) -> Result<Renderable, RenderError> {
        attrs.validate()?;

        let program = self.build_program(attrs)?;
        let pipeline = self.backend.create_pipeline(&PipelineDescriptor {
            program: &program,
            topology: attrs.topology,
            transparent: attrs.transparent,
            label: None,
        })?;

        let packed = pack_vertices(attrs, &program.layout)?;
        let vertex_buffer = self.backend.create_buffer(&BufferDescriptor::new(
            packed.len() as u64,
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
        ))?;
        self.backend.write_buffer(&vertex_buffer, 0, &packed)?;

        let indices = index_data(attrs);
        let index_buffer = self.backend.create_buffer(&BufferDescriptor::new(
            (indices.len() * 4) as u64,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
        ))?;
        self.backend
            .write_buffer(&index_buffer, 0, bytemuck::cast_slice(&indices))?;

        let uniform_buffer = if program.layout.uniform_stride > 0 {
            Some(self.backend.create_buffer(
                &BufferDescriptor::new(
                    padded_block_size(program.layout.uniform_stride),
                    BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                )
                .with_label("uniform block"),
            )?)
        } else {
            None
        };
        let bone_buffer = match program.layout.bone_count() {
            Some(bones) => Some(self.backend.create_buffer(
                &BufferDescriptor::new(
                    bones as u64 * 64,
                    BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                )
                .with_label("bone matrices"),
            )?),
            None => None,
        };

        // Textures upload once at creation; there is no image swapping on a
        // live renderable.
        let mut diffuse = None;
        let mut displacement = None;
        if let Some(image) = &attrs.image {
            diffuse = Some(self.backend.create_texture(
                &image.bitmap.descriptor().with_label("diffuse"),
                &image.bitmap.pixels,
            )?);
            if let Some(map) = &image.displacement_map {
                displacement = Some(self.backend.create_texture(
                    &map.descriptor().with_label("displacement"),
                    &map.pixels,
                )?);
            }
        }

        let skeleton = match &attrs.bones {
            Some(bones) => {
                let mut skeleton = Skeleton::new(
                    bones.count as usize,
                    bones.root,
                    bones.parent_index.clone(),
                    Axis::default(),
                )?;
                let bind_pose = options.bones.clone().unwrap_or_else(BonePose::rest);
                skeleton.bind(&bind_pose)?;
                Some(skeleton)
            }
            None => None,
        };

        let bind_group = if program.dialect == ShaderDialect::Wgsl
            && !program.layout.binding_order.is_empty()
        {
            let resources = collect_resources(
                &program,
                diffuse.as_ref(),
                displacement.as_ref(),
                uniform_buffer.as_ref(),
                bone_buffer.as_ref(),
            )?;
            Some(self.backend.create_bind_group(&pipeline, &resources)?)
        } else {
            None
        };

        let (bounds_min, bounds_max) = bounds(&attrs.vertices);
        let mut textures = Vec::new();
        textures.extend(diffuse);
        textures.extend(displacement);

        let renderable = Renderable {
            backend: Arc::clone(&self.backend),
            program,
            pipeline,
            bind_group,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            uniform_buffer,
            bone_buffer,
            textures,
            skeleton,
            options,
            transparent: attrs.transparent,
            bounds_min,
            bounds_max,
        };
        renderable.write_all_uniforms()?;
        Ok(renderable)
    }

    /// Map descriptor capabilities onto builder calls. Elements with no
    /// color source fall back to opaque white.
    fn build_program(
        &self,
        attrs: &DrawableElementAttributes,
    ) -> Result<ShaderProgram, RenderError> {
        let mut builder = ProgramBuilder::new();
        if let Some(image) = &attrs.image {
            builder = builder.with_texture();
            if image.displacement_map.is_some() {
                builder = builder.with_displacement_map();
            }
            if image.animate {
                builder = builder.with_animation_2d();
            }
        } else if attrs.colors.is_some() {
            builder = builder.with_interpolated_color();
        } else {
            builder =
                builder.with_static_color(attrs.static_color.unwrap_or([1.0, 1.0, 1.0, 1.0]));
        }
        if let Some(bones) = &attrs.bones {
            builder = builder.with_skeletal_animation(bones.count);
        }
        if attrs.perspective {
            builder = builder.with_perspective();
        }
        if !attrs.is_static {
            builder = builder.with_dynamic_transform();
        }
        builder.build(self.backend.dialect())
    }
}

fn collect_resources<'a>(
    program: &ShaderProgram,
    diffuse: Option<&'a GpuTexture>,
    displacement: Option<&'a GpuTexture>,
    uniform_buffer: Option<&'a GpuBuffer>,
    bone_buffer: Option<&'a GpuBuffer>,
) -> Result<Vec<BindingResource<'a>>, RenderError> {
    let missing =
        |what: &str| RenderError::Configuration(format!("program binds {what} but none exists"));
    let mut resources = Vec::with_capacity(program.layout.binding_order.len());
    for name in &program.layout.binding_order {
        let resource = match *name {
            "diffuse_texture" => {
                BindingResource::Texture(diffuse.ok_or_else(|| missing("a diffuse texture"))?)
            }
            "diffuse_sampler" => {
                BindingResource::Sampler(diffuse.ok_or_else(|| missing("a diffuse sampler"))?)
            }
            "displacement_map" => BindingResource::Texture(
                displacement.ok_or_else(|| missing("a displacement map"))?,
            ),
            "displacement_sampler" => BindingResource::Sampler(
                displacement.ok_or_else(|| missing("a displacement sampler"))?,
            ),
            UNIFORM_BLOCK_BINDING => BindingResource::Buffer(
                uniform_buffer.ok_or_else(|| missing("a uniform block"))?,
            ),
            "bones" => {
                BindingResource::Buffer(bone_buffer.ok_or_else(|| missing("a bone buffer"))?)
            }
            other => {
                return Err(RenderError::Configuration(format!(
                    "unknown binding {other}"
                )));
            }
        };
        resources.push(resource);
    }
    Ok(resources)
}

fn bounds(vertices: &[Vec3]) -> (Vec3, Vec3) {
    let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for v in vertices {
        min = min.inf(v);
        max = max.sup(v);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::shader::UniformKind;
    use larkspur_core::math::Vec3;

    fn device(dialect: ShaderDialect) -> (Arc<DummyBackend>, RenderDevice) {
        let backend = Arc::new(DummyBackend::new(dialect));
        let device = RenderDevice::new(Arc::clone(&backend) as Arc<dyn GpuBackend>);
        (backend, device)
    }

    fn triangle() -> DrawableElementAttributes {
        DrawableElementAttributes::new(vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn static_triangle_has_position_only() {
        let (_, device) = device(ShaderDialect::Glsl);
        let renderable = device
            .create_renderable(
                &triangle().with_static_color([1.0, 0.0, 0.0, 1.0]).with_static(),
                DrawOpt::new(),
            )
            .unwrap();
        let names: Vec<_> = renderable
            .program()
            .layout
            .attributes
            .iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["vertex_position"]);
        assert!(renderable.program().layout.uniforms.is_empty());
    }

    #[test]
    fn dynamic_element_gets_an_initial_uniform_write() {
        let (backend, device) = device(ShaderDialect::Wgsl);
        let renderable = device
            .create_renderable(&triangle(), DrawOpt::new())
            .unwrap();
        assert!(renderable
            .program()
            .layout
            .has_uniform(UniformKind::Transformation));
        // Vertex, index, and one transformation write.
        assert_eq!(backend.buffer_write_count(), 3);
    }

    #[test]
    fn invalid_descriptor_fails_before_allocation() {
        let (backend, device) = device(ShaderDialect::Wgsl);
        let err = device
            .create_renderable(&DrawableElementAttributes::new(Vec::new()), DrawOpt::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::DataShape(_)));
        assert_eq!(backend.buffer_write_count(), 0);
    }
}
