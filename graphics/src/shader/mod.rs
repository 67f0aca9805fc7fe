//! Shader program synthesis.
//!
//! A `ProgramBuilder` collects capability requests and emits a complete
//! shader pair plus the `ProgramLayout` that the binding layer allocates
//! from. The builder is consumed by `build`; a fresh builder is required
//! for every program, so no state ever leaks between renderables.

mod glsl;
pub mod layout;
mod wgsl;

pub use layout::{
    AttributeSlot, ProgramLayout, ShaderStageFlags, ShaderType, UniformKind, UniformSlot,
    UNIFORM_BLOCK_BINDING,
};

use crate::error::RenderError;
use layout::LayoutBuilder;

/// Which shader language to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDialect {
    /// GLSL ES 1.00, for the raster backend (texture units, no blocks).
    Glsl,
    /// WGSL, for the bind-group backend.
    Wgsl,
}

/// Base fragment shape of a program. Exactly one is required.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BaseMode {
    /// Sample a diffuse texture.
    Texture,
    /// Interpolate a per-vertex color attribute.
    InterpolatedColor,
    /// A single color baked into the fragment source as a literal.
    StaticColor([f32; 4]),
}

/// Capability set the emitters render from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgramDesc {
    pub base: BaseModeDesc,
    pub displacement_map: bool,
    pub animation_2d: bool,
    pub bone_count: Option<u32>,
    pub perspective: bool,
    pub dynamic_transform: bool,
}

/// `BaseMode` exposed to the emitter modules.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BaseModeDesc {
    Texture,
    InterpolatedColor,
    StaticColor([f32; 4]),
}

/// A generated shader pair and its layout.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    /// Vertex stage source in the requested dialect.
    pub vertex_source: String,
    /// Fragment stage source in the requested dialect.
    pub fragment_source: String,
    /// Attribute and uniform layout the sources were generated against.
    pub layout: ProgramLayout,
    /// Dialect the sources are written in.
    pub dialect: ShaderDialect,
}

/// Builds a shader program from capability requests.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    base: Option<BaseMode>,
    displacement_map: bool,
    animation_2d: bool,
    bone_count: Option<u32>,
    perspective: bool,
    dynamic_transform: bool,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample a diffuse texture. Replaces any previously selected base mode.
    pub fn with_texture(mut self) -> Self {
        self.base = Some(BaseMode::Texture);
        self
    }

    /// Interpolate a per-vertex color attribute. Replaces any previously
    /// selected base mode.
    pub fn with_interpolated_color(mut self) -> Self {
        self.base = Some(BaseMode::InterpolatedColor);
        self
    }

    /// Use a single fixed color. Replaces any previously selected base mode.
    pub fn with_static_color(mut self, rgba: [f32; 4]) -> Self {
        self.base = Some(BaseMode::StaticColor(rgba));
        self
    }

    /// Displace vertices along Z by a sampled map scaled with `bump_scale`.
    /// Requires the texture base.
    pub fn with_displacement_map(mut self) -> Self {
        self.displacement_map = true;
        self
    }

    /// Offset texture coordinates by a per-frame `animation_offset` uniform
    /// (sprite-sheet animation). Requires the texture base.
    pub fn with_animation_2d(mut self) -> Self {
        self.animation_2d = true;
        self
    }

    /// Skin vertices against a bone-matrix array of the given length.
    pub fn with_skeletal_animation(mut self, bone_count: u32) -> Self {
        self.bone_count = Some(bone_count);
        self
    }

    /// Multiply by a perspective projection uniform.
    pub fn with_perspective(mut self) -> Self {
        self.perspective = true;
        self
    }

    /// Multiply by a per-instance transformation uniform.
    pub fn with_dynamic_transform(mut self) -> Self {
        self.dynamic_transform = true;
        self
    }

    /// Validate the capability set, compute the layout, and emit sources.
    pub fn build(self, dialect: ShaderDialect) -> Result<ShaderProgram, RenderError> {
        let base = self.base.ok_or_else(|| {
            RenderError::Configuration(
                "a base mode (texture, interpolated color, or static color) is required"
                    .to_string(),
            )
        })?;
        let textured = matches!(base, BaseMode::Texture);
        if self.displacement_map && !textured {
            return Err(RenderError::Configuration(
                "displacement map requires the texture base mode".to_string(),
            ));
        }
        if self.animation_2d && !textured {
            return Err(RenderError::Configuration(
                "2d animation requires the texture base mode".to_string(),
            ));
        }
        if self.bone_count == Some(0) {
            return Err(RenderError::Configuration(
                "skeletal animation requires at least one bone".to_string(),
            ));
        }

        let desc = ProgramDesc {
            base: match base {
                BaseMode::Texture => BaseModeDesc::Texture,
                BaseMode::InterpolatedColor => BaseModeDesc::InterpolatedColor,
                BaseMode::StaticColor(rgba) => BaseModeDesc::StaticColor(rgba),
            },
            displacement_map: self.displacement_map,
            animation_2d: self.animation_2d,
            bone_count: self.bone_count,
            perspective: self.perspective,
            dynamic_transform: self.dynamic_transform,
        };
        let layout = Self::compute_layout(&desc, dialect);
        let (vertex_source, fragment_source) = match dialect {
            ShaderDialect::Glsl => glsl::emit(&desc, &layout),
            ShaderDialect::Wgsl => wgsl::emit(&desc, &layout),
        };
        log::trace!(
            "built {:?} program: {} attributes, {} uniforms, stride {}",
            dialect,
            layout.attributes.len(),
            layout.uniforms.len(),
            layout.attribute_stride
        );
        Ok(ShaderProgram {
            vertex_source,
            fragment_source,
            layout,
            dialect,
        })
    }

    /// Declaration order is fixed: position, then capability attributes;
    /// texture bindings, then the packed block members, then bones. The GLSL
    /// dialect declares no samplers (texture units carry their own sampling
    /// state there).
    fn compute_layout(desc: &ProgramDesc, dialect: ShaderDialect) -> ProgramLayout {
        let mut builder = LayoutBuilder::new();
        let samplers = dialect == ShaderDialect::Wgsl;

        builder.attribute("vertex_position", ShaderType::Vec3);
        if matches!(desc.base, BaseModeDesc::Texture) {
            builder.attribute("texture_coords", ShaderType::Vec2);
        }
        if matches!(desc.base, BaseModeDesc::InterpolatedColor) {
            builder.attribute("color", ShaderType::Vec4);
        }
        if desc.bone_count.is_some() {
            builder.attribute("bone_indices", ShaderType::Vec4);
            builder.attribute("bone_weights", ShaderType::Vec4);
        }

        if matches!(desc.base, BaseModeDesc::Texture) {
            builder.uniform(UniformKind::DiffuseTexture, 1);
            if samplers {
                builder.uniform(UniformKind::DiffuseSampler, 1);
            }
        }
        if desc.displacement_map {
            builder.uniform(UniformKind::DisplacementMap, 1);
            if samplers {
                builder.uniform(UniformKind::DisplacementSampler, 1);
            }
            builder.uniform(UniformKind::BumpScale, 1);
        }
        if desc.animation_2d {
            builder.uniform(UniformKind::AnimationOffset, 1);
        }
        if let Some(bones) = desc.bone_count {
            builder.uniform(UniformKind::BoneMatrices, bones);
        }
        if desc.perspective {
            builder.uniform(UniformKind::Perspective, 1);
        }
        if desc.dynamic_transform {
            builder.uniform(UniformKind::Transformation, 1);
        }
        builder.finish()
    }
}

/// Formats an `f32` as a source literal that always carries a decimal point.
pub(crate) fn float_literal(value: f32) -> String {
    let formatted = format!("{value}");
    if formatted.contains('.') || formatted.contains("inf") || formatted.contains("NaN") {
        formatted
    } else {
        format!("{formatted}.0")
    }
}
