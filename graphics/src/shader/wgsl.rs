//! WGSL emitter for the bind-group backend.
//!
//! Packed scalars/vectors/matrices live in one `Uniforms` struct whose
//! member order matches the layout's packed offsets; textures, samplers,
//! and the bone array each take their own `@binding` slot.

use crate::shader::layout::{ProgramLayout, ShaderType, UNIFORM_BLOCK_BINDING};
use crate::shader::{float_literal, BaseModeDesc, ProgramDesc};

pub(crate) fn emit(desc: &ProgramDesc, layout: &ProgramLayout) -> (String, String) {
    let header = emit_header(desc, layout);
    (
        format!("{header}{}", emit_vertex(desc, layout)),
        format!("{header}{}", emit_fragment(desc, layout)),
    )
}

/// Struct and binding declarations shared by both stages.
fn emit_header(desc: &ProgramDesc, layout: &ProgramLayout) -> String {
    let mut src = String::new();

    let packed: Vec<_> = layout.uniforms.iter().filter(|u| u.kind.is_packed()).collect();
    if !packed.is_empty() {
        src.push_str("struct Uniforms {\n");
        for slot in &packed {
            src.push_str(&format!(
                "    {}: {},\n",
                slot.kind.name(),
                wgsl_type(slot.ty)
            ));
        }
        src.push_str("};\n\n");
    }

    for (slot, name) in layout.binding_order.iter().enumerate() {
        let decl = match *name {
            UNIFORM_BLOCK_BINDING => "var<uniform> uniforms: Uniforms;".to_string(),
            "bones" => format!(
                "var<uniform> bones: array<mat4x4<f32>, {}>;",
                desc.bone_count.unwrap_or(1)
            ),
            "diffuse_sampler" | "displacement_sampler" => format!("var {name}: sampler;"),
            _ => format!("var {name}: texture_2d<f32>;"),
        };
        src.push_str(&format!("@group(0) @binding({slot}) {decl}\n"));
    }
    if !layout.binding_order.is_empty() {
        src.push('\n');
    }

    src.push_str("struct VertexInput {\n");
    for attr in &layout.attributes {
        src.push_str(&format!(
            "    @location({}) {}: {},\n",
            attr.location,
            attr.name,
            wgsl_type(attr.ty)
        ));
    }
    src.push_str("};\n\n");

    src.push_str("struct VertexOutput {\n");
    src.push_str("    @builtin(position) position: vec4<f32>,\n");
    match desc.base {
        BaseModeDesc::Texture => {
            src.push_str("    @location(0) texture_coords: vec2<f32>,\n");
        }
        BaseModeDesc::InterpolatedColor => {
            src.push_str("    @location(0) color: vec4<f32>,\n");
        }
        BaseModeDesc::StaticColor(_) => {}
    }
    src.push_str("};\n\n");
    src
}

fn emit_vertex(desc: &ProgramDesc, _layout: &ProgramLayout) -> String {
    let mut src = String::new();
    src.push_str("@vertex\n");
    src.push_str("fn vs_main(input: VertexInput) -> VertexOutput {\n");
    src.push_str("    var position = vec4<f32>(input.vertex_position, 1.0);\n");
    if desc.bone_count.is_some() {
        src.push_str("    let skin = bones[i32(input.bone_indices.x)] * input.bone_weights.x\n");
        src.push_str("        + bones[i32(input.bone_indices.y)] * input.bone_weights.y\n");
        src.push_str("        + bones[i32(input.bone_indices.z)] * input.bone_weights.z\n");
        src.push_str("        + bones[i32(input.bone_indices.w)] * input.bone_weights.w;\n");
        src.push_str("    position = skin * position;\n");
    }
    if desc.displacement_map {
        src.push_str(
            "    let bump = textureSampleLevel(displacement_map, displacement_sampler, input.texture_coords, 0.0).r;\n",
        );
        src.push_str("    position.z = position.z + bump * uniforms.bump_scale;\n");
    }
    if desc.dynamic_transform {
        src.push_str("    position = uniforms.transformation * position;\n");
    }
    if desc.perspective {
        src.push_str("    position = uniforms.perspective * position;\n");
    }
    src.push_str("    var output: VertexOutput;\n");
    src.push_str("    output.position = position;\n");
    match desc.base {
        BaseModeDesc::Texture => {
            if desc.animation_2d {
                src.push_str(
                    "    output.texture_coords = input.texture_coords + uniforms.animation_offset;\n",
                );
            } else {
                src.push_str("    output.texture_coords = input.texture_coords;\n");
            }
        }
        BaseModeDesc::InterpolatedColor => {
            src.push_str("    output.color = input.color;\n");
        }
        BaseModeDesc::StaticColor(_) => {}
    }
    src.push_str("    return output;\n");
    src.push_str("}\n");
    src
}

fn emit_fragment(desc: &ProgramDesc, _layout: &ProgramLayout) -> String {
    let mut src = String::new();
    src.push_str("@fragment\n");
    src.push_str("fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {\n");
    match desc.base {
        BaseModeDesc::Texture => {
            src.push_str(
                "    return textureSample(diffuse_texture, diffuse_sampler, input.texture_coords);\n",
            );
        }
        BaseModeDesc::InterpolatedColor => {
            src.push_str("    return input.color;\n");
        }
        BaseModeDesc::StaticColor(rgba) => {
            src.push_str(&format!(
                "    return vec4<f32>({}, {}, {}, {});\n",
                float_literal(rgba[0]),
                float_literal(rgba[1]),
                float_literal(rgba[2]),
                float_literal(rgba[3])
            ));
        }
    }
    src.push_str("}\n");
    src
}

fn wgsl_type(ty: ShaderType) -> &'static str {
    match ty {
        ShaderType::Float => "f32",
        ShaderType::Int => "i32",
        ShaderType::Vec2 => "vec2<f32>",
        ShaderType::Vec3 => "vec3<f32>",
        ShaderType::Vec4 => "vec4<f32>",
        ShaderType::Mat2 => "mat2x2<f32>",
        ShaderType::Mat3 => "mat3x3<f32>",
        ShaderType::Mat4 => "mat4x4<f32>",
        ShaderType::Texture2d => "texture_2d<f32>",
        ShaderType::Sampler => "sampler",
    }
}
