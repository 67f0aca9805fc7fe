//! GLSL ES 1.00 emitter for the raster backend.
//!
//! Attribute/varying/uniform declarations, `gl_FragColor` output, and
//! texture units assigned in declaration order. Samplers are implicit in
//! this dialect, so the layout never declares them.

use crate::shader::layout::{ProgramLayout, UniformKind};
use crate::shader::{float_literal, BaseModeDesc, ProgramDesc};

pub(crate) fn emit(desc: &ProgramDesc, layout: &ProgramLayout) -> (String, String) {
    (emit_vertex(desc, layout), emit_fragment(desc))
}

fn emit_vertex(desc: &ProgramDesc, layout: &ProgramLayout) -> String {
    let mut src = String::new();
    let textured = matches!(desc.base, BaseModeDesc::Texture);
    let colored = matches!(desc.base, BaseModeDesc::InterpolatedColor);

    for attr in &layout.attributes {
        src.push_str(&format!(
            "attribute {} {};\n",
            glsl_type(attr.components),
            attr.name
        ));
    }
    if desc.displacement_map {
        src.push_str("uniform sampler2D displacement_map;\n");
        src.push_str("uniform float bump_scale;\n");
    }
    if desc.animation_2d {
        src.push_str("uniform vec2 animation_offset;\n");
    }
    if let Some(bones) = desc.bone_count {
        src.push_str(&format!("uniform mat4 bones[{bones}];\n"));
    }
    if desc.perspective {
        src.push_str("uniform mat4 perspective;\n");
    }
    if desc.dynamic_transform {
        src.push_str("uniform mat4 transformation;\n");
    }
    if textured {
        src.push_str("varying vec2 frag_texture_coords;\n");
    }
    if colored {
        src.push_str("varying vec4 frag_color;\n");
    }

    src.push_str("\nvoid main() {\n");
    src.push_str("    vec4 position = vec4(vertex_position, 1.0);\n");
    if desc.bone_count.is_some() {
        src.push_str("    mat4 skin = bones[int(bone_indices.x)] * bone_weights.x\n");
        src.push_str("        + bones[int(bone_indices.y)] * bone_weights.y\n");
        src.push_str("        + bones[int(bone_indices.z)] * bone_weights.z\n");
        src.push_str("        + bones[int(bone_indices.w)] * bone_weights.w;\n");
        src.push_str("    position = skin * position;\n");
    }
    if desc.displacement_map {
        src.push_str(
            "    float bump = texture2DLod(displacement_map, texture_coords, 0.0).r;\n",
        );
        src.push_str("    position.z += bump * bump_scale;\n");
    }
    if desc.dynamic_transform {
        src.push_str("    position = transformation * position;\n");
    }
    if desc.perspective {
        src.push_str("    position = perspective * position;\n");
    }
    src.push_str("    gl_Position = position;\n");
    if textured {
        if desc.animation_2d {
            src.push_str("    frag_texture_coords = texture_coords + animation_offset;\n");
        } else {
            src.push_str("    frag_texture_coords = texture_coords;\n");
        }
    }
    if colored {
        src.push_str("    frag_color = color;\n");
    }
    src.push_str("}\n");
    src
}

fn emit_fragment(desc: &ProgramDesc) -> String {
    let mut src = String::new();
    src.push_str("precision mediump float;\n");
    match desc.base {
        BaseModeDesc::Texture => {
            src.push_str(&format!(
                "uniform sampler2D {};\n",
                UniformKind::DiffuseTexture.name()
            ));
            src.push_str("varying vec2 frag_texture_coords;\n");
            src.push_str("\nvoid main() {\n");
            src.push_str(
                "    gl_FragColor = texture2D(diffuse_texture, frag_texture_coords);\n",
            );
            src.push_str("}\n");
        }
        BaseModeDesc::InterpolatedColor => {
            src.push_str("varying vec4 frag_color;\n");
            src.push_str("\nvoid main() {\n");
            src.push_str("    gl_FragColor = frag_color;\n");
            src.push_str("}\n");
        }
        BaseModeDesc::StaticColor(rgba) => {
            src.push_str("\nvoid main() {\n");
            src.push_str(&format!(
                "    gl_FragColor = vec4({}, {}, {}, {});\n",
                float_literal(rgba[0]),
                float_literal(rgba[1]),
                float_literal(rgba[2]),
                float_literal(rgba[3])
            ));
            src.push_str("}\n");
        }
    }
    src
}

fn glsl_type(components: u32) -> &'static str {
    match components {
        1 => "float",
        2 => "vec2",
        3 => "vec3",
        _ => "vec4",
    }
}
