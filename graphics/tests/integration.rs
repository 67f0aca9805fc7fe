//! End-to-end tests over the dummy backend.

use std::sync::Arc;

use larkspur_core::math::{Angle, Axis, Mat4, Vec2, Vec3};
use larkspur_graphics::backend::dummy::DummyBackend;
use larkspur_graphics::backend::GpuBackend;
use larkspur_graphics::{
    BoneAttributes, BonePose, Camera, DrawOpt, DrawableElementAttributes, ImageAttributes,
    ProgramBuilder, Registry, RenderDevice, RenderError, ShaderDialect, Skeleton, TextureData,
    UniformKind,
};
use rstest::rstest;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup(dialect: ShaderDialect) -> (Arc<DummyBackend>, RenderDevice) {
    init_logging();
    let backend = Arc::new(DummyBackend::new(dialect));
    let device = RenderDevice::new(Arc::clone(&backend) as Arc<dyn GpuBackend>);
    (backend, device)
}

fn triangle(z: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(-0.5, -0.5, z),
        Vec3::new(0.5, -0.5, z),
        Vec3::new(0.0, 0.5, z),
    ]
}

#[test]
fn red_triangle_draws_once_with_a_literal_color() {
    let (backend, device) = setup(ShaderDialect::Glsl);
    let attrs = DrawableElementAttributes::new(triangle(0.0))
        .with_static_color([1.0, 0.0, 0.0, 1.0])
        .with_static();
    let renderable = device.create_renderable(&attrs, DrawOpt::new()).unwrap();

    // The color is baked into the source, not bound as a uniform.
    assert!(renderable
        .program()
        .fragment_source
        .contains("vec4(1.0, 0.0, 0.0, 1.0)"));
    let names: Vec<_> = renderable
        .program()
        .layout
        .attributes
        .iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["vertex_position"]);

    let mut registry = Registry::new();
    registry.append("triangle", renderable);
    registry.draw();
    assert_eq!(backend.draw_call_count(), 1);
}

#[test]
fn transparent_instances_order_farther_first() {
    let (_, device) = setup(ShaderDialect::Wgsl);
    let mut registry = Registry::new();
    let make = |z: f32| {
        let attrs = DrawableElementAttributes::new(triangle(z))
            .with_static()
            .with_transparency();
        device.create_renderable(&attrs, DrawOpt::new()).unwrap()
    };
    registry.append("near", make(2.0));
    registry.append("far", make(5.0));
    assert_eq!(registry.resolved_draw_order(), vec!["far", "near"]);
}

#[test]
fn bone_shape_mismatch_fails_at_create() {
    let (backend, device) = setup(ShaderDialect::Wgsl);
    let attrs = DrawableElementAttributes::new(triangle(0.0)).with_bones(BoneAttributes {
        count: 2,
        indices: vec![0.0; 12],
        weights: vec![0.25; 10],
        root: 0,
        parent_index: vec![0, 0],
    });
    let err = device.create_renderable(&attrs, DrawOpt::new()).unwrap_err();
    assert!(matches!(err, RenderError::DataShape(_)));
    assert_eq!(backend.buffer_write_count(), 0);
}

#[test]
fn root_rotation_propagates_down_a_chain() {
    init_logging();
    let skeleton = Skeleton::new(3, 0, vec![0, 0, 1], Axis::Z).unwrap();
    let offsets = vec![
        Vec3::zeros(),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    ];
    let rest = BonePose::new(Vec::new(), offsets.clone());
    let bent = BonePose::new(
        vec![Angle::Degrees(90.0), Angle::ZERO, Angle::ZERO],
        offsets,
    );

    let rest_globals = skeleton.resolve(&rest).unwrap();
    let bent_globals = skeleton.resolve(&bent).unwrap();

    // Bone 2's world position moved with the root.
    let tip_rest = rest_globals[2].transform_point(Vec3::zeros());
    let tip_bent = bent_globals[2].transform_point(Vec3::zeros());
    assert!((tip_rest.x - 2.0).abs() < 1e-5);
    assert!((tip_bent.y - 2.0).abs() < 1e-5);

    // Its pose relative to bone 1 did not.
    let relative = bent_globals[1].invert().unwrap().compose(&bent_globals[2]);
    let local = relative.transform_point(Vec3::zeros());
    assert!((local.x - 1.0).abs() < 1e-5);
    assert!(local.y.abs() < 1e-5);
}

#[test]
fn empty_partial_update_writes_nothing() {
    let (backend, device) = setup(ShaderDialect::Wgsl);
    let mut renderable = device
        .create_renderable(&DrawableElementAttributes::new(triangle(0.0)), DrawOpt::new())
        .unwrap();
    let writes = backend.buffer_write_count();
    renderable.set_attributes(&DrawOpt::new()).unwrap();
    assert_eq!(backend.buffer_write_count(), writes);
}

#[rstest]
#[case(ShaderDialect::Glsl)]
#[case(ShaderDialect::Wgsl)]
fn texture_base_declares_position_then_uv(#[case] dialect: ShaderDialect) {
    init_logging();
    let program = ProgramBuilder::new().with_texture().build(dialect).unwrap();
    let names: Vec<_> = program.layout.attributes.iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["vertex_position", "texture_coords"]);
    assert_eq!(program.layout.attribute("texture_coords").unwrap().offset, 12);
}

#[test]
fn explicit_transformation_matrix_uploads_verbatim() {
    let (backend, device) = setup(ShaderDialect::Wgsl);
    #[rustfmt::skip]
    let explicit = Mat4::from([
        2.0, 0.0, 0.0, 7.0,
        0.0, 3.0, 0.0, -1.0,
        0.0, 0.0, 4.0, 0.5,
        0.0, 0.0, 0.0, 1.0,
    ]);
    let options = DrawOpt::new()
        .with_transformation_matrix(explicit)
        .with_rotation(Angle::Degrees(45.0), Axis::Z)
        .with_translation(Vec3::new(9.0, 9.0, 9.0));
    let renderable = device
        .create_renderable(&DrawableElementAttributes::new(triangle(0.0)), options)
        .unwrap();

    let slot = renderable
        .program()
        .layout
        .uniform(UniformKind::Transformation)
        .unwrap();
    let bytes = backend.read_buffer(renderable.uniform_buffer().unwrap());
    let uploaded: &[f32] =
        bytemuck::cast_slice(&bytes[slot.offset as usize..slot.offset as usize + 64]);
    assert_eq!(uploaded, &explicit.to_cols_array());
}

#[test]
fn camera_update_rewrites_the_transform_uniform() {
    let (backend, device) = setup(ShaderDialect::Wgsl);
    let mut renderable = device
        .create_renderable(&DrawableElementAttributes::new(triangle(0.0)), DrawOpt::new())
        .unwrap();
    let before = backend.read_buffer(renderable.uniform_buffer().unwrap());

    let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 10.0));
    renderable
        .set_attributes(&DrawOpt::new().with_camera(camera))
        .unwrap();
    let after = backend.read_buffer(renderable.uniform_buffer().unwrap());
    assert_ne!(before, after);
}

#[test]
fn textured_skinned_element_creates_end_to_end() {
    let (backend, device) = setup(ShaderDialect::Wgsl);
    let vertices = triangle(0.0);
    let image = ImageAttributes::new(
        TextureData::new(2, 2, vec![128; 16]),
        vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.5, 1.0)],
    )
    .with_displacement_map(TextureData::new(2, 2, vec![0; 16]))
    .with_animation();
    let bones = BoneAttributes {
        count: 2,
        indices: vec![0.0; 12],
        weights: {
            let mut w = vec![0.0; 12];
            for chunk in w.chunks_mut(4) {
                chunk[0] = 1.0;
            }
            w
        },
        root: 0,
        parent_index: vec![0, 0],
    };
    let attrs = DrawableElementAttributes::new(vertices)
        .with_image(image)
        .with_bones(bones)
        .with_perspective();
    let renderable = device.create_renderable(&attrs, DrawOpt::new()).unwrap();

    let layout = &renderable.program().layout;
    assert_eq!(layout.bone_count(), Some(2));
    assert!(layout.has_uniform(UniformKind::BumpScale));
    assert!(layout.has_uniform(UniformKind::AnimationOffset));
    assert!(layout.has_uniform(UniformKind::Perspective));
    assert!(layout.has_uniform(UniformKind::Transformation));
    // vec3 + vec2 + vec4 + vec4 interleaved.
    assert_eq!(layout.attribute_stride, 12 + 8 + 16 + 16);

    // Bone buffer received two skinning matrices.
    let bone_bytes = backend.read_buffer(renderable.bone_buffer().unwrap());
    assert_eq!(bone_bytes.len(), 2 * 64);

    renderable.draw().unwrap();
    assert_eq!(backend.draw_call_count(), 1);
}

#[test]
fn raster_dialect_culls_out_of_view_elements() {
    let (backend, device) = setup(ShaderDialect::Glsl);
    let mut registry = Registry::new();
    let visible = DrawableElementAttributes::new(triangle(0.0)).with_static();
    let far_off = DrawableElementAttributes::new(triangle(0.0)).with_static();
    registry.append(
        "visible",
        device.create_renderable(&visible, DrawOpt::new()).unwrap(),
    );
    registry.append(
        "far_off",
        device
            .create_renderable(
                &far_off,
                DrawOpt::new().with_translation(Vec3::new(50.0, 0.0, 0.0)),
            )
            .unwrap(),
    );
    registry.draw();
    assert_eq!(backend.draw_call_count(), 1);
}
