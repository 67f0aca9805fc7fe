//! Draw options and the transform resolver.
//!
//! A `DrawOpt` is an all-optional override bag: `set_attributes` merges a
//! partial one into the instance's current options, then the resolver turns
//! the merged state into a single world matrix.

use larkspur_core::math::{Angle, Axis, Mat4, Vec3};

use crate::camera::Camera;
use crate::skeleton::BonePose;

/// Scale shorthand: one factor for every axis or one per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Uniform(f32),
    PerAxis(Vec3),
}

impl Scale {
    fn matrix(&self) -> Mat4 {
        match self {
            Scale::Uniform(s) => Mat4::scaling_uniform(*s),
            Scale::PerAxis(s) => Mat4::scaling(*s),
        }
    }
}

/// Perspective projection parameters with a cached matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fov: Angle,
    aspect: f32,
    near: f32,
    far: f32,
    matrix: Mat4,
}

impl Projection {
    pub fn new() -> Self {
        let fov = Angle::Degrees(60.0);
        let (aspect, near, far) = (1.0, 0.1, 100.0);
        Self {
            fov,
            aspect,
            near,
            far,
            matrix: Mat4::perspective(fov, aspect, near, far),
        }
    }

    pub fn with_fov(mut self, fov: Angle) -> Self {
        self.set_fov(fov);
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.set_aspect(aspect);
        self
    }

    pub fn with_planes(mut self, near: f32, far: f32) -> Self {
        self.set_planes(near, far);
        self
    }

    /// Setters recompute the cached matrix only on an actual change.
    pub fn set_fov(&mut self, fov: Angle) {
        if self.fov != fov {
            self.fov = fov;
            self.refresh();
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if self.aspect != aspect {
            self.aspect = aspect;
            self.refresh();
        }
    }

    pub fn set_planes(&mut self, near: f32, far: f32) {
        if self.near != near || self.far != far {
            self.near = near;
            self.far = far;
            self.refresh();
        }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    fn refresh(&mut self) {
        self.matrix = Mat4::perspective(self.fov, self.aspect, self.near, self.far);
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-draw overrides. Every field is optional; merging a partial replaces
/// only the fields it carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawOpt {
    /// Explicit world matrix. When present it wins verbatim over every
    /// other transform field.
    pub transformation_matrix: Option<Mat4>,
    pub rotation_matrix: Option<Mat4>,
    pub angle: Option<Angle>,
    pub axis: Option<Axis>,
    pub translation_matrix: Option<Mat4>,
    pub translation: Option<Vec3>,
    pub scale_matrix: Option<Mat4>,
    pub scale: Option<Scale>,
    pub camera: Option<Camera>,
    pub projection: Option<Projection>,
    /// Sprite-sheet UV offset.
    pub animation_vector: Option<[f32; 2]>,
    pub bump_scale: Option<f32>,
    pub bones: Option<BonePose>,
}

impl DrawOpt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transformation_matrix(mut self, m: Mat4) -> Self {
        self.transformation_matrix = Some(m);
        self
    }

    pub fn with_rotation(mut self, angle: Angle, axis: Axis) -> Self {
        self.angle = Some(angle);
        self.axis = Some(axis);
        self
    }

    pub fn with_rotation_matrix(mut self, m: Mat4) -> Self {
        self.rotation_matrix = Some(m);
        self
    }

    pub fn with_translation(mut self, t: Vec3) -> Self {
        self.translation = Some(t);
        self
    }

    pub fn with_translation_matrix(mut self, m: Mat4) -> Self {
        self.translation_matrix = Some(m);
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_scale_matrix(mut self, m: Mat4) -> Self {
        self.scale_matrix = Some(m);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_animation_vector(mut self, offset: [f32; 2]) -> Self {
        self.animation_vector = Some(offset);
        self
    }

    pub fn with_bump_scale(mut self, scale: f32) -> Self {
        self.bump_scale = Some(scale);
        self
    }

    pub fn with_bones(mut self, pose: BonePose) -> Self {
        self.bones = Some(pose);
        self
    }

    /// Shallow merge: a `Some` field in `partial` replaces the current
    /// value, a `None` leaves it alone.
    pub fn merge(&mut self, partial: &DrawOpt) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(value) = &partial.$field {
                    self.$field = Some(value.clone());
                }
            };
        }
        take!(transformation_matrix);
        take!(rotation_matrix);
        take!(angle);
        take!(axis);
        take!(translation_matrix);
        take!(translation);
        take!(scale_matrix);
        take!(scale);
        take!(camera);
        take!(projection);
        take!(animation_vector);
        take!(bump_scale);
        take!(bones);
    }

    /// The effective translation, from whichever field carries one.
    pub fn effective_translation(&self) -> Vec3 {
        if let Some(m) = &self.transformation_matrix {
            return Vec3::new(m.as_slice()[3], m.as_slice()[7], m.as_slice()[11]);
        }
        if let Some(m) = &self.translation_matrix {
            return Vec3::new(m.as_slice()[3], m.as_slice()[7], m.as_slice()[11]);
        }
        self.translation.unwrap_or_else(Vec3::zeros)
    }
}

/// Resolve a `DrawOpt` into one world matrix.
///
/// An explicit `transformation_matrix` is returned verbatim, skipping every
/// other field. Otherwise the canonical order applies scale first, then
/// translation, then rotation, with an attached camera's inverse view
/// multiplied in last. Each stage prefers its explicit matrix field over
/// the shorthand. No options at all resolves to identity.
pub fn resolve_transform(opt: &DrawOpt) -> Mat4 {
    if let Some(m) = &opt.transformation_matrix {
        return *m;
    }

    let mut world = match (&opt.scale_matrix, &opt.scale) {
        (Some(m), _) => *m,
        (None, Some(scale)) => scale.matrix(),
        (None, None) => Mat4::identity(),
    };
    match (&opt.translation_matrix, &opt.translation) {
        (Some(m), _) => world = m.compose(&world),
        (None, Some(t)) => world = Mat4::translation(*t).compose(&world),
        (None, None) => {}
    }
    match (&opt.rotation_matrix, &opt.angle) {
        (Some(m), _) => world = m.compose(&world),
        (None, Some(angle)) => {
            let axis = opt.axis.unwrap_or_default();
            world = Mat4::rotation(*angle, axis).compose(&world);
        }
        (None, None) => {}
    }
    if let Some(camera) = &opt.camera {
        world = camera.inverse_view().compose(&world);
    }
    world
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Mat4, b: &Mat4) -> bool {
        a.as_slice()
            .iter()
            .zip(b.as_slice())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn empty_options_resolve_to_identity() {
        assert_eq!(resolve_transform(&DrawOpt::new()), Mat4::identity());
    }

    #[test]
    fn explicit_matrix_wins_verbatim() {
        let explicit = Mat4::from([
            2.0, 0.0, 0.0, 7.0, //
            0.0, 2.0, 0.0, 0.0, //
            0.0, 0.0, 2.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let opt = DrawOpt::new()
            .with_transformation_matrix(explicit)
            .with_rotation(Angle::Degrees(45.0), Axis::Z)
            .with_translation(Vec3::new(9.0, 9.0, 9.0));
        assert_eq!(resolve_transform(&opt), explicit);
    }

    #[test]
    fn canonical_order_is_rotation_of_translated_scale() {
        let opt = DrawOpt::new()
            .with_scale(Scale::Uniform(2.0))
            .with_translation(Vec3::new(1.0, 0.0, 0.0))
            .with_rotation(Angle::Degrees(90.0), Axis::Z);
        let expected = Mat4::rotation(Angle::Degrees(90.0), Axis::Z)
            .compose(&Mat4::translation(Vec3::new(1.0, 0.0, 0.0)))
            .compose(&Mat4::scaling_uniform(2.0));
        assert!(approx_eq(&resolve_transform(&opt), &expected));
    }

    #[test]
    fn explicit_stage_matrix_beats_shorthand() {
        let stage = Mat4::translation(Vec3::new(5.0, 0.0, 0.0));
        let opt = DrawOpt::new()
            .with_translation_matrix(stage)
            .with_translation(Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(resolve_transform(&opt), stage);
    }

    #[test]
    fn camera_left_multiplies() {
        let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 10.0));
        let opt = DrawOpt::new()
            .with_translation(Vec3::new(0.0, 0.0, 4.0))
            .with_camera(camera.clone());
        let expected = camera
            .inverse_view()
            .compose(&Mat4::translation(Vec3::new(0.0, 0.0, 4.0)));
        assert!(approx_eq(&resolve_transform(&opt), &expected));
    }

    #[test]
    fn merge_replaces_only_present_fields() {
        let mut current = DrawOpt::new()
            .with_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_bump_scale(0.5);
        let partial = DrawOpt::new().with_bump_scale(0.9);
        current.merge(&partial);
        assert_eq!(current.translation, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(current.bump_scale, Some(0.9));
    }

    #[test]
    fn merging_an_empty_partial_changes_nothing() {
        let mut current = DrawOpt::new().with_rotation(Angle::Degrees(10.0), Axis::Y);
        let before = current.clone();
        current.merge(&DrawOpt::new());
        assert_eq!(current, before);
    }

    #[test]
    fn projection_cache_refreshes_only_on_change() {
        let mut projection = Projection::new();
        let before = *projection.matrix();
        projection.set_aspect(1.0);
        assert_eq!(*projection.matrix(), before);
        projection.set_aspect(16.0 / 9.0);
        assert_ne!(*projection.matrix(), before);
    }
}
