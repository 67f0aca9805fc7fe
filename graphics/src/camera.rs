//! View camera with a cached inverse view matrix.

use larkspur_core::math::{Angle, Axis, Mat4, Vec3};

/// A camera defined by a position and a single-axis rotation.
///
/// The inverse view matrix is computed analytically as
/// `R(-angle) * T(-position)`, so it exists for every camera state and is
/// refreshed only by setters that actually change something.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    angle: Angle,
    axis: Axis,
    inverse_view: Mat4,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec3::zeros(),
            angle: Angle::ZERO,
            axis: Axis::default(),
            inverse_view: Mat4::identity(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_rotation(mut self, angle: Angle, axis: Axis) -> Self {
        self.set_rotation(angle, axis);
        self
    }

    /// Move the camera. A no-op when the position is unchanged.
    pub fn set_position(&mut self, position: Vec3) {
        if self.position == position {
            return;
        }
        self.position = position;
        self.refresh();
    }

    /// Rotate the camera. A no-op when angle and axis are unchanged.
    pub fn set_rotation(&mut self, angle: Angle, axis: Axis) {
        if self.angle == angle && self.axis == axis {
            return;
        }
        self.angle = angle;
        self.axis = axis;
        self.refresh();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The cached inverse of the camera's world transform.
    pub fn inverse_view(&self) -> &Mat4 {
        &self.inverse_view
    }

    fn refresh(&mut self) {
        self.inverse_view =
            Mat4::rotation(-self.angle, self.axis).compose(&Mat4::translation(-self.position));
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_untouched() {
        let camera = Camera::new();
        assert_eq!(*camera.inverse_view(), Mat4::identity());
    }

    #[test]
    fn inverse_view_undoes_the_camera_transform() {
        let camera = Camera::new()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Angle::Degrees(40.0), Axis::Y);
        let view = Mat4::translation(camera.position())
            .compose(&Mat4::rotation(Angle::Degrees(40.0), Axis::Y));
        let product = view.compose(camera.inverse_view());
        for (got, want) in product.as_slice().iter().zip(Mat4::identity().as_slice()) {
            assert!((got - want).abs() < 1e-5);
        }
    }

    #[test]
    fn unchanged_setter_keeps_the_cache() {
        let mut camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 5.0));
        let before = *camera.inverse_view();
        camera.set_position(Vec3::new(0.0, 0.0, 5.0));
        camera.set_rotation(Angle::ZERO, Axis::default());
        assert_eq!(*camera.inverse_view(), before);
    }
}
