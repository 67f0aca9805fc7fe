//! Math type aliases and angle/axis value types.
//!
//! Vectors are nalgebra aliases (always f32 for rendering). Matrices live in
//! [`matrix`]: a flat row-major representation with a column-vector
//! convention (`v' = M * v`), chosen so layouts match the generated shader
//! code byte for byte.

pub mod matrix;

pub use matrix::{compose, invert, Mat4, MathError};

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// An angle carrying its unit.
///
/// Replaces the boolean "convert to radians" flag: callers state the unit at
/// the construction site and conversion happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Angle {
    /// Angle in degrees.
    Degrees(f32),
    /// Angle in radians.
    Radians(f32),
}

impl Angle {
    /// The zero angle.
    pub const ZERO: Angle = Angle::Radians(0.0);

    /// Value in radians.
    pub fn radians(self) -> f32 {
        match self {
            Angle::Degrees(d) => d.to_radians(),
            Angle::Radians(r) => r,
        }
    }

    /// Value in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            Angle::Degrees(d) => d,
            Angle::Radians(r) => r.to_degrees(),
        }
    }
}

impl std::ops::Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        match self {
            Angle::Degrees(d) => Angle::Degrees(-d),
            Angle::Radians(r) => Angle::Radians(-r),
        }
    }
}

/// A principal rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    /// Default axis for 2D-style rotations.
    Z,
}

impl Default for Axis {
    fn default() -> Self {
        Axis::Z
    }
}
