//! Flat row-major matrix operations.
//!
//! Matrices are stored row-major as flat `f32` slices. The generalized
//! [`compose`] and [`invert`] functions work on any dimensions; [`Mat4`] is
//! the 4x4 case used everywhere in rendering, with transform and projection
//! constructors.
//!
//! Convention: column vectors (`v' = M * v`), +Z into the screen, 0..1 depth
//! after projection. GPU uploads go through [`Mat4::to_cols_array`] since
//! both GLSL and WGSL expect column-major matrix data.

use std::fmt;
use std::ops::Mul;

use super::{Angle, Axis, Vec3};

/// Errors from matrix operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// Operand dimensions do not line up.
    DimensionMismatch(String),
    /// Gauss-Jordan elimination hit a zero pivot: the matrix has no inverse.
    Singular,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch(msg) => write!(f, "dimension mismatch: {msg}"),
            Self::Singular => write!(f, "matrix is singular"),
        }
    }
}

impl std::error::Error for MathError {}

/// Generalized matrix product of flattened row-major matrices.
///
/// `a` has `a_cols` columns; `b` must have `a_cols` rows. The product has
/// `a.len() / a_cols` rows and `b.len() / a_cols` columns.
///
/// # Errors
///
/// [`MathError::DimensionMismatch`] when either flat length is not divisible
/// by the stated dimension, or `a_cols` is zero.
pub fn compose(a: &[f32], a_cols: usize, b: &[f32]) -> Result<Vec<f32>, MathError> {
    if a_cols == 0 || !a.len().is_multiple_of(a_cols) {
        return Err(MathError::DimensionMismatch(format!(
            "left operand of length {} is not a whole number of {}-column rows",
            a.len(),
            a_cols
        )));
    }
    if !b.len().is_multiple_of(a_cols) {
        return Err(MathError::DimensionMismatch(format!(
            "right operand of length {} does not have {} rows",
            b.len(),
            a_cols
        )));
    }

    let a_rows = a.len() / a_cols;
    let b_cols = b.len() / a_cols;
    let mut out = vec![0.0; a_rows * b_cols];
    for r in 0..a_rows {
        for c in 0..b_cols {
            let mut acc = 0.0;
            for k in 0..a_cols {
                acc += a[r * a_cols + k] * b[k * b_cols + c];
            }
            out[r * b_cols + c] = acc;
        }
    }
    Ok(out)
}

/// Invert a square row-major matrix via Gauss-Jordan elimination with
/// partial pivoting.
///
/// # Errors
///
/// [`MathError::DimensionMismatch`] when `m.len() != cols * cols`;
/// [`MathError::Singular`] when no usable pivot exists for some column.
pub fn invert(m: &[f32], cols: usize) -> Result<Vec<f32>, MathError> {
    if m.len() != cols * cols {
        return Err(MathError::DimensionMismatch(format!(
            "expected a {cols}x{cols} matrix, got {} elements",
            m.len()
        )));
    }

    let n = cols;
    // Augmented [M | I], eliminated in place.
    let width = 2 * n;
    let mut aug = vec![0.0f32; n * width];
    for r in 0..n {
        aug[r * width..r * width + n].copy_from_slice(&m[r * n..(r + 1) * n]);
        aug[r * width + n + r] = 1.0;
    }

    for col in 0..n {
        // Partial pivoting: largest magnitude at or below the diagonal.
        let mut pivot_row = col;
        let mut pivot_abs = aug[col * width + col].abs();
        for r in (col + 1)..n {
            let a = aug[r * width + col].abs();
            if a > pivot_abs {
                pivot_row = r;
                pivot_abs = a;
            }
        }
        if pivot_abs <= f32::EPSILON {
            return Err(MathError::Singular);
        }
        if pivot_row != col {
            for c in 0..width {
                aug.swap(col * width + c, pivot_row * width + c);
            }
        }

        let pivot = aug[col * width + col];
        for c in 0..width {
            aug[col * width + c] /= pivot;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r * width + col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..width {
                aug[r * width + c] -= factor * aug[col * width + c];
            }
        }
    }

    let mut out = vec![0.0; n * n];
    for r in 0..n {
        out[r * n..(r + 1) * n].copy_from_slice(&aug[r * width + n..(r + 1) * width]);
    }
    Ok(out)
}

/// 4x4 row-major matrix.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mat4(pub [f32; 16]);

impl Mat4 {
    /// The identity matrix. Always a fresh value, never shared state.
    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Mat4(m)
    }

    /// Rotation about a principal axis.
    pub fn rotation(angle: Angle, axis: Axis) -> Self {
        let rad = angle.radians();
        let (s, c) = rad.sin_cos();
        let mut m = Self::identity().0;
        match axis {
            Axis::X => {
                m[5] = c;
                m[6] = -s;
                m[9] = s;
                m[10] = c;
            }
            Axis::Y => {
                m[0] = c;
                m[2] = s;
                m[8] = -s;
                m[10] = c;
            }
            Axis::Z => {
                m[0] = c;
                m[1] = -s;
                m[4] = s;
                m[5] = c;
            }
        }
        Mat4(m)
    }

    /// Translation by `t`.
    pub fn translation(t: Vec3) -> Self {
        let mut m = Self::identity().0;
        m[3] = t.x;
        m[7] = t.y;
        m[11] = t.z;
        Mat4(m)
    }

    /// Per-axis scaling.
    pub fn scaling(s: Vec3) -> Self {
        let mut m = [0.0; 16];
        m[0] = s.x;
        m[5] = s.y;
        m[10] = s.z;
        m[15] = 1.0;
        Mat4(m)
    }

    /// Uniform scaling.
    pub fn scaling_uniform(s: f32) -> Self {
        Self::scaling(Vec3::new(s, s, s))
    }

    /// Left-handed perspective projection (+Z forward) with 0..1 depth.
    pub fn perspective(fov: Angle, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov.radians() / 2.0).tan();
        let range = far - near;
        let mut m = [0.0; 16];
        m[0] = f / aspect;
        m[5] = f;
        m[10] = far / range;
        m[11] = -near * far / range;
        m[14] = 1.0;
        Mat4(m)
    }

    /// Matrix product `self * other`.
    pub fn compose(&self, other: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &other.0;
        let mut out = [0.0; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = a[r * 4] * b[c]
                    + a[r * 4 + 1] * b[4 + c]
                    + a[r * 4 + 2] * b[8 + c]
                    + a[r * 4 + 3] * b[12 + c];
            }
        }
        Mat4(out)
    }

    /// Inverse via [`invert`].
    ///
    /// # Errors
    ///
    /// [`MathError::Singular`] when the matrix has no inverse.
    pub fn invert(&self) -> Result<Mat4, MathError> {
        let inv = invert(&self.0, 4)?;
        let mut m = [0.0; 16];
        m.copy_from_slice(&inv);
        Ok(Mat4(m))
    }

    /// Apply the affine part to a point (no perspective divide).
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.0;
        Vec3::new(
            m[0] * p.x + m[1] * p.y + m[2] * p.z + m[3],
            m[4] * p.x + m[5] * p.y + m[6] * p.z + m[7],
            m[8] * p.x + m[9] * p.y + m[10] * p.z + m[11],
        )
    }

    /// Flatten to column-major order for GPU upload.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let m = &self.0;
        [
            m[0], m[4], m[8], m[12], //
            m[1], m[5], m[9], m[13], //
            m[2], m[6], m[10], m[14], //
            m[3], m[7], m[11], m[15],
        ]
    }

    /// View as a flat row-major slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f32; 16]> for Mat4 {
    fn from(m: [f32; 16]) -> Self {
        Mat4(m)
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq(a: &Mat4, b: &Mat4, eps: f32) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn compose_rectangular() {
        // 2x3 * 3x2 = 2x2
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let p = compose(&a, 3, &b).unwrap();
        assert_eq!(p, vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn compose_dimension_mismatch() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 2.0];
        assert!(matches!(
            compose(&a, 2, &b),
            Err(MathError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn invert_singular_fails() {
        let m = [1.0, 2.0, 2.0, 4.0]; // rank 1
        assert_eq!(invert(&m, 2), Err(MathError::Singular));
    }

    #[test]
    fn invert_roundtrip_identity() {
        let m = Mat4::translation(Vec3::new(1.0, -2.0, 3.0))
            .compose(&Mat4::rotation(Angle::Degrees(33.0), Axis::Y))
            .compose(&Mat4::scaling(Vec3::new(2.0, 0.5, 4.0)));
        let inv = m.invert().unwrap();
        assert!(approx_eq(&m.compose(&inv), &Mat4::identity(), 1e-5));
        assert!(approx_eq(&inv.compose(&m), &Mat4::identity(), 1e-5));
    }

    #[test]
    fn invert_needs_pivoting() {
        // Zero on the first diagonal entry; only row swaps make this solvable.
        let m = [0.0, 1.0, 1.0, 0.0];
        let inv = invert(&m, 2).unwrap();
        assert_eq!(inv, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn rotation_z_quarter_turn() {
        let m = Mat4::rotation(Angle::Radians(FRAC_PI_2), Axis::Z);
        let p = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_accepts_degrees() {
        let deg = Mat4::rotation(Angle::Degrees(90.0), Axis::Z);
        let rad = Mat4::rotation(Angle::Radians(FRAC_PI_2), Axis::Z);
        assert!(approx_eq(&deg, &rad, 1e-6));
    }

    #[test]
    fn translation_moves_points() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_point(Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn perspective_depth_range() {
        let m = Mat4::perspective(Angle::Degrees(60.0), 1.0, 0.1, 100.0);
        // Project a point on the near plane and one on the far plane.
        let near = m.0[10] * 0.1 + m.0[11];
        let far = m.0[10] * 100.0 + m.0[11];
        assert!((near / 0.1).abs() < 1e-5); // depth 0 at near
        assert!((far / 100.0 - 1.0).abs() < 1e-5); // depth 1 at far
    }

    #[test]
    fn cols_array_transposes() {
        #[rustfmt::skip]
        let m = Mat4([
            1.0, 2.0, 3.0, 4.0,
            5.0, 6.0, 7.0, 8.0,
            9.0, 10.0, 11.0, 12.0,
            13.0, 14.0, 15.0, 16.0,
        ]);
        let cols = m.to_cols_array();
        assert_eq!(&cols[0..4], &[1.0, 5.0, 9.0, 13.0]);
        assert_eq!(&cols[12..16], &[4.0, 8.0, 12.0, 16.0]);
    }
}
