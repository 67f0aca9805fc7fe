//! Rendering error types.

use std::fmt;

use larkspur_core::math::MathError;

/// Errors that can occur while building or driving renderables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A capability was requested without its prerequisite (for example a
    /// displacement map without texture coordinates).
    Configuration(String),
    /// Caller-supplied data has the wrong shape (mismatched lengths,
    /// empty vertex list, malformed bone descriptor).
    DataShape(String),
    /// A backend device, buffer, texture, or pipeline could not be created.
    ResourceAcquisition(String),
    /// A matrix inversion hit a singular matrix.
    SingularMatrix,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::DataShape(msg) => write!(f, "data shape error: {msg}"),
            Self::ResourceAcquisition(msg) => write!(f, "resource acquisition failed: {msg}"),
            Self::SingularMatrix => write!(f, "matrix is singular"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<MathError> for RenderError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Singular => Self::SingularMatrix,
            MathError::DimensionMismatch(msg) => Self::DataShape(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RenderError::Configuration("displacement map without texture".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: displacement map without texture"
        );
        assert_eq!(RenderError::SingularMatrix.to_string(), "matrix is singular");
    }

    #[test]
    fn math_error_conversion() {
        assert_eq!(
            RenderError::from(MathError::Singular),
            RenderError::SingularMatrix
        );
        assert!(matches!(
            RenderError::from(MathError::DimensionMismatch("bad".into())),
            RenderError::DataShape(_)
        ));
    }
}
