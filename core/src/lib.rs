//! # Larkspur Core
//!
//! Shared foundation for the Larkspur engine crates:
//! - [`math`]: vector aliases, angles/axes, and the flat row-major matrix
//!   library (generalized compose, Gauss-Jordan inversion, transform and
//!   projection constructors).
//! - [`mesh`]: primitive topology used by index generation and pipelines.

pub mod math;
pub mod mesh;
