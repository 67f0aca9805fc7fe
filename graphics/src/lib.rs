//! Larkspur rendering: shader synthesis, binding, and GPU backends.
//!
//! The flow is descriptor to program to resources: a
//! [`DrawableElementAttributes`] describes an element, [`RenderDevice`]
//! builds a shader program from its capabilities and allocates exactly what
//! the program's layout calls for, and a [`Registry`] owns the resulting
//! [`Renderable`]s and resolves per-frame draw order.

pub mod attributes;
pub mod backend;
mod binding;
pub mod camera;
pub mod device;
pub mod error;
pub mod registry;
pub mod renderable;
pub mod shader;
pub mod skeleton;
pub mod transform;
pub mod types;

pub use attributes::{BoneAttributes, DrawableElementAttributes, ImageAttributes, TextureData};
pub use camera::Camera;
pub use device::RenderDevice;
pub use error::RenderError;
pub use registry::Registry;
pub use renderable::Renderable;
pub use shader::{ProgramBuilder, ProgramLayout, ShaderDialect, ShaderProgram, UniformKind};
pub use skeleton::{BonePose, Skeleton};
pub use transform::{resolve_transform, DrawOpt, Projection, Scale};

use static_assertions::assert_impl_all;

assert_impl_all!(DrawableElementAttributes: Send, Sync, Clone);
assert_impl_all!(ShaderProgram: Send, Sync, Clone);
assert_impl_all!(DrawOpt: Send, Sync, Clone);
assert_impl_all!(RenderError: Send, Sync, std::error::Error);
