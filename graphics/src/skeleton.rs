//! Bone hierarchy resolution and skinning matrices.

use larkspur_core::math::{Angle, Axis, Mat4, MathError, Vec3};

use crate::error::RenderError;

/// A pose to apply: one angle and one translation per bone.
///
/// Empty vectors mean "rest": zero angles, zero translations. A non-empty
/// vector must match the bone count exactly; padding one stream from the
/// other's length is rejected as a shape error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonePose {
    pub angles: Vec<Angle>,
    pub translations: Vec<Vec3>,
}

impl BonePose {
    pub fn new(angles: Vec<Angle>, translations: Vec<Vec3>) -> Self {
        Self {
            angles,
            translations,
        }
    }

    /// The rest pose.
    pub fn rest() -> Self {
        Self::default()
    }

    fn angle(&self, bone: usize) -> Angle {
        self.angles.get(bone).copied().unwrap_or(Angle::ZERO)
    }

    fn translation(&self, bone: usize) -> Vec3 {
        self.translations.get(bone).copied().unwrap_or_else(Vec3::zeros)
    }
}

/// A bone hierarchy with bind-pose data for skinning.
///
/// The bone list order must be a topological order of the parent relation:
/// every non-root bone's parent appears earlier in the list. That makes a
/// single forward pass sufficient to resolve globals.
#[derive(Debug, Clone)]
pub struct Skeleton {
    bone_count: usize,
    root: usize,
    parent_index: Vec<usize>,
    axis: Axis,
    inverse_pose: Vec<Mat4>,
}

impl Skeleton {
    /// Validates the hierarchy shape up front. A malformed skeleton fails
    /// here, never silently at resolve time.
    pub fn new(
        bone_count: usize,
        root: usize,
        parent_index: Vec<usize>,
        axis: Axis,
    ) -> Result<Self, RenderError> {
        if bone_count == 0 {
            return Err(RenderError::Configuration(
                "a skeleton needs at least one bone".to_string(),
            ));
        }
        if parent_index.len() != bone_count {
            return Err(RenderError::Configuration(format!(
                "{} parent entries for {bone_count} bones",
                parent_index.len()
            )));
        }
        if root >= bone_count {
            return Err(RenderError::Configuration(format!(
                "root bone {root} out of range for {bone_count} bones"
            )));
        }
        for (bone, &parent) in parent_index.iter().enumerate() {
            if bone == root {
                continue;
            }
            if parent >= bone_count {
                return Err(RenderError::Configuration(format!(
                    "bone {bone} has out-of-range parent {parent}"
                )));
            }
            if parent >= bone {
                return Err(RenderError::Configuration(format!(
                    "bone {bone} appears before its parent {parent}; \
                     the bone list must be topologically ordered"
                )));
            }
        }
        Ok(Self {
            bone_count,
            root,
            parent_index,
            axis,
            inverse_pose: vec![Mat4::identity(); bone_count],
        })
    }

    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    /// Establish the bind pose: resolves globals once and stores their
    /// inverses. Skinning matrices are relative to this pose from here on.
    pub fn bind(&mut self, pose: &BonePose) -> Result<(), RenderError> {
        let globals = self.resolve(pose)?;
        self.inverse_pose = globals
            .iter()
            .map(Mat4::invert)
            .collect::<Result<Vec<_>, MathError>>()?;
        Ok(())
    }

    /// Resolve world transforms for every bone under the given pose.
    pub fn resolve(&self, pose: &BonePose) -> Result<Vec<Mat4>, RenderError> {
        self.check_pose(pose)?;
        let mut globals: Vec<Mat4> = Vec::with_capacity(self.bone_count);
        for bone in 0..self.bone_count {
            let local = Mat4::rotation(pose.angle(bone), self.axis)
                .compose(&Mat4::translation(pose.translation(bone)));
            let global = if bone == self.root {
                local
            } else {
                globals[self.parent_index[bone]].compose(&local)
            };
            globals.push(global);
        }
        Ok(globals)
    }

    /// Bind-pose-relative skinning matrices, flattened column-major for
    /// direct upload into the bone-matrix buffer.
    pub fn skinning_matrices(&self, pose: &BonePose) -> Result<Vec<f32>, RenderError> {
        let globals = self.resolve(pose)?;
        let mut out = Vec::with_capacity(self.bone_count * 16);
        for (global, inverse) in globals.iter().zip(&self.inverse_pose) {
            out.extend_from_slice(&global.compose(inverse).to_cols_array());
        }
        Ok(out)
    }

    fn check_pose(&self, pose: &BonePose) -> Result<(), RenderError> {
        if !pose.angles.is_empty() && pose.angles.len() != self.bone_count {
            return Err(RenderError::DataShape(format!(
                "{} pose angles for {} bones",
                pose.angles.len(),
                self.bone_count
            )));
        }
        if !pose.translations.is_empty() && pose.translations.len() != self.bone_count {
            return Err(RenderError::DataShape(format!(
                "{} pose translations for {} bones",
                pose.translations.len(),
                self.bone_count
            )));
        }
        Ok(())
    }
}
