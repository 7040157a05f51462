use glam::{Quat, Vec3};
use rapier3d::na::Isometry3;
use serde::{Deserialize, Serialize};

use crate::util::{decompose_isometry, isometry_from_parts};

/// A position and orientation in world space.
///
/// Hands carry the pose reported by their input device; interactable poses are always read back
/// from the physics simulation.
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct Pose {
    /// The translation of the entity
    pub translation: Vec3,
    /// The rotation of the entity
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    /// Create a pose from its parts
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// An unrotated pose at `translation`
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a pose from a [`rapier3d::na::Isometry3`]
    pub fn from_isometry(isometry: &Isometry3<f32>) -> Self {
        let (rotation, translation) = decompose_isometry(isometry);
        Self {
            translation,
            rotation,
        }
    }

    /// Convenience function to convert the `Pose` into a `nalgebra::Isometry3`
    pub fn position(&self) -> Isometry3<f32> {
        isometry_from_parts(self.translation, self.rotation)
    }

    /// Move a point from this pose's local space into world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * point
    }

    /// Move a point from world space into this pose's local space
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation)
    }

    /// Compose two poses: `other` is expressed in this pose's local space
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            translation: self.transform_point(other.translation),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Are all the components of this pose finite?
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}
