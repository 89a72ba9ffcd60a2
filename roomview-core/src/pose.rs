//! Rigid transforms exchanged with the tracking platform

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transform (position + orientation) expressed in some reference space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in meters
    pub position: Vec3,
    /// Orientation
    pub orientation: Quat,
}

impl Pose {
    /// The identity pose
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a new pose
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Pose at a position with no rotation
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Recover a pose from a platform-provided column-major matrix.
    ///
    /// Any scale in the matrix is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (_, orientation, position) = matrix.to_scale_rotation_translation();
        Self { position, orientation }
    }

    /// The full rigid transform
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Translate this pose by `delta` in world space
    pub fn translated(&self, delta: Vec3) -> Self {
        Self::new(self.position + delta, self.orientation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Transform applied on top of a tracked pose: uniform scale then yaw about +Y
pub fn gesture_overlay(scale: f32, yaw: f32) -> Mat4 {
    Mat4::from_rotation_y(yaw) * Mat4::from_scale(Vec3::splat(scale))
}
