//! Per-frame pose resolution for placed entities

use crate::ar::gesture_recognition::GestureAccumulator;
use crate::ar::spatial_anchor::{AnchorRegistry, TrackingHandle};
use crate::platform::{ReferenceSpace, XrFrame};
use crate::pose::gesture_overlay;
use crate::scene::SceneBackend;
use tracing::trace;

/// What happened to the registry during one pose update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoseUpdateSummary {
    /// Anchors whose pose was re-resolved
    pub resolved: usize,
    /// Anchors that kept their last-known pose this frame
    pub tracking_lost: usize,
    /// Entities with a static pose
    pub static_poses: usize,
}

/// Resolve every anchor against `space` and rewrite each node's world transform.
///
/// The tracked pose is written first, then the gesture overlay (uniform scale,
/// yaw about +Y) is applied to every entity alike. An anchor that fails to
/// resolve keeps its last-known pose; lost tracking is transient.
pub fn update_poses<S, F>(
    registry: &mut AnchorRegistry,
    frame: &F,
    space: &ReferenceSpace,
    gestures: &GestureAccumulator,
    scene: &mut S,
) -> PoseUpdateSummary
where
    S: SceneBackend,
    F: XrFrame + ?Sized,
{
    let overlay = gesture_overlay(gestures.target_scale(), gestures.yaw());
    let mut summary = PoseUpdateSummary::default();

    for entity in registry.list_mut() {
        match entity.tracking {
            TrackingHandle::Anchor(handle) => match frame.anchor_pose(&handle, space) {
                Some(pose) => {
                    entity.last_pose = pose;
                    summary.resolved += 1;
                }
                None => {
                    trace!(id = %entity.id, "anchor pose unavailable, keeping last pose");
                    summary.tracking_lost += 1;
                }
            },
            TrackingHandle::Static(_) => summary.static_poses += 1,
        }

        scene.set_world_transform(entity.node, entity.last_pose.matrix() * overlay);
    }

    summary
}
