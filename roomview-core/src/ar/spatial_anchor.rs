//! Spatial anchoring for placed models

use crate::error::PlacementError;
use crate::platform::{AnchorFuture, AnchorHandle};
use crate::pose::Pose;
use crate::scene::{NodeId, SceneBackend};
use std::fmt;
use tracing::debug;

/// Identifier of a placed entity, unique for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// How a placed entity follows the real world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingHandle {
    /// Live platform anchor, re-resolved every frame
    Anchor(AnchorHandle),
    /// One-time pose used when anchors are unavailable; never re-resolved
    Static(Pose),
}

impl TrackingHandle {
    /// Whether the pose is re-resolved every frame
    pub fn is_trackable(&self) -> bool {
        matches!(self, TrackingHandle::Anchor(_))
    }
}

/// A model placed in the room
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEntity {
    /// Entity identifier
    pub id: EntityId,
    /// Anchor or static pose
    pub tracking: TrackingHandle,
    /// Scene node cloned from the template
    pub node: NodeId,
    /// Frame index at which the entity was committed
    pub created_at_frame: u64,
    /// Last successfully resolved pose
    pub last_pose: Pose,
}

/// Ordered set of placed entities; insertion order is placement order.
///
/// A node is attached to the scene iff its entity is registered here.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    entities: Vec<PlacedEntity>,
    next_id: u64,
}

impl AnchorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone `template`, bind the clone to `tracking`, attach it.
    ///
    /// The template itself is never touched. `pose` is the pose the entity is
    /// shown at until the first successful re-resolution.
    pub fn place<S: SceneBackend>(
        &mut self,
        scene: &mut S,
        template: &S::Template,
        tracking: TrackingHandle,
        pose: Pose,
        frame: u64,
    ) -> Result<&PlacedEntity, PlacementError> {
        if let TrackingHandle::Anchor(handle) = tracking {
            if self.contains_anchor(&handle) {
                return Err(PlacementError::DuplicateAnchor(handle.0));
            }
        }

        let node = scene.instantiate(template);
        scene.set_world_transform(node, pose.matrix());
        scene.attach(node);

        let id = EntityId(self.next_id);
        self.next_id += 1;
        debug!(%id, %node, trackable = tracking.is_trackable(), frame, "placed entity");

        self.entities.push(PlacedEntity {
            id,
            tracking,
            node,
            created_at_frame: frame,
            last_pose: pose,
        });
        Ok(&self.entities[self.entities.len() - 1])
    }

    /// Detach every node and empty the registry; returns how many were removed
    pub fn remove_all<S: SceneBackend>(&mut self, scene: &mut S) -> usize {
        let removed = self.entities.len();
        for entity in self.entities.drain(..) {
            scene.detach(entity.node);
        }
        removed
    }

    /// Entities in placement order
    pub fn list(&self) -> &[PlacedEntity] {
        &self.entities
    }

    pub(crate) fn list_mut(&mut self) -> &mut [PlacedEntity] {
        &mut self.entities
    }

    /// Number of placed entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is placed
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an anchor is already bound to an entity
    pub fn contains_anchor(&self, handle: &AnchorHandle) -> bool {
        self.entities
            .iter()
            .any(|e| e.tracking == TrackingHandle::Anchor(*handle))
    }
}

/// An anchor creation that has been started but not yet observed to complete
pub struct PendingPlacement {
    /// Session generation the request was issued in
    pub generation: u64,
    /// Hit pose the anchor was requested at
    pub pose: Pose,
    /// Frame index the request was issued in
    pub requested_at_frame: u64,
    /// Platform anchor creation
    pub future: AnchorFuture,
}

impl fmt::Debug for PendingPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPlacement")
            .field("generation", &self.generation)
            .field("pose", &self.pose)
            .field("requested_at_frame", &self.requested_at_frame)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingScene;
    use glam::Vec3;

    #[test]
    fn test_place_attaches_clone_and_keeps_order() {
        let mut scene = RecordingScene::new();
        let template = scene.load_template("chair");
        let mut registry = AnchorRegistry::new();

        let first = registry
            .place(&mut scene, &template, TrackingHandle::Anchor(AnchorHandle(7)), Pose::IDENTITY, 3)
            .unwrap()
            .id;
        let static_pose = Pose::from_position(Vec3::new(0.0, -1.0, -2.0));
        let second = registry
            .place(&mut scene, &template, TrackingHandle::Static(static_pose), static_pose, 4)
            .unwrap()
            .id;

        let ids: Vec<_> = registry.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(scene.attached_count(), 2);
        assert_eq!(registry.list()[0].created_at_frame, 3);
        assert!(!registry.list()[1].tracking.is_trackable());
    }

    #[test]
    fn test_duplicate_anchor_is_rejected() {
        let mut scene = RecordingScene::new();
        let template = scene.load_template("chair");
        let mut registry = AnchorRegistry::new();
        let tracking = TrackingHandle::Anchor(AnchorHandle(1));

        registry.place(&mut scene, &template, tracking, Pose::IDENTITY, 0).unwrap();
        let err = registry.place(&mut scene, &template, tracking, Pose::IDENTITY, 1).unwrap_err();

        assert_eq!(err, PlacementError::DuplicateAnchor(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(scene.attached_count(), 1);
    }

    #[test]
    fn test_remove_all_is_idempotent() {
        let mut scene = RecordingScene::new();
        let template = scene.load_template("chair");
        let mut registry = AnchorRegistry::new();
        registry
            .place(&mut scene, &template, TrackingHandle::Static(Pose::IDENTITY), Pose::IDENTITY, 0)
            .unwrap();

        assert_eq!(registry.remove_all(&mut scene), 1);
        assert_eq!(registry.remove_all(&mut scene), 0);
        assert!(registry.is_empty());
        assert_eq!(scene.attached_count(), 0);
    }
}
