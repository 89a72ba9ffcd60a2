//! AR placement and tracking
//!
//! This module negotiates the tracking session, decides when a tap places the
//! model, keeps placed models locked to their anchors, and maps two-finger
//! gestures onto the placed group.

pub mod ar_session;
pub mod capability;
pub mod gesture_recognition;
pub mod placement;
pub mod pose_updater;
pub mod spatial_anchor;
pub mod status;

pub use ar_session::{ArSession, FrameReport, SessionState};
pub use capability::{CapabilityNegotiator, CapabilityNotice, HitTestTier, NegotiatedSession};
pub use gesture_recognition::{Gesture, GestureAccumulator, GestureRecognizer};
pub use placement::{PlacementMode, PlacementStateMachine};
pub use pose_updater::{update_poses, PoseUpdateSummary};
pub use spatial_anchor::{AnchorRegistry, EntityId, PendingPlacement, PlacedEntity, TrackingHandle};
pub use status::StatusEvent;
