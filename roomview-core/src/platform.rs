//! Host tracking platform integration
//!
//! The engine never talks to a device directly. A host implements
//! [`TrackingPlatform`] for session-level requests and hands an [`XrFrame`] to
//! [`ArSession::on_frame`](crate::ar::ArSession::on_frame) once per display frame.

use crate::error::PlatformError;
use crate::pose::Pose;
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional and required capabilities of a tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionFeature {
    /// Real-world hit-testing against the camera view
    HitTest,
    /// Persistent platform anchors
    Anchors,
    /// DOM/UI overlay on top of the camera view
    DomOverlay,
}

impl fmt::Display for SessionFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionFeature::HitTest => "hit-test",
            SessionFeature::Anchors => "anchors",
            SessionFeature::DomOverlay => "dom-overlay",
        };
        f.write_str(name)
    }
}

/// Parameters of a session request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    /// Features whose absence must fail the request
    pub required_features: Vec<SessionFeature>,
    /// Features the platform may silently decline
    pub optional_features: Vec<SessionFeature>,
}

/// Opaque token for an active tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// A granted session and the features the platform actually enabled
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGrant {
    /// Session token
    pub handle: SessionHandle,
    /// Enabled features, required and optional
    pub enabled_features: Vec<SessionFeature>,
}

impl SessionGrant {
    /// Whether a feature was enabled for this session
    pub fn has_feature(&self, feature: SessionFeature) -> bool {
        self.enabled_features.contains(&feature)
    }
}

/// Kinds of reference space the engine asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceKind {
    /// Stationary space near the session origin, used for all pose math
    Local,
    /// Space attached to the viewer, used only to aim hit-test rays
    Viewer,
}

/// A coordinate frame handed out by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceSpace {
    /// Platform identifier
    pub id: u64,
    /// What kind of space this is
    pub kind: ReferenceSpaceKind,
}

/// Real-world entity types a hit-test may be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTestEntityType {
    /// Detected planes
    Plane,
}

/// Ray relative to the hit-test space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction
    pub direction: Vec3,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        }
    }
}

/// Parameters for a hit-test source request
#[derive(Debug, Clone, PartialEq)]
pub struct HitTestOptions {
    /// Space the ray is expressed in
    pub space: ReferenceSpace,
    /// Entity-type filter; empty means unconstrained
    pub entity_types: Vec<HitTestEntityType>,
    /// Ray offset; `None` uses the platform default
    pub offset_ray: Option<Ray>,
}

/// Handle to a subscribed hit-test query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitTestSource {
    /// Platform identifier
    pub id: u64,
}

/// One surface intersection returned by a hit-test query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// Intersection pose in the requested space
    pub pose: Pose,
}

/// Handle to a platform-tracked anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorHandle(pub u64);

/// Pending anchor creation.
///
/// Resolved by polling; the engine never blocks on it.
pub type AnchorFuture = LocalBoxFuture<'static, Result<AnchorHandle, PlatformError>>;

/// Session-level platform requests.
///
/// All of these may suspend while the platform (or the user, for permission
/// prompts) responds.
#[async_trait(?Send)]
pub trait TrackingPlatform {
    /// Whether immersive AR is available at all
    async fn is_session_supported(&self) -> bool;

    /// Request a tracking session
    async fn request_session(&self, request: &SessionRequest) -> Result<SessionGrant, PlatformError>;

    /// Request a reference space of the given kind
    async fn request_reference_space(
        &self,
        session: &SessionHandle,
        kind: ReferenceSpaceKind,
    ) -> Result<ReferenceSpace, PlatformError>;

    /// Subscribe a hit-test query
    async fn request_hit_test_source(
        &self,
        session: &SessionHandle,
        options: &HitTestOptions,
    ) -> Result<HitTestSource, PlatformError>;

    /// End the session and release platform resources
    async fn end_session(&self, session: &SessionHandle) -> Result<(), PlatformError>;
}

/// Per-frame platform queries, valid only for the frame they were handed out for
pub trait XrFrame {
    /// Frame timestamp in milliseconds
    fn timestamp(&self) -> f64;

    /// Results of a hit-test source for this frame, nearest first
    fn hit_test_results(
        &self,
        source: &HitTestSource,
        space: &ReferenceSpace,
    ) -> Result<Vec<HitResult>, PlatformError>;

    /// Current pose of an anchor, or `None` while tracking is lost
    fn anchor_pose(&self, anchor: &AnchorHandle, space: &ReferenceSpace) -> Option<Pose>;

    /// Start creating an anchor at `pose`
    fn create_anchor(&self, pose: &Pose, space: &ReferenceSpace) -> AnchorFuture;
}
