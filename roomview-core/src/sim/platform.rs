//! Scripted tracking platform

use crate::error::PlatformError;
use crate::platform::{
    AnchorFuture, AnchorHandle, HitResult, HitTestOptions, HitTestSource, ReferenceSpace,
    ReferenceSpaceKind, SessionFeature, SessionGrant, SessionHandle, SessionRequest,
    TrackingPlatform, XrFrame,
};
use crate::pose::Pose;
use async_trait::async_trait;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// What the simulated device supports and how it misbehaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    /// Immersive AR available at all
    #[serde(default = "default_true")]
    pub supported: bool,

    /// The user denies the camera permission prompt
    #[serde(default)]
    pub permission_denied: bool,

    /// Grant the optional `anchors` feature
    #[serde(default = "default_true")]
    pub grant_anchors: bool,

    /// Grant the optional `dom-overlay` feature
    #[serde(default = "default_true")]
    pub grant_dom_overlay: bool,

    /// Hand out a `local` reference space
    #[serde(default = "default_true")]
    pub local_space: bool,

    /// Hand out a `viewer` reference space
    #[serde(default = "default_true")]
    pub viewer_space: bool,

    /// Accept entity-type filters and offset rays on hit-test requests
    #[serde(default = "default_true")]
    pub plane_hit_test: bool,

    /// Accept hit-test requests at all
    #[serde(default = "default_true")]
    pub hit_test: bool,

    /// Frames an anchor request stays pending after the frame that issued it
    #[serde(default = "default_anchor_latency")]
    pub anchor_latency_frames: u32,

    /// Reject every anchor request
    #[serde(default)]
    pub fail_anchor_creation: bool,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            supported: true,
            permission_denied: false,
            grant_anchors: true,
            grant_dom_overlay: true,
            local_space: true,
            viewer_space: true,
            plane_hit_test: true,
            hit_test: true,
            anchor_latency_frames: default_anchor_latency(),
            fail_anchor_creation: false,
        }
    }
}

fn default_true() -> bool { true }
fn default_anchor_latency() -> u32 { 1 }

#[derive(Debug, Default)]
struct SimWorld {
    next_id: u64,
    session: Option<SessionHandle>,
    anchors: HashMap<AnchorHandle, Pose>,
    drift: Vec3,
    tracking_lost: bool,
    hit_test_requests: Vec<HitTestOptions>,
}

impl SimWorld {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_anchor(&mut self, pose: Pose) -> AnchorHandle {
        let handle = AnchorHandle(self.next_id());
        self.anchors.insert(handle, pose);
        handle
    }
}

/// A tracking platform driven entirely by its [`SimulationProfile`] and by
/// test code moving the simulated world
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    profile: SimulationProfile,
    world: Rc<RefCell<SimWorld>>,
}

impl SimulatedPlatform {
    /// Create a platform behaving as `profile` describes
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            world: Rc::new(RefCell::new(SimWorld::default())),
        }
    }

    /// An empty frame; add hits with the builder methods
    pub fn frame(&self, timestamp: f64) -> SimFrame {
        SimFrame {
            world: Rc::clone(&self.world),
            profile: self.profile.clone(),
            timestamp,
            hits: Ok(Vec::new()),
        }
    }

    /// Offset every anchor pose by `drift`, as a tracking correction would
    pub fn set_drift(&self, drift: Vec3) {
        self.world.borrow_mut().drift = drift;
    }

    /// Make every anchor pose unresolvable until cleared
    pub fn set_tracking_lost(&self, lost: bool) {
        self.world.borrow_mut().tracking_lost = lost;
    }

    /// Register an anchor directly, bypassing the asynchronous request
    pub fn spawn_anchor(&self, pose: Pose) -> AnchorHandle {
        self.world.borrow_mut().add_anchor(pose)
    }

    /// Number of anchors the platform has created
    pub fn anchor_count(&self) -> usize {
        self.world.borrow().anchors.len()
    }

    /// Every hit-test source request received, in order
    pub fn hit_test_requests(&self) -> Vec<HitTestOptions> {
        self.world.borrow().hit_test_requests.clone()
    }

    /// Whether a session is currently granted
    pub fn session_active(&self) -> bool {
        self.world.borrow().session.is_some()
    }

    fn grants(&self, feature: SessionFeature) -> bool {
        match feature {
            SessionFeature::HitTest => true,
            SessionFeature::Anchors => self.profile.grant_anchors,
            SessionFeature::DomOverlay => self.profile.grant_dom_overlay,
        }
    }
}

#[async_trait(?Send)]
impl TrackingPlatform for SimulatedPlatform {
    async fn is_session_supported(&self) -> bool {
        self.profile.supported
    }

    async fn request_session(&self, request: &SessionRequest) -> Result<SessionGrant, PlatformError> {
        if !self.profile.supported {
            return Err(PlatformError::NotSupported("immersive-ar".to_string()));
        }
        if self.profile.permission_denied {
            return Err(PlatformError::PermissionDenied("camera".to_string()));
        }
        if let Some(missing) = request.required_features.iter().find(|f| !self.grants(**f)) {
            return Err(PlatformError::NotSupported(missing.to_string()));
        }

        let enabled_features = request
            .required_features
            .iter()
            .chain(request.optional_features.iter())
            .copied()
            .filter(|f| self.grants(*f))
            .collect();

        let mut world = self.world.borrow_mut();
        let handle = SessionHandle(world.next_id());
        world.session = Some(handle);
        Ok(SessionGrant {
            handle,
            enabled_features,
        })
    }

    async fn request_reference_space(
        &self,
        session: &SessionHandle,
        kind: ReferenceSpaceKind,
    ) -> Result<ReferenceSpace, PlatformError> {
        let mut world = self.world.borrow_mut();
        if world.session != Some(*session) {
            return Err(PlatformError::SessionEnded);
        }
        let granted = match kind {
            ReferenceSpaceKind::Local => self.profile.local_space,
            ReferenceSpaceKind::Viewer => self.profile.viewer_space,
        };
        if !granted {
            return Err(PlatformError::NotSupported(format!("{kind:?} reference space")));
        }
        Ok(ReferenceSpace {
            id: world.next_id(),
            kind,
        })
    }

    async fn request_hit_test_source(
        &self,
        session: &SessionHandle,
        options: &HitTestOptions,
    ) -> Result<HitTestSource, PlatformError> {
        let mut world = self.world.borrow_mut();
        world.hit_test_requests.push(options.clone());
        if world.session != Some(*session) {
            return Err(PlatformError::SessionEnded);
        }
        if !self.profile.hit_test {
            return Err(PlatformError::NotSupported("hit-test".to_string()));
        }
        let constrained = !options.entity_types.is_empty() || options.offset_ray.is_some();
        if constrained && !self.profile.plane_hit_test {
            return Err(PlatformError::NotSupported("entityTypes/offsetRay".to_string()));
        }
        Ok(HitTestSource { id: world.next_id() })
    }

    async fn end_session(&self, session: &SessionHandle) -> Result<(), PlatformError> {
        let mut world = self.world.borrow_mut();
        if world.session != Some(*session) {
            return Err(PlatformError::SessionEnded);
        }
        world.session = None;
        world.anchors.clear();
        Ok(())
    }
}

/// One simulated display frame
#[derive(Debug)]
pub struct SimFrame {
    world: Rc<RefCell<SimWorld>>,
    profile: SimulationProfile,
    timestamp: f64,
    hits: Result<Vec<HitResult>, PlatformError>,
}

impl SimFrame {
    /// Add a hit at `pose`; hits are returned in insertion order
    pub fn with_hit(mut self, pose: Pose) -> Self {
        if let Ok(hits) = &mut self.hits {
            hits.push(HitResult { pose });
        }
        self
    }

    /// Make this frame's hit-test query fail
    pub fn with_hit_failure(mut self) -> Self {
        self.hits = Err(PlatformError::ApiError("hit-test query failed".to_string()));
        self
    }
}

impl XrFrame for SimFrame {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn hit_test_results(
        &self,
        _source: &HitTestSource,
        _space: &ReferenceSpace,
    ) -> Result<Vec<HitResult>, PlatformError> {
        self.hits.clone()
    }

    fn anchor_pose(&self, anchor: &AnchorHandle, _space: &ReferenceSpace) -> Option<Pose> {
        let world = self.world.borrow();
        if world.tracking_lost {
            return None;
        }
        world.anchors.get(anchor).map(|pose| pose.translated(world.drift))
    }

    fn create_anchor(&self, pose: &Pose, _space: &ReferenceSpace) -> AnchorFuture {
        Box::pin(AnchorRequest {
            world: Rc::clone(&self.world),
            pose: *pose,
            polls_left: self.profile.anchor_latency_frames,
            fail: self.profile.fail_anchor_creation,
        })
    }
}

/// Resolves after a fixed number of polls; the engine polls once per frame
struct AnchorRequest {
    world: Rc<RefCell<SimWorld>>,
    pose: Pose,
    polls_left: u32,
    fail: bool,
}

impl Future for AnchorRequest {
    type Output = Result<AnchorHandle, PlatformError>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Poll::Pending;
        }
        if self.fail {
            return Poll::Ready(Err(PlatformError::Rejected("anchor creation failed".to_string())));
        }
        let pose = self.pose;
        Poll::Ready(Ok(self.world.borrow_mut().add_anchor(pose)))
    }
}
