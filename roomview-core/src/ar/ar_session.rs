//! AR session coordination
//!
//! [`ArSession`] owns every piece of mutable session state and lends it to the
//! components for the duration of one call. The host drives it from a single
//! thread: `start` once, then `on_frame` once per display frame, with taps,
//! touches and resets interleaved between frames.

use crate::ar::capability::{CapabilityNegotiator, NegotiatedSession};
use crate::ar::gesture_recognition::{Gesture, GestureAccumulator, GestureRecognizer};
use crate::ar::placement::{PlacementMode, PlacementStateMachine};
use crate::ar::pose_updater::{update_poses, PoseUpdateSummary};
use crate::ar::spatial_anchor::{AnchorRegistry, PendingPlacement, TrackingHandle};
use crate::ar::status::StatusEvent;
use crate::config::ArConfig;
use crate::error::{AssetError, PlacementError, PlatformError, SessionError};
use crate::platform::{AnchorHandle, HitResult, TrackingPlatform, XrFrame};
use crate::pose::Pose;
use crate::scene::{AssetLoader, SceneBackend};
use futures::FutureExt;
use glam::Vec2;
use std::task::{Context, Poll};
use tracing::{debug, info, trace, warn};

/// AR session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started
    Uninitialized,
    /// Waiting on the platform during negotiation
    Negotiating,
    /// Session active, frames are processed
    Active,
    /// Negotiation failed; the interactive flow is disabled
    Failed,
    /// Session ended
    Ended,
}

/// Per-frame outcome, mostly for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame index, starting at 1 for the first processed frame
    pub frame: u64,
    /// Number of hit results this frame
    pub hits: usize,
    /// Whether a placement attempt started this frame
    pub placement_started: bool,
    /// Pose update counters
    pub poses: PoseUpdateSummary,
}

/// AR session coordinator
pub struct ArSession<S: SceneBackend> {
    /// Session state
    state: SessionState,
    /// Capability negotiation plan
    negotiator: CapabilityNegotiator,
    /// Negotiated handles, present while active
    session: Option<NegotiatedSession>,
    /// Searching/placed decision
    placement: PlacementStateMachine,
    /// Placed entities
    registry: AnchorRegistry,
    /// Touch interpretation
    recognizer: GestureRecognizer,
    /// Gesture state applied to every placed entity
    gestures: GestureAccumulator,
    /// Scene the placed nodes live in
    scene: S,
    /// Model to clone on placement
    template: Option<S::Template>,
    /// Anchor creations not yet observed to complete
    in_flight: Vec<PendingPlacement>,
    /// Nearest hit of the last frame while searching
    reticle: Option<Pose>,
    /// Processed frames since start
    frame_index: u64,
    /// Bumped on reset and teardown; stale continuations compare against it
    generation: u64,
    /// Status outbox
    events: Vec<StatusEvent>,
}

impl<S: SceneBackend> ArSession<S> {
    /// Create an idle session around a scene backend
    pub fn new(scene: S, config: &ArConfig) -> Self {
        Self {
            state: SessionState::Uninitialized,
            negotiator: CapabilityNegotiator::new(config),
            session: None,
            placement: PlacementStateMachine::new(),
            registry: AnchorRegistry::new(),
            recognizer: GestureRecognizer::new(&config.gesture),
            gestures: GestureAccumulator::new(),
            scene,
            template: None,
            in_flight: Vec::new(),
            reticle: None,
            frame_index: 0,
            generation: 0,
            events: Vec::new(),
        }
    }

    /// Negotiate the session with the platform.
    ///
    /// On failure the state becomes [`SessionState::Failed`] and the frame loop
    /// must not be entered; degraded capabilities are reported as events only.
    pub async fn start<P>(&mut self, platform: &P) -> Result<(), SessionError>
    where
        P: TrackingPlatform + ?Sized,
    {
        match self.state {
            SessionState::Uninitialized | SessionState::Failed | SessionState::Ended => {}
            // `start` holds `&mut self`, so this is an abandoned earlier negotiation
            SessionState::Negotiating => debug!("restarting abandoned negotiation"),
            SessionState::Active => return Err(SessionError::AlreadyStarted),
        }
        self.state = SessionState::Negotiating;

        match self.negotiator.negotiate(platform).await {
            Ok(session) => {
                for notice in &session.notices {
                    self.events.push(StatusEvent::CapabilityDegraded(*notice));
                }
                self.session = Some(session);
                self.state = SessionState::Active;
                self.frame_index = 0;
                self.events.push(StatusEvent::SessionStarted);
                self.announce_ready();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "AR session negotiation failed");
                self.state = SessionState::Failed;
                self.events.push(StatusEvent::SessionFailed(e.clone()));
                Err(e)
            }
        }
    }

    /// Load the model through `loader` and use it for future placements
    pub async fn load_template<L>(&mut self, loader: &L, asset: &str) -> Result<(), AssetError>
    where
        L: AssetLoader<Template = S::Template> + ?Sized,
    {
        match loader.load(asset).await {
            Ok(template) => {
                info!(asset, "model loaded");
                self.events.push(StatusEvent::ModelLoaded {
                    asset: asset.to_string(),
                });
                self.set_template(template);
                Ok(())
            }
            Err(e) => {
                warn!(asset, error = %e, "model failed to load");
                self.events.push(StatusEvent::ModelLoadFailed(e.clone()));
                Err(e)
            }
        }
    }

    /// Use an already-loaded template for future placements
    pub fn set_template(&mut self, template: S::Template) {
        let first = self.template.is_none();
        self.template = Some(template);
        if first {
            self.announce_ready();
        }
    }

    /// A tap: ask for a placement on the next frame with a hit.
    ///
    /// Returns `false` when the tap is ignored (session not active, or a model
    /// is already placed).
    pub fn request_placement(&mut self) -> bool {
        if self.state != SessionState::Active {
            debug!(state = ?self.state, "tap ignored, session not active");
            return false;
        }
        if !self.placement.request() {
            debug!("tap ignored, model already placed");
            return false;
        }
        if self.has_current_in_flight() {
            debug!("tap queued behind an in-flight anchor request");
        }
        true
    }

    /// Feed the currently active touch points
    pub fn on_touches(&mut self, touches: &[Vec2]) -> Option<Gesture> {
        let gesture = self.recognizer.sample(&mut self.gestures, touches);
        if let Some(gesture) = &gesture {
            trace!(?gesture, "gesture");
        }
        gesture
    }

    /// Process one display frame: anchor completions from earlier frames,
    /// hit-test, placement evaluation, pose update, in that order. A no-op
    /// unless the session is active.
    pub fn on_frame<F>(&mut self, frame: &F) -> FrameReport
    where
        F: XrFrame + ?Sized,
    {
        if self.state != SessionState::Active {
            return FrameReport::default();
        }
        let Some((source, space, anchors_enabled)) = self
            .session
            .as_ref()
            .map(|s| (s.hit_test_source, s.local_space, s.anchors_enabled()))
        else {
            return FrameReport::default();
        };
        self.frame_index += 1;

        // Anchor requests from earlier frames
        self.drive_in_flight();

        let hits = match source {
            Some(source) => match frame.hit_test_results(&source, &space) {
                Ok(hits) => hits,
                Err(e) => {
                    debug!(frame = self.frame_index, error = %e, "hit-test query failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.update_reticle(hits.first());

        let in_flight = self.has_current_in_flight();
        let chosen = self
            .placement
            .evaluate(&hits, self.template.is_some(), in_flight);
        let placement_started = chosen.is_some();
        if let Some(hit) = chosen {
            self.begin_placement(frame, hit, anchors_enabled);
        }

        let poses = update_poses(&mut self.registry, frame, &space, &self.gestures, &mut self.scene);

        FrameReport {
            frame: self.frame_index,
            hits: hits.len(),
            placement_started,
            poses,
        }
    }

    /// Remove every placed model and return to searching.
    ///
    /// Returns whether anything changed; resetting an empty session is a no-op.
    pub fn reset(&mut self) -> bool {
        let changed = !self.registry.is_empty()
            || self.placement.mode() != PlacementMode::Searching
            || self.placement.is_requested()
            || self.has_current_in_flight()
            || self.gestures != GestureAccumulator::new();
        if !changed {
            return false;
        }

        let removed = self.registry.remove_all(&mut self.scene);
        // Dropping a pending request withdraws it before the platform creates the anchor
        let discarded = self.in_flight.len();
        self.in_flight.clear();
        self.placement.reset();
        self.gestures.reset();
        self.generation += 1;
        info!(removed, discarded, generation = self.generation, "placement reset");

        self.events.push(StatusEvent::Reset);
        self.announce_ready();
        true
    }

    /// End the session and release it on the platform
    pub async fn end_session<P>(&mut self, platform: &P) -> Result<(), PlatformError>
    where
        P: TrackingPlatform + ?Sized,
    {
        let Some(session) = self.session.as_ref().map(|s| s.grant.handle) else {
            return Ok(());
        };
        self.on_session_ended();
        platform.end_session(&session).await
    }

    /// The platform ended the session (user exit, system interruption)
    pub fn on_session_ended(&mut self) {
        if self.session.take().is_none() {
            if self.state == SessionState::Negotiating {
                info!("AR session ended during negotiation");
                self.state = SessionState::Ended;
                self.events.push(StatusEvent::SessionEnded);
            }
            return;
        }
        let removed = self.registry.remove_all(&mut self.scene);
        let discarded = self.in_flight.len();
        self.in_flight.clear();
        self.placement.reset();
        self.gestures.reset();
        self.reticle = None;
        self.generation += 1;
        self.state = SessionState::Ended;
        info!(removed, discarded, "AR session ended");
        self.events.push(StatusEvent::SessionEnded);
    }

    /// Session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether negotiation failed and a non-tracked preview should be shown
    pub fn needs_fallback_preview(&self) -> bool {
        self.state == SessionState::Failed
    }

    /// Negotiated handles, while active
    pub fn negotiated(&self) -> Option<&NegotiatedSession> {
        self.session.as_ref()
    }

    /// Placement mode
    pub fn mode(&self) -> PlacementMode {
        self.placement.mode()
    }

    /// Whether a tap is waiting for a qualifying frame
    pub fn placement_pending(&self) -> bool {
        self.placement.is_requested()
    }

    /// Anchor creations started but not yet observed to complete
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Placed entities
    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    /// Gesture state
    pub fn gestures(&self) -> &GestureAccumulator {
        &self.gestures
    }

    /// Nearest surface hit of the last frame while searching
    pub fn reticle(&self) -> Option<Pose> {
        self.reticle
    }

    /// Number of frames processed since start
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Scene backend
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Scene backend, mutably (for the host's own nodes)
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Whether a template is loaded
    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    /// Take all status events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.events)
    }

    fn has_current_in_flight(&self) -> bool {
        self.in_flight.iter().any(|p| p.generation == self.generation)
    }

    fn announce_ready(&mut self) {
        let can_place = self.session.as_ref().is_some_and(|s| s.can_place());
        if self.state == SessionState::Active
            && can_place
            && self.template.is_some()
            && self.placement.mode() == PlacementMode::Searching
        {
            self.events.push(StatusEvent::ReadyToPlace);
        }
    }

    fn update_reticle(&mut self, nearest: Option<&HitResult>) {
        let next = match self.placement.mode() {
            PlacementMode::Searching => nearest.map(|hit| hit.pose),
            PlacementMode::Placed => None,
        };
        match (self.reticle.is_some(), next.is_some()) {
            (false, true) => self.events.push(StatusEvent::SurfaceFound),
            (true, false) if self.placement.mode() == PlacementMode::Searching => {
                self.events.push(StatusEvent::SurfaceLost)
            }
            _ => {}
        }
        self.reticle = next;
    }

    fn begin_placement<F>(&mut self, frame: &F, hit: HitResult, anchors_enabled: bool)
    where
        F: XrFrame + ?Sized,
    {
        let Some(space) = self.session.as_ref().map(|s| s.local_space) else {
            return;
        };

        if anchors_enabled {
            debug!(frame = self.frame_index, "requesting anchor");
            let mut pending = PendingPlacement {
                generation: self.generation,
                pose: hit.pose,
                requested_at_frame: self.frame_index,
                future: frame.create_anchor(&hit.pose, &space),
            };
            // Futures are lazy; poll once so the platform request starts now
            match Self::poll_anchor(&mut pending) {
                Poll::Ready(result) => self.complete_placement(pending.generation, pending.pose, result),
                Poll::Pending => {
                    self.events.push(StatusEvent::Anchoring);
                    self.in_flight.push(pending);
                }
            }
        } else {
            let pose = Pose::from_matrix(&hit.pose.matrix());
            self.commit_placement(TrackingHandle::Static(pose), pose);
        }
    }

    fn poll_anchor(pending: &mut PendingPlacement) -> Poll<Result<AnchorHandle, PlatformError>> {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        pending.future.poll_unpin(&mut cx)
    }

    fn drive_in_flight(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        let mut still_pending = Vec::with_capacity(self.in_flight.len());
        for mut pending in std::mem::take(&mut self.in_flight) {
            match Self::poll_anchor(&mut pending) {
                Poll::Ready(result) => {
                    trace!(
                        waited = self.frame_index - pending.requested_at_frame,
                        "anchor request resolved"
                    );
                    self.complete_placement(pending.generation, pending.pose, result);
                }
                Poll::Pending => still_pending.push(pending),
            }
        }
        self.in_flight = still_pending;
    }

    fn complete_placement(
        &mut self,
        generation: u64,
        pose: Pose,
        result: Result<AnchorHandle, PlatformError>,
    ) {
        // The world may have been reset since the request was issued
        if generation != self.generation || self.placement.mode() != PlacementMode::Searching {
            debug!(generation, current = self.generation, "discarding stale anchor result");
            if let Ok(anchor) = result {
                debug!(anchor = anchor.0, "stale anchor left to the platform");
            }
            return;
        }
        match result {
            Ok(anchor) => self.commit_placement(TrackingHandle::Anchor(anchor), pose),
            Err(e) => {
                warn!(error = %e, "anchor creation failed");
                self.events
                    .push(StatusEvent::PlacementFailed(PlacementError::AnchorRejected(e)));
            }
        }
    }

    fn commit_placement(&mut self, tracking: TrackingHandle, pose: Pose) {
        let Some(template) = self.template.as_ref() else {
            self.events.push(StatusEvent::PlacementFailed(PlacementError::NoTemplate));
            return;
        };
        match self
            .registry
            .place(&mut self.scene, template, tracking, pose, self.frame_index)
        {
            Ok(entity) => {
                let event = StatusEvent::ModelPlaced {
                    entity: entity.id,
                    tracked: entity.tracking.is_trackable(),
                };
                info!(entity = %entity.id, tracked = entity.tracking.is_trackable(), "model placed");
                self.placement.confirm_placed();
                self.reticle = None;
                self.events.push(event);
                if self.placement.cancel_request() {
                    debug!("tap made during anchor creation superseded by placement");
                }
            }
            Err(e) => {
                warn!(error = %e, "placement rejected by registry");
                self.events.push(StatusEvent::PlacementFailed(e));
            }
        }
    }
}
