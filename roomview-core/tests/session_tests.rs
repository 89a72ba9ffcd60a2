/// Tests for session negotiation, teardown and tracking
use async_trait::async_trait;
use futures::FutureExt;
use glam::{Vec2, Vec3};
use roomview_core::ar::{CapabilityNotice, HitTestTier, SessionState};
use roomview_core::platform::{
    HitTestOptions, HitTestSource, ReferenceSpace, ReferenceSpaceKind, SessionGrant, SessionHandle,
    SessionRequest, TrackingPlatform,
};
use roomview_core::PlatformError;
use roomview_core::pose::gesture_overlay;
use roomview_core::sim::{RecordingScene, SimulatedPlatform, SimulationProfile};
use roomview_core::{ArConfig, ArSession, SessionError, StatusEvent};

mod test_helpers;
use test_helpers::*;

/// A platform that never answers the support query
struct StalledPlatform;

#[async_trait(?Send)]
impl TrackingPlatform for StalledPlatform {
    async fn is_session_supported(&self) -> bool {
        futures::future::pending().await
    }

    async fn request_session(&self, _request: &SessionRequest) -> Result<SessionGrant, PlatformError> {
        Err(PlatformError::SessionEnded)
    }

    async fn request_reference_space(
        &self,
        _session: &SessionHandle,
        _kind: ReferenceSpaceKind,
    ) -> Result<ReferenceSpace, PlatformError> {
        Err(PlatformError::SessionEnded)
    }

    async fn request_hit_test_source(
        &self,
        _session: &SessionHandle,
        _options: &HitTestOptions,
    ) -> Result<HitTestSource, PlatformError> {
        Err(PlatformError::SessionEnded)
    }

    async fn end_session(&self, _session: &SessionHandle) -> Result<(), PlatformError> {
        Ok(())
    }
}

fn new_session() -> ArSession<RecordingScene> {
    let mut session = ArSession::new(RecordingScene::new(), &ArConfig::default());
    let template = session.scene().load_template("lamp.glb");
    session.set_template(template);
    session
}

#[test]
fn test_start_announces_readiness() {
    let platform = SimulatedPlatform::new(SimulationProfile::default());
    let mut session = new_session();

    tokio_test::block_on(session.start(&platform)).unwrap();

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(
        session.drain_events(),
        vec![StatusEvent::SessionStarted, StatusEvent::ReadyToPlace]
    );
    assert!(matches!(
        session.negotiated().unwrap().hit_test_tier,
        Some(HitTestTier::PlaneConstrained { .. })
    ));
}

#[test]
fn test_unsupported_device_requests_fallback_preview() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        supported: false,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    let err = tokio_test::block_on(session.start(&platform)).unwrap_err();

    assert_eq!(err, SessionError::Unsupported);
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.needs_fallback_preview());
    assert_eq!(
        session.drain_events(),
        vec![StatusEvent::SessionFailed(SessionError::Unsupported)]
    );
}

#[test]
fn test_denied_permission_disables_frame_loop() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        permission_denied: true,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    let err = tokio_test::block_on(session.start(&platform)).unwrap_err();
    assert!(matches!(err, SessionError::Rejected(_)));
    assert!(session.needs_fallback_preview());

    assert!(!session.request_placement());
    let report = session.on_frame(&floor_frame(&platform, 0.0));
    assert_eq!(report.frame, 0);
    assert_eq!(session.frame_index(), 0);
    assert!(session.registry().is_empty());
}

#[test]
fn test_missing_local_space_is_fatal() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        local_space: false,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    let err = tokio_test::block_on(session.start(&platform)).unwrap_err();

    assert!(matches!(err, SessionError::ReferenceSpace(_)));
    assert!(session.needs_fallback_preview());
}

#[test]
fn test_missing_local_space_releases_platform_session() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        local_space: false,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    assert!(tokio_test::block_on(session.start(&platform)).is_err());

    assert!(!platform.session_active());
    assert!(session.negotiated().is_none());
}

#[test]
fn test_no_hit_test_degrades_without_error() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        plane_hit_test: false,
        hit_test: false,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    tokio_test::block_on(session.start(&platform)).unwrap();

    assert_eq!(session.state(), SessionState::Active);
    let events = session.drain_events();
    assert!(events.contains(&StatusEvent::CapabilityDegraded(CapabilityNotice::HitTestUnavailable)));
    assert!(!events.contains(&StatusEvent::ReadyToPlace));

    session.request_placement();
    let report = session.on_frame(&floor_frame(&platform, 0.0));
    assert_eq!(report.hits, 0);
    assert!(session.registry().is_empty());
}

#[test]
fn test_missing_viewer_space_disables_hit_testing() {
    let platform = SimulatedPlatform::new(SimulationProfile {
        viewer_space: false,
        ..SimulationProfile::default()
    });
    let mut session = new_session();

    tokio_test::block_on(session.start(&platform)).unwrap();

    let negotiated = session.negotiated().unwrap();
    assert!(negotiated.viewer_space.is_none());
    assert!(negotiated.hit_test_source.is_none());
    assert!(platform.hit_test_requests().is_empty());
}

#[test]
fn test_start_twice_is_rejected() {
    let (platform, mut session) = started_session(SimulationProfile::default());

    let err = tokio_test::block_on(session.start(&platform)).unwrap_err();

    assert_eq!(err, SessionError::AlreadyStarted);
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_abandoned_negotiation_can_be_ended_and_restarted() {
    let mut session = new_session();

    assert!(session.start(&StalledPlatform).now_or_never().is_none());
    assert_eq!(session.state(), SessionState::Negotiating);

    session.on_session_ended();
    assert_eq!(session.state(), SessionState::Ended);
    assert_eq!(session.drain_events(), vec![StatusEvent::SessionEnded]);

    let platform = SimulatedPlatform::new(SimulationProfile::default());
    tokio_test::block_on(session.start(&platform)).unwrap();
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_abandoned_negotiation_does_not_block_restart() {
    let mut session = new_session();
    assert!(session.start(&StalledPlatform).now_or_never().is_none());

    let platform = SimulatedPlatform::new(SimulationProfile::default());
    tokio_test::block_on(session.start(&platform)).unwrap();

    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_end_session_tears_everything_down() {
    let (platform, mut session) = started_session(SimulationProfile::default());
    session.request_placement();
    run_frames(&mut session, &platform, 3, true);
    assert_eq!(session.registry().len(), 1);
    session.drain_events();

    tokio_test::block_on(session.end_session(&platform)).unwrap();

    assert_eq!(session.state(), SessionState::Ended);
    assert!(!platform.session_active());
    assert!(session.registry().is_empty());
    assert_eq!(session.scene().attached_count(), 0);
    assert_eq!(session.drain_events(), vec![StatusEvent::SessionEnded]);

    let frames = session.frame_index();
    session.on_frame(&floor_frame(&platform, 100.0));
    assert_eq!(session.frame_index(), frames);

    // Ending twice is a no-op
    tokio_test::block_on(session.end_session(&platform)).unwrap();
    assert!(session.drain_events().is_empty());
}

#[test]
fn test_platform_ending_session_discards_pending_anchor() {
    let (platform, mut session) = started_session(SimulationProfile {
        anchor_latency_frames: 5,
        ..SimulationProfile::default()
    });
    session.request_placement();
    session.on_frame(&floor_frame(&platform, 0.0));
    assert_eq!(session.in_flight_count(), 1);

    session.on_session_ended();

    assert_eq!(session.in_flight_count(), 0);
    assert!(!session.placement_pending());
    assert_eq!(session.state(), SessionState::Ended);
}

#[test]
fn test_session_can_restart_after_ending() {
    let (platform, mut session) = started_session(SimulationProfile::default());
    tokio_test::block_on(session.end_session(&platform)).unwrap();

    tokio_test::block_on(session.start(&platform)).unwrap();

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.frame_index(), 0);
}

#[test]
fn test_placed_model_follows_anchor_drift() {
    let (platform, mut session) = started_session(SimulationProfile::default());
    session.request_placement();
    run_frames(&mut session, &platform, 2, true);
    let node = session.registry().list()[0].node;

    platform.set_drift(Vec3::new(0.0, 0.02, 0.1));
    session.on_frame(&platform.frame(48.0));

    let transform = session.scene().node(node).unwrap().world_transform;
    let expected = floor_pose().translated(Vec3::new(0.0, 0.02, 0.1)).matrix();
    assert!(transform.abs_diff_eq(expected, 1e-6));
}

#[test]
fn test_tracking_loss_holds_last_pose() {
    let (platform, mut session) = started_session(SimulationProfile::default());
    session.request_placement();
    run_frames(&mut session, &platform, 3, true);
    let node = session.registry().list()[0].node;
    let before = session.scene().node(node).unwrap().world_transform;

    platform.set_tracking_lost(true);
    let report = session.on_frame(&platform.frame(64.0));

    assert_eq!(report.poses.tracking_lost, 1);
    assert_eq!(session.scene().node(node).unwrap().world_transform, before);
    assert_eq!(session.scene().attached_count(), 1);

    platform.set_tracking_lost(false);
    let report = session.on_frame(&platform.frame(80.0));
    assert_eq!(report.poses.resolved, 1);
}

#[test]
fn test_pinch_and_twist_transform_placed_model() {
    let (platform, mut session) = started_session(SimulationProfile::default());
    session.request_placement();
    run_frames(&mut session, &platform, 2, true);
    let node = session.registry().list()[0].node;

    session.on_touches(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]);
    session.on_touches(&[Vec2::new(0.0, 0.0), Vec2::new(150.0, 50.0)]);
    session.on_frame(&platform.frame(48.0));

    let gestures = session.gestures();
    assert!(gestures.is_active());
    assert!(gestures.yaw() > 0.0);
    let expected = floor_pose().matrix() * gesture_overlay(gestures.target_scale(), gestures.yaw());
    let transform = session.scene().node(node).unwrap().world_transform;
    assert!(transform.abs_diff_eq(expected, 1e-5));

    session.on_touches(&[]);
    assert!(!session.gestures().is_active());
    assert_eq!(session.gestures().current_scale(), session.gestures().target_scale());
}

#[test]
fn test_gesture_state_survives_until_reset() {
    let (platform, mut session) = started_session(SimulationProfile::default());

    // Scale chosen before anything is placed still applies after placement
    session.on_touches(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]);
    session.on_touches(&[Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0)]);
    session.on_touches(&[Vec2::new(0.0, 0.0)]);
    assert_eq!(session.gestures().current_scale(), 2.0);

    session.request_placement();
    run_frames(&mut session, &platform, 2, true);
    let node = session.registry().list()[0].node;
    let expected = floor_pose().matrix() * gesture_overlay(2.0, 0.0);
    assert!(session
        .scene()
        .node(node)
        .unwrap()
        .world_transform
        .abs_diff_eq(expected, 1e-6));

    session.reset();
    assert_eq!(session.gestures().current_scale(), 1.0);
    assert_eq!(session.gestures().yaw(), 0.0);
}
