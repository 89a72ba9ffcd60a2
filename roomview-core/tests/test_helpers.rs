//! Shared fixtures for session-level tests
#![allow(dead_code)]

use glam::Vec3;
use roomview_core::sim::{RecordingScene, SimFrame, SimulatedPlatform, SimulationProfile};
use roomview_core::{ArConfig, ArSession, Pose};

/// Where the simulated floor is hit, nearest first
pub fn floor_pose() -> Pose {
    Pose::from_position(Vec3::new(0.0, -1.2, -1.5))
}

/// A frame whose hit-test sees the floor
pub fn floor_frame(platform: &SimulatedPlatform, timestamp: f64) -> SimFrame {
    platform.frame(timestamp).with_hit(floor_pose())
}

/// A platform and an active session with a template loaded; startup events are drained
pub fn started_session(profile: SimulationProfile) -> (SimulatedPlatform, ArSession<RecordingScene>) {
    let platform = SimulatedPlatform::new(profile);
    let mut session = ArSession::new(RecordingScene::new(), &ArConfig::default());
    let template = session.scene().load_template("armchair.glb");
    session.set_template(template);
    tokio_test::block_on(session.start(&platform)).expect("session should start");
    session.drain_events();
    (platform, session)
}

/// Run `count` frames, each seeing the floor when `with_hits` is set
pub fn run_frames(
    session: &mut ArSession<RecordingScene>,
    platform: &SimulatedPlatform,
    count: usize,
    with_hits: bool,
) {
    for i in 0..count {
        let timestamp = i as f64 * 16.0;
        let frame = if with_hits {
            floor_frame(platform, timestamp)
        } else {
            platform.frame(timestamp)
        };
        session.on_frame(&frame);
    }
}

/// Placed models and rendered nodes agree, and `Placed` mirrors a non-empty registry
pub fn assert_consistent(session: &ArSession<RecordingScene>) {
    assert_eq!(session.scene().attached_count(), session.registry().len());
    for entity in session.registry().list() {
        assert!(session.scene().node(entity.node).is_some_and(|n| n.attached));
    }
    assert_eq!(
        session.mode() == roomview_core::PlacementMode::Placed,
        !session.registry().is_empty()
    );
}
