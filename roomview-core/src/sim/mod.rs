//! Deterministic stand-ins for the host platform and renderer
//!
//! Used by the test suite and by the `roomview simulate` command to drive a
//! full session without a device.

mod platform;
mod scene;

pub use platform::{SimFrame, SimulatedPlatform, SimulationProfile};
pub use scene::{ModelTemplate, RecordedNode, RecordingScene, SimAssetLoader};
