//! RoomView core - AR placement and tracking engine
//!
//! Places a product model on a detected floor, keeps it locked to the surface
//! while the camera moves, and lets the user scale and rotate it with two
//! fingers. Rendering, asset decoding and the device itself stay behind the
//! [`SceneBackend`], [`AssetLoader`] and [`TrackingPlatform`] traits.

#![warn(missing_docs)]

pub mod ar;
pub mod config;
pub mod error;
pub mod platform;
pub mod pose;
pub mod scene;
pub mod sim;

pub use ar::{ArSession, PlacementMode, SessionState, StatusEvent};
pub use config::ArConfig;
pub use error::{AssetError, PlacementError, PlatformError, SessionError};
pub use platform::{TrackingPlatform, XrFrame};
pub use pose::Pose;
pub use scene::{AssetLoader, NodeId, SceneBackend};
