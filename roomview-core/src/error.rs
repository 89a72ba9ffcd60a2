//! Error types for the tracking engine

use thiserror::Error;

/// Errors reported by the host tracking platform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    /// The requested feature or parameter is not supported
    #[error("Feature not supported on this platform: {0}")]
    NotSupported(String),

    /// The user denied access (camera, motion sensors)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The platform rejected the request for another reason
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The request referred to a session that is no longer running
    #[error("Session ended")]
    SessionEnded,

    /// Platform API error
    #[error("Platform API error: {0}")]
    ApiError(String),
}

/// Fatal session-level failures.
///
/// These disable the interactive flow; the caller is expected to switch to a
/// static, non-tracked preview.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Immersive AR is not available on this device at all
    #[error("Immersive AR is not supported on this device")]
    Unsupported,

    /// The session request itself was rejected
    #[error("AR session request rejected: {0}")]
    Rejected(#[source] PlatformError),

    /// The `local` reference space could not be obtained
    #[error("Reference space unavailable: {0}")]
    ReferenceSpace(#[source] PlatformError),

    /// `start` was called on a session that is not in a startable state
    #[error("Session already started")]
    AlreadyStarted,
}

/// Failure to load the renderable template
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    /// The asset could not be fetched
    #[error("Failed to fetch asset '{asset}': {reason}")]
    Fetch {
        /// Asset reference that was requested
        asset: String,
        /// Loader-provided reason
        reason: String,
    },

    /// The asset was fetched but could not be decoded
    #[error("Failed to decode asset '{asset}': {reason}")]
    Decode {
        /// Asset reference that was requested
        asset: String,
        /// Loader-provided reason
        reason: String,
    },
}

/// Failures of a single placement attempt.
///
/// These never propagate out of the frame loop; they are reported as status
/// events and the user may retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    /// Asynchronous anchor creation was rejected by the platform
    #[error("Anchor creation failed: {0}")]
    AnchorRejected(#[source] PlatformError),

    /// The anchor handle is already bound to a placed entity
    #[error("Anchor {0} is already registered")]
    DuplicateAnchor(u64),

    /// Placement was requested before a renderable template was loaded
    #[error("No model loaded")]
    NoTemplate,
}
