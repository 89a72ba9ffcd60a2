//! Status events consumed by the UI

use crate::ar::capability::CapabilityNotice;
use crate::ar::spatial_anchor::EntityId;
use crate::error::{AssetError, PlacementError, SessionError};
use std::fmt;

/// Something the UI may want to tell the user.
///
/// `Display` renders the human-readable status line.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Negotiation succeeded and the frame loop may run
    SessionStarted,
    /// Negotiation failed; the caller should fall back to a static preview
    SessionFailed(SessionError),
    /// A capability was not granted and the session runs degraded
    CapabilityDegraded(CapabilityNotice),
    /// The model template finished loading
    ModelLoaded {
        /// Asset reference
        asset: String,
    },
    /// The model template failed to load
    ModelLoadFailed(AssetError),
    /// Session, model and hit-testing are all available
    ReadyToPlace,
    /// A surface is under the reticle
    SurfaceFound,
    /// The reticle lost its surface
    SurfaceLost,
    /// A placement started waiting on anchor creation
    Anchoring,
    /// A model was placed
    ModelPlaced {
        /// New entity
        entity: EntityId,
        /// Whether it follows a live anchor
        tracked: bool,
    },
    /// A placement attempt failed; the user may tap again
    PlacementFailed(PlacementError),
    /// All placed models were removed
    Reset,
    /// The session ended
    SessionEnded,
}

impl StatusEvent {
    /// Whether this event reports a problem
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            StatusEvent::SessionFailed(_)
                | StatusEvent::CapabilityDegraded(_)
                | StatusEvent::ModelLoadFailed(_)
                | StatusEvent::PlacementFailed(_)
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::SessionStarted => f.write_str("AR session started"),
            StatusEvent::SessionFailed(e) => write!(f, "AR unavailable: {e}"),
            StatusEvent::CapabilityDegraded(notice) => write!(f, "{notice}"),
            StatusEvent::ModelLoaded { asset } => write!(f, "Model loaded: {asset}"),
            StatusEvent::ModelLoadFailed(e) => write!(f, "Could not load model: {e}"),
            StatusEvent::ReadyToPlace => f.write_str("Ready to place"),
            StatusEvent::SurfaceFound => f.write_str("Surface found, tap to place"),
            StatusEvent::SurfaceLost => f.write_str("Move your device to find a surface"),
            StatusEvent::Anchoring => f.write_str("Anchoring model..."),
            StatusEvent::ModelPlaced { .. } => f.write_str("Model placed!"),
            StatusEvent::PlacementFailed(e) => write!(f, "Placement failed, tap to retry: {e}"),
            StatusEvent::Reset => f.write_str("Cleared, ready to place again"),
            StatusEvent::SessionEnded => f.write_str("AR session ended"),
        }
    }
}
