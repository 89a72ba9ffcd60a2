//! Searching/placed state machine

use crate::platform::HitResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether new placements are permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Looking for a surface; a tap may place the model
    Searching,
    /// A model group is placed; taps are ignored until reset
    Placed,
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementMode::Searching => f.write_str("searching"),
            PlacementMode::Placed => f.write_str("placed"),
        }
    }
}

/// Decides once per frame whether to start a placement
#[derive(Debug, Clone)]
pub struct PlacementStateMachine {
    mode: PlacementMode,
    requested: bool,
}

impl PlacementStateMachine {
    /// Start in `Searching` with no request pending
    pub fn new() -> Self {
        Self {
            mode: PlacementMode::Searching,
            requested: false,
        }
    }

    /// Current mode
    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    /// Whether a tap is waiting for a qualifying frame
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Record a tap. Returns `false` when placements are suppressed.
    pub fn request(&mut self) -> bool {
        if self.mode == PlacementMode::Placed {
            return false;
        }
        self.requested = true;
        true
    }

    /// Drop a pending tap without honoring it
    pub fn cancel_request(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }

    /// Evaluate this frame's conditions.
    ///
    /// Returns the first (nearest) hit and clears the request when a tap is
    /// pending, a hit exists, a model is loaded, nothing is in flight, and the
    /// mode is `Searching`. The request flag is cleared here, before any
    /// asynchronous anchor work starts, so one tap yields at most one attempt.
    pub fn evaluate(
        &mut self,
        hits: &[HitResult],
        template_loaded: bool,
        placement_in_flight: bool,
    ) -> Option<HitResult> {
        if self.mode != PlacementMode::Searching
            || !self.requested
            || !template_loaded
            || placement_in_flight
        {
            return None;
        }
        let hit = *hits.first()?;
        self.requested = false;
        Some(hit)
    }

    /// A placement was committed to the registry
    pub fn confirm_placed(&mut self) {
        self.mode = PlacementMode::Placed;
    }

    /// Back to `Searching` with no request pending
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PlacementStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
