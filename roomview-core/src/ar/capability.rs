//! Session and hit-test capability negotiation
//!
//! Optional capabilities degrade instead of failing: the session is requested
//! with `hit-test` as the only required feature, and the hit-test source is
//! requested through an ordered list of [`HitTestTier`]s, stopping at the first
//! one the platform accepts.

use crate::config::ArConfig;
use crate::error::SessionError;
use crate::platform::{
    HitTestEntityType, HitTestOptions, HitTestSource, Ray, ReferenceSpace, ReferenceSpaceKind,
    SessionFeature, SessionGrant, SessionRequest, TrackingPlatform,
};
use glam::Vec3;
use std::fmt;
use tracing::{debug, info, warn};

/// A capability the session runs without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityNotice {
    /// Plane-constrained hit-testing was rejected; any surface is accepted
    HitTestUnconstrained,
    /// No hit-test source could be obtained; placement is disabled
    HitTestUnavailable,
    /// Anchors were not granted; placed models use a static pose
    AnchorsUnavailable,
    /// The UI overlay was not granted
    DomOverlayUnavailable,
}

impl fmt::Display for CapabilityNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CapabilityNotice::HitTestUnconstrained => {
                "Plane detection unavailable, placing on any detected surface"
            }
            CapabilityNotice::HitTestUnavailable => "Surface detection unavailable, placement disabled",
            CapabilityNotice::AnchorsUnavailable => {
                "Anchors unavailable, the model will not follow tracking corrections"
            }
            CapabilityNotice::DomOverlayUnavailable => "UI overlay unavailable",
        };
        f.write_str(text)
    }
}

/// One hit-test source request descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTestTier {
    /// Restricted to detected planes, cast along an offset ray
    PlaneConstrained {
        /// Ray in viewer space
        ray: Ray,
    },
    /// Any surface, platform default ray
    Unconstrained,
}

impl HitTestTier {
    /// Request options for this tier against `space`
    pub fn options(&self, space: ReferenceSpace) -> HitTestOptions {
        match self {
            HitTestTier::PlaneConstrained { ray } => HitTestOptions {
                space,
                entity_types: vec![HitTestEntityType::Plane],
                offset_ray: Some(*ray),
            },
            HitTestTier::Unconstrained => HitTestOptions {
                space,
                entity_types: Vec::new(),
                offset_ray: None,
            },
        }
    }
}

/// Everything a successful negotiation hands to the frame loop
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedSession {
    /// Granted session
    pub grant: SessionGrant,
    /// Space all poses are expressed in
    pub local_space: ReferenceSpace,
    /// Space the hit-test ray is attached to, if granted
    pub viewer_space: Option<ReferenceSpace>,
    /// Hit-test subscription, if any tier was accepted
    pub hit_test_source: Option<HitTestSource>,
    /// Tier that produced `hit_test_source`
    pub hit_test_tier: Option<HitTestTier>,
    /// Capabilities the session runs without
    pub notices: Vec<CapabilityNotice>,
}

impl NegotiatedSession {
    /// Whether live anchors may be created
    pub fn anchors_enabled(&self) -> bool {
        self.grant.has_feature(SessionFeature::Anchors)
    }

    /// Whether placement can ever fire in this session
    pub fn can_place(&self) -> bool {
        self.hit_test_source.is_some()
    }
}

/// Requests the session, reference spaces and hit-test source
#[derive(Debug, Clone)]
pub struct CapabilityNegotiator {
    request_anchors: bool,
    request_dom_overlay: bool,
    tiers: Vec<HitTestTier>,
}

impl CapabilityNegotiator {
    /// Build the request plan from configuration
    pub fn new(config: &ArConfig) -> Self {
        let mut tiers = Vec::with_capacity(2);
        if config.hit_test.prefer_plane_constrained {
            // A degenerate direction falls back to looking straight ahead
            let direction = Vec3::from_array(config.hit_test.ray_direction)
                .try_normalize()
                .unwrap_or(Ray::default().direction);
            tiers.push(HitTestTier::PlaneConstrained {
                ray: Ray {
                    origin: Vec3::from_array(config.hit_test.ray_origin),
                    direction,
                },
            });
        }
        tiers.push(HitTestTier::Unconstrained);

        Self {
            request_anchors: config.session.request_anchors,
            request_dom_overlay: config.session.request_dom_overlay,
            tiers,
        }
    }

    /// The session request: `hit-test` required, the rest optional
    pub fn session_request(&self) -> SessionRequest {
        let mut optional_features = Vec::new();
        if self.request_anchors {
            optional_features.push(SessionFeature::Anchors);
        }
        if self.request_dom_overlay {
            optional_features.push(SessionFeature::DomOverlay);
        }
        SessionRequest {
            required_features: vec![SessionFeature::HitTest],
            optional_features,
        }
    }

    /// Hit-test tiers in the order they are tried
    pub fn tiers(&self) -> &[HitTestTier] {
        &self.tiers
    }

    /// Run the whole negotiation.
    ///
    /// Only a missing platform, a rejected session, or a missing `local` space
    /// are errors; everything else degrades into a [`CapabilityNotice`].
    pub async fn negotiate<P>(&self, platform: &P) -> Result<NegotiatedSession, SessionError>
    where
        P: TrackingPlatform + ?Sized,
    {
        if !platform.is_session_supported().await {
            warn!("immersive AR not supported");
            return Err(SessionError::Unsupported);
        }

        let request = self.session_request();
        let grant = platform
            .request_session(&request)
            .await
            .map_err(SessionError::Rejected)?;
        info!(session = grant.handle.0, features = ?grant.enabled_features, "AR session granted");

        let mut notices = Vec::new();
        if self.request_anchors && !grant.has_feature(SessionFeature::Anchors) {
            warn!("anchors not granted, falling back to static placement");
            notices.push(CapabilityNotice::AnchorsUnavailable);
        }
        if self.request_dom_overlay && !grant.has_feature(SessionFeature::DomOverlay) {
            debug!("dom overlay not granted");
            notices.push(CapabilityNotice::DomOverlayUnavailable);
        }

        let local_space = match platform
            .request_reference_space(&grant.handle, ReferenceSpaceKind::Local)
            .await
        {
            Ok(space) => space,
            Err(e) => {
                // The granted session must not outlive a failed negotiation
                if let Err(end_err) = platform.end_session(&grant.handle).await {
                    warn!(error = %end_err, "failed to release session after negotiation failure");
                }
                return Err(SessionError::ReferenceSpace(e));
            }
        };

        let viewer_space = match platform
            .request_reference_space(&grant.handle, ReferenceSpaceKind::Viewer)
            .await
        {
            Ok(space) => Some(space),
            Err(e) => {
                warn!(error = %e, "viewer space unavailable, hit-testing disabled");
                None
            }
        };

        let mut hit_test_source = None;
        let mut hit_test_tier = None;
        if let Some(viewer) = viewer_space {
            for tier in &self.tiers {
                match platform
                    .request_hit_test_source(&grant.handle, &tier.options(viewer))
                    .await
                {
                    Ok(source) => {
                        debug!(?tier, source = source.id, "hit-test source acquired");
                        hit_test_source = Some(source);
                        hit_test_tier = Some(*tier);
                        break;
                    }
                    Err(e) => warn!(?tier, error = %e, "hit-test source request rejected"),
                }
            }
        }

        match hit_test_tier {
            Some(HitTestTier::Unconstrained) if self.tiers.len() > 1 => {
                notices.push(CapabilityNotice::HitTestUnconstrained);
            }
            None => notices.push(CapabilityNotice::HitTestUnavailable),
            _ => {}
        }

        Ok(NegotiatedSession {
            grant,
            local_space,
            viewer_space,
            hit_test_source,
            hit_test_tier,
            notices,
        })
    }
}

impl Default for CapabilityNegotiator {
    fn default() -> Self {
        Self::new(&ArConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedPlatform, SimulationProfile};

    #[test]
    fn test_session_request_marks_only_hit_test_required() {
        let request = CapabilityNegotiator::default().session_request();

        assert_eq!(request.required_features, vec![SessionFeature::HitTest]);
        assert!(request.optional_features.contains(&SessionFeature::Anchors));
        assert!(request.optional_features.contains(&SessionFeature::DomOverlay));
    }

    #[test]
    fn test_preferred_tier_wins_when_supported() {
        let platform = SimulatedPlatform::new(SimulationProfile::default());
        let session = tokio_test::block_on(CapabilityNegotiator::default().negotiate(&platform)).unwrap();

        assert!(matches!(session.hit_test_tier, Some(HitTestTier::PlaneConstrained { .. })));
        assert!(session.notices.is_empty());
        assert_eq!(platform.hit_test_requests().len(), 1);
    }

    #[test]
    fn test_falls_back_to_unconstrained_tier() {
        let platform = SimulatedPlatform::new(SimulationProfile {
            plane_hit_test: false,
            ..SimulationProfile::default()
        });
        let session = tokio_test::block_on(CapabilityNegotiator::default().negotiate(&platform)).unwrap();

        let requests = platform.hit_test_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].entity_types, vec![HitTestEntityType::Plane]);
        assert!(requests[1].entity_types.is_empty());
        assert!(requests[1].offset_ray.is_none());
        assert_eq!(session.hit_test_tier, Some(HitTestTier::Unconstrained));
        assert_eq!(session.notices, vec![CapabilityNotice::HitTestUnconstrained]);
    }

    #[test]
    fn test_both_tiers_rejected_degrades_without_error() {
        let platform = SimulatedPlatform::new(SimulationProfile {
            plane_hit_test: false,
            hit_test: false,
            ..SimulationProfile::default()
        });
        let session = tokio_test::block_on(CapabilityNegotiator::default().negotiate(&platform)).unwrap();

        assert_eq!(platform.hit_test_requests().len(), 2);
        assert!(session.hit_test_source.is_none());
        assert!(!session.can_place());
        assert_eq!(session.notices, vec![CapabilityNotice::HitTestUnavailable]);
    }

    #[test]
    fn test_session_rejection_is_fatal_and_distinct() {
        let unsupported = SimulatedPlatform::new(SimulationProfile {
            supported: false,
            ..SimulationProfile::default()
        });
        let denied = SimulatedPlatform::new(SimulationProfile {
            permission_denied: true,
            ..SimulationProfile::default()
        });
        let negotiator = CapabilityNegotiator::default();

        assert_eq!(
            tokio_test::block_on(negotiator.negotiate(&unsupported)).unwrap_err(),
            SessionError::Unsupported
        );
        assert!(matches!(
            tokio_test::block_on(negotiator.negotiate(&denied)).unwrap_err(),
            SessionError::Rejected(_)
        ));
    }

    #[test]
    fn test_missing_anchors_is_a_notice() {
        let platform = SimulatedPlatform::new(SimulationProfile {
            grant_anchors: false,
            ..SimulationProfile::default()
        });
        let session = tokio_test::block_on(CapabilityNegotiator::default().negotiate(&platform)).unwrap();

        assert!(!session.anchors_enabled());
        assert_eq!(session.notices, vec![CapabilityNotice::AnchorsUnavailable]);
    }

    #[test]
    fn test_zero_ray_direction_looks_straight_ahead() {
        let mut config = ArConfig::default();
        config.hit_test.ray_direction = [0.0, 0.0, 0.0];
        config.hit_test.ray_origin = [0.0, 0.1, 0.0];

        let negotiator = CapabilityNegotiator::new(&config);

        let HitTestTier::PlaneConstrained { ray } = negotiator.tiers()[0] else {
            panic!("plane-constrained tier should come first");
        };
        assert_eq!(ray.direction, Vec3::NEG_Z);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.1, 0.0));
    }
}
