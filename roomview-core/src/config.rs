//! Tunables for session negotiation, hit-testing and gestures

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArConfig {
    /// Session request options
    #[serde(default)]
    pub session: SessionConfig,

    /// Hit-test negotiation
    #[serde(default)]
    pub hit_test: HitTestConfig,

    /// Gesture mapping
    #[serde(default)]
    pub gesture: GestureConfig,
}

/// Which optional session features to ask for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ask for persistent anchors
    #[serde(default = "default_true")]
    pub request_anchors: bool,

    /// Ask for a UI overlay
    #[serde(default = "default_true")]
    pub request_dom_overlay: bool,
}

/// Hit-test source negotiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitTestConfig {
    /// Try the plane-constrained, offset-ray query before the unconstrained one
    #[serde(default = "default_true")]
    pub prefer_plane_constrained: bool,

    /// Origin of the offset ray in viewer space
    #[serde(default = "default_ray_origin")]
    pub ray_origin: [f32; 3],

    /// Direction of the offset ray in viewer space
    #[serde(default = "default_ray_direction")]
    pub ray_direction: [f32; 3],
}

/// Two-finger gesture mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Lower clamp of the model scale
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    /// Upper clamp of the model scale
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    /// Radians of yaw per pixel of vertical offset change
    #[serde(default = "default_yaw_sensitivity")]
    pub yaw_sensitivity: f32,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            hit_test: HitTestConfig::default(),
            gesture: GestureConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_anchors: default_true(),
            request_dom_overlay: default_true(),
        }
    }
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            prefer_plane_constrained: default_true(),
            ray_origin: default_ray_origin(),
            ray_direction: default_ray_direction(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            yaw_sensitivity: default_yaw_sensitivity(),
        }
    }
}

fn default_true() -> bool { true }
fn default_ray_origin() -> [f32; 3] { [0.0, 0.0, -0.1] }
fn default_ray_direction() -> [f32; 3] { [0.0, 0.0, -1.0] }
fn default_min_scale() -> f32 { 0.5 }
fn default_max_scale() -> f32 { 3.0 }
fn default_yaw_sensitivity() -> f32 { 0.01 }
