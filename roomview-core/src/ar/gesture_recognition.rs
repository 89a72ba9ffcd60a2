//! Two-finger gesture recognition for placed models
//!
//! Scale and yaw are computed from every two-point sample; there is no
//! pinch-versus-twist disambiguation. The result is applied to the whole
//! placed group, not to a touched object.

use crate::config::GestureConfig;
use glam::Vec2;
use tracing::warn;

/// Recognized gesture step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// First two-finger sample; baseline recorded
    Began {
        /// Distance between the two points
        baseline: f32,
    },
    /// Subsequent two-finger sample
    Transform {
        /// Clamped target scale
        scale: f32,
        /// Yaw added by this sample, in radians
        yaw_delta: f32,
    },
    /// Fewer than two points remain; scale committed
    Released {
        /// Committed scale
        scale: f32,
    },
}

/// Gesture state shared between the recognizer and the pose updater
#[derive(Debug, Clone, PartialEq)]
pub struct GestureAccumulator {
    /// Distance between the two points at gesture start; `None` when no gesture is active
    distance_baseline: Option<f32>,
    /// Vertical offset between the two points at the previous sample
    previous_vertical_offset: f32,
    /// Scale committed by the last released gesture
    current_scale: f32,
    /// Scale the active gesture is aiming for
    target_scale: f32,
    /// Accumulated yaw in radians
    yaw: f32,
}

impl GestureAccumulator {
    /// Scale 1, yaw 0, no active gesture
    pub fn new() -> Self {
        Self {
            distance_baseline: None,
            previous_vertical_offset: 0.0,
            current_scale: 1.0,
            target_scale: 1.0,
            yaw: 0.0,
        }
    }

    /// Scale committed by the last release
    pub fn current_scale(&self) -> f32 {
        self.current_scale
    }

    /// Scale to render with; equals `current_scale` outside a gesture
    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    /// Accumulated yaw in radians
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Whether a two-finger gesture is in progress
    pub fn is_active(&self) -> bool {
        self.distance_baseline.is_some()
    }

    /// Back to scale 1, yaw 0
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for GestureAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts raw touch samples into accumulator updates
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    min_scale: f32,
    max_scale: f32,
    yaw_sensitivity: f32,
}

impl GestureRecognizer {
    /// Create a recognizer from configuration
    pub fn new(config: &GestureConfig) -> Self {
        let defaults = GestureConfig::default();
        let (min_scale, max_scale) = if !config.min_scale.is_finite() || !config.max_scale.is_finite() {
            warn!(
                min = config.min_scale,
                max = config.max_scale,
                "non-finite scale bounds, using defaults"
            );
            (defaults.min_scale, defaults.max_scale)
        } else if config.min_scale <= config.max_scale {
            (config.min_scale, config.max_scale)
        } else {
            (config.max_scale, config.min_scale)
        };
        let yaw_sensitivity = if config.yaw_sensitivity.is_finite() {
            config.yaw_sensitivity
        } else {
            warn!(sensitivity = config.yaw_sensitivity, "non-finite yaw sensitivity, using default");
            defaults.yaw_sensitivity
        };
        Self {
            min_scale,
            max_scale,
            yaw_sensitivity,
        }
    }

    /// Feed the set of currently active touch points.
    ///
    /// Exactly two points drive the gesture, fewer than two release it, and
    /// more than two are ignored.
    pub fn sample(&self, acc: &mut GestureAccumulator, touches: &[Vec2]) -> Option<Gesture> {
        match touches {
            [a, b] => self.two_point_sample(acc, *a, *b),
            _ if touches.len() < 2 => self.release(acc),
            _ => None,
        }
    }

    fn two_point_sample(&self, acc: &mut GestureAccumulator, a: Vec2, b: Vec2) -> Option<Gesture> {
        let distance = a.distance(b);
        let vertical_offset = b.y - a.y;

        let Some(baseline) = acc.distance_baseline else {
            // Coincident points cannot serve as a ratio baseline
            if distance <= f32::EPSILON {
                return None;
            }
            acc.distance_baseline = Some(distance);
            acc.previous_vertical_offset = vertical_offset;
            return Some(Gesture::Began { baseline: distance });
        };

        let ratio = distance / baseline;
        acc.target_scale = (ratio * acc.current_scale).clamp(self.min_scale, self.max_scale);

        let yaw_delta = (vertical_offset - acc.previous_vertical_offset) * self.yaw_sensitivity;
        acc.yaw += yaw_delta;
        acc.previous_vertical_offset = vertical_offset;

        Some(Gesture::Transform {
            scale: acc.target_scale,
            yaw_delta,
        })
    }

    fn release(&self, acc: &mut GestureAccumulator) -> Option<Gesture> {
        acc.distance_baseline.take()?;
        acc.current_scale = acc.target_scale;
        Some(Gesture::Released {
            scale: acc.current_scale,
        })
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(&GestureConfig::default())
    }
}
