//! Automatic laser power ramp.
//!
//! Power follows the beam's air path: the farther the head is from the
//! near corner of the travel envelope, the closer the power gets to
//! `min_power`. Updates are rate limited by a single-shot window and
//! suppressed when the change is below `epsilon`.

use std::time::Duration;

use focuskit_settings::{PowerSettings, TravelEnvelope};
use tracing::debug;

/// A power value that should be sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerUpdate {
    /// Target power in `[0, 1]`
    pub power: f32,
    /// Value handed to the laser output (`power / output_divisor`)
    pub output: f32,
}

/// Position-dependent laser power throttle
#[derive(Debug, Clone)]
pub struct PowerThrottle {
    enabled: bool,
    min_power: f32,
    max_power: f32,
    epsilon: f32,
    output_divisor: f32,
    interval: Duration,
    envelope: TravelEnvelope,
    last_sent: f32,
    window_active: bool,
}

impl PowerThrottle {
    /// Create a throttle from settings
    pub fn new(settings: &PowerSettings) -> Self {
        Self {
            enabled: settings.auto_power,
            min_power: settings.min_power,
            max_power: settings.max_power,
            epsilon: settings.epsilon,
            output_divisor: settings.output_divisor,
            interval: Duration::from_millis(settings.min_interval_ms),
            envelope: settings.envelope,
            last_sent: 0.0,
            window_active: false,
        }
    }

    /// Operator power configuration
    pub fn configure(&mut self, enabled: bool, min_power: f32, max_power: f32) {
        self.enabled = enabled;
        self.min_power = min_power;
        self.max_power = max_power;
    }

    /// Air-path fraction at `(x, y)`, clamped to `[0, 1]`
    pub fn fraction(&self, x: f32, y: f32) -> f32 {
        let env = &self.envelope;
        let span = (env.max_x - env.min_x) + (env.max_y - env.min_y);
        if span <= 0.0 {
            return 0.0;
        }
        (((env.max_x - x) + (env.max_y - y)) / span).clamp(0.0, 1.0)
    }

    /// Power the ramp asks for at `(x, y)`
    pub fn target_power(&self, x: f32, y: f32) -> f32 {
        self.min_power + (self.max_power - self.min_power) * self.fraction(x, y)
    }

    /// Handle a coordinate update
    ///
    /// Returns the update to send, if any. A returned update opens the rate
    /// limiting window; the caller schedules its expiry.
    pub fn on_coords(&mut self, x: f32, y: f32) -> Option<PowerUpdate> {
        if !self.enabled || self.max_power < self.min_power || self.window_active {
            return None;
        }

        let target = self.target_power(x, y);
        if (target - self.last_sent).abs() < self.epsilon {
            return None;
        }

        debug!("Power {:.3} -> {:.3} at X{} Y{}", self.last_sent, target, x, y);
        self.last_sent = target;
        self.window_active = true;

        Some(PowerUpdate {
            power: target,
            output: target / self.output_divisor,
        })
    }

    /// The rate limiting window elapsed
    pub fn window_elapsed(&mut self) {
        self.window_active = false;
    }

    /// Length of the rate limiting window
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last power that was sent
    pub fn last_sent(&self) -> f32 {
        self.last_sent
    }

    /// Check if automatic power is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if the rate limiting window is open
    pub fn is_window_active(&self) -> bool {
        self.window_active
    }
}
