//! Clock and tick-rate utilities for frame stamping.
//!
//! Frame timestamps in handsense are fractional milliseconds anchored to a
//! monotonic epoch recorded when the landmark provider started. This module
//! provides utilities for:
//! - Capturing the epoch and stamping ticks
//! - Converting between millisecond and second domains
//! - Throttling delivery to a target tick rate

use std::time::Instant;

/// A tick clock that provides monotonic millisecond timestamps relative to
/// a fixed epoch (the moment the provider started).
#[derive(Debug, Clone)]
pub struct TickClock {
    /// The instant the stream started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl TickClock {
    /// Create a new tick clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a clock from a known epoch (for replaying recorded streams).
    pub fn from_epoch(epoch: Instant, wall: String) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Milliseconds elapsed since the stream started.
    pub fn elapsed_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Seconds elapsed since the stream started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at stream start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Convert a millisecond value to seconds.
    pub fn ms_to_secs(ms: f64) -> f64 {
        ms / 1000.0
    }

    /// Convert seconds to milliseconds.
    pub fn secs_to_ms(secs: f64) -> f64 {
        secs * 1000.0
    }
}

/// Tick-rate gate for frame delivery.
///
/// Landmark providers typically run ~30 inferences per second; this gate lets
/// a faster upstream (e.g. a 60 fps camera callback) throttle down to the
/// pipeline's target rate.
#[derive(Debug)]
pub struct FrameRateGate {
    target_interval_ms: f64,
    last_tick_ms: Option<f64>,
}

impl FrameRateGate {
    /// Create a gate targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ms: 1000.0 / target_hz.max(1) as f64,
            last_tick_ms: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_ms: f64) -> bool {
        match self.last_tick_ms {
            None => {
                self.last_tick_ms = Some(now_ms);
                true
            }
            Some(last) if now_ms >= last + self.target_interval_ms => {
                self.last_tick_ms = Some(now_ms);
                true
            }
            _ => false,
        }
    }

    /// Target interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.target_interval_ms
    }
}
