//! Position tracking: smoothed anchor position, velocity, depth, roll.
//!
//! Runs first in the pipeline. For every hand in the frame it derives an
//! anchor point, settles it through exponential smoothing and a jitter
//! gate, and differentiates consecutive reported positions into velocity.
//! One history entry per hand id; hands absent from the frame are pruned
//! so a returning id starts from scratch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use handsense_frame_model::{
    ControlState, Frame, HandId, HandObservation, LandmarkPoint, SingleHandState, VelocityVector,
    MIDDLE_MCP,
};

use crate::stage::InterpretStage;

/// Which landmark anchors the reported hand position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMode {
    /// Mean of wrist and the four non-thumb knuckles. Steadiest choice.
    #[default]
    PalmCenter,
    /// Index fingertip, for pointing-style interaction.
    IndexFingertip,
    /// Wrist only, for coarse whole-hand movement.
    WristOnly,
}

/// Tuning for the position stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub mode: PositionMode,
    /// Exponential smoothing factor in `(0.0, 1.0]`; 1.0 disables
    /// smoothing. Values outside the range are clamped at use.
    pub smoothing_factor: f64,
    /// Movements smaller than this (normalized units) hold the previous
    /// reported position instead of trembling around it.
    pub jitter_threshold: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            mode: PositionMode::PalmCenter,
            smoothing_factor: 0.5,
            jitter_threshold: 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PositionHistory {
    /// Smoothing accumulator, pre jitter gate.
    smoothed: (f64, f64),
    /// Last position actually reported downstream.
    reported: (f64, f64),
    timestamp_ms: f64,
}

/// First stage: establishes the per-hand entries of the control state.
pub struct PositionTracker {
    config: PositionConfig,
    history: HashMap<HandId, PositionHistory>,
}

impl PositionTracker {
    pub fn new(config: PositionConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PositionConfig::default())
    }

    pub fn config(&self) -> &PositionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PositionConfig {
        &mut self.config
    }

    fn anchor(&self, hand: &HandObservation) -> LandmarkPoint {
        match self.config.mode {
            PositionMode::PalmCenter => hand.palm_center(),
            PositionMode::IndexFingertip => hand.index_tip(),
            PositionMode::WristOnly => hand.wrist(),
        }
    }

    fn track_hand(&mut self, hand: &HandObservation, timestamp_ms: f64) -> SingleHandState {
        let raw = self.anchor(hand);
        let factor = self.config.smoothing_factor.clamp(0.0, 1.0);
        let previous = self.history.get(&hand.id).copied();

        let smoothed = match previous {
            // A hand's first sample comes through raw.
            None => (raw.x, raw.y),
            Some(prev) => (
                prev.smoothed.0 + (raw.x - prev.smoothed.0) * factor,
                prev.smoothed.1 + (raw.y - prev.smoothed.1) * factor,
            ),
        };

        // Gate against the last reported position, not the last smoothed
        // one; sub-threshold drift must not accumulate.
        let reported = match previous {
            Some(prev) => {
                let dx = smoothed.0 - prev.reported.0;
                let dy = smoothed.1 - prev.reported.1;
                if (dx * dx + dy * dy).sqrt() < self.config.jitter_threshold {
                    prev.reported
                } else {
                    smoothed
                }
            }
            None => smoothed,
        };

        let velocity = match previous {
            Some(prev) => {
                let elapsed_secs = (timestamp_ms - prev.timestamp_ms) / 1000.0;
                if elapsed_secs <= 0.0 {
                    VelocityVector::default()
                } else {
                    VelocityVector::from_components(
                        (reported.0 - prev.reported.0) / elapsed_secs,
                        (reported.1 - prev.reported.1) / elapsed_secs,
                    )
                }
            }
            None => VelocityVector::default(),
        };

        self.history.insert(
            hand.id,
            PositionHistory {
                smoothed,
                reported,
                timestamp_ms,
            },
        );

        let wrist = hand.wrist();
        let middle_knuckle = hand.landmark(MIDDLE_MCP);

        SingleHandState {
            hand_id: hand.id,
            is_tracked: true,
            position: LandmarkPoint::new(reported.0, reported.1, raw.z),
            fingertip_position: hand.index_tip(),
            velocity,
            depth: (1.0 - hand.mean_z()).clamp(0.0, 1.0),
            rotation_rad: (middle_knuckle.y - wrist.y).atan2(middle_knuckle.x - wrist.x),
            ..Default::default()
        }
    }
}

impl InterpretStage for PositionTracker {
    fn name(&self) -> &'static str {
        "position"
    }

    fn process(&mut self, frame: &Frame, state: &mut ControlState) {
        for hand in &frame.hands {
            let tracked = self.track_hand(hand, frame.timestamp_ms);
            state.hands.push(tracked);
        }
        state.has_active_hand = !state.hands.is_empty();

        // Hands that vanished this tick lose their history; the same id
        // reappearing later is a brand-new hand.
        self.history
            .retain(|id, _| frame.hands.iter().any(|hand| hand.id == *id));
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}
