//! Distance measurement: pinch gaps and inter-hand metrics.
//!
//! Runs last in the pipeline. Produces a [`DistanceSnapshot`] under the
//! `"distances"` aux key and never touches the per-hand entries. Each
//! metric is smoothed independently; a metric that lapses (for example
//! the second hand vanishing) drops its history, so its next value comes
//! through raw instead of blended with stale state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use handsense_frame_model::{
    ControlState, DistanceSnapshot, Frame, HandObservation, INDEX_TIP, THUMB_TIP,
};

use crate::stage::InterpretStage;

/// Tuning for the distance stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Divide raw distances by the average hand size, making the metrics
    /// comparable across camera distances.
    pub normalize: bool,
    /// Exponential smoothing factor per metric, in `(0.0, 1.0]`.
    pub smoothing_factor: f64,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            smoothing_factor: 0.4,
        }
    }
}

/// The scalar metrics the stage tracks, each with its own smoothing
/// history. Pinch metrics are keyed by hand slot, not hand id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DistanceMetric {
    PalmToPalm,
    IndexToIndex,
    ThumbToThumb,
    PrimaryPinch,
    SecondaryPinch,
}

/// Third stage: distance metrics into [`ControlState::aux`].
pub struct DistanceMeasurer {
    config: DistanceConfig,
    smoothed: HashMap<DistanceMetric, f64>,
}

impl DistanceMeasurer {
    pub fn new(config: DistanceConfig) -> Self {
        Self {
            config,
            smoothed: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DistanceConfig::default())
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DistanceConfig {
        &mut self.config
    }

    fn normalized(&self, raw: f64, avg_hand_size: f64) -> f64 {
        if self.config.normalize && avg_hand_size > f64::EPSILON {
            raw / avg_hand_size
        } else {
            raw
        }
    }

    /// Smooth one metric against its own history. `None` clears the
    /// history so the metric restarts raw when it reappears.
    fn track(&mut self, metric: DistanceMetric, value: Option<f64>) -> Option<f64> {
        match value {
            None => {
                self.smoothed.remove(&metric);
                None
            }
            Some(raw) => {
                let factor = self.config.smoothing_factor.clamp(0.0, 1.0);
                let smoothed = match self.smoothed.get(&metric) {
                    Some(previous) => previous + (raw - previous) * factor,
                    None => raw,
                };
                self.smoothed.insert(metric, smoothed);
                Some(smoothed)
            }
        }
    }
}

fn pinch_distance(hand: &HandObservation) -> f64 {
    hand.thumb_tip().distance_2d(&hand.index_tip())
}

impl InterpretStage for DistanceMeasurer {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn process(&mut self, frame: &Frame, state: &mut ControlState) {
        // Observations in the order the position stage established.
        let observations: Vec<&HandObservation> = state
            .hands
            .iter()
            .filter_map(|hand| frame.hands.iter().find(|obs| obs.id == hand.hand_id))
            .collect();

        if observations.is_empty() {
            self.smoothed.clear();
            return;
        }

        let avg_hand_size = observations
            .iter()
            .map(|observation| observation.hand_size())
            .sum::<f64>()
            / observations.len() as f64;

        let primary = observations[0];
        let secondary = observations.get(1).copied();

        let primary_pinch = Some(self.normalized(pinch_distance(primary), avg_hand_size));
        let secondary_pinch =
            secondary.map(|hand| self.normalized(pinch_distance(hand), avg_hand_size));

        let (palm_to_palm, index_to_index, thumb_to_thumb) = match secondary {
            Some(second) if observations.len() == 2 => (
                Some(self.normalized(
                    primary.palm_center().distance_2d(&second.palm_center()),
                    avg_hand_size,
                )),
                Some(self.normalized(
                    primary
                        .landmark(INDEX_TIP)
                        .distance_2d(&second.landmark(INDEX_TIP)),
                    avg_hand_size,
                )),
                Some(self.normalized(
                    primary
                        .landmark(THUMB_TIP)
                        .distance_2d(&second.landmark(THUMB_TIP)),
                    avg_hand_size,
                )),
            ),
            _ => (None, None, None),
        };

        let snapshot = DistanceSnapshot {
            palm_to_palm: self.track(DistanceMetric::PalmToPalm, palm_to_palm),
            index_to_index: self.track(DistanceMetric::IndexToIndex, index_to_index),
            thumb_to_thumb: self.track(DistanceMetric::ThumbToThumb, thumb_to_thumb),
            primary_pinch: self.track(DistanceMetric::PrimaryPinch, primary_pinch),
            secondary_pinch: self.track(DistanceMetric::SecondaryPinch, secondary_pinch),
            avg_hand_size,
        };

        match serde_json::to_value(snapshot) {
            Ok(value) => {
                state.aux.insert(DistanceSnapshot::AUX_KEY.to_string(), value);
            }
            Err(error) => {
                tracing::warn!(%error, "failed to encode distance snapshot");
            }
        }
    }

    fn reset(&mut self) {
        self.smoothed.clear();
    }
}
