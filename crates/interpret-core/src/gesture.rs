//! Gesture interpretation: finger extension, openness, classification.
//!
//! Runs after position tracking and fills in the gesture-related fields
//! of each tracked hand. Classification is a fixed-priority ladder over
//! per-finger extension flags and a smoothed openness scalar; a short
//! hold window keeps single-frame misclassifications from flickering
//! through to consumers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use handsense_frame_model::{
    ControlState, FingerFlags, Frame, GestureReport, GestureType, HandId, HandObservation,
    LandmarkPoint, OpennessState, FINGERTIPS, INDEX_DIP, INDEX_MCP, INDEX_PIP, INDEX_TIP,
    MIDDLE_DIP, MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP, PINKY_DIP, PINKY_MCP, PINKY_PIP, PINKY_TIP,
    RING_DIP, RING_MCP, RING_PIP, RING_TIP, THUMB_IP, THUMB_MCP, THUMB_TIP,
};

use crate::stage::InterpretStage;

/// Tuning for the gesture stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum interior joint angle, in radians, for a finger to count
    /// as straight.
    pub extension_angle_rad: f64,
    /// Maximum thumb-tip to index-tip distance for a pinch.
    pub pinch_threshold: f64,
    /// Openness below this, with no extended fingers, reads as a fist.
    pub fist_openness_max: f64,
    /// Openness above this, with four or more extended fingers, reads as
    /// an open hand.
    pub open_openness_min: f64,
    /// Mean fingertip-to-wrist distance of a fully closed hand.
    pub openness_closed_distance: f64,
    /// Mean fingertip-to-wrist distance of a fully spread hand.
    pub openness_open_distance: f64,
    /// Exponential smoothing factor for openness, in `(0.0, 1.0]`.
    pub openness_smoothing: f64,
    /// How long a raw classification must persist before being reported.
    pub min_gesture_duration_ms: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            extension_angle_rad: 160.0_f64.to_radians(),
            pinch_threshold: 0.05,
            fist_openness_max: 0.3,
            open_openness_min: 0.7,
            openness_closed_distance: 0.10,
            openness_open_distance: 0.40,
            openness_smoothing: 0.3,
            min_gesture_duration_ms: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GestureHistory {
    smoothed_openness: f64,
    timestamp_ms: f64,
    /// Instantaneous classification of the latest tick.
    raw: GestureType,
    /// When the current raw classification first appeared.
    raw_since_ms: f64,
    /// What consumers actually see, behind the hold window.
    reported: GestureType,
}

impl GestureHistory {
    fn first_seen(openness: f64, timestamp_ms: f64) -> Self {
        Self {
            smoothed_openness: openness,
            timestamp_ms,
            raw: GestureType::None,
            raw_since_ms: timestamp_ms,
            reported: GestureType::None,
        }
    }
}

/// Second stage: fingers, openness, and the classified gesture.
pub struct GestureClassifier {
    config: GestureConfig,
    history: HashMap<HandId, GestureHistory>,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(GestureConfig::default())
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GestureConfig {
        &mut self.config
    }
}

impl InterpretStage for GestureClassifier {
    fn name(&self) -> &'static str {
        "gesture"
    }

    fn process(&mut self, frame: &Frame, state: &mut ControlState) {
        let now = frame.timestamp_ms;

        for hand in &mut state.hands {
            let observation = match frame.hands.iter().find(|obs| obs.id == hand.hand_id) {
                Some(observation) => observation,
                None => continue,
            };

            let fingers = detect_fingers(observation, self.config.extension_angle_rad);
            let openness_raw = raw_openness(
                observation,
                self.config.openness_closed_distance,
                self.config.openness_open_distance,
            );

            let factor = self.config.openness_smoothing.clamp(0.0, 1.0);
            let entry = self
                .history
                .entry(hand.hand_id)
                .or_insert_with(|| GestureHistory::first_seen(openness_raw, now));

            // The seeded entry makes a hand's first openness sample come
            // through raw.
            let openness =
                entry.smoothed_openness + (openness_raw - entry.smoothed_openness) * factor;
            let elapsed_ms = (now - entry.timestamp_ms).max(1.0);
            let derivative = (openness - entry.smoothed_openness) / elapsed_ms;

            let raw = classify(observation, openness, &fingers, &self.config);
            if raw != entry.raw {
                entry.raw = raw;
                entry.raw_since_ms = now;
            }
            let held_ms = now - entry.raw_since_ms;
            if held_ms >= self.config.min_gesture_duration_ms {
                entry.reported = entry.raw;
            }

            entry.smoothed_openness = openness;
            entry.timestamp_ms = now;
            let reported = entry.reported;

            hand.fingers = fingers;
            hand.openness = OpennessState {
                value: openness,
                derivative,
            };
            hand.gesture = GestureReport {
                gesture: reported,
                confidence: confidence_for(reported, openness, fingers.extended_count),
                duration_ms: held_ms,
            };
        }

        self.history
            .retain(|id, _| frame.hands.iter().any(|obs| obs.id == *id));
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Interior angle at `vertex` formed by `a` and `b`, in radians.
///
/// Degenerate (zero-length) segments yield 0.0 rather than NaN, so a
/// collapsed landmark reads as fully bent.
fn interior_angle(a: LandmarkPoint, vertex: LandmarkPoint, b: LandmarkPoint) -> f64 {
    let ux = a.x - vertex.x;
    let uy = a.y - vertex.y;
    let uz = a.z - vertex.z;
    let vx = b.x - vertex.x;
    let vy = b.y - vertex.y;
    let vz = b.z - vertex.z;

    let norm_u = (ux * ux + uy * uy + uz * uz).sqrt();
    let norm_v = (vx * vx + vy * vy + vz * vz).sqrt();
    if norm_u <= f64::EPSILON || norm_v <= f64::EPSILON {
        return 0.0;
    }

    let cos = ((ux * vx + uy * vy + uz * vz) / (norm_u * norm_v)).clamp(-1.0, 1.0);
    cos.acos()
}

/// A finger is extended when both its interior joints are near straight.
fn finger_extended(
    hand: &HandObservation,
    mcp: usize,
    pip: usize,
    dip: usize,
    tip: usize,
    min_angle_rad: f64,
) -> bool {
    let pip_angle = interior_angle(hand.landmark(mcp), hand.landmark(pip), hand.landmark(dip));
    let dip_angle = interior_angle(hand.landmark(pip), hand.landmark(dip), hand.landmark(tip));
    pip_angle > min_angle_rad && dip_angle > min_angle_rad
}

/// The thumb has no usable interior angles; it counts as extended when
/// its tip is farther from the wrist than both of its lower joints.
fn thumb_extended(hand: &HandObservation) -> bool {
    let wrist = hand.wrist();
    let tip = hand.landmark(THUMB_TIP).distance_2d(&wrist);
    tip > hand.landmark(THUMB_IP).distance_2d(&wrist)
        && tip > hand.landmark(THUMB_MCP).distance_2d(&wrist)
}

fn detect_fingers(hand: &HandObservation, min_angle_rad: f64) -> FingerFlags {
    FingerFlags::from_flags(
        thumb_extended(hand),
        finger_extended(hand, INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP, min_angle_rad),
        finger_extended(
            hand,
            MIDDLE_MCP,
            MIDDLE_PIP,
            MIDDLE_DIP,
            MIDDLE_TIP,
            min_angle_rad,
        ),
        finger_extended(hand, RING_MCP, RING_PIP, RING_DIP, RING_TIP, min_angle_rad),
        finger_extended(hand, PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP, min_angle_rad),
    )
}

/// Mean fingertip-to-wrist distance remapped onto `[0.0, 1.0]` between
/// the configured closed and open reference distances.
fn raw_openness(hand: &HandObservation, closed_distance: f64, open_distance: f64) -> f64 {
    let band = open_distance - closed_distance;
    if band <= f64::EPSILON {
        return 0.0;
    }

    let wrist = hand.wrist();
    let mean: f64 = FINGERTIPS
        .iter()
        .map(|&index| hand.landmark(index).distance_2d(&wrist))
        .sum::<f64>()
        / FINGERTIPS.len() as f64;

    ((mean - closed_distance) / band).clamp(0.0, 1.0)
}

/// Fixed-priority ladder, first match wins: pinch beats the counted
/// shapes, counted shapes beat the openness-driven ones.
fn classify(
    hand: &HandObservation,
    openness: f64,
    fingers: &FingerFlags,
    config: &GestureConfig,
) -> GestureType {
    let pinch_distance = hand.thumb_tip().distance_2d(&hand.index_tip());
    if pinch_distance < config.pinch_threshold {
        return GestureType::Pinch;
    }

    let count = fingers.extended_count;
    if count == 0 && openness < config.fist_openness_max {
        return GestureType::ClosedFist;
    }
    if fingers.thumb && count == 1 {
        return GestureType::ThumbsUp;
    }
    if fingers.index && count == 1 {
        return GestureType::Pointing;
    }
    if fingers.index && fingers.middle && count == 2 {
        return GestureType::Peace;
    }
    if count >= 4 && openness > config.open_openness_min {
        return GestureType::OpenHand;
    }
    GestureType::None
}

fn confidence_for(gesture: GestureType, openness: f64, extended_count: u8) -> f64 {
    match gesture {
        GestureType::Pinch => 0.9,
        GestureType::ClosedFist => {
            ((1.0 - openness) * f64::from(5 - extended_count.min(5)) / 5.0).clamp(0.0, 1.0)
        }
        GestureType::ThumbsUp | GestureType::Pointing | GestureType::Peace => 0.8,
        GestureType::OpenHand => openness.clamp(0.0, 1.0),
        GestureType::None => 0.0,
    }
}
