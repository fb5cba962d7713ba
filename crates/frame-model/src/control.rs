//! Control state: the interpreted output published once per tick.
//!
//! `ControlState` is the boundary contract toward downstream consumers
//! (cursor drivers, UI bindings, recorders). It is rebuilt fresh every
//! tick and never mutated after publication. Hands appear in provider
//! order; the first entry is the primary hand.

use serde::{Deserialize, Serialize};

use crate::landmark::{HandId, LandmarkPoint};

/// Per-hand velocity in normalized units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityVector {
    pub vx: f64,
    pub vy: f64,
    /// Euclidean norm of `(vx, vy)`.
    pub magnitude: f64,
}

impl VelocityVector {
    /// Build from components, deriving the magnitude.
    pub fn from_components(vx: f64, vy: f64) -> Self {
        Self {
            vx,
            vy,
            magnitude: (vx * vx + vy * vy).sqrt(),
        }
    }
}

/// Which fingers are extended, plus the derived count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FingerFlags {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
    /// Number of raised flags, `0..=5`.
    pub extended_count: u8,
}

impl FingerFlags {
    /// Build from per-finger flags, deriving `extended_count`.
    pub fn from_flags(thumb: bool, index: bool, middle: bool, ring: bool, pinky: bool) -> Self {
        let mut flags = Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
            extended_count: 0,
        };
        flags.extended_count = flags.count();
        flags
    }

    /// Count of raised flags.
    pub fn count(&self) -> u8 {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|&&raised| raised)
            .count() as u8
    }
}

/// Discrete gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    Pinch,
    ClosedFist,
    ThumbsUp,
    Pointing,
    Peace,
    OpenHand,
    /// No recognized gesture.
    #[default]
    None,
}

impl GestureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::Pinch => "pinch",
            GestureType::ClosedFist => "closed_fist",
            GestureType::ThumbsUp => "thumbs_up",
            GestureType::Pointing => "pointing",
            GestureType::Peace => "peace",
            GestureType::OpenHand => "open_hand",
            GestureType::None => "none",
        }
    }
}

/// The reported gesture with confidence and raw-classification age.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureReport {
    pub gesture: GestureType,
    /// Gesture-specific confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// How long the current raw classification has persisted, in ms.
    ///
    /// Resets to zero the tick the raw classification changes, whether or
    /// not the reporting hysteresis has confirmed the change yet.
    pub duration_ms: f64,
}

/// Continuous hand-openness measure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpennessState {
    /// Smoothed openness in `[0.0, 1.0]`; 0 is a fist, 1 a spread hand.
    pub value: f64,
    /// Change in smoothed openness per millisecond.
    pub derivative: f64,
}

/// Full interpreted state for one tracked hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SingleHandState {
    pub hand_id: HandId,
    pub is_tracked: bool,
    /// Smoothed, jitter-gated position of the configured anchor.
    pub position: LandmarkPoint,
    /// Raw index fingertip position, unsmoothed for precision targeting.
    pub fingertip_position: LandmarkPoint,
    pub velocity: VelocityVector,
    pub gesture: GestureReport,
    pub fingers: FingerFlags,
    pub openness: OpennessState,
    /// Normalized proximity to the camera in `[0.0, 1.0]`; 1 is closest.
    pub depth: f64,
    /// Hand roll: angle of the wrist to middle-knuckle vector, radians.
    pub rotation_rad: f64,
}

/// The merged interpretation result published once per tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    /// Frame timestamp, in ms since stream start.
    pub timestamp_ms: f64,
    /// Elapsed ms since the previous tick; zero on the first.
    pub delta_ms: f64,
    /// Tracked hands in provider order; the first entry is primary.
    pub hands: Vec<SingleHandState>,
    pub has_active_hand: bool,
    /// Auxiliary metrics keyed by producer (for example `"distances"`).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub aux: serde_json::Map<String, serde_json::Value>,
}

impl ControlState {
    /// A state with no hands and zeroed timing, as published after reset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fresh state for one tick, before any stage has run.
    pub fn for_tick(timestamp_ms: f64, delta_ms: f64) -> Self {
        Self {
            timestamp_ms,
            delta_ms,
            ..Self::default()
        }
    }

    pub fn primary_hand(&self) -> Option<&SingleHandState> {
        self.hands.first()
    }

    pub fn secondary_hand(&self) -> Option<&SingleHandState> {
        self.hands.get(1)
    }

    /// Distance metrics attached by the distance stage, if present.
    pub fn distances(&self) -> Option<DistanceSnapshot> {
        self.aux
            .get(DistanceSnapshot::AUX_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Inter-hand and pinch distance metrics for one tick.
///
/// Stored in [`ControlState::aux`] under [`DistanceSnapshot::AUX_KEY`].
/// Two-hand metrics are `None` unless exactly two hands are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceSnapshot {
    pub palm_to_palm: Option<f64>,
    pub index_to_index: Option<f64>,
    pub thumb_to_thumb: Option<f64>,
    /// Thumb-tip to index-tip distance of the primary hand.
    pub primary_pinch: Option<f64>,
    /// Thumb-tip to index-tip distance of the secondary hand.
    pub secondary_pinch: Option<f64>,
    /// Mean wrist to middle-fingertip distance across tracked hands.
    pub avg_hand_size: f64,
}

impl DistanceSnapshot {
    /// Key under which the snapshot lives in [`ControlState::aux`].
    pub const AUX_KEY: &'static str = "distances";
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_velocity_magnitude_derived() {
        let velocity = VelocityVector::from_components(3.0, 4.0);
        assert!((velocity.magnitude - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_finger_flags_count() {
        let flags = FingerFlags::from_flags(true, true, false, false, true);
        assert_eq!(flags.extended_count, 3);
        assert_eq!(FingerFlags::default().count(), 0);
    }

    #[test]
    fn test_gesture_type_serializes_snake_case() {
        let json = serde_json::to_string(&GestureType::ClosedFist).unwrap();
        assert_eq!(json, "\"closed_fist\"");
        assert_eq!(GestureType::ThumbsUp.as_str(), "thumbs_up");
        assert_eq!(GestureType::default(), GestureType::None);
    }

    #[test]
    fn test_primary_and_secondary_follow_order() {
        let mut state = ControlState::for_tick(100.0, 33.0);
        assert!(state.primary_hand().is_none());

        state.hands.push(SingleHandState {
            hand_id: 11,
            ..Default::default()
        });
        assert!(state.secondary_hand().is_none());

        state.hands.push(SingleHandState {
            hand_id: 22,
            ..Default::default()
        });

        assert_eq!(state.primary_hand().unwrap().hand_id, 11);
        assert_eq!(state.secondary_hand().unwrap().hand_id, 22);
    }

    #[test]
    fn test_empty_state_has_no_hands() {
        let state = ControlState::empty();
        assert!(!state.has_active_hand);
        assert!(state.hands.is_empty());
        assert_eq!(state.timestamp_ms, 0.0);
        assert!(state.distances().is_none());
    }

    #[test]
    fn test_distances_roundtrip_through_aux() {
        let snapshot = DistanceSnapshot {
            palm_to_palm: Some(1.25),
            primary_pinch: Some(0.4),
            avg_hand_size: 0.3,
            ..Default::default()
        };

        let mut state = ControlState::for_tick(50.0, 16.7);
        state.aux.insert(
            DistanceSnapshot::AUX_KEY.to_string(),
            serde_json::to_value(snapshot).unwrap(),
        );

        let restored = state.distances().unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_empty_aux_omitted_from_json() {
        let json = serde_json::to_string(&ControlState::empty()).unwrap();
        assert!(!json.contains("\"aux\""));
    }

    proptest! {
        #[test]
        fn prop_extended_count_matches_flags(
            thumb in any::<bool>(),
            index in any::<bool>(),
            middle in any::<bool>(),
            ring in any::<bool>(),
            pinky in any::<bool>(),
        ) {
            let flags = FingerFlags::from_flags(thumb, index, middle, ring, pinky);
            let expected =
                [thumb, index, middle, ring, pinky].iter().filter(|&&raised| raised).count();
            prop_assert_eq!(flags.extended_count as usize, expected);
            prop_assert!(flags.extended_count <= 5);
        }
    }
}
