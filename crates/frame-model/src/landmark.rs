//! Hand landmark types and the fixed 21-point topology.
//!
//! The landmark layout follows the MediaPipe Hands convention: wrist
//! first, then four joints per finger from thumb to pinky, base to tip.
//! `x` and `y` are normalized to `[0.0, 1.0]` relative to the capture
//! frame; `z` is relative depth where smaller values are closer to the
//! camera.

use serde::{Deserialize, Serialize};

/// Stable correlation key for one physical hand across frames.
pub type HandId = u64;

// Landmark indices for the 21-point hand topology.
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Fingertip landmarks, thumb through pinky.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// A single skeletal point of a tracked hand.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    /// Relative depth; smaller values are closer to the camera.
    pub z: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane, ignoring depth.
    pub fn distance_2d(&self, other: &LandmarkPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Left/right label assigned by the upstream landmark provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// One hand's worth of landmarks for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    /// Correlates the same physical hand across consecutive frames.
    pub id: HandId,
    pub handedness: Handedness,
    /// The 21 landmarks in topology order.
    pub landmarks: Vec<LandmarkPoint>,
    /// Provider confidence in `[0.0, 1.0]`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl HandObservation {
    pub fn new(
        id: HandId,
        handedness: Handedness,
        landmarks: Vec<LandmarkPoint>,
        confidence: f64,
    ) -> Self {
        Self {
            id,
            handedness,
            landmarks,
            confidence,
        }
    }

    /// Landmark at `index`, substituting the origin for missing points.
    ///
    /// Providers occasionally deliver short landmark lists mid-glitch; a
    /// defaulted point degrades the derived metrics for one tick instead
    /// of dropping the whole hand.
    pub fn landmark(&self, index: usize) -> LandmarkPoint {
        self.landmarks.get(index).copied().unwrap_or_default()
    }

    pub fn wrist(&self) -> LandmarkPoint {
        self.landmark(WRIST)
    }

    pub fn thumb_tip(&self) -> LandmarkPoint {
        self.landmark(THUMB_TIP)
    }

    pub fn index_tip(&self) -> LandmarkPoint {
        self.landmark(INDEX_TIP)
    }

    pub fn middle_tip(&self) -> LandmarkPoint {
        self.landmark(MIDDLE_TIP)
    }

    /// Palm center: mean of the wrist and the four non-thumb knuckles.
    pub fn palm_center(&self) -> LandmarkPoint {
        let anchors = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
        let mut x = 0.0;
        let mut y = 0.0;
        let mut z = 0.0;
        for &index in &anchors {
            let point = self.landmark(index);
            x += point.x;
            y += point.y;
            z += point.z;
        }
        let n = anchors.len() as f64;
        LandmarkPoint::new(x / n, y / n, z / n)
    }

    /// Wrist to middle-fingertip distance, the hand-size reference scalar.
    pub fn hand_size(&self) -> f64 {
        self.wrist().distance_2d(&self.middle_tip())
    }

    /// The five fingertip positions, thumb through pinky.
    pub fn fingertips(&self) -> [LandmarkPoint; 5] {
        FINGERTIPS.map(|index| self.landmark(index))
    }

    /// Mean relative depth across the landmarks present (0.0 when empty).
    pub fn mean_z(&self) -> f64 {
        if self.landmarks.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.landmarks.iter().map(|point| point.z).sum();
        sum / self.landmarks.len() as f64
    }
}
