//! Frame types for the hand-landmark stream.
//!
//! A frame is what the upstream landmark provider delivers per inference
//! tick (typically around 30 per second): zero to two hand observations
//! plus timing. Recorded streams use append-only JSONL with one frame per
//! line and an optional `# `-prefixed header line carrying stream
//! metadata.

use serde::{Deserialize, Serialize};

use crate::landmark::HandObservation;

/// A single tick of hand observations from the landmark provider.
///
/// Timestamps are fractional milliseconds since the provider started and
/// are non-decreasing across consecutive frames of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Milliseconds since stream start.
    #[serde(rename = "t")]
    pub timestamp_ms: f64,

    /// Time the provider spent on inference for this frame, in ms.
    #[serde(rename = "proc_ms", default)]
    pub processing_duration_ms: f64,

    /// Zero to two hands observed this tick.
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

impl Frame {
    pub fn new(timestamp_ms: f64, hands: Vec<HandObservation>) -> Self {
        Self {
            timestamp_ms,
            processing_duration_ms: 0.0,
            hands,
        }
    }

    /// A frame with no hands (tracking dropout or startup).
    pub fn empty(timestamp_ms: f64) -> Self {
        Self::new(timestamp_ms, Vec::new())
    }
}

/// Stream metadata written as a `# `-prefixed first line of a JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// Wall-clock time at stream start (RFC 3339).
    pub epoch_wall: String,
    /// Identifier of the landmark provider that produced the stream.
    pub provider: String,
    /// Nominal inference rate in Hz.
    pub nominal_fps: u32,
}

impl FrameStreamHeader {
    /// Header stamped with the current wall-clock time.
    pub fn new(provider: impl Into<String>, nominal_fps: u32) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
            provider: provider.into(),
            nominal_fps,
        }
    }
}

/// Parse frames from JSONL content (one JSON object per line).
///
/// Blank lines and `#` comment lines, including the stream header, are
/// skipped.
pub fn parse_frames(jsonl: &str) -> Result<Vec<Frame>, serde_json::Error> {
    let mut frames = Vec::new();
    for line in jsonl.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        frames.push(serde_json::from_str(trimmed)?);
    }
    Ok(frames)
}

/// Serialize frames to JSONL, one frame per line.
pub fn serialize_frames(frames: &[Frame]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

/// Serialize a full stream: header comment line, then one frame per line.
pub fn serialize_stream(
    header: &FrameStreamHeader,
    frames: &[Frame],
) -> Result<String, serde_json::Error> {
    let mut output = format!("# {}\n", serde_json::to_string(header)?);
    output.push_str(&serialize_frames(frames)?);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{HandObservation, Handedness, LandmarkPoint, LANDMARK_COUNT};

    fn sample_hand(id: u64) -> HandObservation {
        HandObservation::new(
            id,
            Handedness::Right,
            vec![LandmarkPoint::new(0.5, 0.5, 0.3); LANDMARK_COUNT],
            0.95,
        )
    }

    #[test]
    fn test_frame_serialization_roundtrip() {
        let frames = vec![
            Frame::empty(0.0),
            Frame::new(33.4, vec![sample_hand(1)]),
            Frame::new(66.7, vec![sample_hand(1), sample_hand(2)]),
        ];

        let jsonl = serialize_frames(&frames).unwrap();
        let parsed = parse_frames(&jsonl).unwrap();
        assert_eq!(parsed, frames);
    }

    #[test]
    fn test_timestamp_uses_short_key() {
        let json = serde_json::to_string(&Frame::empty(12.5)).unwrap();
        assert!(json.contains("\"t\":12.5"));
        assert!(!json.contains("timestamp_ms"));
    }

    #[test]
    fn test_parse_skips_header_and_blank_lines() {
        let jsonl = concat!(
            "# {\"schema_version\":\"1.0\",\"epoch_wall\":\"2026-01-01T00:00:00Z\",",
            "\"provider\":\"replay\",\"nominal_fps\":30}\n",
            "\n",
            "{\"t\":0.0}\n",
            "{\"t\":33.3,\"hands\":[]}\n",
        );
        let frames = parse_frames(jsonl).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp_ms, 0.0);
        assert!(frames[0].hands.is_empty());
    }

    #[test]
    fn test_stream_includes_header_line() {
        let header = FrameStreamHeader::new("test-provider", 30);
        let stream = serialize_stream(&header, &[Frame::empty(1.0)]).unwrap();
        assert!(stream.starts_with("# "));
        assert!(stream.contains("test-provider"));

        // The header line must survive a roundtrip as a comment.
        let frames = parse_frames(&stream).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let frame: Frame = serde_json::from_str(r#"{"t":5.0}"#).unwrap();
        assert_eq!(frame.processing_duration_ms, 0.0);
        assert!(frame.hands.is_empty());
    }
}
