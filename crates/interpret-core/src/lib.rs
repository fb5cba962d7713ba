//! Handsense Interpretation Core
//!
//! Turns raw hand-landmark frames into a semantic control state:
//! - **Position:** smoothed per-hand position, velocity, depth, rotation
//! - **Gesture:** finger extension, openness, hysteresis-gated gestures
//! - **Distance:** normalized pinch and inter-hand distance metrics
//!
//! The stages are pure computation over per-hand history and run in a
//! fixed order inside [`InterpretPipeline`]. [`ControlEngine`] adds
//! lifecycle on top: it drains a frame source and publishes one
//! [`handsense_frame_model::ControlState`] per tick.

pub mod distance;
pub mod engine;
pub mod gesture;
pub mod position;
pub mod stage;

pub use distance::{DistanceConfig, DistanceMeasurer};
pub use engine::{
    ControlEngine, EngineState, InterpretConfig, InterpretConfigPatch, InterpretPipeline,
};
pub use gesture::{GestureClassifier, GestureConfig};
pub use position::{PositionConfig, PositionMode, PositionTracker};
pub use stage::InterpretStage;
