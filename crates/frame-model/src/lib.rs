//! Handsense Frame Model
//!
//! Defines the boundary data contracts for the interpretation pipeline:
//! - **Landmarks:** the fixed 21-point hand topology and geometry helpers
//! - **Frames:** per-tick observations from the landmark provider, with a
//!   JSONL stream format for fixtures and offline replay
//! - **Control state:** the interpreted per-tick output toward effectors
//!
//! All coordinates are normalized to `[0.0, 1.0]` relative to the capture
//! frame; timestamps are fractional milliseconds since stream start.

pub mod control;
pub mod frame;
pub mod landmark;

pub use control::*;
pub use frame::*;
pub use landmark::*;
