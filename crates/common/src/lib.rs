//! Handsense Common Utilities
//!
//! Shared infrastructure for all handsense crates:
//! - Error types and result aliases
//! - Clock and tick-rate utilities for frame stamping
//! - Tracing/logging initialization
//! - Logging configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
