//! Drives the control engine from a synthetic landmark provider.
//!
//! A scripted right hand sweeps left to right at 30 ticks per second;
//! the thumb-index gap closes during the middle third of the sweep, so
//! the log shows the reported gesture flip to a pinch and back. The
//! provider simulates a fast camera callback throttled down to the
//! pipeline rate.
//!
//! Run with:
//!   cargo run -p handsense-interpret-core --example synthetic_stream

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::sleep;

use handsense_common::{FrameRateGate, LoggingConfig, TickClock};
use handsense_frame_model::{
    Frame, HandObservation, Handedness, LandmarkPoint, INDEX_TIP, LANDMARK_COUNT, THUMB_TIP,
};
use handsense_interpret_core::ControlEngine;

const TICKS: u32 = 90;
const PIPELINE_HZ: u32 = 30;

/// One scripted observation at the given sweep phase in [0, 1).
fn scripted_hand(phase: f64) -> HandObservation {
    let x = 0.2 + 0.6 * phase;
    let y = 0.5;
    let mut landmarks = vec![LandmarkPoint::new(x, y, 0.3); LANDMARK_COUNT];

    // Thumb and index pinch together in the middle third.
    let gap = if (0.33..0.66).contains(&phase) { 0.01 } else { 0.12 };
    landmarks[THUMB_TIP] = LandmarkPoint::new(x - gap / 2.0, y + 0.05, 0.3);
    landmarks[INDEX_TIP] = LandmarkPoint::new(x + gap / 2.0, y + 0.05, 0.3);

    HandObservation::new(1, Handedness::Right, landmarks, 0.95)
}

#[tokio::main]
async fn main() -> Result<()> {
    handsense_common::logging::init_logging(&LoggingConfig::with_level("info"));

    let mut engine = ControlEngine::with_defaults();
    let mut updates = engine.subscribe();
    let (frames_tx, frames_rx) = mpsc::channel(16);
    engine.start(frames_rx);

    // Provider task: a ~120 Hz callback gated down to the pipeline rate,
    // stamping each frame off the shared monotonic epoch.
    let provider = tokio::spawn(async move {
        let clock = TickClock::start();
        let mut gate = FrameRateGate::new(PIPELINE_HZ);
        let mut sent = 0u32;
        while sent < TICKS {
            let now_ms = clock.elapsed_ms();
            if gate.should_tick(now_ms) {
                let phase = f64::from(sent) / f64::from(TICKS);
                let frame = Frame::new(now_ms, vec![scripted_hand(phase)]);
                if frames_tx.send(frame).await.is_err() {
                    break;
                }
                sent += 1;
            }
            sleep(Duration::from_millis(8)).await;
        }
    });

    for _ in 0..TICKS {
        let state = updates.recv().await?;
        if let Some(hand) = state.primary_hand() {
            let pinch = state.distances().and_then(|snapshot| snapshot.primary_pinch);
            tracing::info!(
                t = state.timestamp_ms,
                x = hand.position.x,
                vx = hand.velocity.vx,
                gesture = hand.gesture.gesture.as_str(),
                pinch = ?pinch,
                "tick"
            );
        }
    }

    provider.await?;
    engine.stop();
    Ok(())
}
