//! End-to-end flows through the interpretation pipeline and the engine.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use handsense_frame_model::{
    parse_frames, serialize_frames, ControlState, Frame, GestureType, HandObservation, Handedness,
    LandmarkPoint, INDEX_MCP, LANDMARK_COUNT, MIDDLE_MCP, PINKY_MCP, RING_MCP, THUMB_CMC,
    THUMB_IP, THUMB_MCP, THUMB_TIP,
};
use handsense_interpret_core::{
    ControlEngine, EngineState, GestureConfig, InterpretConfig, InterpretPipeline,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// All landmarks on one point, enough for motion and distance flows.
fn uniform_hand(id: u64, x: f64, y: f64) -> HandObservation {
    HandObservation::new(
        id,
        Handedness::Right,
        vec![LandmarkPoint::new(x, y, 0.3); LANDMARK_COUNT],
        0.95,
    )
}

/// A recognizable right hand: open spreads every finger, closed curls
/// them all into a fist.
fn posed_hand(id: u64, open: bool) -> HandObservation {
    let mut points = [(0.50_f64, 0.80_f64); LANDMARK_COUNT];
    points[THUMB_CMC] = (0.44, 0.76);
    points[THUMB_MCP] = (0.40, 0.72);
    points[THUMB_IP] = (0.38, 0.69);
    points[THUMB_TIP] = if open { (0.32, 0.63) } else { (0.43, 0.73) };

    for (mcp_index, mcp) in [
        (INDEX_MCP, (0.42, 0.60)),
        (MIDDLE_MCP, (0.50, 0.58)),
        (RING_MCP, (0.58, 0.60)),
        (PINKY_MCP, (0.64, 0.63)),
    ] {
        points[mcp_index] = mcp;
        let (pip, dip, tip) = if open {
            (
                (mcp.0, mcp.1 - 0.08),
                (mcp.0, mcp.1 - 0.14),
                (mcp.0, mcp.1 - 0.20),
            )
        } else {
            (
                (mcp.0, mcp.1 - 0.05),
                (mcp.0 + 0.02, mcp.1 - 0.03),
                (mcp.0 + 0.02, mcp.1 + 0.03),
            )
        };
        points[mcp_index + 1] = pip;
        points[mcp_index + 2] = dip;
        points[mcp_index + 3] = tip;
    }

    let landmarks = points
        .iter()
        .map(|&(x, y)| LandmarkPoint::new(x, y, 0.35))
        .collect();
    HandObservation::new(id, Handedness::Right, landmarks, 0.95)
}

#[test]
fn test_tracking_scenario_end_to_end() {
    let mut pipeline = InterpretPipeline::with_defaults();

    // Empty stream before any hand arrives.
    let idle = pipeline.process(&Frame::empty(0.0));
    assert!(!idle.has_active_hand);
    assert!(idle.hands.is_empty());

    // A hand appears: first sample reported raw, at rest.
    let appear = pipeline.process(&Frame::new(33.0, vec![uniform_hand(1, 0.5, 0.5)]));
    assert!(appear.has_active_hand);
    let hand = appear.primary_hand().unwrap();
    assert!((hand.position.x - 0.5).abs() < 1e-9);
    assert_eq!(hand.velocity.magnitude, 0.0);

    // Holding still: the clock advances, velocity stays zero.
    let still = pipeline.process(&Frame::new(66.0, vec![uniform_hand(1, 0.5, 0.5)]));
    assert_eq!(still.delta_ms, 33.0);
    assert_eq!(still.primary_hand().unwrap().velocity.magnitude, 0.0);

    // A sweep to the right produces rightward velocity.
    let sweep = pipeline.process(&Frame::new(100.0, vec![uniform_hand(1, 0.8, 0.5)]));
    let moving = sweep.primary_hand().unwrap();
    assert!(moving.velocity.vx > 0.0);
    assert!(moving.velocity.magnitude > 0.0);

    // A second hand joins and the inter-hand metrics light up.
    let joined = pipeline.process(&Frame::new(
        133.0,
        vec![uniform_hand(1, 0.8, 0.5), uniform_hand(2, 0.2, 0.5)],
    ));
    assert_eq!(joined.hands.len(), 2);
    assert_eq!(joined.secondary_hand().unwrap().hand_id, 2);
    assert!(joined.distances().unwrap().palm_to_palm.is_some());

    // Back to one hand: the pair metrics lapse, tracking carries on.
    let solo = pipeline.process(&Frame::new(166.0, vec![uniform_hand(1, 0.8, 0.5)]));
    assert!(solo.has_active_hand);
    assert!(solo.distances().unwrap().palm_to_palm.is_none());
    assert!(solo.distances().unwrap().primary_pinch.is_some());

    // Total dropout.
    let gone = pipeline.process(&Frame::empty(200.0));
    assert!(!gone.has_active_hand);
    assert!(gone.hands.is_empty());
}

#[test]
fn test_gesture_confirmation_through_pipeline() {
    let config = InterpretConfig {
        gesture: GestureConfig {
            openness_smoothing: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pipeline = InterpretPipeline::new(config);
    let fist = posed_hand(1, false);

    // The fist must outlive the hold window before it is reported.
    let first = pipeline.process(&Frame::new(0.0, vec![fist.clone()]));
    assert_eq!(first.primary_hand().unwrap().gesture.gesture, GestureType::None);

    pipeline.process(&Frame::new(80.0, vec![fist.clone()]));

    let confirmed = pipeline.process(&Frame::new(180.0, vec![fist]));
    let hand = confirmed.primary_hand().unwrap();
    assert_eq!(hand.gesture.gesture, GestureType::ClosedFist);
    assert_eq!(hand.gesture.duration_ms, 180.0);
    assert_eq!(hand.fingers.extended_count, 0);
    assert!(hand.openness.value < 0.3);

    // Opening the hand: the confirmed report holds until the window
    // passes again, then flips.
    let open = posed_hand(1, true);
    let flip = pipeline.process(&Frame::new(213.0, vec![open.clone()]));
    assert_eq!(flip.primary_hand().unwrap().gesture.gesture, GestureType::ClosedFist);

    let settled = pipeline.process(&Frame::new(380.0, vec![open]));
    let hand = settled.primary_hand().unwrap();
    assert_eq!(hand.gesture.gesture, GestureType::OpenHand);
    assert_eq!(hand.fingers.extended_count, 5);
    assert!(hand.openness.value > 0.7);
}

#[test]
fn test_recorded_stream_replays_identically() {
    let frames = vec![
        Frame::empty(0.0),
        Frame::new(33.0, vec![uniform_hand(1, 0.4, 0.5)]),
        Frame::new(66.0, vec![uniform_hand(1, 0.5, 0.5)]),
        Frame::new(100.0, vec![uniform_hand(1, 0.5, 0.5), uniform_hand(2, 0.7, 0.5)]),
    ];

    let jsonl = serialize_frames(&frames).unwrap();
    let replayed = parse_frames(&jsonl).unwrap();
    assert_eq!(replayed.len(), frames.len());

    let mut live = InterpretPipeline::with_defaults();
    let mut offline = InterpretPipeline::with_defaults();
    for (original, decoded) in frames.iter().zip(&replayed) {
        assert_eq!(live.process(original), offline.process(decoded));
    }
}

#[tokio::test]
async fn test_engine_publishes_each_frame_in_order() {
    let mut engine = ControlEngine::with_defaults();
    let mut updates = engine.subscribe();
    let (frames_tx, frames_rx) = mpsc::channel(8);

    engine.start(frames_rx);
    assert_eq!(engine.state(), EngineState::Running);

    frames_tx
        .send(Frame::new(0.0, vec![uniform_hand(1, 0.3, 0.5)]))
        .await
        .unwrap();
    frames_tx
        .send(Frame::new(33.0, vec![uniform_hand(1, 0.6, 0.5)]))
        .await
        .unwrap();

    let first = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(first.timestamp_ms, 0.0);
    assert!(first.has_active_hand);

    let second = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(second.timestamp_ms, 33.0);
    assert_eq!(second.delta_ms, 33.0);
    assert!(second.primary_hand().unwrap().velocity.magnitude > 0.0);

    // The latest state is also readable without subscribing.
    assert_eq!(engine.current_state().timestamp_ms, 33.0);

    engine.stop();
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_engine_reset_publishes_empty_state() {
    let mut engine = ControlEngine::with_defaults();
    let mut updates = engine.subscribe();
    let (frames_tx, frames_rx) = mpsc::channel(8);
    engine.start(frames_rx);

    frames_tx
        .send(Frame::new(100.0, vec![uniform_hand(1, 0.4, 0.4)]))
        .await
        .unwrap();
    let tick = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert!(tick.has_active_hand);

    engine.reset();
    let cleared = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert!(!cleared.has_active_hand);
    assert!(cleared.hands.is_empty());
    assert_eq!(engine.current_state(), ControlState::empty());
    assert_eq!(engine.state(), EngineState::Running);

    // The next frame starts the clock from scratch.
    frames_tx
        .send(Frame::new(500.0, vec![uniform_hand(1, 0.4, 0.4)]))
        .await
        .unwrap();
    let fresh = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(fresh.delta_ms, 0.0);
    assert_eq!(fresh.primary_hand().unwrap().velocity.magnitude, 0.0);
}

#[tokio::test]
async fn test_engine_restart_switches_sources() {
    let mut engine = ControlEngine::with_defaults();
    let (first_tx, first_rx) = mpsc::channel::<Frame>(8);
    engine.start(first_rx);

    let (second_tx, second_rx) = mpsc::channel(8);
    engine.start(second_rx);
    assert_eq!(engine.state(), EngineState::Running);

    let mut updates = engine.subscribe();
    second_tx
        .send(Frame::new(777.0, vec![uniform_hand(3, 0.5, 0.5)]))
        .await
        .unwrap();

    let state = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(state.timestamp_ms, 777.0);
    assert_eq!(state.primary_hand().unwrap().hand_id, 3);

    drop(first_tx);
}

#[tokio::test]
async fn test_engine_reconfigure_applies_to_next_tick() {
    let mut engine = ControlEngine::with_defaults();
    let mut updates = engine.subscribe();
    let (frames_tx, frames_rx) = mpsc::channel(8);
    engine.start(frames_rx);

    let patch = serde_json::from_str(r#"{"gesture":{"min_gesture_duration_ms":0.0}}"#).unwrap();
    engine.reconfigure(&patch);
    assert_eq!(engine.config().gesture.min_gesture_duration_ms, 0.0);

    // With the hold window gone, a fist is reported on its first tick.
    frames_tx
        .send(Frame::new(0.0, vec![posed_hand(1, false)]))
        .await
        .unwrap();
    let state = timeout(RECV_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(
        state.primary_hand().unwrap().gesture.gesture,
        GestureType::ClosedFist
    );
}
