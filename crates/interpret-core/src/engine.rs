//! Pipeline orchestration and the control engine.
//!
//! [`InterpretPipeline`] is the synchronous core: it runs the three
//! stages in fixed order (position, then gesture, then distance) and
//! tracks elapsed time between frames. [`ControlEngine`] wraps it with
//! lifecycle: it drains a frame source on a worker task, publishes every
//! tick on a broadcast channel, and keeps the latest state readable
//! without waiting.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};

use handsense_common::HandsenseResult;
use handsense_frame_model::{ControlState, Frame};

use crate::distance::{DistanceConfig, DistanceMeasurer};
use crate::gesture::{GestureClassifier, GestureConfig};
use crate::position::{PositionConfig, PositionMode, PositionTracker};
use crate::stage::InterpretStage;

/// Published states buffered per subscriber before lag kicks in.
const BROADCAST_CAPACITY: usize = 64;

/// Full tuning configuration across the three stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpretConfig {
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub distance: DistanceConfig,
}

impl InterpretConfig {
    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> HandsenseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from a JSON file, falling back to defaults with a warning
    /// when the file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to load config, using defaults");
                }
            }
        }
        Self::default()
    }

    /// Save configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save_to_file(&self, path: &Path) -> HandsenseResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Merge a partial patch over this configuration.
    pub fn apply_patch(&mut self, patch: &InterpretConfigPatch) {
        if let Some(position) = &patch.position {
            position.apply_to(&mut self.position);
        }
        if let Some(gesture) = &patch.gesture {
            gesture.apply_to(&mut self.gesture);
        }
        if let Some(distance) = &patch.distance {
            distance.apply_to(&mut self.distance);
        }
    }
}

/// Partial update for [`InterpretConfig`]; unset fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpretConfigPatch {
    #[serde(default)]
    pub position: Option<PositionPatch>,
    #[serde(default)]
    pub gesture: Option<GesturePatch>,
    #[serde(default)]
    pub distance: Option<DistancePatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionPatch {
    #[serde(default)]
    pub mode: Option<PositionMode>,
    #[serde(default)]
    pub smoothing_factor: Option<f64>,
    #[serde(default)]
    pub jitter_threshold: Option<f64>,
}

impl PositionPatch {
    fn apply_to(&self, config: &mut PositionConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(smoothing_factor) = self.smoothing_factor {
            config.smoothing_factor = smoothing_factor;
        }
        if let Some(jitter_threshold) = self.jitter_threshold {
            config.jitter_threshold = jitter_threshold;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GesturePatch {
    #[serde(default)]
    pub extension_angle_rad: Option<f64>,
    #[serde(default)]
    pub pinch_threshold: Option<f64>,
    #[serde(default)]
    pub fist_openness_max: Option<f64>,
    #[serde(default)]
    pub open_openness_min: Option<f64>,
    #[serde(default)]
    pub openness_closed_distance: Option<f64>,
    #[serde(default)]
    pub openness_open_distance: Option<f64>,
    #[serde(default)]
    pub openness_smoothing: Option<f64>,
    #[serde(default)]
    pub min_gesture_duration_ms: Option<f64>,
}

impl GesturePatch {
    fn apply_to(&self, config: &mut GestureConfig) {
        if let Some(extension_angle_rad) = self.extension_angle_rad {
            config.extension_angle_rad = extension_angle_rad;
        }
        if let Some(pinch_threshold) = self.pinch_threshold {
            config.pinch_threshold = pinch_threshold;
        }
        if let Some(fist_openness_max) = self.fist_openness_max {
            config.fist_openness_max = fist_openness_max;
        }
        if let Some(open_openness_min) = self.open_openness_min {
            config.open_openness_min = open_openness_min;
        }
        if let Some(openness_closed_distance) = self.openness_closed_distance {
            config.openness_closed_distance = openness_closed_distance;
        }
        if let Some(openness_open_distance) = self.openness_open_distance {
            config.openness_open_distance = openness_open_distance;
        }
        if let Some(openness_smoothing) = self.openness_smoothing {
            config.openness_smoothing = openness_smoothing;
        }
        if let Some(min_gesture_duration_ms) = self.min_gesture_duration_ms {
            config.min_gesture_duration_ms = min_gesture_duration_ms;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistancePatch {
    #[serde(default)]
    pub normalize: Option<bool>,
    #[serde(default)]
    pub smoothing_factor: Option<f64>,
}

impl DistancePatch {
    fn apply_to(&self, config: &mut DistanceConfig) {
        if let Some(normalize) = self.normalize {
            config.normalize = normalize;
        }
        if let Some(smoothing_factor) = self.smoothing_factor {
            config.smoothing_factor = smoothing_factor;
        }
    }
}

/// The synchronous per-tick interpretation core.
pub struct InterpretPipeline {
    position: PositionTracker,
    gesture: GestureClassifier,
    distance: DistanceMeasurer,
    last_timestamp_ms: Option<f64>,
}

impl InterpretPipeline {
    pub fn new(config: InterpretConfig) -> Self {
        Self {
            position: PositionTracker::new(config.position),
            gesture: GestureClassifier::new(config.gesture),
            distance: DistanceMeasurer::new(config.distance),
            last_timestamp_ms: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(InterpretConfig::default())
    }

    /// Current tuning across all stages.
    pub fn config(&self) -> InterpretConfig {
        InterpretConfig {
            position: self.position.config().clone(),
            gesture: self.gesture.config().clone(),
            distance: self.distance.config().clone(),
        }
    }

    /// Retune stages in place. Per-hand history is left untouched, so a
    /// tuning change never makes a tracked hand restart from scratch.
    pub fn apply_patch(&mut self, patch: &InterpretConfigPatch) {
        if let Some(position) = &patch.position {
            position.apply_to(self.position.config_mut());
        }
        if let Some(gesture) = &patch.gesture {
            gesture.apply_to(self.gesture.config_mut());
        }
        if let Some(distance) = &patch.distance {
            distance.apply_to(self.distance.config_mut());
        }
    }

    /// Run one frame through all stages into a fresh control state.
    pub fn process(&mut self, frame: &Frame) -> ControlState {
        let delta_ms = match self.last_timestamp_ms {
            None => 0.0,
            Some(last) if frame.timestamp_ms >= last => frame.timestamp_ms - last,
            Some(last) => {
                tracing::warn!(
                    timestamp_ms = frame.timestamp_ms,
                    last_timestamp_ms = last,
                    "frame timestamp went backwards, clamping delta to zero"
                );
                0.0
            }
        };

        let mut state = ControlState::for_tick(frame.timestamp_ms, delta_ms);

        let stages: [&mut dyn InterpretStage; 3] =
            [&mut self.position, &mut self.gesture, &mut self.distance];
        for stage in stages {
            stage.process(frame, &mut state);
            tracing::trace!(stage = stage.name(), hands = state.hands.len(), "stage done");
        }

        self.last_timestamp_ms = Some(frame.timestamp_ms);
        state
    }

    /// Drop all per-hand history and the tick clock.
    pub fn reset(&mut self) {
        self.position.reset();
        self.gesture.reset();
        self.distance.reset();
        self.last_timestamp_ms = None;
    }
}

/// Lifecycle states for [`ControlEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No frame source attached.
    Idle,
    /// Attached to a frame source, publishing one state per frame.
    Running,
}

/// Drives the interpretation pipeline from a frame source.
///
/// Subscribers get every tick in order via [`ControlEngine::subscribe`];
/// [`ControlEngine::current_state`] always returns the latest published
/// state without blocking.
pub struct ControlEngine {
    pipeline: Arc<Mutex<InterpretPipeline>>,
    state: EngineState,
    broadcast_tx: broadcast::Sender<ControlState>,
    watch_tx: Arc<watch::Sender<ControlState>>,
    watch_rx: watch::Receiver<ControlState>,
    worker: Option<tokio::task::JoinHandle<()>>,
}

impl ControlEngine {
    pub fn new(config: InterpretConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (watch_tx, watch_rx) = watch::channel(ControlState::empty());
        Self {
            pipeline: Arc::new(Mutex::new(InterpretPipeline::new(config))),
            state: EngineState::Idle,
            broadcast_tx,
            watch_tx: Arc::new(watch_tx),
            watch_rx,
            worker: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(InterpretConfig::default())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Attach a frame source and start publishing per incoming frame.
    ///
    /// An already-attached source is detached first; two sources are
    /// never drained concurrently. The engine stays `Running` if the
    /// source closes, so a host can attach a fresh source later.
    pub fn start(&mut self, mut frames: mpsc::Receiver<Frame>) {
        self.detach_worker();

        let pipeline = Arc::clone(&self.pipeline);
        let broadcast_tx = self.broadcast_tx.clone();
        let watch_tx = Arc::clone(&self.watch_tx);

        self.worker = Some(tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let state = {
                    let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
                    pipeline.process(&frame)
                };
                watch_tx.send_replace(state.clone());
                // A send error only means nobody is subscribed right now.
                let _ = broadcast_tx.send(state);
            }
            tracing::info!("frame source closed");
        }));

        self.state = EngineState::Running;
        tracing::info!("control engine started");
    }

    /// Detach the frame source and go idle. Published state is kept.
    pub fn stop(&mut self) {
        self.detach_worker();
        self.state = EngineState::Idle;
        tracing::info!("control engine stopped");
    }

    /// Drop all pipeline history and publish an empty, no-hands state.
    /// Valid whether idle or running.
    pub fn reset(&self) {
        {
            let mut pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            pipeline.reset();
        }
        let empty = ControlState::empty();
        self.watch_tx.send_replace(empty.clone());
        let _ = self.broadcast_tx.send(empty);
        tracing::info!("control engine reset");
    }

    /// Merge a partial tuning patch over the running configuration.
    pub fn reconfigure(&self, patch: &InterpretConfigPatch) {
        let mut pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        pipeline.apply_patch(patch);
        tracing::info!("control engine reconfigured");
    }

    /// Current tuning across all stages.
    pub fn config(&self) -> InterpretConfig {
        self.pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .config()
    }

    /// Subscribe to the published state stream, future ticks only.
    ///
    /// A subscriber that falls more than the channel capacity behind
    /// sees [`broadcast::error::RecvError::Lagged`] and continues from
    /// the oldest retained tick.
    pub fn subscribe(&self) -> broadcast::Receiver<ControlState> {
        self.broadcast_tx.subscribe()
    }

    /// The most recently published state, without waiting.
    pub fn current_state(&self) -> ControlState {
        self.watch_rx.borrow().clone()
    }

    fn detach_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            tracing::debug!("detached previous frame source");
        }
    }
}

impl Drop for ControlEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
