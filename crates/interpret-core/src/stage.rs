//! The stage seam the interpretation pipeline is built around.

use handsense_frame_model::{ControlState, Frame};

/// One step of the per-tick interpretation pipeline.
///
/// Stages run in a fixed order and communicate only through the shared
/// [`ControlState`] under construction: each stage reads the frame plus
/// whatever earlier stages wrote, and adds its own fields. Per-hand
/// history lives inside the stage and is keyed by hand id.
pub trait InterpretStage: Send {
    /// Stable stage name for logs.
    fn name(&self) -> &'static str;

    /// Fold one frame into the state under construction.
    fn process(&mut self, frame: &Frame, state: &mut ControlState);

    /// Drop all per-hand history, as if no hand had ever been seen.
    fn reset(&mut self);
}
