use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// The classifier itself is an opaque capability: model format, inference
/// runtime and labels are the backend's business. The pipeline only consumes
/// this contract.
///
/// Implementations must treat the frame as read-only and ephemeral, and must
/// report detections in the frame's own pixel space.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry selection and logging.
    fn name(&self) -> &'static str;

    /// Returns true once the model is loaded and `detect` may be called.
    ///
    /// The frame loop defers ticks while this is false; it never treats a
    /// not-yet-ready backend as an error.
    fn is_ready(&self) -> bool {
        true
    }

    /// Optional warm-up hook (model load, first-inference priming).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}
