/// Axis-aligned box in source pixel space (origin at the top-left of the
/// raw capture, before any mirror correction).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One classifier output for a single frame.
///
/// Produced fresh each frame by the detector backend and discarded after one
/// pipeline pass.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Object class label as reported by the classifier (e.g. "person").
    pub label: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
    /// Location in source pixel space.
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}
