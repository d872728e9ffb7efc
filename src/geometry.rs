//! Bounding-box coordinate handling.
//!
//! Classifiers report boxes in raw capture space. When the rendering surface
//! mirrors the camera image (selfie-style front camera), raw coordinates are
//! horizontally flipped relative to what the user sees, so left/right cues
//! computed from them would be reversed. `normalize` folds that correction
//! into one place; all mirror math is done against the capture-frame width.
//!
//! `project` additionally maps a normalized box onto a display surface whose
//! size differs from the native capture resolution.

use crate::detect::BoundingBox;

/// Box in the left-origin coordinate space of the displayed view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedBox {
    pub fn center_x(&self) -> f32 {
        self.left + self.width / 2.0
    }
}

/// Placement and size of the display surface, in display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Map a raw box into the displayed view's coordinate space.
///
/// For a mirrored view the left edge becomes
/// `frame_width - (x + width)`; top, width and height pass through unchanged.
pub fn normalize(raw: &BoundingBox, frame_width: f32, mirrored: bool) -> NormalizedBox {
    let left = if mirrored {
        frame_width - (raw.x + raw.width)
    } else {
        raw.x
    };
    NormalizedBox {
        left,
        top: raw.y,
        width: raw.width,
        height: raw.height,
    }
}

/// Scale a normalized box from native capture resolution onto a display
/// surface of a different size.
pub fn project(
    norm: &NormalizedBox,
    frame_width: f32,
    frame_height: f32,
    display: &DisplayRect,
) -> NormalizedBox {
    NormalizedBox {
        left: display.left + norm.left * display.width / frame_width,
        top: display.top + norm.top * display.height / frame_height,
        width: norm.width * display.width / frame_width,
        height: norm.height * display.height / frame_height,
    }
}

/// Coarse horizontal position bucket used for spoken directional cues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Left,
    Center,
    Right,
}

impl Zone {
    /// Bucket by box center against frame-width thirds. Boundary values fall
    /// into the center bucket.
    pub fn of(norm: &NormalizedBox, frame_width: f32) -> Zone {
        let center_x = norm.center_x();
        if center_x < frame_width / 3.0 {
            Zone::Left
        } else if center_x > 2.0 * frame_width / 3.0 {
            Zone::Right
        } else {
            Zone::Center
        }
    }
}
