//! Distance estimation from bounding-box width.
//!
//! The estimate is a crude monotonic proxy, not a calibrated metric: a box
//! spanning the full frame width yields distance 1.0 (arbitrary unit),
//! narrower boxes yield larger distances. The inverse width-ratio form is
//! load-bearing; downstream thresholds are tuned against it.

use anyhow::{anyhow, Result};

/// Estimate distance as the inverse of the box/frame width ratio.
///
/// Fails on non-positive widths; a zero-width box is invalid geometry, not a
/// zero-distance object, and the caller skips the alert path for it.
pub fn estimate(box_width: f32, frame_width: f32) -> Result<f32> {
    if frame_width <= 0.0 {
        return Err(anyhow!(
            "invalid geometry: frame width must be positive, got {}",
            frame_width
        ));
    }
    if box_width <= 0.0 {
        return Err(anyhow!(
            "invalid geometry: box width must be positive, got {}",
            box_width
        ));
    }
    Ok(1.0 / (box_width / frame_width))
}

/// Binary near signal driving the proximity tone.
pub fn is_near(distance: f32, threshold: f32) -> bool {
    distance <= threshold
}
