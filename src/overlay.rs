//! Overlay surface seam.
//!
//! Rendering is an external collaborator; the pipeline only asks the surface
//! to add one marker pair per accepted detection (a highlight box plus a
//! text label above it) and to remove the previous frame's markers before
//! drawing the new set. Markers never accumulate across frames.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::geometry::NormalizedBox;

/// Vertical offset of the label artifact above its highlight box, in display
/// pixels.
const LABEL_OFFSET: f32 = 20.0;

/// Opaque handle covering the artifact pair of one detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OverlayHandle(u64);

/// Overlay surface contract.
pub trait OverlaySurface: Send {
    /// Add a highlight box and its label for one detection; returns a handle
    /// for later removal.
    fn add(&mut self, bbox: &NormalizedBox, label: &str) -> OverlayHandle;

    /// Remove the artifact pair behind `handle`. Unknown handles are ignored.
    fn remove(&mut self, handle: OverlayHandle);
}

/// One transient visual marker.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bbox: NormalizedBox,
    pub text: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Highlight,
    Label,
}

#[derive(Debug, Default)]
struct Artifacts {
    live: HashMap<u64, Vec<Artifact>>,
    next_handle: u64,
}

/// In-memory overlay surface.
///
/// Keeps the live artifact set so tests and the daemon's debug logging can
/// observe it. Clones share the same artifact store, mirroring
/// `RecordingSink`.
#[derive(Clone, Default)]
pub struct MemoryOverlay {
    artifacts: Arc<Mutex<Artifacts>>,
}

impl MemoryOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live artifacts (two per detection: box + label).
    pub fn live_artifacts(&self) -> usize {
        self.artifacts
            .lock()
            .expect("overlay lock")
            .live
            .values()
            .map(|pair| pair.len())
            .sum()
    }

    /// Snapshot of the live artifact set.
    pub fn snapshot(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .expect("overlay lock")
            .live
            .values()
            .flatten()
            .cloned()
            .collect()
    }
}

impl OverlaySurface for MemoryOverlay {
    fn add(&mut self, bbox: &NormalizedBox, label: &str) -> OverlayHandle {
        let mut artifacts = self.artifacts.lock().expect("overlay lock");
        let handle = artifacts.next_handle;
        artifacts.next_handle += 1;

        let label_box = NormalizedBox {
            left: bbox.left,
            top: bbox.top - LABEL_OFFSET,
            width: bbox.width,
            height: LABEL_OFFSET,
        };
        artifacts.live.insert(
            handle,
            vec![
                Artifact {
                    kind: ArtifactKind::Highlight,
                    bbox: *bbox,
                    text: None,
                },
                Artifact {
                    kind: ArtifactKind::Label,
                    bbox: label_box,
                    text: Some(label.to_string()),
                },
            ],
        );
        log::trace!(
            "overlay add #{}: {} at left={:.0} top={:.0}",
            handle,
            label,
            bbox.left,
            bbox.top
        );
        OverlayHandle(handle)
    }

    fn remove(&mut self, handle: OverlayHandle) {
        self.artifacts
            .lock()
            .expect("overlay lock")
            .live
            .remove(&handle.0);
    }
}
