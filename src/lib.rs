//! Sightline
//!
//! An assistive perception loop: sample a live video frame, obtain object
//! detections from an external classifier, filter and deduplicate them, turn
//! each detection into a spatial cue (left/center/right, near/far) and emit
//! throttled audio feedback (speech + tone) so a user without continuous
//! visual attention is informed about nearby objects.
//!
//! # Pipeline
//!
//! frame source → detector backend → geometry normalizer → detection filter
//! → { proximity estimator, announcement throttler } → feedback sink, with a
//! global alert throttler gating the proximity tone. The frame loop drives
//! the cadence and owns all mutable pipeline state.
//!
//! # Module Structure
//!
//! - `frame`: frame acquisition seam (`Frame`, `FrameSource`, synthetic source)
//! - `detect`: detector backend trait, registry and scripted stub
//! - `geometry`: mirror correction, display projection, zone bucketing
//! - `filter`: confidence threshold + class allow-list
//! - `proximity`: inverse width-ratio distance heuristic
//! - `throttle`: per-label announcement and global alert cooldowns
//! - `feedback`: speech/tone sinks and the overlap policy
//! - `overlay`: overlay surface seam with in-memory implementation
//! - `pipeline`: the frame loop state machine
//! - `config`: file + environment configuration for the daemon

pub mod config;
pub mod detect;
pub mod feedback;
pub mod filter;
pub mod frame;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod proximity;
pub mod throttle;

pub use config::{PipelineConfig, SightlinedConfig, SourceSettings};
pub use detect::{BackendRegistry, BoundingBox, Detection, DetectorBackend, ScriptedBackend};
pub use feedback::{
    announcement_text, FeedbackSink, NullSink, OverlapPolicy, ProcessSink, RecordingSink,
};
pub use frame::{open_source, Frame, FrameSource, SourceStats, SyntheticSource};
pub use geometry::{normalize, project, DisplayRect, NormalizedBox, Zone};
pub use overlay::{Artifact, ArtifactKind, MemoryOverlay, OverlayHandle, OverlaySurface};
pub use pipeline::{LoopState, Pipeline, RunFlag, TickReport};
pub use throttle::ThrottleState;
