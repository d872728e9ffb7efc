//! The detection-to-feedback loop.
//!
//! Each tick:
//! 1. observe the run flag (stop requests apply at tick boundaries only)
//! 2. defer while the detector is still loading
//! 3. grab a frame; 0x0 dimensions mean the source is warming up, so skip
//!    detection but keep rescheduling
//! 4. run detection; a failing detector is logged and treated as a pass with
//!    zero detections
//! 5. clear the previous frame's overlay artifacts, then per accepted
//!    detection: normalize geometry, bucket into a zone, draw, announce and
//!    alert through the throttles
//!
//! One thread drives the loop; the detector call completes before the next
//! tick is scheduled, so `ThrottleState` and the artifact list have a single
//! owner and no tick ever races another. No failure inside a tick is fatal;
//! only source acquisition errors propagate, and those prevent the loop from
//! entering its active state in the first place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::detect::DetectorBackend;
use crate::feedback::{announcement_text, FeedbackSink};
use crate::filter;
use crate::frame::FrameSource;
use crate::geometry::{self, DisplayRect, Zone};
use crate::overlay::{OverlayHandle, OverlaySurface};
use crate::proximity;
use crate::throttle::ThrottleState;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Externally toggled run control, observed at tick boundaries.
#[derive(Clone, Default)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    /// A fresh flag in the running state.
    pub fn new() -> Self {
        let flag = Self::default();
        flag.running.store(true, Ordering::SeqCst);
        flag
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Active,
}

/// Per-tick accounting, for logs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickReport {
    /// The source produced usable dimensions and detection ran.
    pub frame_ready: bool,
    pub detections: usize,
    pub accepted: usize,
    pub announced: usize,
    pub alerted: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn FrameSource>,
    detector: Arc<Mutex<dyn DetectorBackend>>,
    sink: Box<dyn FeedbackSink>,
    overlay: Box<dyn OverlaySurface>,
    display: Option<DisplayRect>,
    throttle: ThrottleState,
    artifacts: Vec<OverlayHandle>,
    state: LoopState,
    ticks: u64,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn FrameSource>,
        detector: Arc<Mutex<dyn DetectorBackend>>,
        sink: Box<dyn FeedbackSink>,
        overlay: Box<dyn OverlaySurface>,
    ) -> Self {
        Self {
            config,
            source,
            detector,
            sink,
            overlay,
            display: None,
            throttle: ThrottleState::new(),
            artifacts: Vec::new(),
            state: LoopState::Idle,
            ticks: 0,
        }
    }

    /// Project overlay artifacts onto a display surface whose size differs
    /// from the native capture resolution.
    pub fn with_display(mut self, display: DisplayRect) -> Self {
        self.display = Some(display);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Acquire the frame source and enter the active state.
    ///
    /// Acquisition failure is the one error class that propagates: the
    /// pipeline stays idle and the caller decides how to report it.
    pub fn start(&mut self) -> Result<()> {
        self.source
            .connect()
            .context("frame source acquisition failed")?;
        self.state = LoopState::Active;
        log::info!("pipeline active (target {} fps)", self.config.target_fps);
        Ok(())
    }

    /// Leave the active state and clear all overlay artifacts.
    pub fn stop(&mut self) {
        self.clear_artifacts();
        self.state = LoopState::Idle;
        log::info!("pipeline idle after {} ticks", self.ticks);
    }

    /// Run ticks until the flag clears, pacing to the configured frame rate.
    pub fn run(&mut self, flag: &RunFlag) -> Result<()> {
        self.start()?;
        let interval = Duration::from_millis(1000 / u64::from(self.config.target_fps.max(1)));
        let mut last_health_log = Instant::now();

        while flag.is_running() {
            let report = self.tick(Instant::now());
            log::debug!(
                "tick #{}: ready={} detections={} accepted={} announced={} alerted={}",
                self.ticks,
                report.frame_ready,
                report.detections,
                report.accepted,
                report.announced,
                report.alerted
            );

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "source health={} frames={} url={} tracked_labels={}",
                    self.source.is_healthy(),
                    stats.frames_grabbed,
                    stats.url,
                    self.throttle.tracked_labels()
                );
                last_health_log = Instant::now();
            }

            std::thread::sleep(interval);
        }

        self.stop();
        Ok(())
    }

    /// One detection pass. Never fails; every pipeline error is absorbed
    /// into the report per the loop contract.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if self.state != LoopState::Active {
            log::debug!("tick ignored: pipeline is idle");
            return report;
        }
        self.ticks += 1;
        self.sink.poll();

        let detector_ready = match self.detector.lock() {
            Ok(guard) => guard.is_ready(),
            Err(_) => {
                log::warn!("detector lock poisoned; deferring tick");
                false
            }
        };
        if !detector_ready {
            log::debug!("detector not ready; deferring tick");
            return report;
        }

        let frame = match self.source.grab() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("frame grab failed: {:#}", e);
                return report;
            }
        };
        if !frame.is_ready() {
            log::debug!("frame source not warmed up; skipping detection");
            return report;
        }
        report.frame_ready = true;

        let detections = match self.detector.lock() {
            Ok(mut guard) => match guard.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    log::warn!("detector failed, treating as empty pass: {:#}", e);
                    Vec::new()
                }
            },
            Err(_) => {
                log::warn!("detector lock poisoned, treating as empty pass");
                Vec::new()
            }
        };
        report.detections = detections.len();

        self.clear_artifacts();

        let frame_width = frame.width as f32;
        let frame_height = frame.height as f32;
        for detection in &detections {
            if !filter::accept(detection, &self.config) {
                continue;
            }
            report.accepted += 1;

            let norm = geometry::normalize(&detection.bbox, frame_width, self.config.mirrored);
            let zone = Zone::of(&norm, frame_width);

            let drawn = match &self.display {
                Some(display) => geometry::project(&norm, frame_width, frame_height, display),
                None => norm,
            };
            let label = format!(
                "{} - {:.2}% confidence",
                detection.label,
                detection.confidence * 100.0
            );
            self.artifacts.push(self.overlay.add(&drawn, &label));

            if self
                .throttle
                .try_announce(&detection.label, now, self.config.announce_cooldown)
            {
                let text = announcement_text(&detection.label, zone);
                if let Err(e) = self.sink.speak(&text, &self.config.speech_locale) {
                    log::warn!("speech sink failed: {:#}", e);
                }
                report.announced += 1;
            }

            match proximity::estimate(detection.bbox.width, frame_width) {
                Ok(distance)
                    if proximity::is_near(distance, self.config.near_distance_threshold) =>
                {
                    if self.throttle.try_alert(now, self.config.alert_cooldown) {
                        if let Err(e) = self.sink.play_tone() {
                            log::warn!("tone sink failed: {:#}", e);
                        }
                        report.alerted += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::debug!("proximity estimate skipped: {:#}", e);
                }
            }
        }

        report
    }

    fn clear_artifacts(&mut self) {
        for handle in self.artifacts.drain(..) {
            self.overlay.remove(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSettings;
    use crate::detect::{BoundingBox, Detection, ScriptedBackend};
    use crate::feedback::RecordingSink;
    use crate::frame::SyntheticSource;
    use crate::overlay::MemoryOverlay;

    fn source_settings() -> SourceSettings {
        SourceSettings {
            url: "stub://test".to_string(),
            target_fps: 10,
            width: 600,
            height: 400,
            mirrored: false,
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            confidence_threshold: 0.5,
            allowed_labels: ["person", "dog"].iter().map(|s| s.to_string()).collect(),
            ..PipelineConfig::default()
        }
    }

    fn person_at(x: f32, width: f32) -> Detection {
        Detection::new(
            "person",
            0.9,
            BoundingBox {
                x,
                y: 10.0,
                width,
                height: 50.0,
            },
        )
    }

    fn build(
        config: PipelineConfig,
        backend: ScriptedBackend,
        warmup: u32,
    ) -> (Pipeline, RecordingSink, MemoryOverlay) {
        let sink = RecordingSink::new();
        let overlay = MemoryOverlay::new();
        let pipeline = Pipeline::new(
            config,
            Box::new(SyntheticSource::new(source_settings()).with_warmup(warmup)),
            Arc::new(Mutex::new(backend)),
            Box::new(sink.clone()),
            Box::new(overlay.clone()),
        );
        (pipeline, sink, overlay)
    }

    #[test]
    fn tick_before_start_is_ignored() {
        let (mut pipeline, _sink, _overlay) = build(test_config(), ScriptedBackend::new(), 0);
        let report = pipeline.tick(Instant::now());
        assert!(!report.frame_ready);
        assert_eq!(pipeline.state(), LoopState::Idle);
    }

    #[test]
    fn start_surfaces_source_acquisition_failure() {
        let mut settings = source_settings();
        settings.url = "rtsp://camera-1".to_string();
        let mut pipeline = Pipeline::new(
            test_config(),
            Box::new(SyntheticSource::new(settings)),
            Arc::new(Mutex::new(ScriptedBackend::new())),
            Box::new(RecordingSink::new()),
            Box::new(MemoryOverlay::new()),
        );
        assert!(pipeline.start().is_err());
        assert_eq!(pipeline.state(), LoopState::Idle);
    }

    #[test]
    fn detector_not_ready_defers_without_error() {
        let backend = ScriptedBackend::new().ready_after(2);
        let (mut pipeline, _sink, _overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();

        let t0 = Instant::now();
        assert!(!pipeline.tick(t0).frame_ready);
        assert!(!pipeline.tick(t0 + Duration::from_millis(100)).frame_ready);
        assert!(pipeline.tick(t0 + Duration::from_millis(200)).frame_ready);
    }

    #[test]
    fn accepted_detection_announces_and_draws() {
        let mut backend = ScriptedBackend::new();
        // Narrow box: distance 600/30 = 20, well past the near threshold.
        backend.push_detections(vec![person_at(10.0, 30.0)]);
        let (mut pipeline, sink, overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();

        let report = pipeline.tick(Instant::now());
        assert_eq!(report.accepted, 1);
        assert_eq!(report.announced, 1);
        assert_eq!(report.alerted, 0);
        assert_eq!(sink.utterances(), vec!["There is a person on your left."]);
        assert_eq!(overlay.live_artifacts(), 2);
    }

    #[test]
    fn wide_box_raises_one_alert() {
        let mut backend = ScriptedBackend::new();
        // 200/600 of the frame: distance 3, inside the near threshold of 5.
        backend.push_detections(vec![person_at(200.0, 200.0)]);
        let (mut pipeline, sink, _overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();

        let report = pipeline.tick(Instant::now());
        assert_eq!(report.alerted, 1);
        assert_eq!(sink.tones(), 1);
    }

    #[test]
    fn detector_failure_is_an_empty_pass() {
        let mut backend = ScriptedBackend::new();
        backend.push_detections(vec![person_at(10.0, 30.0)]);
        backend.push_failure("inference backend fell over");
        backend.push_detections(vec![person_at(10.0, 30.0)]);
        let (mut pipeline, _sink, overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();

        let t0 = Instant::now();
        assert_eq!(pipeline.tick(t0).accepted, 1);
        assert_eq!(overlay.live_artifacts(), 2);

        // The failing pass clears the previous frame's artifacts and keeps
        // the loop alive.
        let report = pipeline.tick(t0 + Duration::from_millis(100));
        assert!(report.frame_ready);
        assert_eq!(report.detections, 0);
        assert_eq!(overlay.live_artifacts(), 0);

        assert_eq!(pipeline.tick(t0 + Duration::from_millis(200)).accepted, 1);
    }

    #[test]
    fn display_projection_scales_drawn_boxes() {
        let mut backend = ScriptedBackend::new();
        backend.push_detections(vec![person_at(60.0, 30.0)]);
        let sink = RecordingSink::new();
        let overlay = MemoryOverlay::new();
        // Half-size display surface offset by (10, 20).
        let display = DisplayRect {
            left: 10.0,
            top: 20.0,
            width: 300.0,
            height: 200.0,
        };
        let mut pipeline = Pipeline::new(
            test_config(),
            Box::new(SyntheticSource::new(source_settings())),
            Arc::new(Mutex::new(backend)),
            Box::new(sink),
            Box::new(overlay.clone()),
        )
        .with_display(display);
        pipeline.start().unwrap();
        pipeline.tick(Instant::now());

        let snapshot = overlay.snapshot();
        let highlight = snapshot
            .iter()
            .find(|a| a.kind == crate::overlay::ArtifactKind::Highlight)
            .unwrap();
        assert_eq!(highlight.bbox.left, 10.0 + 30.0);
        assert_eq!(highlight.bbox.top, 20.0 + 5.0);
        assert_eq!(highlight.bbox.width, 15.0);
        assert_eq!(highlight.bbox.height, 25.0);
    }

    #[test]
    fn stop_clears_overlays() {
        let mut backend = ScriptedBackend::new();
        backend.push_detections(vec![person_at(10.0, 30.0)]);
        let (mut pipeline, _sink, overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();
        pipeline.tick(Instant::now());
        assert_eq!(overlay.live_artifacts(), 2);

        pipeline.stop();
        assert_eq!(overlay.live_artifacts(), 0);
        assert_eq!(pipeline.state(), LoopState::Idle);
    }

    #[test]
    fn zero_width_box_skips_alert_but_not_announcement() {
        let mut backend = ScriptedBackend::new();
        backend.push_detections(vec![person_at(10.0, 0.0)]);
        let (mut pipeline, sink, _overlay) = build(test_config(), backend, 0);
        pipeline.start().unwrap();

        let report = pipeline.tick(Instant::now());
        assert_eq!(report.accepted, 1);
        assert_eq!(report.announced, 1);
        assert_eq!(report.alerted, 0);
        assert_eq!(sink.tones(), 0);
    }
}
