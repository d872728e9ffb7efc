//! sightlined - assistive perception daemon
//!
//! This daemon:
//! 1. Resolves configuration (SIGHTLINE_CONFIG file + SIGHTLINE_* env)
//! 2. Opens the configured frame source and detector backend
//! 3. Runs the detection-to-feedback loop at the configured frame rate
//! 4. Speaks spatial announcements and plays proximity tones through the
//!    configured playback commands
//! 5. Stops cleanly on SIGINT (overlays cleared, loop left at a tick
//!    boundary)

use anyhow::{Context, Result};

use sightline::{
    open_source, BackendRegistry, MemoryOverlay, Pipeline, ProcessSink, RunFlag, ScriptedBackend,
    SightlinedConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SightlinedConfig::load()?;

    let mut registry = BackendRegistry::new();
    registry.register(ScriptedBackend::new());
    let detector = registry.select(Some(cfg.detector.backend.as_str()))?;
    {
        let mut guard = detector
            .lock()
            .map_err(|_| anyhow::anyhow!("detector lock poisoned"))?;
        guard.warm_up().context("detector warm-up failed")?;
        log::info!("detector backend: {}", guard.name());
    }

    let source = open_source(&cfg.source)?;

    let sink = ProcessSink::new(
        cfg.feedback.speech_command.clone(),
        cfg.feedback.tone_command.clone(),
        cfg.feedback.overlap_policy,
    )?;

    let overlay = MemoryOverlay::new();

    let flag = RunFlag::new();
    {
        let flag = flag.clone();
        ctrlc::set_handler(move || {
            log::info!("stop requested");
            flag.stop();
        })
        .context("install signal handler")?;
    }

    log::info!(
        "sightlined running: source={} {}x{}@{}fps mirrored={} threshold={:.2} labels={}",
        cfg.source.url,
        cfg.source.width,
        cfg.source.height,
        cfg.source.target_fps,
        cfg.source.mirrored,
        cfg.detector.confidence_threshold,
        cfg.detector.allowed_labels.len()
    );

    let mut pipeline = Pipeline::new(
        cfg.pipeline_config(),
        source,
        detector,
        Box::new(sink),
        Box::new(overlay),
    );
    pipeline.run(&flag)
}
