//! demo - synthetic end-to-end run of the perception loop
//!
//! Scripts a small street scene against the stub detector: a person walks
//! across the view from left to right while a car approaches until it fills
//! enough of the frame to trip the proximity tone. Announcements and tones
//! are printed as they fire, so the throttling behavior is visible without a
//! camera or audio device.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use sightline::{
    BoundingBox, Detection, FeedbackSink, MemoryOverlay, Pipeline, PipelineConfig,
    ScriptedBackend, SourceSettings, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to run.
    #[arg(long, default_value_t = 120)]
    frames: u32,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Treat the view as a mirrored (selfie-style) feed.
    #[arg(long)]
    mirrored: bool,
}

const FRAME_WIDTH: u32 = 1280;
const FRAME_HEIGHT: u32 = 720;

/// Sink that narrates feedback to stdout.
struct StdoutSink;

impl FeedbackSink for StdoutSink {
    fn speak(&mut self, text: &str, locale: &str) -> Result<()> {
        println!("[speech {}] {}", locale, text);
        Ok(())
    }

    fn play_tone(&mut self) -> Result<()> {
        println!("[tone] beep");
        Ok(())
    }
}

/// Person strolling left to right; car closing in from mid-frame.
fn scripted_scene(frames: u32) -> ScriptedBackend {
    let mut backend = ScriptedBackend::new();
    let width = FRAME_WIDTH as f32;
    for i in 0..frames {
        let t = i as f32 / frames.max(1) as f32;
        let mut detections = vec![Detection::new(
            "person",
            0.87,
            BoundingBox {
                x: t * (width - 120.0),
                y: 200.0,
                width: 120.0,
                height: 360.0,
            },
        )];
        // The car only enters the scene in the second half of the run, and
        // grows until it spans well over a fifth of the frame.
        if t > 0.5 {
            let growth = (t - 0.5) * 2.0;
            let car_width = 120.0 + growth * 400.0;
            detections.push(Detection::new(
                "car",
                0.78,
                BoundingBox {
                    x: (width - car_width) / 2.0,
                    y: 300.0,
                    width: car_width,
                    height: 240.0,
                },
            ));
        }
        backend.push_detections(detections);
    }
    backend
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let settings = SourceSettings {
        url: "stub://demo".to_string(),
        target_fps: args.fps,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        mirrored: args.mirrored,
    };
    let config = PipelineConfig {
        mirrored: args.mirrored,
        target_fps: args.fps,
        ..PipelineConfig::default()
    };

    let overlay = MemoryOverlay::new();
    let mut pipeline = Pipeline::new(
        config,
        Box::new(SyntheticSource::new(settings)),
        Arc::new(Mutex::new(scripted_scene(args.frames))),
        Box::new(StdoutSink),
        Box::new(overlay.clone()),
    );

    pipeline.start()?;
    let interval = Duration::from_millis(1000 / u64::from(args.fps.max(1)));
    let start = Instant::now();
    for i in 0..args.frames {
        // Simulated clock: tick timestamps advance by the frame interval
        // regardless of how fast the loop actually runs.
        let now = start + interval * i;
        let report = pipeline.tick(now);
        if report.announced > 0 || report.alerted > 0 {
            println!(
                "frame {:>3}: {} drawn, {} spoken, {} tones",
                i,
                overlay.live_artifacts(),
                report.announced,
                report.alerted
            );
        }
    }
    pipeline.stop();

    println!("done: {} frames simulated", args.frames);
    Ok(())
}
