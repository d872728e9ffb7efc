use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::feedback::OverlapPolicy;

const DEFAULT_SOURCE_URL: &str = "stub://front_camera";
const DEFAULT_SOURCE_FPS: u32 = 15;
const DEFAULT_SOURCE_WIDTH: u32 = 1280;
const DEFAULT_SOURCE_HEIGHT: u32 = 720;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.55;
const DEFAULT_ANNOUNCE_COOLDOWN_MS: u64 = 5000;
const DEFAULT_ALERT_COOLDOWN_MS: u64 = 1000;
const DEFAULT_NEAR_DISTANCE_THRESHOLD: f32 = 5.0;
const DEFAULT_SPEECH_LOCALE: &str = "en-US";

/// Object classes worth announcing. Everything else the classifier reports
/// is noise for a pedestrian (traffic lights, handbags, ...).
const DEFAULT_ALLOWED_LABELS: &[&str] = &[
    "car",
    "bicycle",
    "truck",
    "bus",
    "person",
    "cat",
    "dog",
    "chair",
    "dining table",
    "motorcycle",
    "potted plant",
    "vase",
];

fn default_speech_command() -> Vec<String> {
    ["espeak", "-v", "{locale}", "{text}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tone_command() -> Vec<String> {
    ["aplay", "-q", "beep.wav"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Deserialize, Default)]
struct SightlinedConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    feedback: Option<FeedbackConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    mirrored: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    confidence_threshold: Option<f32>,
    allowed_labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct FeedbackConfigFile {
    announce_cooldown_ms: Option<u64>,
    alert_cooldown_ms: Option<u64>,
    near_distance_threshold: Option<f32>,
    speech_locale: Option<String>,
    overlap_policy: Option<OverlapPolicy>,
    speech_command: Option<Vec<String>>,
    tone_command: Option<Vec<String>>,
}

/// Daemon configuration, resolved from file + environment + defaults.
#[derive(Debug, Clone)]
pub struct SightlinedConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub feedback: FeedbackSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// The displayed view is horizontally flipped relative to the raw
    /// capture (selfie-style front camera).
    pub mirrored: bool,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub confidence_threshold: f32,
    pub allowed_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackSettings {
    pub announce_cooldown: Duration,
    pub alert_cooldown: Duration,
    pub near_distance_threshold: f32,
    pub speech_locale: String,
    pub overlap_policy: OverlapPolicy,
    pub speech_command: Vec<String>,
    pub tone_command: Vec<String>,
}

/// Constant-per-run knobs the pipeline itself consumes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub confidence_threshold: f32,
    pub allowed_labels: HashSet<String>,
    pub announce_cooldown: Duration,
    pub alert_cooldown: Duration,
    pub near_distance_threshold: f32,
    pub mirrored: bool,
    pub target_fps: u32,
    pub speech_locale: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            allowed_labels: DEFAULT_ALLOWED_LABELS.iter().map(|s| s.to_string()).collect(),
            announce_cooldown: Duration::from_millis(DEFAULT_ANNOUNCE_COOLDOWN_MS),
            alert_cooldown: Duration::from_millis(DEFAULT_ALERT_COOLDOWN_MS),
            near_distance_threshold: DEFAULT_NEAR_DISTANCE_THRESHOLD,
            mirrored: false,
            target_fps: DEFAULT_SOURCE_FPS,
            speech_locale: DEFAULT_SPEECH_LOCALE.to_string(),
        }
    }
}

impl SightlinedConfig {
    /// Resolve configuration: optional JSON file named by `SIGHTLINE_CONFIG`,
    /// then environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGHTLINE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SightlinedConfigFile) -> Self {
        let source = SourceSettings {
            url: file
                .source
                .as_ref()
                .and_then(|s| s.url.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|s| s.target_fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|s| s.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|s| s.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
            mirrored: file.source.as_ref().and_then(|s| s.mirrored).unwrap_or(false),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|d| d.backend.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            confidence_threshold: file
                .detector
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            allowed_labels: file
                .detector
                .and_then(|d| d.allowed_labels)
                .unwrap_or_else(|| DEFAULT_ALLOWED_LABELS.iter().map(|s| s.to_string()).collect()),
        };
        let feedback = FeedbackSettings {
            announce_cooldown: Duration::from_millis(
                file.feedback
                    .as_ref()
                    .and_then(|f| f.announce_cooldown_ms)
                    .unwrap_or(DEFAULT_ANNOUNCE_COOLDOWN_MS),
            ),
            alert_cooldown: Duration::from_millis(
                file.feedback
                    .as_ref()
                    .and_then(|f| f.alert_cooldown_ms)
                    .unwrap_or(DEFAULT_ALERT_COOLDOWN_MS),
            ),
            near_distance_threshold: file
                .feedback
                .as_ref()
                .and_then(|f| f.near_distance_threshold)
                .unwrap_or(DEFAULT_NEAR_DISTANCE_THRESHOLD),
            speech_locale: file
                .feedback
                .as_ref()
                .and_then(|f| f.speech_locale.clone())
                .unwrap_or_else(|| DEFAULT_SPEECH_LOCALE.to_string()),
            overlap_policy: file
                .feedback
                .as_ref()
                .and_then(|f| f.overlap_policy)
                .unwrap_or(OverlapPolicy::Queue),
            speech_command: file
                .feedback
                .as_ref()
                .and_then(|f| f.speech_command.clone())
                .unwrap_or_else(default_speech_command),
            tone_command: file
                .feedback
                .and_then(|f| f.tone_command)
                .unwrap_or_else(default_tone_command),
        };
        Self {
            source,
            detector,
            feedback,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SIGHTLINE_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(mirrored) = std::env::var("SIGHTLINE_MIRRORED") {
            self.source.mirrored = match mirrored.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(anyhow!(
                        "SIGHTLINE_MIRRORED must be true/false, got '{}'",
                        other
                    ))
                }
            };
        }
        if let Ok(backend) = std::env::var("SIGHTLINE_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(threshold) = std::env::var("SIGHTLINE_CONFIDENCE_THRESHOLD") {
            self.detector.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("SIGHTLINE_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        if let Ok(labels) = std::env::var("SIGHTLINE_ALLOWED_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.detector.allowed_labels = parsed;
            }
        }
        if let Ok(locale) = std::env::var("SIGHTLINE_SPEECH_LOCALE") {
            if !locale.trim().is_empty() {
                self.feedback.speech_locale = locale;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.target_fps == 0 {
            return Err(anyhow!("source.target_fps must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!(
                "detector.confidence_threshold must be in [0, 1], got {}",
                self.detector.confidence_threshold
            ));
        }
        if self.detector.allowed_labels.is_empty() {
            return Err(anyhow!(
                "detector.allowed_labels must name at least one class"
            ));
        }
        if self.feedback.near_distance_threshold <= 0.0 {
            return Err(anyhow!(
                "feedback.near_distance_threshold must be greater than zero"
            ));
        }
        if self.feedback.announce_cooldown.is_zero() || self.feedback.alert_cooldown.is_zero() {
            return Err(anyhow!("feedback cooldowns must be greater than zero"));
        }
        Ok(())
    }

    /// Flatten into the knobs the pipeline consumes.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            confidence_threshold: self.detector.confidence_threshold,
            allowed_labels: self.detector.allowed_labels.iter().cloned().collect(),
            announce_cooldown: self.feedback.announce_cooldown,
            alert_cooldown: self.feedback.alert_cooldown,
            near_distance_threshold: self.feedback.near_distance_threshold,
            mirrored: self.source.mirrored,
            target_fps: self.source.target_fps,
            speech_locale: self.feedback.speech_locale.clone(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<SightlinedConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
