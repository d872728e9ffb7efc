//! Audio feedback seam: speech synthesis and the proximity tone.
//!
//! The pipeline is fire-and-forget towards the sink; playback latency never
//! blocks a tick. Speech requests can overlap (a new announcement while one
//! is still playing), and implementations resolve that according to one
//! explicit policy:
//! - `Drop`: ignore new utterances while one is playing
//! - `Queue`: queue unconditionally and play in order
//!
//! Built-in sinks:
//! - `ProcessSink`: spawns configurable speech/tone commands (e.g. espeak,
//!   aplay), policy-aware
//! - `RecordingSink`: captures utterances and tone counts for tests
//! - `NullSink`: discards everything

use std::collections::VecDeque;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::geometry::Zone;

/// What to do with a speech request that arrives while an utterance is still
/// playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    Drop,
    Queue,
}

/// Spoken message for one accepted detection.
pub fn announcement_text(label: &str, zone: Zone) -> String {
    match zone {
        Zone::Center => format!("There is a {} in the center.", label),
        Zone::Left => format!("There is a {} on your left.", label),
        Zone::Right => format!("There is a {} on your right.", label),
    }
}

/// Feedback sink contract. At most one `speak` call per accepted
/// announcement and one `play_tone` call per accepted alert.
pub trait FeedbackSink: Send {
    fn speak(&mut self, text: &str, locale: &str) -> Result<()>;

    fn play_tone(&mut self) -> Result<()>;

    /// Drive deferred playback (queue drain, child reaping). Called once per
    /// pipeline tick; the default does nothing.
    fn poll(&mut self) {}
}

// ----------------------------------------------------------------------------
// NullSink
// ----------------------------------------------------------------------------

/// Sink that discards all feedback (headless runs, benchmarks).
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn speak(&mut self, text: &str, _locale: &str) -> Result<()> {
        log::debug!("speech dropped (null sink): {}", text);
        Ok(())
    }

    fn play_tone(&mut self) -> Result<()> {
        log::debug!("tone dropped (null sink)");
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// RecordingSink
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Recorded {
    utterances: Vec<String>,
    tones: usize,
}

/// Sink that records everything it is asked to play. Clones share the same
/// recording, so a test can keep one clone and hand the other to the
/// pipeline.
#[derive(Clone, Default)]
pub struct RecordingSink {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utterances(&self) -> Vec<String> {
        self.recorded.lock().expect("recording lock").utterances.clone()
    }

    pub fn tones(&self) -> usize {
        self.recorded.lock().expect("recording lock").tones
    }
}

impl FeedbackSink for RecordingSink {
    fn speak(&mut self, text: &str, _locale: &str) -> Result<()> {
        self.recorded
            .lock()
            .expect("recording lock")
            .utterances
            .push(text.to_string());
        Ok(())
    }

    fn play_tone(&mut self) -> Result<()> {
        self.recorded.lock().expect("recording lock").tones += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// ProcessSink
// ----------------------------------------------------------------------------

/// Sink backed by external playback commands.
///
/// Command arguments may contain `{text}` and `{locale}` placeholders; when
/// no argument mentions `{text}`, the utterance is appended as the final
/// argument. Children are spawned detached and reaped on `poll`.
pub struct ProcessSink {
    speech_command: Vec<String>,
    tone_command: Vec<String>,
    policy: OverlapPolicy,
    speaking: Option<Child>,
    pending: VecDeque<(String, String)>,
    tones: Vec<Child>,
}

impl ProcessSink {
    pub fn new(
        speech_command: Vec<String>,
        tone_command: Vec<String>,
        policy: OverlapPolicy,
    ) -> Result<Self> {
        if speech_command.is_empty() {
            return Err(anyhow!("speech command must not be empty"));
        }
        if tone_command.is_empty() {
            return Err(anyhow!("tone command must not be empty"));
        }
        Ok(Self {
            speech_command,
            tone_command,
            policy,
            speaking: None,
            pending: VecDeque::new(),
            tones: Vec::new(),
        })
    }

    /// Number of utterances waiting behind the current one (Queue policy).
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn speaking_busy(&mut self) -> bool {
        if let Some(child) = self.speaking.as_mut() {
            match child.try_wait() {
                Ok(Some(_)) => self.speaking = None,
                Ok(None) => return true,
                Err(e) => {
                    log::warn!("speech child wait failed: {}", e);
                    self.speaking = None;
                }
            }
        }
        false
    }

    fn spawn_speech(&mut self, text: &str, locale: &str) -> Result<()> {
        let mut args: Vec<String> = self.speech_command[1..]
            .iter()
            .map(|arg| arg.replace("{text}", text).replace("{locale}", locale))
            .collect();
        if !self.speech_command[1..].iter().any(|arg| arg.contains("{text}")) {
            args.push(text.to_string());
        }
        let child = Command::new(&self.speech_command[0])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn speech command '{}'", self.speech_command[0]))?;
        self.speaking = Some(child);
        Ok(())
    }
}

impl FeedbackSink for ProcessSink {
    fn speak(&mut self, text: &str, locale: &str) -> Result<()> {
        if self.speaking_busy() {
            match self.policy {
                OverlapPolicy::Drop => {
                    log::debug!("speech busy, dropping utterance: {}", text);
                    return Ok(());
                }
                OverlapPolicy::Queue => {
                    self.pending.push_back((text.to_string(), locale.to_string()));
                    return Ok(());
                }
            }
        }
        self.spawn_speech(text, locale)
    }

    fn play_tone(&mut self) -> Result<()> {
        let child = Command::new(&self.tone_command[0])
            .args(&self.tone_command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn tone command '{}'", self.tone_command[0]))?;
        self.tones.push(child);
        Ok(())
    }

    fn poll(&mut self) {
        self.tones
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));

        if !self.speaking_busy() {
            if let Some((text, locale)) = self.pending.pop_front() {
                if let Err(e) = self.spawn_speech(&text, &locale) {
                    log::warn!("queued speech failed: {:#}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_phrasing_matches_zone() {
        assert_eq!(
            announcement_text("person", Zone::Center),
            "There is a person in the center."
        );
        assert_eq!(
            announcement_text("dog", Zone::Left),
            "There is a dog on your left."
        );
        assert_eq!(
            announcement_text("car", Zone::Right),
            "There is a car on your right."
        );
    }

    #[test]
    fn recording_sink_is_shared_between_clones() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        handle.speak("There is a dog on your left.", "en-US").unwrap();
        handle.play_tone().unwrap();

        assert_eq!(sink.utterances(), vec!["There is a dog on your left."]);
        assert_eq!(sink.tones(), 1);
    }

    #[test]
    fn process_sink_rejects_empty_commands() {
        assert!(ProcessSink::new(vec![], vec!["aplay".into()], OverlapPolicy::Queue).is_err());
        assert!(ProcessSink::new(vec!["espeak".into()], vec![], OverlapPolicy::Queue).is_err());
    }

    #[test]
    fn queue_policy_defers_overlapping_utterances() {
        let mut sink = ProcessSink::new(
            vec!["sh".into(), "-c".into(), "sleep 1".into(), "{text}".into()],
            vec!["true".into()],
            OverlapPolicy::Queue,
        )
        .unwrap();
        sink.speak("first", "en-US").unwrap();
        sink.speak("second", "en-US").unwrap();
        assert_eq!(sink.pending(), 1);
    }

    #[test]
    fn drop_policy_discards_overlapping_utterances() {
        let mut sink = ProcessSink::new(
            vec!["sh".into(), "-c".into(), "sleep 1".into(), "{text}".into()],
            vec!["true".into()],
            OverlapPolicy::Drop,
        )
        .unwrap();
        sink.speak("first", "en-US").unwrap();
        sink.speak("second", "en-US").unwrap();
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn overlap_policy_deserializes_from_lowercase() {
        let policy: OverlapPolicy = serde_json::from_str("\"queue\"").unwrap();
        assert_eq!(policy, OverlapPolicy::Queue);
        let policy: OverlapPolicy = serde_json::from_str("\"drop\"").unwrap();
        assert_eq!(policy, OverlapPolicy::Drop);
    }
}
