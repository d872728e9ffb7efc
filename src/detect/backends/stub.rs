use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

enum ScriptedPass {
    Detections(Vec<Detection>),
    Failure(String),
}

/// Scripted detector backend for tests, demos and dry runs.
///
/// Each `detect` call pops the next scripted pass; an exhausted script yields
/// empty results. Readiness can be delayed by a number of `is_ready` polls to
/// exercise the loop's deferred-start path.
pub struct ScriptedBackend {
    script: VecDeque<ScriptedPass>,
    ready_after: u32,
    polls: std::cell::Cell<u32>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            ready_after: 0,
            polls: std::cell::Cell::new(0),
        }
    }

    /// Delay readiness until `is_ready` has been polled `polls` times.
    pub fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls;
        self
    }

    /// Queue one detection pass.
    pub fn push_detections(&mut self, detections: Vec<Detection>) {
        self.script.push_back(ScriptedPass::Detections(detections));
    }

    /// Queue one failing pass.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.script.push_back(ScriptedPass::Failure(message.into()));
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_ready(&self) -> bool {
        let polls = self.polls.get().saturating_add(1);
        self.polls.set(polls);
        polls > self.ready_after
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        match self.script.pop_front() {
            Some(ScriptedPass::Detections(detections)) => Ok(detections),
            Some(ScriptedPass::Failure(message)) => Err(anyhow!(message)),
            None => Ok(vec![]),
        }
    }
}
