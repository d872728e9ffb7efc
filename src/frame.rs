//! Frame acquisition seam.
//!
//! Camera handling, permissions and decoding are somebody else's problem;
//! this module only defines the contract the pipeline consumes:
//! - `Frame`: one sampled image plus its native dimensions
//! - `FrameSource`: connect / grab / health
//! - `SyntheticSource`: built-in `stub://` source for tests and dry runs
//!
//! A source may report 0x0 dimensions while the stream warms up. The frame
//! loop treats that as "skip detection this tick", never as an error.

use anyhow::{anyhow, Result};

use crate::config::SourceSettings;

/// One sampled video frame in source pixel space.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// An empty frame standing in for a stream that has not produced
    /// dimensions yet.
    pub fn not_ready() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Dimensions are known, detection can run.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Frame source contract.
pub trait FrameSource: Send {
    /// Acquire the underlying stream. Failure here is surfaced to the caller
    /// and prevents the pipeline from entering its active state.
    fn connect(&mut self) -> Result<()>;

    /// Sample the current frame. May return a not-ready frame while the
    /// stream warms up.
    fn grab(&mut self) -> Result<Frame>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Counters for periodic health logging.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_grabbed: u64,
    pub url: String,
}

/// Open the frame source named by the configuration.
///
/// Real capture devices live behind this seam; the built-in implementation
/// only understands `stub://` urls.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        Ok(Box::new(SyntheticSource::new(settings.clone())))
    } else {
        Err(anyhow!(
            "unsupported source url '{}': only stub:// sources are built in",
            settings.url
        ))
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and dry runs
// ----------------------------------------------------------------------------

/// Synthetic frame source.
///
/// Produces deterministic pixel patterns at the configured dimensions. The
/// first `warmup_frames` grabs return not-ready frames, emulating a stream
/// whose dimensions are not yet known.
pub struct SyntheticSource {
    settings: SourceSettings,
    warmup_remaining: u32,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            warmup_remaining: 0,
            frame_count: 0,
            connected: false,
        }
    }

    /// Emulate a slow stream: the first `frames` grabs are not ready.
    pub fn with_warmup(mut self, frames: u32) -> Self {
        self.warmup_remaining = frames;
        self
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.settings.width * self.settings.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        if !self.settings.url.starts_with("stub://") {
            return Err(anyhow!(
                "synthetic source requires a stub:// url, got '{}'",
                self.settings.url
            ));
        }
        self.connected = true;
        log::info!("frame source connected: {} (synthetic)", self.settings.url);
        Ok(())
    }

    fn grab(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(anyhow!("frame source not connected"));
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Ok(Frame::not_ready());
        }
        self.frame_count += 1;
        Ok(Frame::new(
            self.generate_pixels(),
            self.settings.width,
            self.settings.height,
        ))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_grabbed: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}
