//! Generated frames for tests and dry runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::FrameSource;
use crate::{Frame, Result};

/// Deterministic in-memory source.  Frame `n` has every byte set to
/// `n % 256` and `index == n`, so ordering and loss are easy to check.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    fps: f64,
    limit: Option<u64>,
    delay: Option<Duration>,
    produced: Arc<AtomicU64>,
}

impl SyntheticSource {
    /// Endless source reporting an unknown frame rate.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: 0.0,
            limit: None,
            delay: None,
            produced: Arc::new(AtomicU64::new(0)),
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Sleep before every frame, like a device waiting for its next exposure.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared count of frames handed out so far.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.produced)
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let n = self.produced.load(Ordering::SeqCst);
        if self.limit.is_some_and(|limit| n >= limit) {
            return Ok(None);
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let pts = if self.fps > 0.0 {
            Duration::from_secs_f64(n as f64 / self.fps)
        } else {
            Duration::ZERO
        };
        let frame = Frame::filled(self.width, self.height, [n as u8; 3])
            .with_index(n)
            .with_pts(pts);
        self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(Some(frame))
    }

    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}
