use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, VideoIoError};

/// Which capture/encode backend opens descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GStreamer pipelines; requires the `gstreamer` cargo feature.
    Gstreamer,
    /// Pure-Rust image-sequence reader/writer.
    Native,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "gstreamer") {
            Backend::Gstreamer
        } else {
            Backend::Native
        }
    }
}

/// Construction parameters for [`crate::VideoIo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoIoConfig {
    /// Width and height of each frame returned by `read`
    pub size: (u32, u32),
    /// Image sequence (`%06d.jpg`), video file, `csi://0`, `/dev/video0`,
    /// `rtsp://…` or `http://…`
    pub input_uri: String,
    /// Output video file or image sequence pattern
    #[serde(default)]
    pub output_uri: Option<String>,
    /// Native resolution of the input, used to pick a camera capture mode
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),
    /// Input frame rate; used when the source cannot report one
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Frames to buffer.  For live sources a larger buffer drops fewer
    /// frames but adds latency.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Estimated processing speed; caps the capture interval of live sources
    #[serde(default = "default_proc_fps")]
    pub proc_fps: f64,
    #[serde(default)]
    pub backend: Backend,
}

fn default_resolution() -> (u32, u32) {
    (1920, 1080)
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_buffer_size() -> usize {
    10
}

fn default_proc_fps() -> f64 {
    30.0
}

impl VideoIoConfig {
    pub fn new(size: (u32, u32), input_uri: impl Into<String>) -> Self {
        Self {
            size,
            input_uri: input_uri.into(),
            output_uri: None,
            resolution: default_resolution(),
            frame_rate: default_frame_rate(),
            buffer_size: default_buffer_size(),
            proc_fps: default_proc_fps(),
            backend: Backend::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(VideoIoError::InvalidConfig(msg.to_string()));
        if !(self.frame_rate > 0.0 && self.frame_rate.is_finite()) {
            return invalid("frame_rate must be positive");
        }
        if !(self.proc_fps > 0.0 && self.proc_fps.is_finite()) {
            return invalid("proc_fps must be positive");
        }
        if self.buffer_size < 1 {
            return invalid("buffer_size must be at least 1");
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return invalid("size must be non-zero");
        }
        if self.input_uri.trim().is_empty() {
            return invalid("input_uri is empty");
        }
        Ok(())
    }
}
