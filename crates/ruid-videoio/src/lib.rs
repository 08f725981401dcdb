// ruid-videoio/src/lib.rs
// ============================================================
// Buffered video I/O for RuID v2
// A background capture thread pulls decoded frames from a
// source (file, image sequence, CSI/V4L2 camera, RTSP, HTTP)
// into a bounded FIFO; the processing loop drains it at its
// own cadence through a blocking `read`.
// ------------------------------------------------------------
// Public API:
//   * VideoIo::new(config)  – open source (+ optional sink), prime 1 frame
//   * VideoIo::start/stop   – run / join the capture thread
//   * VideoIo::read/write   – blocking frame in / frame out
//   * frame_stream(io)      – async Stream adapter over `read`
// ------------------------------------------------------------
// Build notes
//   * `--features gstreamer` enables the GStreamer backend.
//   * Without it only image sequences (and synthetic sources)
//     can be opened by descriptor.
// ============================================================

//! RuID – video I/O layer
//!
//! [`VideoIo`] decouples a frame source from the processing loop.
//! Finite sources (video files, image sequences) get back-pressure: the
//! capture thread waits for free space so no frame is ever lost.  Live
//! sources (cameras, network streams) never stall the producer: when the
//! buffer is full the incoming frame is dropped and the buffered ones are
//! kept.
//!
//! End of stream is not an error.  When the source runs dry the capture
//! thread flags shutdown and [`VideoIo::read`] returns `Ok(None)` once the
//! buffer has drained, exactly as it does after [`VideoIo::stop`].

use thiserror::Error;

pub mod buffer;
mod capture;
pub mod config;
pub mod frame;
pub mod pacing;
pub mod pipeline;
pub mod protocol;
pub mod source;
mod stream;
mod videoio;

pub use buffer::{FrameBuffer, PushOutcome};
pub use config::{Backend, VideoIoConfig};
pub use frame::Frame;
pub use pacing::{cap_dt, Pacing};
pub use pipeline::{capture_pipeline, write_pipeline};
pub use protocol::Protocol;
#[cfg(feature = "gstreamer")]
pub use source::gstreamer::{GstSink, GstSource};
pub use source::image_seq::{ImageSequenceSink, ImageSequenceSource};
pub use source::synthetic::SyntheticSource;
pub use source::{FrameSink, FrameSource};
pub use stream::frame_stream;
pub use videoio::{StreamState, VideoIo};

#[derive(Error, Debug)]
pub enum VideoIoError {
    #[error("Unable to read video stream")]
    FirstFrame,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("write() requires an output sink")]
    NoSink,
    #[error("Cannot {op} while {state:?}")]
    InvalidState { op: &'static str, state: StreamState },
    #[error("Stream has been released")]
    Released,
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("GStreamer {0} plugin not found")]
    PluginMissing(String),
    #[error("Frame is {actual} bytes, expected {expected} for {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Frame is {actual:?}, sink expects {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Source read failed: {0}")]
    Source(String),
    #[error(transparent)]
    Resize(#[from] ruid_preprocess::PreprocessError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "gstreamer")]
    #[error("GStreamer init failed: {0}")]
    GstInit(#[source] gst::glib::Error),
    #[cfg(feature = "gstreamer")]
    #[error("Failed to parse pipeline: {0}")]
    ParsePipeline(#[source] gst::glib::Error),
    #[cfg(feature = "gstreamer")]
    #[error("Pipeline is not a gst::Pipeline")]
    NotPipeline,
    #[cfg(feature = "gstreamer")]
    #[error("Element `{0}` not found")]
    ElementNotFound(&'static str),
    #[cfg(feature = "gstreamer")]
    #[error("Element `{0}` downcast failed")]
    ElementDowncastFailed(&'static str),
    #[cfg(feature = "gstreamer")]
    #[error("Failed to change pipeline state: {0}")]
    StateChange(#[source] gst::StateChangeError),
    #[cfg(feature = "gstreamer")]
    #[error("Failed to pull sample: {0}")]
    PullSample(#[source] gst::glib::BoolError),
    #[cfg(feature = "gstreamer")]
    #[error("Failed to push buffer: {0:?}")]
    Flow(gst::FlowError),
    #[cfg(feature = "gstreamer")]
    #[error("Sample has no buffer")]
    MissingBuffer,
    #[cfg(feature = "gstreamer")]
    #[error("Sample has no caps")]
    MissingCaps,
    #[cfg(feature = "gstreamer")]
    #[error("Caps missing struct")]
    MissingStructure,
    #[cfg(feature = "gstreamer")]
    #[error("Failed to get field value: {0}")]
    FieldError(String),
    #[cfg(feature = "gstreamer")]
    #[error("Buffer map failed: {0}")]
    BufferMap(String),
}

pub type Result<T> = std::result::Result<T, VideoIoError>;
