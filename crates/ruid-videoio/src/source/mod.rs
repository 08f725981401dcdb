//! Frame sources and sinks.
//!
//! The video I/O core only needs two things from a backend: "read one
//! decoded frame" and "write one frame".  Everything else (decoding,
//! scaling, encoding, pipeline construction) lives behind these traits.
//!
//! Descriptors are dispatched by the configured [`Backend`]:
//! - `synthetic://[frames]` – generated frames, any backend
//! - `*%0Nd.*` image sequences – pure-Rust reader/writer, any backend
//! - everything else – GStreamer (feature: gstreamer)

#[cfg(feature = "gstreamer")]
pub mod gstreamer;
pub mod image_seq;
pub mod synthetic;

use std::path::Path;

use crate::config::{Backend, VideoIoConfig};
use crate::protocol::Protocol;
use crate::{Frame, Result, VideoIoError};

use image_seq::{ImageSequenceSink, ImageSequenceSource};
use synthetic::SyntheticSource;

/// Producer side of a capture backend.
///
/// After [`crate::VideoIo::start`] a source is only ever touched from the
/// capture thread, hence `Send` but not `Sync`.
pub trait FrameSource: Send {
    /// Next decoded frame.  `Ok(None)` is a clean end of stream; both
    /// `None` and `Err` end capture for good.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Resolution the source decodes at.
    fn native_size(&self) -> (u32, u32);

    /// Reported frame rate, `0.0` when unknown.
    fn fps(&self) -> f64;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Consumer side of an encode backend.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// First frame of a freshly opened source.  End of stream and read errors
/// alike mean the stream cannot be used.
pub(crate) fn first_frame(read: Result<Option<Frame>>) -> Result<Frame> {
    match read {
        Ok(Some(frame)) => Ok(frame),
        Ok(None) => Err(VideoIoError::FirstFrame),
        Err(e) => {
            log::warn!("First read failed: {e}");
            Err(VideoIoError::FirstFrame)
        }
    }
}

const SYNTHETIC_SCHEME: &str = "synthetic://";

/// Open the input named by `config.input_uri`.
pub fn open_source(config: &VideoIoConfig, protocol: Protocol) -> Result<Box<dyn FrameSource>> {
    let uri = config.input_uri.as_str();
    if let Some(rest) = uri.strip_prefix(SYNTHETIC_SCHEME) {
        let (w, h) = config.resolution;
        let mut source = SyntheticSource::new(w, h).with_fps(config.frame_rate);
        if !rest.is_empty() {
            let frames = rest
                .parse()
                .map_err(|_| VideoIoError::InvalidConfig(format!("bad frame count in `{uri}`")))?;
            source = source.with_limit(frames);
        }
        return Ok(Box::new(source));
    }

    match config.backend {
        Backend::Native if protocol == Protocol::Image => {
            Ok(Box::new(ImageSequenceSource::open(uri)?))
        }
        Backend::Native => Err(VideoIoError::BackendUnavailable(format!(
            "native backend cannot open {protocol:?} input `{uri}`"
        ))),
        Backend::Gstreamer => open_gst_source(config, protocol),
    }
}

/// Open the output at `uri`, encoding `config.size` frames at `fps`.
pub fn open_sink(config: &VideoIoConfig, uri: &str, fps: f64) -> Result<Box<dyn FrameSink>> {
    if let Some(dir) = Path::new(uri).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    if uri.contains('%') {
        return Ok(Box::new(ImageSequenceSink::create(uri, config.size)?));
    }
    match config.backend {
        Backend::Native => Err(VideoIoError::BackendUnavailable(format!(
            "native backend can only write image sequences, got `{uri}`"
        ))),
        Backend::Gstreamer => open_gst_sink(config, uri, fps),
    }
}

#[cfg(feature = "gstreamer")]
fn open_gst_source(config: &VideoIoConfig, protocol: Protocol) -> Result<Box<dyn FrameSource>> {
    gstreamer::init()?;
    let line = crate::pipeline::capture_pipeline(config, protocol, gstreamer::has_element)?;
    log::info!("Capture pipeline {line}");
    Ok(Box::new(gstreamer::GstSource::open(&line)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_gst_source(config: &VideoIoConfig, protocol: Protocol) -> Result<Box<dyn FrameSource>> {
    Err(VideoIoError::BackendUnavailable(format!(
        "built without the gstreamer feature, cannot open {protocol:?} input `{}`",
        config.input_uri
    )))
}

#[cfg(feature = "gstreamer")]
fn open_gst_sink(config: &VideoIoConfig, uri: &str, fps: f64) -> Result<Box<dyn FrameSink>> {
    gstreamer::init()?;
    let line = crate::pipeline::write_pipeline(uri, gstreamer::has_element)?;
    log::info!("Write pipeline: {line}");
    Ok(Box::new(gstreamer::GstSink::open(&line, config.size, fps)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_gst_sink(_config: &VideoIoConfig, uri: &str, _fps: f64) -> Result<Box<dyn FrameSink>> {
    Err(VideoIoError::BackendUnavailable(format!(
        "built without the gstreamer feature, cannot write `{uri}`"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_descriptor() {
        let mut config = VideoIoConfig::new((64, 48), "synthetic://3");
        config.resolution = (32, 24);
        let mut src = open_source(&config, Protocol::parse(&config.input_uri)).unwrap();
        assert_eq!(src.native_size(), (32, 24));
        assert_eq!(src.fps(), 30.0);
        for _ in 0..3 {
            assert!(src.read_frame().unwrap().is_some());
        }
        assert!(src.read_frame().unwrap().is_none());

        let bad = VideoIoConfig::new((64, 48), "synthetic://lots");
        assert!(matches!(
            open_source(&bad, Protocol::Video),
            Err(VideoIoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn native_backend_rejects_streams() {
        let mut config = VideoIoConfig::new((64, 48), "rtsp://cam/live");
        config.backend = Backend::Native;
        assert!(matches!(
            open_source(&config, Protocol::Rtsp),
            Err(VideoIoError::BackendUnavailable(_))
        ));
        assert!(matches!(
            open_sink(&config, "out.mp4", 30.0),
            Err(VideoIoError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn sink_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clips/run1/out.mp4");
        let mut config = VideoIoConfig::new((8, 6), "clip.mp4");
        config.backend = Backend::Native;
        assert!(matches!(
            open_sink(&config, out.to_str().unwrap(), 30.0),
            Err(VideoIoError::BackendUnavailable(_))
        ));
        assert!(dir.path().join("clips/run1").is_dir());
    }

    #[test]
    fn first_frame_failures_are_construction_errors() {
        assert_eq!(first_frame(Ok(Some(Frame::filled(2, 2, [1; 3])))).unwrap().size(), (2, 2));
        assert!(matches!(first_frame(Ok(None)), Err(VideoIoError::FirstFrame)));
        assert!(matches!(
            first_frame(Err(VideoIoError::Source("no signal".into()))),
            Err(VideoIoError::FirstFrame)
        ));
    }
}
