//! GStreamer backend: `… ! appsink name=sink` for capture,
//! `appsrc name=src ! …` for encoding.

use std::time::Duration;

use gst::prelude::*;
use log::{debug, warn};

use super::{FrameSink, FrameSource};
use crate::frame::aligned_rgb_stride;
use crate::pipeline::fps_fraction;
use crate::{Frame, Result, VideoIoError};

pub(crate) fn init() -> Result<()> {
    gst::init().map_err(VideoIoError::GstInit)
}

/// Plugin probe handed to the pipeline builder.
pub(crate) fn has_element(name: &str) -> bool {
    gst::ElementFactory::find(name).is_some()
}

fn launch(description: &str) -> Result<gst::Pipeline> {
    gst::parse::launch(description)
        .map_err(VideoIoError::ParsePipeline)?
        .downcast::<gst::Pipeline>()
        .map_err(|_| VideoIoError::NotPipeline)
}

/// Capture handle – owns the pipeline and *appsink*.
pub struct GstSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    size: (u32, u32),
    fps: f64,
    frames_read: u64,
    pending: Option<Frame>,
}

impl GstSource {
    /// Launch `description` and pull the first sample so size and rate are
    /// known.  Fails with [`VideoIoError::FirstFrame`] if there is none.
    pub fn open(description: &str) -> Result<Self> {
        init()?;
        let pipeline = launch(description)?;
        let appsink = pipeline
            .by_name("sink")
            .ok_or(VideoIoError::ElementNotFound("sink"))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| VideoIoError::ElementDowncastFailed("sink"))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(VideoIoError::StateChange)?;

        let mut source = Self {
            pipeline,
            appsink,
            size: (0, 0),
            fps: 0.0,
            frames_read: 0,
            pending: None,
        };
        // a pipeline that never produces a sample is a construction failure
        let first = super::first_frame(source.pull())?;
        source.pending = Some(first);
        Ok(source)
    }

    fn pull(&mut self) -> Result<Option<Frame>> {
        let sample = match self.appsink.pull_sample() {
            Ok(sample) => sample,
            Err(_) if self.appsink.is_eos() => return Ok(None),
            Err(e) => return Err(VideoIoError::PullSample(e)),
        };

        let buffer = sample.buffer().ok_or(VideoIoError::MissingBuffer)?;
        let caps = sample.caps().ok_or(VideoIoError::MissingCaps)?;
        let s = caps.structure(0).ok_or(VideoIoError::MissingStructure)?;
        let width = s
            .get::<i32>("width")
            .map_err(|e| VideoIoError::FieldError(e.to_string()))? as u32;
        let height = s
            .get::<i32>("height")
            .map_err(|e| VideoIoError::FieldError(e.to_string()))? as u32;
        if let Ok(rate) = s.get::<gst::Fraction>("framerate") {
            if rate.denom() != 0 {
                self.fps = rate.numer() as f64 / rate.denom() as f64;
            }
        }
        self.size = (width, height);

        let pts = buffer
            .pts()
            .map(|t| Duration::from_nanos(t.nseconds()))
            .unwrap_or(Duration::ZERO);

        let map = buffer
            .map_readable()
            .map_err(|e| VideoIoError::BufferMap(e.to_string()))?;
        let frame = Frame::from_strided(width, height, aligned_rgb_stride(width), map.as_slice())?
            .with_index(self.frames_read)
            .with_pts(pts);
        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl FrameSource for GstSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.pull(),
        }
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn close(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(VideoIoError::StateChange)?;
        Ok(())
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Encode handle – owns the pipeline and *appsrc*.
pub struct GstSink {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    size: (u32, u32),
    frame_ns: u64,
    written: u64,
    closed: bool,
}

impl GstSink {
    pub fn open(description: &str, size: (u32, u32), fps: f64) -> Result<Self> {
        init()?;
        let pipeline = launch(description)?;
        let appsrc = pipeline
            .by_name("src")
            .ok_or(VideoIoError::ElementNotFound("src"))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| VideoIoError::ElementDowncastFailed("src"))?;

        let (num, den) = fps_fraction(fps);
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .field("width", size.0 as i32)
            .field("height", size.1 as i32)
            .field("framerate", gst::Fraction::new(num, den))
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        pipeline
            .set_state(gst::State::Playing)
            .map_err(VideoIoError::StateChange)?;

        Ok(Self {
            pipeline,
            appsrc,
            size,
            frame_ns: (1e9 / fps) as u64,
            written: 0,
            closed: false,
        })
    }
}

impl FrameSink for GstSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.size() != self.size {
            return Err(VideoIoError::SizeMismatch {
                expected: self.size,
                actual: frame.size(),
            });
        }
        frame.check_len()?;

        let mut buffer = gst::Buffer::from_mut_slice(frame.to_strided(aligned_rgb_stride(frame.width)));
        if let Some(buffer) = buffer.get_mut() {
            buffer.set_pts(gst::ClockTime::from_nseconds(self.frame_ns * self.written));
            buffer.set_duration(gst::ClockTime::from_nseconds(self.frame_ns));
        }
        self.appsrc.push_buffer(buffer).map_err(VideoIoError::Flow)?;
        self.written += 1;
        Ok(())
    }

    /// Send EOS and wait for the muxer to finish the file.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.appsrc.end_of_stream().map_err(VideoIoError::Flow)?;

        if let Some(bus) = self.pipeline.bus() {
            let msg = bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(5),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            );
            match msg.as_ref().map(|m| m.view()) {
                Some(gst::MessageView::Error(err)) => warn!("Encoder error on close: {}", err.error()),
                Some(_) => debug!("Encoder flushed {} frames", self.written),
                None => warn!("Timed out waiting for encoder EOS"),
            }
        }

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(VideoIoError::StateChange)?;
        Ok(())
    }
}

impl Drop for GstSink {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "needs a GStreamer runtime"]
    fn empty_pipeline_is_construction_failure() {
        let line = "videotestsrc num-buffers=0 ! videoconvert ! video/x-raw, format=RGB ! appsink name=sink sync=false";
        assert!(matches!(GstSource::open(line), Err(VideoIoError::FirstFrame)));
    }

    #[test]
    #[ignore = "needs a GStreamer runtime"]
    fn reads_test_pattern() {
        let line = "videotestsrc num-buffers=3 ! video/x-raw, width=64, height=48 ! videoconvert ! video/x-raw, format=RGB ! appsink name=sink sync=false";
        let mut src = GstSource::open(line).unwrap();
        assert_eq!(src.native_size(), (64, 48));
        let mut n = 0;
        while let Some(frame) = src.read_frame().unwrap() {
            assert_eq!(frame.index, n);
            n += 1;
        }
        assert_eq!(n, 3);
    }
}
