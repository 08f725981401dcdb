use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use ruid_preprocess::Resizer;

use crate::buffer::FrameBuffer;
use crate::capture::{self, CaptureHandle};
use crate::config::VideoIoConfig;
use crate::pacing::Pacing;
use crate::protocol::Protocol;
use crate::source::{self, FrameSink, FrameSource};
use crate::{Frame, Result, VideoIoError};

/// Lifecycle of a [`VideoIo`]; only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Source open, first frame buffered, capture thread not running.
    Created,
    Capturing,
    /// Capture thread joined.  Buffered frames are gone; `read` reports end of stream.
    Stopped,
    /// Source and sink closed.
    Released,
}

/// Video capturing and output saving.
///
/// ```no_run
/// use ruid_videoio::{VideoIo, VideoIoConfig};
/// let mut io = VideoIo::new(VideoIoConfig::new((1280, 720), "rtsp://cam/live")).unwrap();
/// io.start().unwrap();
/// while let Some(frame) = io.read().unwrap() {
///     println!("frame {} ({}×{})", frame.index, frame.width, frame.height);
/// }
/// io.release().unwrap();
/// ```
pub struct VideoIo {
    config: VideoIoConfig,
    protocol: Protocol,
    pacing: Pacing,
    native_size: (u32, u32),
    // decided once at construction; scales from each frame's own size
    resizer: Option<Mutex<Resizer>>,
    buffer: Arc<FrameBuffer>,
    // owned here until `start`, then by the capture thread until joined
    source: Option<Box<dyn FrameSource>>,
    capture: Option<CaptureHandle>,
    sink: Option<Box<dyn FrameSink>>,
    state: StreamState,
}

impl VideoIo {
    /// Open the input (and output, if `config.output_uri` is set) through
    /// the configured backend and buffer the first frame.
    pub fn new(config: VideoIoConfig) -> Result<Self> {
        config.validate()?;
        let protocol = Protocol::parse(&config.input_uri);
        let source = source::open_source(&config, protocol)?;
        let mut io = Self::prime(config, protocol, source)?;

        if let Some(uri) = io.config.output_uri.clone() {
            io.sink = Some(source::open_sink(&io.config, &uri, io.pacing.output_fps())?);
        }
        Ok(io)
    }

    /// Build around an already opened source and optional sink.
    /// `config.input_uri` still decides liveness.
    pub fn with_source(
        config: VideoIoConfig,
        source: Box<dyn FrameSource>,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Result<Self> {
        config.validate()?;
        let protocol = Protocol::parse(&config.input_uri);
        let mut io = Self::prime(config, protocol, source)?;
        io.sink = sink;
        Ok(io)
    }

    fn prime(config: VideoIoConfig, protocol: Protocol, mut source: Box<dyn FrameSource>) -> Result<Self> {
        let first = match source::first_frame(source.read_frame()) {
            Ok(frame) => frame,
            Err(e) => return close_with(source, e),
        };

        let capacity = NonZeroUsize::new(config.buffer_size)
            .ok_or_else(|| VideoIoError::InvalidConfig("buffer_size must be at least 1".into()))?;
        let buffer = Arc::new(FrameBuffer::new(capacity));

        let native_size = match source.native_size() {
            (0, _) | (_, 0) => first.size(),
            size => size,
        };
        let resizer = if native_size != config.size {
            Some(Mutex::new(Resizer::new(config.size)?))
        } else {
            None
        };
        buffer.try_push(first);

        let pacing = Pacing::new(source.fps(), config.frame_rate, config.proc_fps, protocol.is_live());
        info!(
            "{}x{} stream @ {} FPS ({protocol:?}, {})",
            native_size.0,
            native_size.1,
            pacing.cap_fps(),
            if protocol.is_live() { "live" } else { "finite" }
        );

        Ok(Self {
            config,
            protocol,
            pacing,
            native_size,
            resizer,
            buffer,
            source: Some(source),
            capture: None,
            sink: None,
            state: StreamState::Created,
        })
    }

    /// Start capturing from file or device.  No-op if already capturing.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            StreamState::Capturing => Ok(()),
            StreamState::Released => Err(VideoIoError::Released),
            StreamState::Stopped => Err(VideoIoError::InvalidState {
                op: "start",
                state: self.state,
            }),
            StreamState::Created => {
                let source = self.source.take().ok_or(VideoIoError::InvalidState {
                    op: "start",
                    state: self.state,
                })?;
                let handle = capture::spawn(source, Arc::clone(&self.buffer), self.is_live())?;
                self.capture = Some(handle);
                self.state = StreamState::Capturing;
                Ok(())
            }
        }
    }

    /// Stop capturing and wait for the capture thread to exit.
    ///
    /// Blocks for as long as the source's current read does; a native read
    /// cannot be interrupted.  Idempotent.
    pub fn stop(&mut self) {
        if matches!(self.state, StreamState::Stopped | StreamState::Released) {
            return;
        }
        self.buffer.signal_shutdown();
        let cleared = self.buffer.clear();
        if let Some(handle) = self.capture.take() {
            match handle.join() {
                Ok(source) => self.source = Some(source),
                Err(_) => warn!("Capture thread panicked"),
            }
        }
        debug!("Capture stopped, discarded {cleared} buffered frames");
        self.state = StreamState::Stopped;
    }

    /// Next frame, resized to `config.size` if the source differs.  Frames
    /// that change size mid-stream are scaled from their own size.
    /// `Ok(None)` means no more frames will arrive.
    ///
    /// Before [`VideoIo::start`] only the primed frame is available; a
    /// second read would wait forever.
    pub fn read(&self) -> Result<Option<Frame>> {
        if self.state == StreamState::Released {
            return Err(VideoIoError::Released);
        }
        let Some(frame) = self.buffer.pop() else {
            return Ok(None);
        };
        match &self.resizer {
            None => Ok(Some(frame)),
            Some(resizer) => {
                let mut resizer = resizer.lock().unwrap_or_else(PoisonError::into_inner);
                let (width, height) = resizer.dst_size();
                let data = resizer.run(frame.size(), &frame.data)?;
                Ok(Some(Frame {
                    width,
                    height,
                    data,
                    ..frame
                }))
            }
        }
    }

    /// Write one frame to the output.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.state == StreamState::Released {
            return Err(VideoIoError::Released);
        }
        let sink = self.sink.as_mut().ok_or(VideoIoError::NoSink)?;
        sink.write_frame(frame)
    }

    /// Stop capturing, then close the output and input.  Idempotent.
    pub fn release(&mut self) -> Result<()> {
        if self.state == StreamState::Released {
            return Ok(());
        }
        self.stop();
        self.state = StreamState::Released;

        let sink_closed = match self.sink.take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        };
        let source_closed = match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        };
        sink_closed.and(source_closed)
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn config(&self) -> &VideoIoConfig {
        &self.config
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_live(&self) -> bool {
        self.protocol.is_live()
    }

    /// Source frame rate, or the configured `frame_rate` if unknown.
    pub fn cap_fps(&self) -> f64 {
        self.pacing.cap_fps()
    }

    /// Capture interval; see [`crate::cap_dt`].
    pub fn cap_dt(&self) -> Duration {
        self.pacing.cap_dt()
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.native_size
    }

    /// Output size of [`VideoIo::read`].
    pub fn size(&self) -> (u32, u32) {
        self.config.size
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Live frames discarded because the buffer was full.
    pub fn dropped_frames(&self) -> u64 {
        self.buffer.dropped()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Drop for VideoIo {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Error releasing video stream: {e}");
        }
    }
}

fn close_with<T>(mut source: Box<dyn FrameSource>, err: VideoIoError) -> Result<T> {
    if let Err(e) = source.close() {
        warn!("Error closing source: {e}");
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synthetic::SyntheticSource;

    fn config(uri: &str) -> VideoIoConfig {
        let mut c = VideoIoConfig::new((8, 6), uri);
        c.buffer_size = 2;
        c
    }

    #[test]
    fn primes_first_frame() {
        let src = SyntheticSource::new(8, 6).with_limit(3).with_fps(25.0);
        let io = VideoIo::with_source(config("clip.mp4"), Box::new(src), None).unwrap();
        assert_eq!(io.state(), StreamState::Created);
        assert_eq!(io.buffered(), 1);
        assert_eq!(io.cap_fps(), 25.0);
        assert!(!io.is_live());
        assert_eq!(io.read().unwrap().unwrap().index, 0);
    }

    #[test]
    fn start_is_idempotent_and_not_restartable() {
        let src = SyntheticSource::new(8, 6).with_limit(3);
        let mut io = VideoIo::with_source(config("clip.mp4"), Box::new(src), None).unwrap();
        io.start().unwrap();
        io.start().unwrap();
        assert_eq!(io.state(), StreamState::Capturing);
        io.stop();
        assert!(matches!(
            io.start(),
            Err(VideoIoError::InvalidState { op: "start", state: StreamState::Stopped })
        ));
    }

    #[test]
    fn stop_before_start_ends_stream() {
        let src = SyntheticSource::new(8, 6);
        let mut io = VideoIo::with_source(config("clip.mp4"), Box::new(src), None).unwrap();
        io.stop();
        assert_eq!(io.state(), StreamState::Stopped);
        assert!(io.read().unwrap().is_none());
    }

    #[test]
    fn operations_fail_after_release() {
        let src = SyntheticSource::new(8, 6).with_limit(1);
        let mut io = VideoIo::with_source(config("clip.mp4"), Box::new(src), None).unwrap();
        io.release().unwrap();
        assert!(matches!(io.read(), Err(VideoIoError::Released)));
        assert!(matches!(io.start(), Err(VideoIoError::Released)));
        assert!(matches!(io.write(&Frame::filled(8, 6, [0; 3])), Err(VideoIoError::Released)));
        io.stop();
        assert!(io.release().is_ok());
    }

    #[test]
    fn write_without_sink_fails() {
        let src = SyntheticSource::new(8, 6).with_limit(1);
        let mut io = VideoIo::with_source(config("clip.mp4"), Box::new(src), None).unwrap();
        assert!(!io.has_sink());
        assert!(matches!(io.write(&Frame::filled(8, 6, [0; 3])), Err(VideoIoError::NoSink)));
    }

    #[test]
    fn rejects_invalid_config_before_reading() {
        let src = SyntheticSource::new(8, 6);
        let counter = src.counter();
        let mut c = config("clip.mp4");
        c.proc_fps = 0.0;
        assert!(matches!(
            VideoIo::with_source(c, Box::new(src), None),
            Err(VideoIoError::InvalidConfig(_))
        ));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn live_pacing_uses_processing_rate() {
        let src = SyntheticSource::new(8, 6).with_fps(30.0);
        let mut c = config("rtsp://cam/live");
        c.proc_fps = 10.0;
        let io = VideoIo::with_source(c, Box::new(src), None).unwrap();
        assert!(io.is_live());
        assert_eq!(io.cap_dt(), Duration::from_secs_f64(0.1));
    }
}
