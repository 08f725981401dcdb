// capture thread: source → FrameBuffer
//
// Shutdown is checked once per iteration, before the (possibly blocking)
// source read.  A failed or exhausted read flags shutdown and ends the
// thread; it is never retried.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::buffer::{FrameBuffer, PushOutcome};
use crate::source::FrameSource;

/// The thread hands the source back on exit so the owner can close it.
pub(crate) type CaptureHandle = JoinHandle<Box<dyn FrameSource>>;

pub(crate) fn spawn(
    source: Box<dyn FrameSource>,
    buffer: Arc<FrameBuffer>,
    is_live: bool,
) -> io::Result<CaptureHandle> {
    thread::Builder::new()
        .name("videoio-capture".into())
        .spawn(move || capture_frames(source, &buffer, is_live))
}

pub(crate) fn capture_frames(
    mut source: Box<dyn FrameSource>,
    buffer: &FrameBuffer,
    is_live: bool,
) -> Box<dyn FrameSource> {
    debug!("Capture thread started (live: {is_live})");
    let mut queued = 0u64;

    while !buffer.is_shutdown() {
        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Source exhausted after {queued} frames");
                break;
            }
            Err(e) => {
                warn!("Source read failed, ending capture: {e}");
                break;
            }
        };

        // keep unprocessed frames in the buffer for files
        let outcome = if is_live {
            buffer.try_push(frame)
        } else {
            buffer.push(frame)
        };
        match outcome {
            PushOutcome::Queued => queued += 1,
            PushOutcome::Dropped => debug!("Buffer full, dropped live frame ({} total)", buffer.dropped()),
            PushOutcome::Closed => break,
        }
    }

    buffer.signal_shutdown();
    debug!("Capture thread exiting");
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synthetic::SyntheticSource;
    use std::num::NonZeroUsize;

    #[test]
    fn exhausted_source_flags_shutdown() {
        let buffer = FrameBuffer::new(NonZeroUsize::new(8).unwrap());
        let source = Box::new(SyntheticSource::new(2, 2).with_limit(5));
        capture_frames(source, &buffer, false);
        assert!(buffer.is_shutdown());
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn live_capture_drops_instead_of_blocking() {
        let buffer = FrameBuffer::new(NonZeroUsize::new(2).unwrap());
        let source = Box::new(SyntheticSource::new(2, 2).with_limit(10));
        // would deadlock on a full buffer if the live path ever waited
        capture_frames(source, &buffer, true);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped(), 8);
        assert_eq!(buffer.pop().unwrap().index, 0);
        assert_eq!(buffer.pop().unwrap().index, 1);
    }

    #[test]
    fn does_not_read_after_shutdown() {
        let buffer = FrameBuffer::new(NonZeroUsize::new(2).unwrap());
        buffer.signal_shutdown();
        let source = SyntheticSource::new(2, 2);
        let counter = source.counter();
        capture_frames(Box::new(source), &buffer, false);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
