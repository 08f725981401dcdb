// ruid-videoio/src/stream.rs
use crate::{Frame, Result, VideoIo};
use futures_core::Stream;
use log::warn;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// back‑pressure: VideoIo → channel → consumer
const DEPTH: usize = 4;

/// Drive `io` from a dedicated thread and expose its frames as a `Stream`.
///
/// The stream ends at end of stream or after the first error.  Dropping the
/// stream stops capture; the controller is released either way.
pub fn frame_stream(mut io: VideoIo) -> impl Stream<Item = Result<Frame>> {
    let (tx, rx) = mpsc::channel(DEPTH);

    std::thread::spawn(move || {
        if let Err(e) = io.start() {
            let _ = tx.blocking_send(Err(e));
            return;
        }
        loop {
            match io.read() {
                Ok(Some(f)) => {
                    if tx.blocking_send(Ok(f)).is_err() {
                        break; // consumer dropped
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }
        if let Err(e) = io.release() {
            warn!("Error releasing video stream: {e}");
        }
    });

    ReceiverStream::new(rx)
}
