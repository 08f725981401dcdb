//! Async consumer demo: the same buffered capture, consumed as a
//! `tokio_stream::Stream`.
//!
//! Usage: cargo run -p demos --bin stream_demo -- synthetic://120

use anyhow::{Context, Result};
use log::info;
use ruid_videoio::{frame_stream, VideoIo, VideoIoConfig};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "synthetic://120".to_string());
    let io = VideoIo::new(VideoIoConfig::new((640, 360), input))
        .context("Failed to open video stream")?;

    let mut frames = frame_stream(io);
    let mut count = 0u64;
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        count += 1;
        if count % 30 == 0 {
            info!("frame {} pts {:?}", frame.index, frame.pts);
        }
    }
    info!("Stream ended after {count} frames");
    Ok(())
}
