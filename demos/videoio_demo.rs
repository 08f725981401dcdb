//! VideoIo Demo
//!
//! Reads every frame of an input through the buffered video I/O layer,
//! optionally writes it back out, and reports the throughput the
//! processing loop actually achieved.
//!
//! Usage:
//!   cargo run -p demos --bin videoio_demo -- --input 'frames/%06d.jpg' --output 'out/%06d.png'
//!   cargo run -p demos --bin videoio_demo -- --input synthetic://300 --work-ms 20
//!   cargo run -p demos --features gstreamer --bin videoio_demo -- --input rtsp://cam/live

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use ruid_videoio::{VideoIo, VideoIoConfig};
use std::{
    collections::VecDeque,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

const FPS_WINDOW_SIZE: usize = 30;

#[derive(Parser)]
struct CliArgs {
    /// Input URI: image sequence, video file, csi://N, /dev/videoN, rtsp://, http://, synthetic://N
    #[arg(long)]
    input: Option<String>,

    /// Output video file or image sequence pattern
    #[arg(long)]
    output: Option<String>,

    /// JSON config; command line values override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "1280")]
    width: u32,

    #[arg(long, default_value = "720")]
    height: u32,

    #[arg(long)]
    buffer_size: Option<usize>,

    #[arg(long)]
    proc_fps: Option<f64>,

    /// Simulated processing time per frame
    #[arg(long, default_value = "0")]
    work_ms: u64,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<usize>,
}

fn build_config(args: &CliArgs) -> Result<VideoIoConfig> {
    let mut config = match &args.config {
        Some(path) => VideoIoConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => {
            let input = args
                .input
                .clone()
                .context("--input is required without --config")?;
            VideoIoConfig::new((args.width, args.height), input)
        }
    };
    if args.config.is_some() {
        if let Some(input) = &args.input {
            config.input_uri = input.clone();
        }
    }
    if args.output.is_some() {
        config.output_uri = args.output.clone();
    }
    if let Some(n) = args.buffer_size {
        config.buffer_size = n;
    }
    if let Some(fps) = args.proc_fps {
        config.proc_fps = fps;
    }
    Ok(config)
}

/// FPS calculation helper
fn calculate_fps(window: &VecDeque<Instant>) -> f64 {
    match (window.front(), window.back()) {
        (Some(first), Some(last)) if window.len() >= 2 => {
            (window.len() - 1) as f64 / last.duration_since(*first).as_secs_f64()
        }
        _ => 0.0,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();
    let config = build_config(&args)?;

    let mut stream = VideoIo::new(config).context("Failed to open video stream")?;
    info!(
        "Capture interval {:.1} ms ({})",
        stream.cap_dt().as_secs_f64() * 1000.0,
        if stream.is_live() { "live" } else { "finite" }
    );
    stream.start()?;

    let started = Instant::now();
    let mut window = VecDeque::with_capacity(FPS_WINDOW_SIZE);
    let mut frames = 0usize;

    while let Some(frame) = stream.read()? {
        if args.work_ms > 0 {
            thread::sleep(Duration::from_millis(args.work_ms));
        }
        if stream.has_sink() {
            stream.write(&frame)?;
        }

        frames += 1;
        if window.len() == FPS_WINDOW_SIZE {
            window.pop_front();
        }
        window.push_back(Instant::now());
        if frames % FPS_WINDOW_SIZE == 0 {
            info!(
                "frame {} ({}x{}) @ {:.1} FPS, {} dropped",
                frame.index,
                frame.width,
                frame.height,
                calculate_fps(&window),
                stream.dropped_frames()
            );
        }
        if args.max_frames.is_some_and(|max| frames >= max) {
            break;
        }
    }

    stream.release()?;
    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "Done: {frames} frames in {elapsed:.2}s ({:.1} FPS)",
        frames as f64 / elapsed.max(f64::EPSILON)
    );
    Ok(())
}
