use std::time::Duration;

/// Capture interval: live sources are capped at the processing rate,
/// finite sources always run at the stream rate.
pub fn cap_dt(cap_fps: f64, proc_fps: f64, is_live: bool) -> Duration {
    let fps = if is_live { cap_fps.min(proc_fps) } else { cap_fps };
    Duration::from_secs_f64(1.0 / fps)
}

/// Rates the capture interval is derived from.  Nothing is cached; every
/// query recomputes from the two rates and liveness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    cap_fps: f64,
    proc_fps: f64,
    is_live: bool,
}

impl Pacing {
    /// `source_fps` is what the source reports; zero or non-finite means
    /// unknown and falls back to the configured `frame_rate`.
    pub fn new(source_fps: f64, frame_rate: f64, proc_fps: f64, is_live: bool) -> Self {
        let cap_fps = if source_fps.is_finite() && source_fps > 0.0 {
            source_fps
        } else {
            frame_rate
        };
        Self {
            cap_fps,
            proc_fps,
            is_live,
        }
    }

    pub fn cap_fps(&self) -> f64 {
        self.cap_fps
    }

    pub fn proc_fps(&self) -> f64 {
        self.proc_fps
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn cap_dt(&self) -> Duration {
        cap_dt(self.cap_fps, self.proc_fps, self.is_live)
    }

    /// Frame rate an output recorded from this stream should be encoded at.
    pub fn output_fps(&self) -> f64 {
        1.0 / self.cap_dt().as_secs_f64()
    }
}
