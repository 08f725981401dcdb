//! GStreamer pipeline descriptions.
//!
//! Plain string builders, compiled with or without the `gstreamer` feature.
//! Plugin availability is passed in as a predicate so the choice of
//! hardware elements can be exercised without GStreamer installed.

use crate::config::VideoIoConfig;
use crate::protocol::{image_format, Protocol};
use crate::{Result, VideoIoError};

/// `fps` as a caps fraction: whole rates are `n/1`, NTSC-style rates
/// like 29.97 become `30000/1001`.
pub fn fps_fraction(fps: f64) -> (i32, i32) {
    let whole = fps.round();
    if (fps - whole).abs() < 1e-3 {
        return (whole as i32, 1);
    }
    let ntsc = (fps * 1.001).round();
    if (fps - ntsc / 1.001).abs() < 1e-3 {
        return ((ntsc * 1000.0) as i32, 1001);
    }
    ((fps * 1000.0).round() as i32, 1000)
}

/// Decode + scale pipeline for `config.input_uri`, ending in
/// `appsink name=sink` that emits packed RGB at `config.size`.
pub fn capture_pipeline(
    config: &VideoIoConfig,
    protocol: Protocol,
    has_element: impl Fn(&str) -> bool,
) -> Result<String> {
    let uri = config.input_uri.as_str();
    let (w, h) = config.size;
    let (rw, rh) = config.resolution;
    let (num, den) = fps_fraction(config.frame_rate);

    let convert = if has_element("nvvidconv") && protocol != Protocol::V4l2 {
        // format conversion for hardware decoder
        format!(
            "nvvidconv interpolation-method=5 ! \
             video/x-raw, width={w}, height={h}, format=BGRx ! \
             videoconvert ! video/x-raw, format=RGB ! appsink name=sink sync=false"
        )
    } else {
        format!(
            "videoscale ! video/x-raw, width={w}, height={h} ! \
             videoconvert ! video/x-raw, format=RGB ! appsink name=sink sync=false"
        )
    };

    let source = match protocol {
        Protocol::Image => format!(
            "multifilesrc location={uri} index=1 caps=\"image/{},framerate={num}/{den}\" ! decodebin ! ",
            image_format(uri)
        ),
        Protocol::Video => format!("filesrc location={uri} ! decodebin ! "),
        Protocol::Csi => {
            if !has_element("nvarguscamerasrc") {
                return Err(VideoIoError::PluginMissing("CSI (nvarguscamerasrc)".into()));
            }
            let sensor_id = uri.split_once("://").map(|(_, id)| id).unwrap_or_default();
            format!(
                "nvarguscamerasrc sensor_id={sensor_id} ! \
                 video/x-raw(memory:NVMM), width={rw}, height={rh}, \
                 format=NV12, framerate={num}/{den} ! "
            )
        }
        Protocol::V4l2 => {
            if !has_element("v4l2src") {
                return Err(VideoIoError::PluginMissing("V4L2 (v4l2src)".into()));
            }
            // no framerate in the caps: many UVC cameras only advertise a subset
            format!("v4l2src device={uri} ! video/x-raw, width={rw}, height={rh}, format=YUY2 ! ")
        }
        Protocol::Rtsp => format!(
            "rtspsrc location={uri} latency=0 ! \
             capsfilter caps=application/x-rtp,media=video ! decodebin ! "
        ),
        Protocol::Http => format!("souphttpsrc location={uri} is-live=true ! decodebin ! "),
    };

    Ok(source + &convert)
}

/// H.264/MP4 encode pipeline fed by `appsrc name=src`.
pub fn write_pipeline(output_uri: &str, has_element: impl Fn(&str) -> bool) -> Result<String> {
    // use hardware encoder if found
    let encoder = if has_element("omxh264enc") {
        "omxh264enc preset-level=2"
    } else if has_element("x264enc") {
        "x264enc pass=4"
    } else {
        return Err(VideoIoError::PluginMissing("H.264 encoder".into()));
    };
    Ok(format!(
        "appsrc name=src ! autovideoconvert ! {encoder} ! qtmux ! filesink location={output_uri}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(uri: &str) -> VideoIoConfig {
        let mut c = VideoIoConfig::new((1280, 720), uri);
        c.resolution = (1920, 1080);
        c
    }

    fn only<'a>(names: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |n| names.iter().any(|x| *x == n)
    }

    #[test]
    fn fractions() {
        assert_eq!(fps_fraction(30.0), (30, 1));
        assert_eq!(fps_fraction(29.97), (30000, 1001));
        assert_eq!(fps_fraction(12.5), (12500, 1000));
    }

    #[test]
    fn image_sequence_uses_multifilesrc() {
        let line = capture_pipeline(&config("seq/%06d.jpg"), Protocol::Image, only(&[])).unwrap();
        assert!(line.starts_with("multifilesrc location=seq/%06d.jpg index=1 caps=\"image/jpeg,framerate=30/1\""));
        assert!(line.contains("videoscale ! video/x-raw, width=1280, height=720"));
        assert!(line.ends_with("appsink name=sink sync=false"));
    }

    #[test]
    fn hardware_scaler_except_for_v4l2() {
        let probe = only(&["nvvidconv", "v4l2src"]);
        let video = capture_pipeline(&config("a.mp4"), Protocol::Video, &probe).unwrap();
        assert!(video.contains("nvvidconv interpolation-method=5"));
        let cam = capture_pipeline(&config("/dev/video0"), Protocol::V4l2, &probe).unwrap();
        assert!(cam.starts_with("v4l2src device=/dev/video0 ! video/x-raw, width=1920, height=1080"));
        assert!(!cam.contains("nvvidconv"));
    }

    #[test]
    fn csi_needs_argus() {
        let c = config("csi://1");
        assert!(matches!(
            capture_pipeline(&c, Protocol::Csi, only(&[])),
            Err(VideoIoError::PluginMissing(_))
        ));
        let line = capture_pipeline(&c, Protocol::Csi, only(&["nvarguscamerasrc"])).unwrap();
        assert!(line.starts_with("nvarguscamerasrc sensor_id=1 !"));
        assert!(line.contains("framerate=30/1"));
        let upper = capture_pipeline(&config("CSI://2"), Protocol::Csi, only(&["nvarguscamerasrc"])).unwrap();
        assert!(upper.starts_with("nvarguscamerasrc sensor_id=2 !"));
    }

    #[test]
    fn network_sources() {
        let rtsp = capture_pipeline(&config("rtsp://cam/live"), Protocol::Rtsp, only(&[])).unwrap();
        assert!(rtsp.starts_with("rtspsrc location=rtsp://cam/live latency=0"));
        let http = capture_pipeline(&config("http://cam/mjpg"), Protocol::Http, only(&[])).unwrap();
        assert!(http.contains("is-live=true"));
        assert!(matches!(
            capture_pipeline(&config("/dev/video2"), Protocol::V4l2, only(&[])),
            Err(VideoIoError::PluginMissing(_))
        ));
    }

    #[test]
    fn encoder_preference() {
        let omx = write_pipeline("out.mp4", only(&["omxh264enc", "x264enc"])).unwrap();
        assert!(omx.contains("omxh264enc preset-level=2"));
        let x264 = write_pipeline("out.mp4", only(&["x264enc"])).unwrap();
        assert!(x264.contains("x264enc pass=4 ! qtmux ! filesink location=out.mp4"));
        assert!(write_pipeline("out.mp4", only(&[])).is_err());
    }
}
