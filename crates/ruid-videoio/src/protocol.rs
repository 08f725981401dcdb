use std::path::Path;

use serde::{Deserialize, Serialize};

/// Input source kind, derived once from the input URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// printf-style numbered image sequence, e.g. `frames/%06d.jpg`
    Image,
    /// Video file
    Video,
    /// MIPI CSI camera, `csi://<sensor id>`
    Csi,
    /// USB/V4L2 camera, `/dev/videoN`
    V4l2,
    Rtsp,
    Http,
}

impl Protocol {
    pub fn parse(uri: &str) -> Self {
        let (scheme, path) = match uri.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("", uri),
        };
        match scheme.to_ascii_lowercase().as_str() {
            "csi" => Protocol::Csi,
            "rtsp" => Protocol::Rtsp,
            "http" => Protocol::Http,
            _ if path.contains("/dev/video") => Protocol::V4l2,
            _ if path.contains('%') => Protocol::Image,
            _ => Protocol::Video,
        }
    }

    /// Live sources are unbounded and real-time; files and image sequences are not.
    pub fn is_live(self) -> bool {
        !matches!(self, Protocol::Image | Protocol::Video)
    }
}

/// Image format of a sequence pattern, as named in `image/<format>` caps.
pub fn image_format(uri: &str) -> String {
    let ext = Path::new(uri)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if ext == "jpg" {
        "jpeg".to_string()
    } else {
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_uris() {
        assert_eq!(Protocol::parse("csi://0"), Protocol::Csi);
        assert_eq!(Protocol::parse("rtsp://user:pw@10.0.0.2:554/live"), Protocol::Rtsp);
        assert_eq!(Protocol::parse("http://cam.local/stream"), Protocol::Http);
        assert_eq!(Protocol::parse("/dev/video0"), Protocol::V4l2);
        assert_eq!(Protocol::parse("frames/%06d.jpg"), Protocol::Image);
        assert_eq!(Protocol::parse("clip.mp4"), Protocol::Video);
        assert_eq!(Protocol::parse("file:///data/clip.mp4"), Protocol::Video);
    }

    #[test]
    fn schemes_ignore_case() {
        assert_eq!(Protocol::parse("RTSP://cam/live"), Protocol::Rtsp);
        assert_eq!(Protocol::parse("Csi://0"), Protocol::Csi);
        assert_eq!(Protocol::parse("HTTP://cam/x"), Protocol::Http);
        assert!(Protocol::parse("RTSP://cam/live").is_live());
    }

    #[test]
    fn liveness() {
        assert!(!Protocol::Image.is_live());
        assert!(!Protocol::Video.is_live());
        for p in [Protocol::Csi, Protocol::V4l2, Protocol::Rtsp, Protocol::Http] {
            assert!(p.is_live());
        }
    }

    #[test]
    fn image_formats() {
        assert_eq!(image_format("seq/%06d.jpg"), "jpeg");
        assert_eq!(image_format("seq/%06d.PNG"), "png");
        assert_eq!(image_format("seq/%06d"), "");
    }
}
