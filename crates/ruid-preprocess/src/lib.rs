//! ruid‑preprocess – resize packed RGB8 frames to a fixed output size.
//!
//! The video I/O layer hands every frame it reads through a [`Resizer`]
//! when the source resolution differs from the configured output size.
//! The same input always yields the same output; frames may change size
//! mid-stream.

use resize::{new, Pixel, Type};
use rgb::FromSlice;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("invalid dimensions {0}x{1}")]
    ZeroDimension(u32, u32),
    #[error("expected {expected} RGB bytes for {width}x{height}, got {actual}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("resize failed: {0}")]
    Resize(#[from] resize::Error),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Interpolation used when scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    Point,
    /// Bilinear, matches the usual `resize(frame, size)` default.
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl Filter {
    fn kind(self) -> Type {
        match self {
            Filter::Point => Type::Point,
            Filter::Triangle => Type::Triangle,
            Filter::CatmullRom => Type::Catrom,
            Filter::Lanczos3 => Type::Lanczos3,
        }
    }
}

/// Number of bytes in a packed RGB8 image of `width`×`height`.
pub fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

type Rgb8Scaler = resize::Resizer<resize::formats::Rgb<u8, u8>>;

/// Scales packed RGB8 buffers of any size to one fixed output size.
///
/// Filter coefficients depend on the source size, so the scaler for the
/// most recent source size is kept and rebuilt only when it changes.
#[derive(Debug)]
pub struct Resizer {
    dst: (u32, u32),
    filter: Filter,
    cached: Option<((u32, u32), Rgb8Scaler)>,
}

impl Resizer {
    /// Create a resizer to `dst` (width, height).
    pub fn new(dst: (u32, u32)) -> Result<Self> {
        check_dims(dst)?;
        Ok(Self {
            dst,
            filter: Filter::default(),
            cached: None,
        })
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self.cached = None;
        self
    }

    /// Source size the cached scaler was built for, if any.
    pub fn cached_src(&self) -> Option<(u32, u32)> {
        self.cached.as_ref().map(|(src, _)| *src)
    }

    pub fn dst_size(&self) -> (u32, u32) {
        self.dst
    }

    /// Resize one packed RGB8 image of `src` (width, height).  The input
    /// must be exactly `src.0 * src.1 * 3` bytes.
    pub fn run(&mut self, src: (u32, u32), rgb: &[u8]) -> Result<Vec<u8>> {
        check_dims(src)?;
        let (sw, sh) = src;
        let (dw, dh) = self.dst;
        let expected = rgb_len(sw, sh);
        if rgb.len() != expected {
            return Err(PreprocessError::BufferSize {
                width: sw,
                height: sh,
                expected,
                actual: rgb.len(),
            });
        }

        let mut dst = vec![0u8; rgb_len(dw, dh)];
        if src == self.dst {
            dst.copy_from_slice(rgb);
            return Ok(dst);
        }

        let scaler = match self.cached.take() {
            Some((size, scaler)) if size == src => scaler,
            _ => new(
                sw as usize,
                sh as usize,
                dw as usize,
                dh as usize,
                Pixel::RGB8,
                self.filter.kind(),
            )?,
        };
        let (_, scaler) = self.cached.insert((src, scaler));
        scaler.resize(rgb.as_rgb(), dst.as_rgb_mut())?;
        Ok(dst)
    }
}

fn check_dims((w, h): (u32, u32)) -> Result<()> {
    if w == 0 || h == 0 {
        return Err(PreprocessError::ZeroDimension(w, h));
    }
    Ok(())
}
