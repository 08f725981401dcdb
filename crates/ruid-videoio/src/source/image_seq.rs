//! Numbered image sequences (`frames/%06d.jpg`), read and written with the
//! `image` crate.  Numbering starts at 1; a sequence ends at the first
//! missing file.

use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info};

use super::{FrameSink, FrameSource};
use crate::{Frame, Result, VideoIoError};

/// Substitute `index` into the first `%d` / `%0Nd` / `%Nd` of `pattern`.
pub fn format_index(pattern: &str, index: u64) -> Option<String> {
    let start = pattern.find('%')?;
    let conv = &pattern[start + 1..];
    let digits_end = conv.find(|c: char| !c.is_ascii_digit())?;
    if !conv[digits_end..].starts_with('d') {
        return None;
    }
    let flags = &conv[..digits_end];
    let zero_pad = flags.starts_with('0');
    let width: usize = if flags.is_empty() { 0 } else { flags.parse().ok()? };

    let number = if zero_pad {
        format!("{index:0width$}")
    } else {
        format!("{index:>width$}")
    };
    let rest = &conv[digits_end + 1..];
    Some(format!("{}{}{}", &pattern[..start], number, rest))
}

fn indexed_path(pattern: &str, index: u64) -> Result<PathBuf> {
    format_index(pattern, index)
        .map(PathBuf::from)
        .ok_or_else(|| VideoIoError::InvalidConfig(format!("`{pattern}` is not a %d sequence pattern")))
}

pub struct ImageSequenceSource {
    pattern: String,
    next_file: u64,
    frames_read: u64,
    size: (u32, u32),
    pending: Option<Frame>,
}

impl ImageSequenceSource {
    /// Open a sequence.  The first image is decoded up front to learn the
    /// native size; a missing first image is not an error here, the stream
    /// is simply empty.
    pub fn open(pattern: &str) -> Result<Self> {
        let mut source = Self {
            pattern: pattern.to_string(),
            next_file: 1,
            frames_read: 0,
            size: (0, 0),
            pending: None,
        };
        source.pending = source.load_next()?;
        if let Some(frame) = &source.pending {
            source.size = frame.size();
            info!("Image sequence {pattern}: {}x{}", frame.width, frame.height);
        }
        Ok(source)
    }

    fn load_next(&mut self) -> Result<Option<Frame>> {
        let path = indexed_path(&self.pattern, self.next_file)?;
        if !path.exists() {
            debug!("Image sequence ended at {}", path.display());
            return Ok(None);
        }
        let img = image::open(&path)?.to_rgb8();
        let (w, h) = img.dimensions();
        let frame = Frame::new(w, h, img.into_raw())?.with_index(self.frames_read);
        self.next_file += 1;
        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.load_next(),
        }
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    /// Image files carry no timing; the configured frame rate applies.
    fn fps(&self) -> f64 {
        0.0
    }
}

pub struct ImageSequenceSink {
    pattern: String,
    size: (u32, u32),
    next_file: u64,
}

impl ImageSequenceSink {
    /// Prepare to write `size` frames, creating the output directory.
    pub fn create(pattern: &str, size: (u32, u32)) -> Result<Self> {
        let first = indexed_path(pattern, 1)?;
        if let Some(dir) = first.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self {
            pattern: pattern.to_string(),
            size,
            next_file: 1,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.next_file - 1
    }

    fn save(&self, path: &Path, frame: &Frame) -> Result<()> {
        let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
            VideoIoError::FrameSize {
                width: frame.width,
                height: frame.height,
                expected: frame.expected_len(),
                actual: frame.data.len(),
            },
        )?;
        img.save(path)?;
        Ok(())
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.size() != self.size {
            return Err(VideoIoError::SizeMismatch {
                expected: self.size,
                actual: frame.size(),
            });
        }
        let path = indexed_path(&self.pattern, self.next_file)?;
        self.save(&path, frame)?;
        self.next_file += 1;
        Ok(())
    }
}
