use std::time::Duration;

use crate::{Result, VideoIoError};

/// One decoded frame: packed RGB8, `width * height * 3` bytes, no row padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Position in capture order, starting at 0.
    pub index: u64,
    pub pts: Duration,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            data,
            index: 0,
            pts: Duration::ZERO,
        };
        frame.check_len()?;
        Ok(frame)
    }

    /// A frame where every pixel is `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgb.repeat(pixels),
            index: 0,
            pts: Duration::ZERO,
        }
    }

    /// Copy a frame out of a row-padded buffer (e.g. a mapped GStreamer buffer).
    pub fn from_strided(width: u32, height: u32, stride: usize, bytes: &[u8]) -> Result<Self> {
        let row = width as usize * 3;
        let rows = height as usize;
        let needed = match rows {
            0 => 0,
            n => stride * (n - 1) + row,
        };
        if stride < row || bytes.len() < needed {
            return Err(VideoIoError::FrameSize {
                width,
                height,
                expected: needed.max(row * rows),
                actual: bytes.len(),
            });
        }

        let data = if stride == row {
            bytes[..row * rows].to_vec()
        } else {
            let mut data = Vec::with_capacity(row * rows);
            for r in 0..rows {
                let start = r * stride;
                data.extend_from_slice(&bytes[start..start + row]);
            }
            data
        };
        Self::new(width, height, data)
    }

    /// Inverse of [`Frame::from_strided`]; padding bytes are zero.
    pub fn to_strided(&self, stride: usize) -> Vec<u8> {
        let row = self.width as usize * 3;
        if stride <= row {
            return self.data.clone();
        }
        let mut out = vec![0u8; stride * self.height as usize];
        for (dst, src) in out.chunks_exact_mut(stride).zip(self.data.chunks_exact(row)) {
            dst[..row].copy_from_slice(src);
        }
        out
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = pts;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn expected_len(&self) -> usize {
        ruid_preprocess::rgb_len(self.width, self.height)
    }

    pub fn check_len(&self) -> Result<()> {
        if self.data.len() != self.expected_len() {
            return Err(VideoIoError::FrameSize {
                width: self.width,
                height: self.height,
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Row stride GStreamer uses for packed RGB (rows aligned to 4 bytes).
pub fn aligned_rgb_stride(width: u32) -> usize {
    (width as usize * 3 + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_length() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::new(2, 2, vec![0; 11]),
            Err(VideoIoError::FrameSize { expected: 12, actual: 11, .. })
        ));
    }

    #[test]
    fn strided_copy_drops_padding() {
        // 3px wide rows are 9 bytes, padded to 12
        assert_eq!(aligned_rgb_stride(3), 12);
        let mut padded = Vec::new();
        for r in 0..2u8 {
            padded.extend(std::iter::repeat(r + 1).take(9));
            padded.extend([0xEE; 3]);
        }
        let frame = Frame::from_strided(3, 2, 12, &padded).unwrap();
        assert_eq!(&frame.data[..9], &[1; 9]);
        assert_eq!(&frame.data[9..], &[2; 9]);
        assert_eq!(frame.to_strided(12).len(), 24);
        assert_eq!(&frame.to_strided(12)[9..12], &[0; 3]);
    }

    #[test]
    fn strided_rejects_short_input() {
        assert!(Frame::from_strided(4, 4, 12, &[0; 20]).is_err());
        assert!(Frame::from_strided(4, 1, 8, &[0; 12]).is_err());
    }
}
