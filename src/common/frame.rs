use chrono::{DateTime, TimeDelta, Utc};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

use crate::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Camera native layout, B G R A.
    Bgra8,
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// One captured pixel buffer. Cloning shares the buffer.
#[derive(Clone)]
pub struct Frame {
    sequence: u64,
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Arc<[u8]>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(
        sequence: u64,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            sequence,
            width,
            height,
            format,
            pixels: Arc::from(pixels),
            captured_at: Utc::now(),
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Time elapsed since the buffer left the camera.
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.captured_at
    }

    /// Reads the pixel at (x, y) as R G B regardless of the buffer layout.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.pixels[offset..offset + bpp];
        match self.format {
            PixelFormat::Bgra8 => [px[2], px[1], px[0]],
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => [px[0], px[1], px[2]],
        }
    }

    /// Converts the raw buffer into an image the display can render.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, FrameError> {
        let raw = match self.format {
            PixelFormat::Rgba8 => self.pixels.to_vec(),
            PixelFormat::Bgra8 => {
                let mut rgba = Vec::with_capacity(self.pixels.len());
                // -- pixel order is B G R A; convert to R G B A
                for chunk in self.pixels.chunks_exact(4) {
                    rgba.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]);
                }
                rgba
            }
            PixelFormat::Rgb8 => {
                let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for chunk in self.pixels.chunks_exact(3) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], u8::MAX]);
                }
                rgba
            }
        };
        let expected = self.width as usize * self.height as usize * 4;
        let actual = raw.len();
        RgbaImage::from_raw(self.width, self.height, raw)
            .ok_or(FrameError::BufferSize { expected, actual })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Builds a frame filled with a single colour, handy for devices and tests.
pub fn solid_frame(sequence: u64, width: u32, height: u32, color: Rgba<u8>) -> Frame {
    let pixels: Vec<u8> = color
        .0
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect();
    Frame {
        sequence,
        width,
        height,
        format: PixelFormat::Rgba8,
        pixels: Arc::from(pixels),
        captured_at: Utc::now(),
    }
}
