use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::device::{CaptureDevice, CaptureStream, RawBuffer};
use crate::common::PixelFormat;
use crate::config::{CameraPosition, QualityPreset};
use crate::error::CaptureError;

const PALETTE: [[u8; 3]; 4] = [[220, 40, 30], [40, 200, 60], [30, 60, 220], [128, 128, 128]];

/// Test-pattern camera. Cycles through solid colours with a little sensor
/// noise so the pipeline has something to classify without hardware.
pub struct SyntheticCamera {
    name: String,
    position: CameraPosition,
    frame_rate: u32,
    hold: Duration,
}

impl SyntheticCamera {
    pub fn new(position: CameraPosition, frame_rate: u32) -> Self {
        Self {
            name: format!("synthetic-{:?}", position).to_lowercase(),
            position,
            frame_rate: frame_rate.max(1),
            hold: Duration::from_secs(2),
        }
    }

    /// How long each colour stays on screen.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

impl CaptureDevice for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> CameraPosition {
        self.position
    }

    fn open(&self, preset: QualityPreset) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (width, height) = preset.dimensions();
        Ok(Box::new(SyntheticStream {
            width,
            height,
            interval: Duration::from_secs(1) / self.frame_rate,
            hold: self.hold,
            started_at: None,
            rng: StdRng::from_os_rng(),
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    interval: Duration,
    hold: Duration,
    started_at: Option<Instant>,
    rng: StdRng,
}

impl SyntheticStream {
    fn current_color(&self) -> [u8; 3] {
        let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let hold = self.hold.as_millis().max(1);
        let index = (elapsed.as_millis() / hold) as usize % PALETTE.len();
        PALETTE[index]
    }
}

impl CaptureStream for SyntheticStream {
    fn start_running(&mut self) -> Result<(), CaptureError> {
        self.started_at.get_or_insert_with(Instant::now);
        Ok(())
    }

    fn next_buffer(&mut self) -> Result<Option<RawBuffer>, CaptureError> {
        std::thread::sleep(self.interval);

        let [r, g, b] = self.current_color();
        let pixel_count = self.width as usize * self.height as usize;
        let mut pixels = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            let noise: u8 = self.rng.random_range(0..12);
            // B G R A, the layout cameras hand out
            pixels.extend_from_slice(&[
                b.saturating_add(noise),
                g.saturating_add(noise),
                r.saturating_add(noise),
                u8::MAX,
            ]);
        }
        Ok(Some(RawBuffer {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra8,
            pixels,
        }))
    }
}
