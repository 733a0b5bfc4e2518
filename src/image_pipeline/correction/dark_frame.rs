//! Dark frame subtraction and master dark frame averaging.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{RawProcError, Result};

/// Subtracts `dark` from `frame` in place, keeping the black level as the new zero.
///
/// Every sample becomes `clamp(orig - dark + black, 0, max_code)`, where `max_code` is the
/// top of the sensor code range. Returns `false` without touching the frame when no dark
/// frame is loaded or its size differs from the frame.
pub fn subtract_dark_frame(frame: &mut [u16], dark: Option<&[u16]>, black_level: i32, max_code: i32) -> bool {
    let Some(dark) = dark else {
        warn!("Subtracting dark frame is impossible, no dark frame loaded");
        return false;
    };
    if dark.len() != frame.len() {
        warn!(
            frame_bytes = frame.len() * 2,
            dark_bytes = dark.len() * 2,
            "Subtracting dark frame is impossible, size mismatch"
        );
        return false;
    }

    debug!(samples = frame.len(), "Subtracting dark frame");
    let max_code = max_code.clamp(0, u16::MAX as i32);
    frame.par_iter_mut().zip(dark.par_iter()).for_each(|(sample, &dark)| {
        let value = *sample as i32 - dark as i32 + black_level;
        *sample = value.clamp(0, max_code) as u16;
    });
    true
}

/// Accumulates equally sized frames into a rounded mean, the master dark frame.
#[derive(Debug, Default)]
pub struct DarkFrameAverager {
    sums: Vec<u64>,
    frames: u32,
}

impl DarkFrameAverager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn add(&mut self, frame: &[u16]) -> Result<()> {
        if self.frames == 0 {
            self.sums = vec![0; frame.len()];
        } else if frame.len() != self.sums.len() {
            return Err(RawProcError::DarkFrameMismatch {
                expected: self.sums.len() * 2,
                actual: frame.len() * 2,
            });
        }
        self.sums
            .par_iter_mut()
            .zip(frame.par_iter())
            .for_each(|(sum, &sample)| *sum += sample as u64);
        self.frames += 1;
        Ok(())
    }

    pub fn average(&self) -> Result<Vec<u16>> {
        if self.frames == 0 {
            return Err(RawProcError::EmptyAverage);
        }
        let frames = self.frames as u64;
        Ok(self
            .sums
            .par_iter()
            .map(|&sum| ((sum + frames / 2) / frames) as u16)
            .collect())
    }

    pub fn clear(&mut self) {
        self.sums = Vec::new();
        self.frames = 0;
    }
}
