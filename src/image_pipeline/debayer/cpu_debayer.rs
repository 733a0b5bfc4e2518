use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::image_pipeline::common::error::{RawProcError, Result};
use crate::image_pipeline::debayer::types::RgbImageData;
use crate::image_pipeline::raw::types::RawImageData;

/// Linear RGGB demosaic for previews of corrected frames.
pub struct CpuDebayer;

impl CpuDebayer {
    pub fn new() -> Self {
        Self
    }

    /// Demosaics `raw_image`, normalises it between its black and white levels, applies
    /// the white balance and a linear `exposure_gain`, and scales to 16 bit.
    pub fn process(&self, raw_image: &RawImageData, exposure_gain: f64) -> Result<RgbImageData> {
        let width = raw_image.width;
        let height = raw_image.height;
        info!("Starting CPU debayering for image {}x{}", width, height);

        if raw_image.data.len() < width * height {
            return Err(RawProcError::FrameSizeMismatch {
                expected: width * height,
                actual: raw_image.data.len(),
            });
        }

        let bayer_bytes: Vec<u8> = raw_image.data[..width * height]
            .iter()
            .flat_map(|&val| val.to_le_bytes())
            .collect();
        let mut output_buf = vec![0u8; width * height * 3 * 2];
        let mut cursor = Cursor::new(&bayer_bytes[..]);

        {
            let mut output_raster = RasterMut::new(width, height, RasterDepth::Depth16, &mut output_buf);
            bayer::run_demosaic(&mut cursor, BayerDepth::Depth16LE, CFA::RGGB, Demosaic::Linear, &mut output_raster)
                .map_err(|e| RawProcError::DebayerError(format!("{:?}", e)))?;
        }

        let black_level = raw_image.black_level as f32;
        let range = (raw_image.white_level as f32 - black_level).max(1.0);
        let gain = exposure_gain as f32;
        let wb = raw_image.wb_coeffs;
        debug!(black_level, range, gain, ?wb, "Normalising demosaiced data");

        let rgb_data: Vec<u16> = output_buf
            .par_chunks_exact(6)
            .flat_map_iter(|pixel| {
                let channel = |c: usize| {
                    let raw = u16::from_le_bytes([pixel[c * 2], pixel[c * 2 + 1]]) as f32;
                    let linear = (raw - black_level).max(0.0) / range * wb[c] * gain;
                    (linear * 65535.0).clamp(0.0, 65535.0) as u16
                };
                [channel(0), channel(1), channel(2)]
            })
            .collect();

        Ok(RgbImageData { width, height, data: rgb_data, bits_per_sample: 16 })
    }
}

impl Default for CpuDebayer {
    fn default() -> Self {
        Self::new()
    }
}
