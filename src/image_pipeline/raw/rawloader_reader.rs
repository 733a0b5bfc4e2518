//! RAW image reader implementation using the rawloader library.
//!
//! This module provides support for reading various RAW image formats (ARW, CR2, NEF, DNG, etc.)
//! using the rawloader library. Besides the sensor samples it extracts the metadata the
//! correction pipeline needs: black/white levels, the active (uncropped) area and the
//! white balance multipliers.

use std::io::Cursor;

use tracing::debug;
use rawloader::RawImageData as RawloaderImageData;
use crate::image_pipeline::common::error::{Result, RawProcError};
use crate::image_pipeline::raw::types::{ActiveArea, RawImageData};
use crate::image_pipeline::raw::reader::RawImageReader;

/// RAW image reader that uses the rawloader library for decoding.
///
/// This reader supports any RAW format that rawloader can decode, including but not limited to:
/// - Sony ARW
/// - Canon CR2
/// - Adobe DNG
pub struct RawLoaderReader;

/// Default bit depth when no white level information is available from the RAW file.
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

/// The bit width of the u16 data type, used for calculating actual bits per sample.
const U16_BITS: u32 = 16;

impl RawImageReader for RawLoaderReader {
    /// Reads and decodes RAW image data from a byte array.
    ///
    /// This method:
    /// 1. Decodes the RAW file using rawloader
    /// 2. Converts the data to u16 format (handles both integer and float RAW data)
    /// 3. Calculates the actual bits per sample from the sensor's white level metadata
    /// 4. Derives the active area from the decoder's crop margins
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rawfix_rs::image_pipeline::{RawImageReader, RawLoaderReader};
    ///
    /// let reader = RawLoaderReader;
    /// let raw_bytes = std::fs::read("image.cr2").unwrap();
    /// let image_data = reader.read_raw(&raw_bytes).unwrap();
    /// ```
    fn read_raw(&self, data: &[u8]) -> Result<RawImageData> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| RawProcError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;

        if decoded.cpp != 1 {
            return Err(RawProcError::UnsupportedFormat(format!(
                "{} components per pixel, expected a single-channel CFA image",
                decoded.cpp
            )));
        }

        debug!("Decoded image: {}x{}", width, height);

        // Float data (normalized 0.0-1.0) is scaled to the u16 range
        let data: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => {
                values.iter().map(|&v| v as u16).collect()
            }
            RawloaderImageData::Float(values) => {
                values.iter().map(|&v| (v * u16::MAX as f32) as u16).collect()
            }
        };

        // The white level is the largest code the sensor produces, which gives its bit depth
        // (4095 -> 12 bits, 16383 -> 14 bits).
        let max_white_level = decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX);
        let bits_per_sample = if max_white_level == 0 {
            DEFAULT_BITS_PER_SAMPLE
        } else {
            U16_BITS - max_white_level.leading_zeros()
        };
        let white_level = if max_white_level == 0 { u16::MAX } else { max_white_level };
        let black_level = decoded.blacklevels.iter().min().copied().unwrap_or(0);

        // crops are [top, right, bottom, left]
        let [top, right, bottom, left] = decoded.crops;
        let active_area = ActiveArea {
            x1: left as u32,
            y1: top as u32,
            x2: width.saturating_sub(right) as u32,
            y2: height.saturating_sub(bottom) as u32,
        };

        let green = decoded.wb_coeffs[1];
        let normalize = |c: f32| {
            let value = c / green;
            if value.is_finite() && value > 0.0 { value } else { 1.0 }
        };
        let wb_coeffs = [normalize(decoded.wb_coeffs[0]), 1.0, normalize(decoded.wb_coeffs[2])];

        debug!(
            bits_per_sample,
            black_level,
            white_level,
            ?active_area,
            "Decoded sensor metadata"
        );

        Ok(RawImageData {
            width,
            height,
            data,
            bits_per_sample,
            black_level,
            white_level,
            active_area,
            wb_coeffs,
            camera: format!("{} {}", decoded.clean_make, decoded.clean_model),
        })
    }
}
