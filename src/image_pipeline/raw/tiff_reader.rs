//! Reader for single-channel 16-bit TIFF frames, the format this crate exports
//! Bayer frames and averaged dark frames in.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::image_pipeline::common::error::{RawProcError, Result};
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::RawImageData;

pub struct TiffFrameReader;

impl RawImageReader for TiffFrameReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawImageData> {
        debug!("Decoding TIFF frame, {} bytes", data.len());

        let mut decoder = Decoder::new(Cursor::new(data))
            .map_err(|e| RawProcError::DecodeError(e.to_string()))?;
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| RawProcError::DecodeError(e.to_string()))?;
        let image = decoder
            .read_image()
            .map_err(|e| RawProcError::DecodeError(e.to_string()))?;

        let samples = match image {
            DecodingResult::U16(samples) => samples,
            _ => {
                return Err(RawProcError::UnsupportedFormat(
                    "expected a 16-bit TIFF frame".to_string(),
                ))
            }
        };

        let (width, height) = (width as usize, height as usize);
        if samples.len() != width * height {
            return Err(RawProcError::UnsupportedFormat(format!(
                "expected a single-channel TIFF, got {} samples for {}x{}",
                samples.len(),
                width,
                height
            )));
        }

        Ok(RawImageData::from_samples(width, height, samples, 16))
    }
}
