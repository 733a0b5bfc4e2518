use std::io::{Cursor, Write};

use tiff::encoder::colortype::{ColorType, Gray16, RGB16};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{RawProcError, Result};
use crate::image_pipeline::debayer::types::RgbImageData;
use crate::image_pipeline::raw::types::RawImageData;
use crate::image_pipeline::tiff::types::{ExportConfig, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl StandardTiffWriter {
    fn compression(config: &ExportConfig) -> Compression {
        match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        }
    }

    /// Encodes into memory first so a failed encode leaves `output` untouched.
    fn encode<C: ColorType<Inner = u16>>(
        width: usize,
        height: usize,
        data: &[u16],
        output: &mut dyn Write,
        config: &ExportConfig,
    ) -> Result<()> {
        let mut buffer = Vec::new();

        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| RawProcError::EncodeError(e.to_string()))?
            .with_compression(Self::compression(config));

        if let Some(predictor) = config.predictor {
            let predictor = match predictor {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        encoder
            .write_image::<C>(width as u32, height as u32, data)
            .map_err(|e| RawProcError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }
}

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &RawImageData, output: &mut dyn Write, config: &ExportConfig) -> Result<()> {
        debug!("Encoding Bayer TIFF: {}x{}", image.width, image.height);
        Self::encode::<Gray16>(image.width, image.height, &image.data, output, config)?;
        debug!("TIFF encoding complete");
        Ok(())
    }

    fn write_rgb_tiff(&self, image: &RgbImageData, output: &mut dyn Write, config: &ExportConfig) -> Result<()> {
        debug!("Encoding RGB TIFF: {}x{}", image.width, image.height);
        Self::encode::<RGB16>(image.width, image.height, &image.data, output, config)?;
        debug!("TIFF encoding complete");
        Ok(())
    }
}
