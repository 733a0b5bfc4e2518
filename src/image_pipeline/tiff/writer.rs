use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::types::RgbImageData;
use crate::image_pipeline::raw::types::RawImageData;
use crate::image_pipeline::tiff::types::ExportConfig;

pub trait TiffWriter {
    /// Writes single channel Bayer data as a 16-bit grayscale TIFF.
    fn write_tiff(&self, image: &RawImageData, output: &mut dyn Write, config: &ExportConfig) -> Result<()>;

    fn write_rgb_tiff(&self, image: &RgbImageData, output: &mut dyn Write, config: &ExportConfig) -> Result<()>;
}
