//! TIFF writing module
//!
//! This module writes corrected frames as 16-bit TIFF, either the Bayer data as grayscale
//! or a debayered RGB preview.

mod standard_tiff_writer;
pub mod types;
mod writer;

pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{ExportConfig, ExportConfigBuilder, TiffCompression};
pub use writer::TiffWriter;
