//! Pipeline conversions module
//!
//! Orchestrates decoding, frame correction and TIFF export.

mod raw_to_tiff;

#[cfg(test)]
mod tests;

pub use raw_to_tiff::RawToTiffPipeline;
