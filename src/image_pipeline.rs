//! Image processing pipeline module
//!
//! Raw Bayer frames are decoded, run through the per-clip correction passes and exported
//! as TIFF. Reading, correcting, debayering and writing live in separate modules joined by
//! the conversion orchestrator.

pub mod common;
pub mod conversions;
pub mod correction;
pub mod debayer;
pub mod kernels;
pub mod raw;
pub mod tiff;

pub use common::{
    RawProcError,
    Result,
};

pub use raw::{
    RawImageData,
    RawImageReader,
    RawLoaderReader,
    TiffFrameReader,
};

pub use tiff::{
    TiffCompression,
    ExportConfig,
    ExportConfigBuilder,
    TiffWriter,
    StandardTiffWriter,
};

pub use correction::{
    ClipInfo,
    CorrectionConfig,
    CorrectionKernels,
    CorrectionPipeline,
    CorrectionState,
};

pub use debayer::{
    CpuDebayer,
    RgbImageData,
};

pub use kernels::BuiltinKernels;

pub use conversions::{
    RawToTiffPipeline,
};
