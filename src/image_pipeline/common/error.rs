use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawProcError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Debayering failed: {0}")]
    DebayerError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Frame buffer holds {actual} samples, expected at least {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("Dark frame size mismatch: expected {expected} bytes, got {actual} bytes")]
    DarkFrameMismatch { expected: usize, actual: usize },

    #[error("No external dark frame file configured")]
    MissingDarkFrameFile,

    #[error("Cannot average an empty set of frames")]
    EmptyAverage,

    #[error("Invalid value {value} for {name}")]
    InvalidMode { name: &'static str, value: i32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RawProcError>;
