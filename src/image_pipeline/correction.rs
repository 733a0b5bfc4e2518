//! Raw frame correction module
//!
//! Per-clip state plus the orchestrator that runs the correction passes over each decoded
//! frame before it is rendered.

pub mod clip;
pub mod config;
pub mod dark_frame;
pub mod defect_map;
pub mod deflicker;
pub mod detect;
pub mod frame;
pub mod histogram;
pub mod kernels;
pub mod lut;
pub mod modes;
mod pipeline;
mod state;

#[cfg(test)]
mod tests;

pub use clip::{ClipInfo, RawInfo, SensorSampling};
pub use config::{CorrectionConfig, CorrectionConfigBuilder};
pub use dark_frame::{subtract_dark_frame, DarkFrameAverager};
pub use defect_map::{MapStatus, PixelCoord, PixelMap, PixelMapKind};
pub use deflicker::{deflicker, ExposureBias};
pub use detect::detect_focus_dot_mode;
pub use frame::{expand_to_16bit, RawFrame};
pub use kernels::{
    BadPixelParams, CorrectionKernels, DualIsoOptions, FocusPixelParams, Levels, StripeCorrection, StripeParams,
};
pub use lut::ExposureLuts;
pub use modes::{
    BadPixelMode, BadPixelSearch, ChromaSmooth, DarkFrameMode, DualIsoInterpolation, DualIsoMode, FocusPixelMode,
    PixelInterpolation, VerticalStripeMode,
};
pub use pipeline::{CorrectionPipeline, DUAL_ISO_LEVEL_SCALE, RESTRICTED_LOSSLESS_BIAS, RESTRICTED_LOSSLESS_WHITE_LEVEL};
pub use state::{CorrectionState, InitPhase, ReadyState};
