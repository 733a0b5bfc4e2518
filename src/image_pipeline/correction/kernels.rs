//! Interface to the numeric correction kernels.
//!
//! The orchestrator decides which kernel runs and with which arguments; what a kernel does
//! with the pixels is up to the implementation. Kernels never fail: a kernel that cannot
//! work on a frame leaves it untouched.

use crate::image_pipeline::correction::clip::RawInfo;
use crate::image_pipeline::correction::defect_map::PixelMap;
use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::lut::ExposureLuts;
use crate::image_pipeline::correction::modes::{
    BadPixelSearch, ChromaSmooth, DualIsoInterpolation, PixelInterpolation, VerticalStripeMode,
};

/// Fixed point one of the stripe coefficients.
pub const STRIPE_FIXP_ONE: i32 = 8192;

/// Per column-mod-8 gain coefficients for vertical banding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeCorrection {
    pub coeffs: [i32; 8],
    pub correction_needed: bool,
}

impl Default for StripeCorrection {
    fn default() -> Self {
        Self { coeffs: [STRIPE_FIXP_ONE; 8], correction_needed: false }
    }
}

/// Black and white level handed to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    pub black: i32,
    pub white: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct FocusPixelParams<'a> {
    pub camera_model: u32,
    pub width: u32,
    pub height: u32,
    pub pan_x: u16,
    pub pan_y: u16,
    /// Full sensor readout size the map coordinates refer to
    pub raw_width: u32,
    pub raw_height: u32,
    pub crop_rec: bool,
    /// Non-zero when the clip is restricted to the 8-12 bit lossless range
    pub restricted_lossless_bias: i32,
    pub method: PixelInterpolation,
    pub dual_iso: bool,
    pub luts: &'a ExposureLuts,
}

#[derive(Debug, Clone, Copy)]
pub struct BadPixelParams<'a> {
    pub camera_model: u32,
    pub width: u32,
    pub height: u32,
    pub pan_x: u16,
    pub pan_y: u16,
    pub raw_width: u32,
    pub raw_height: u32,
    pub black_level: i32,
    pub aggressive: bool,
    pub search: BadPixelSearch,
    pub method: PixelInterpolation,
    pub dual_iso: bool,
    pub luts: &'a ExposureLuts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualIsoOptions {
    pub averaging: DualIsoInterpolation,
    pub alias_map: bool,
    pub full_res_blending: bool,
    pub chroma_smooth: ChromaSmooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeParams {
    pub levels: Levels,
    /// Packed frame size in bytes
    pub frame_size: u32,
    pub width: u32,
    pub height: u32,
    pub mode: VerticalStripeMode,
}

pub trait CorrectionKernels {
    /// Read-only probe: does the frame interleave two ISO gains?
    fn detect_dual_iso(&self, frame: &RawFrame<'_>, levels: Levels) -> bool;

    /// Cheap dual ISO reconstruction in place.
    fn dual_iso_preview(&self, frame: &mut RawFrame<'_>, levels: Levels);

    /// Full dual ISO merge; widens the sample range by two bits.
    fn dual_iso_full20bit(&self, raw_info: &RawInfo, frame: &mut RawFrame<'_>, options: DualIsoOptions);

    fn fix_pattern_noise(&self, samples: &mut [i16], width: usize, height: usize, white_level: i32, debug: bool);

    /// Interpolates focus pixels. Owns the map and its status.
    fn fix_focus_pixels(&self, map: &mut PixelMap, frame: &mut RawFrame<'_>, params: &FocusPixelParams<'_>);

    /// Finds and interpolates bad pixels. Owns the map and its status.
    fn fix_bad_pixels(&self, map: &mut PixelMap, frame: &mut RawFrame<'_>, params: &BadPixelParams<'_>);

    fn chroma_smooth(&self, radius: ChromaSmooth, frame: &mut RawFrame<'_>, levels: Levels, luts: &ExposureLuts);

    /// Recomputes `cache` when `compute` is set (clearing it) and applies the correction.
    fn fix_vertical_stripes(
        &self,
        cache: &mut StripeCorrection,
        compute: &mut bool,
        frame: &mut RawFrame<'_>,
        params: &StripeParams,
    );
}
