use std::path::{Path, PathBuf};

use crate::image_pipeline::correction::clip::RawInfo;
use crate::image_pipeline::correction::defect_map::PixelMap;
use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::kernels::{
    BadPixelParams, CorrectionKernels, DualIsoOptions, FocusPixelParams, Levels, StripeCorrection, StripeParams,
};
use crate::image_pipeline::correction::lut::ExposureLuts;
use crate::image_pipeline::correction::modes::ChromaSmooth;
use crate::image_pipeline::kernels::{chroma, dual_iso, pattern_noise, pixel_fix, stripes};

/// Kernel set running on the CPU, parallelised with rayon.
///
/// Focus pixel maps are read from `focus_map_dir` when one is set; without it focus pixel
/// correction finds nothing to fix.
#[derive(Debug, Clone, Default)]
pub struct BuiltinKernels {
    focus_map_dir: Option<PathBuf>,
}

impl BuiltinKernels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_focus_map_dir(dir: impl Into<PathBuf>) -> Self {
        Self { focus_map_dir: Some(dir.into()) }
    }

    pub fn focus_map_dir(&self) -> Option<&Path> {
        self.focus_map_dir.as_deref()
    }
}

impl CorrectionKernels for BuiltinKernels {
    fn detect_dual_iso(&self, frame: &RawFrame<'_>, levels: Levels) -> bool {
        dual_iso::detect(frame, levels)
    }

    fn dual_iso_preview(&self, frame: &mut RawFrame<'_>, levels: Levels) {
        dual_iso::preview(frame, levels);
    }

    fn dual_iso_full20bit(&self, raw_info: &RawInfo, frame: &mut RawFrame<'_>, options: DualIsoOptions) {
        dual_iso::full20bit(raw_info, frame, options);
    }

    fn fix_pattern_noise(&self, samples: &mut [i16], width: usize, height: usize, white_level: i32, debug: bool) {
        pattern_noise::fix_pattern_noise(samples, width, height, white_level, debug);
    }

    fn fix_focus_pixels(&self, map: &mut PixelMap, frame: &mut RawFrame<'_>, params: &FocusPixelParams<'_>) {
        pixel_fix::fix_focus_pixels(self.focus_map_dir(), map, frame, params);
    }

    fn fix_bad_pixels(&self, map: &mut PixelMap, frame: &mut RawFrame<'_>, params: &BadPixelParams<'_>) {
        pixel_fix::fix_bad_pixels(map, frame, params);
    }

    fn chroma_smooth(&self, radius: ChromaSmooth, frame: &mut RawFrame<'_>, levels: Levels, luts: &ExposureLuts) {
        chroma::chroma_smooth(radius, frame, levels, luts);
    }

    fn fix_vertical_stripes(
        &self,
        cache: &mut StripeCorrection,
        compute: &mut bool,
        frame: &mut RawFrame<'_>,
        params: &StripeParams,
    ) {
        stripes::fix_vertical_stripes(cache, compute, frame, params);
    }
}
