//! User-settable correction settings of a clip.

use crate::image_pipeline::correction::modes::{
    BadPixelMode, BadPixelSearch, ChromaSmooth, DarkFrameMode, DualIsoInterpolation, DualIsoMode,
    FocusPixelMode, PixelInterpolation, VerticalStripeMode,
};

/// Which correction passes run, and with which method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionConfig {
    /// Master switch; nothing at all happens while it is off
    pub fix_raw: bool,
    pub vertical_stripes: VerticalStripeMode,
    pub focus_pixels: FocusPixelMode,
    pub focus_pixel_interpolation: PixelInterpolation,
    pub bad_pixels: BadPixelMode,
    pub bad_pixel_search: BadPixelSearch,
    pub bad_pixel_interpolation: PixelInterpolation,
    pub chroma_smooth: ChromaSmooth,
    pub pattern_noise: bool,
    /// Target median for deflicker, 0 disables it
    pub deflicker_target: i32,
    pub dual_iso: DualIsoMode,
    pub dual_iso_interpolation: DualIsoInterpolation,
    pub dual_iso_alias_map: bool,
    pub dual_iso_full_res_blending: bool,
    pub dark_frame: DarkFrameMode,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            fix_raw: false,
            vertical_stripes: VerticalStripeMode::Normal,
            focus_pixels: FocusPixelMode::On,
            focus_pixel_interpolation: PixelInterpolation::Raw2Dng,
            bad_pixels: BadPixelMode::On,
            bad_pixel_search: BadPixelSearch::Normal,
            bad_pixel_interpolation: PixelInterpolation::Raw2Dng,
            chroma_smooth: ChromaSmooth::Off,
            pattern_noise: false,
            deflicker_target: 0,
            dual_iso: DualIsoMode::Off,
            dual_iso_interpolation: DualIsoInterpolation::Amaze,
            dual_iso_alias_map: true,
            dual_iso_full_res_blending: true,
            dark_frame: DarkFrameMode::Off,
        }
    }
}

impl CorrectionConfig {
    pub fn builder() -> CorrectionConfigBuilder {
        CorrectionConfigBuilder::default()
    }
}

/// Builder for CorrectionConfig
#[derive(Default)]
pub struct CorrectionConfigBuilder {
    fix_raw: Option<bool>,
    vertical_stripes: Option<VerticalStripeMode>,
    focus_pixels: Option<FocusPixelMode>,
    focus_pixel_interpolation: Option<PixelInterpolation>,
    bad_pixels: Option<BadPixelMode>,
    bad_pixel_search: Option<BadPixelSearch>,
    bad_pixel_interpolation: Option<PixelInterpolation>,
    chroma_smooth: Option<ChromaSmooth>,
    pattern_noise: Option<bool>,
    deflicker_target: Option<i32>,
    dual_iso: Option<DualIsoMode>,
    dual_iso_interpolation: Option<DualIsoInterpolation>,
    dual_iso_alias_map: Option<bool>,
    dual_iso_full_res_blending: Option<bool>,
    dark_frame: Option<DarkFrameMode>,
}

impl CorrectionConfigBuilder {
    pub fn fix_raw(mut self, enable: bool) -> Self {
        self.fix_raw = Some(enable);
        self
    }

    pub fn vertical_stripes(mut self, mode: VerticalStripeMode) -> Self {
        self.vertical_stripes = Some(mode);
        self
    }

    pub fn focus_pixels(mut self, mode: FocusPixelMode) -> Self {
        self.focus_pixels = Some(mode);
        self
    }

    pub fn focus_pixel_interpolation(mut self, method: PixelInterpolation) -> Self {
        self.focus_pixel_interpolation = Some(method);
        self
    }

    pub fn bad_pixels(mut self, mode: BadPixelMode) -> Self {
        self.bad_pixels = Some(mode);
        self
    }

    pub fn bad_pixel_search(mut self, method: BadPixelSearch) -> Self {
        self.bad_pixel_search = Some(method);
        self
    }

    pub fn bad_pixel_interpolation(mut self, method: PixelInterpolation) -> Self {
        self.bad_pixel_interpolation = Some(method);
        self
    }

    pub fn chroma_smooth(mut self, radius: ChromaSmooth) -> Self {
        self.chroma_smooth = Some(radius);
        self
    }

    pub fn pattern_noise(mut self, enable: bool) -> Self {
        self.pattern_noise = Some(enable);
        self
    }

    pub fn deflicker_target(mut self, target: i32) -> Self {
        self.deflicker_target = Some(target);
        self
    }

    pub fn dual_iso(mut self, mode: DualIsoMode) -> Self {
        self.dual_iso = Some(mode);
        self
    }

    pub fn dual_iso_interpolation(mut self, method: DualIsoInterpolation) -> Self {
        self.dual_iso_interpolation = Some(method);
        self
    }

    pub fn dual_iso_alias_map(mut self, enable: bool) -> Self {
        self.dual_iso_alias_map = Some(enable);
        self
    }

    pub fn dual_iso_full_res_blending(mut self, enable: bool) -> Self {
        self.dual_iso_full_res_blending = Some(enable);
        self
    }

    pub fn dark_frame(mut self, mode: DarkFrameMode) -> Self {
        self.dark_frame = Some(mode);
        self
    }

    pub fn build(self) -> CorrectionConfig {
        let default = CorrectionConfig::default();
        CorrectionConfig {
            fix_raw: self.fix_raw.unwrap_or(default.fix_raw),
            vertical_stripes: self.vertical_stripes.unwrap_or(default.vertical_stripes),
            focus_pixels: self.focus_pixels.unwrap_or(default.focus_pixels),
            focus_pixel_interpolation: self.focus_pixel_interpolation.unwrap_or(default.focus_pixel_interpolation),
            bad_pixels: self.bad_pixels.unwrap_or(default.bad_pixels),
            bad_pixel_search: self.bad_pixel_search.unwrap_or(default.bad_pixel_search),
            bad_pixel_interpolation: self.bad_pixel_interpolation.unwrap_or(default.bad_pixel_interpolation),
            chroma_smooth: self.chroma_smooth.unwrap_or(default.chroma_smooth),
            pattern_noise: self.pattern_noise.unwrap_or(default.pattern_noise),
            deflicker_target: self.deflicker_target.unwrap_or(default.deflicker_target),
            dual_iso: self.dual_iso.unwrap_or(default.dual_iso),
            dual_iso_interpolation: self.dual_iso_interpolation.unwrap_or(default.dual_iso_interpolation),
            dual_iso_alias_map: self.dual_iso_alias_map.unwrap_or(default.dual_iso_alias_map),
            dual_iso_full_res_blending: self.dual_iso_full_res_blending.unwrap_or(default.dual_iso_full_res_blending),
            dark_frame: self.dark_frame.unwrap_or(default.dark_frame),
        }
    }
}
