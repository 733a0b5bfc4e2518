//! Per-clip correction state.
//!
//! One [`CorrectionState`] exists per open clip. It owns everything that lives across
//! frames: the settings, the defect maps, the stripe cache, the exposure lookup tables and
//! the dark frame. Dropping the state releases all of it.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::image_pipeline::common::error::{RawProcError, Result};
use crate::image_pipeline::correction::clip::ClipInfo;
use crate::image_pipeline::correction::config::CorrectionConfig;
use crate::image_pipeline::correction::deflicker::ExposureBias;
use crate::image_pipeline::correction::defect_map::{PixelMap, PixelMapKind};
use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::kernels::{CorrectionKernels, Levels, StripeCorrection};
use crate::image_pipeline::correction::lut::ExposureLuts;
use crate::image_pipeline::correction::modes::{
    BadPixelMode, BadPixelSearch, ChromaSmooth, DarkFrameMode, DualIsoInterpolation, DualIsoMode,
    FocusPixelMode, PixelInterpolation, VerticalStripeMode,
};
use crate::image_pipeline::raw::RawImageReader;

/// Clip-level facts established from the first processed frame.
#[derive(Debug)]
pub struct ReadyState {
    pub is_dual_iso: bool,
    pub luts: ExposureLuts,
}

#[derive(Debug)]
pub enum InitPhase {
    Uninitialized,
    Ready(ReadyState),
}

#[derive(Debug)]
pub struct CorrectionState {
    pub(crate) config: CorrectionConfig,
    pub(crate) clip: ClipInfo,
    pub(crate) phase: InitPhase,
    pub(crate) exposure_bias: ExposureBias,
    pub(crate) focus_pixel_map: PixelMap,
    pub(crate) bad_pixel_map: PixelMap,
    pub(crate) stripe_correction: StripeCorrection,
    pub(crate) compute_stripes: bool,
    pub(crate) dark_frame: Option<Vec<u16>>,
    pub(crate) dark_frame_filename: Option<PathBuf>,
}

impl CorrectionState {
    pub fn new(clip: ClipInfo) -> Self {
        Self::with_config(clip, CorrectionConfig::default())
    }

    pub fn with_config(clip: ClipInfo, config: CorrectionConfig) -> Self {
        Self {
            config,
            clip,
            phase: InitPhase::Uninitialized,
            exposure_bias: ExposureBias::ZERO,
            focus_pixel_map: PixelMap::new(PixelMapKind::Focus),
            bad_pixel_map: PixelMap::new(PixelMapKind::Bad),
            stripe_correction: StripeCorrection::default(),
            compute_stripes: true,
            dark_frame: None,
            dark_frame_filename: None,
        }
    }

    /// Runs the one-shot clip initialisation on the first frame: probes for dual ISO and
    /// builds the exposure lookup tables. Later calls do nothing.
    pub fn ensure_initialized<K: CorrectionKernels + ?Sized>(&mut self, kernels: &K, frame: &RawFrame<'_>) {
        if let InitPhase::Uninitialized = self.phase {
            let raw_info = &self.clip.raw_info;
            let levels = Levels { black: raw_info.black_level, white: raw_info.white_level };
            let is_dual_iso = kernels.detect_dual_iso(frame, levels);
            let luts = ExposureLuts::new(raw_info.black_level);
            info!(is_dual_iso, black_level = raw_info.black_level, "Clip initialised");
            self.phase = InitPhase::Ready(ReadyState { is_dual_iso, luts });
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, InitPhase::Ready(_))
    }

    pub fn luts(&self) -> Option<&ExposureLuts> {
        match &self.phase {
            InitPhase::Ready(ready) => Some(&ready.luts),
            InitPhase::Uninitialized => None,
        }
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CorrectionConfig) {
        self.config = config;
    }

    pub fn clip(&self) -> &ClipInfo {
        &self.clip
    }

    /// Position of the recorded window on the sensor for the next frame.
    pub fn set_pan_position(&mut self, pan_x: u16, pan_y: u16) {
        self.clip.pan_x = pan_x;
        self.clip.pan_y = pan_y;
    }

    pub fn fix_raw(&self) -> bool {
        self.config.fix_raw
    }

    pub fn set_fix_raw(&mut self, enable: bool) {
        self.config.fix_raw = enable;
    }

    pub fn vertical_stripe_mode(&self) -> VerticalStripeMode {
        self.config.vertical_stripes
    }

    pub fn set_vertical_stripe_mode(&mut self, mode: VerticalStripeMode) {
        self.config.vertical_stripes = mode;
    }

    /// Forces the stripe coefficients to be recomputed on the next frame.
    pub fn compute_stripes_on(&mut self) {
        self.compute_stripes = true;
    }

    pub fn compute_stripes(&self) -> bool {
        self.compute_stripes
    }

    pub fn stripe_correction(&self) -> &StripeCorrection {
        &self.stripe_correction
    }

    pub fn focus_pixel_mode(&self) -> FocusPixelMode {
        self.config.focus_pixels
    }

    pub fn set_focus_pixel_mode(&mut self, mode: FocusPixelMode) {
        self.config.focus_pixels = mode;
    }

    pub fn focus_pixel_interpolation(&self) -> PixelInterpolation {
        self.config.focus_pixel_interpolation
    }

    pub fn set_focus_pixel_interpolation(&mut self, method: PixelInterpolation) {
        self.config.focus_pixel_interpolation = method;
    }

    pub fn bad_pixel_mode(&self) -> BadPixelMode {
        self.config.bad_pixels
    }

    pub fn set_bad_pixel_mode(&mut self, mode: BadPixelMode) {
        self.config.bad_pixels = mode;
    }

    pub fn bad_pixel_search(&self) -> BadPixelSearch {
        self.config.bad_pixel_search
    }

    pub fn set_bad_pixel_search(&mut self, method: BadPixelSearch) {
        self.config.bad_pixel_search = method;
    }

    pub fn bad_pixel_interpolation(&self) -> PixelInterpolation {
        self.config.bad_pixel_interpolation
    }

    pub fn set_bad_pixel_interpolation(&mut self, method: PixelInterpolation) {
        self.config.bad_pixel_interpolation = method;
    }

    pub fn chroma_smooth(&self) -> ChromaSmooth {
        self.config.chroma_smooth
    }

    pub fn set_chroma_smooth(&mut self, radius: ChromaSmooth) {
        self.config.chroma_smooth = radius;
    }

    pub fn pattern_noise(&self) -> bool {
        self.config.pattern_noise
    }

    pub fn set_pattern_noise(&mut self, enable: bool) {
        self.config.pattern_noise = enable;
    }

    pub fn deflicker_target(&self) -> i32 {
        self.config.deflicker_target
    }

    pub fn set_deflicker_target(&mut self, target: i32) {
        self.config.deflicker_target = target;
    }

    pub fn dual_iso_mode(&self) -> DualIsoMode {
        self.config.dual_iso
    }

    pub fn set_dual_iso_mode(&mut self, mode: DualIsoMode) {
        self.config.dual_iso = mode;
    }

    pub fn dual_iso_interpolation(&self) -> DualIsoInterpolation {
        self.config.dual_iso_interpolation
    }

    pub fn set_dual_iso_interpolation(&mut self, method: DualIsoInterpolation) {
        self.config.dual_iso_interpolation = method;
    }

    pub fn dual_iso_alias_map(&self) -> bool {
        self.config.dual_iso_alias_map
    }

    pub fn set_dual_iso_alias_map(&mut self, enable: bool) {
        self.config.dual_iso_alias_map = enable;
    }

    pub fn dual_iso_full_res_blending(&self) -> bool {
        self.config.dual_iso_full_res_blending
    }

    pub fn set_dual_iso_full_res_blending(&mut self, enable: bool) {
        self.config.dual_iso_full_res_blending = enable;
    }

    /// Whether the first frame showed interleaved ISO rows. False until initialised.
    pub fn is_dual_iso(&self) -> bool {
        matches!(&self.phase, InitPhase::Ready(ready) if ready.is_dual_iso)
    }

    /// Frames go through the full 20-bit dual ISO merge.
    pub fn hq_dual_iso(&self) -> bool {
        self.config.dual_iso == DualIsoMode::Full20Bit && self.is_dual_iso()
    }

    /// Left shift that maps processed samples onto the 16-bit range. The 20-bit merge
    /// already fills it.
    pub fn output_shift(&self) -> u32 {
        if self.hq_dual_iso() {
            0
        } else {
            16u32.saturating_sub(self.clip.raw_info.bits_per_pixel)
        }
    }

    pub fn exposure_bias(&self) -> ExposureBias {
        self.exposure_bias
    }

    pub fn focus_pixel_map(&self) -> &PixelMap {
        &self.focus_pixel_map
    }

    pub fn bad_pixel_map(&self) -> &PixelMap {
        &self.bad_pixel_map
    }

    pub fn reset_focus_pixel_map(&mut self) {
        self.focus_pixel_map.reset();
    }

    pub fn reset_bad_pixel_map(&mut self) {
        self.bad_pixel_map.reset();
    }

    pub fn dark_frame_mode(&self) -> DarkFrameMode {
        self.config.dark_frame
    }

    pub fn set_dark_frame_mode(&mut self, mode: DarkFrameMode) {
        self.config.dark_frame = mode;
    }

    /// An external dark frame file is configured.
    pub fn dark_frame_ext_status(&self) -> bool {
        self.dark_frame_filename.is_some()
    }

    /// The clip carries its own dark frame.
    pub fn dark_frame_int_status(&self) -> bool {
        self.clip.has_internal_dark_frame
    }

    pub fn dark_frame_filename(&self) -> Option<&Path> {
        self.dark_frame_filename.as_deref()
    }

    pub fn set_dark_frame_filename(&mut self, path: impl Into<PathBuf>) {
        self.dark_frame_filename = Some(path.into());
    }

    pub fn clear_dark_frame_filename(&mut self) {
        self.dark_frame_filename = None;
    }

    pub fn dark_frame(&self) -> Option<&[u16]> {
        self.dark_frame.as_deref()
    }

    /// Size of the loaded dark frame in bytes, zero when none is loaded.
    pub fn dark_frame_size(&self) -> usize {
        self.dark_frame.as_ref().map_or(0, |dark| dark.len() * 2)
    }

    pub fn set_dark_frame(&mut self, samples: Vec<u16>) {
        debug!(bytes = samples.len() * 2, "Dark frame set");
        self.dark_frame = Some(samples);
    }

    pub fn free_dark_frame(&mut self) {
        self.dark_frame = None;
    }

    /// Loads the configured external dark frame file. On failure any previously loaded
    /// dark frame stays in place.
    pub fn load_dark_frame_ext<R: RawImageReader + ?Sized>(&mut self, reader: &R) -> Result<()> {
        let path = self
            .dark_frame_filename
            .clone()
            .ok_or(RawProcError::MissingDarkFrameFile)?;
        let image = reader.read_raw_file(&path)?;
        info!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            "Loaded external dark frame"
        );
        self.set_dark_frame(image.data);
        Ok(())
    }

    /// Prepares the dark frame for `mode`: loads the external file when one is configured,
    /// releases the dark frame when switching off.
    pub fn init_dark_frame<R: RawImageReader + ?Sized>(&mut self, mode: DarkFrameMode, reader: &R) -> Result<()> {
        match mode {
            DarkFrameMode::External => {
                if self.dark_frame_ext_status() {
                    return self.load_dark_frame_ext(reader);
                }
            }
            DarkFrameMode::Internal => {
                if self.dark_frame_int_status() {
                    warn!("Embedded dark frames are not loadable, use an external dark frame");
                }
            }
            DarkFrameMode::Off => self.free_dark_frame(),
        }
        Ok(())
    }
}
