use tracing::{debug, debug_span, instrument, warn};

use crate::image_pipeline::correction::{
    dark_frame::subtract_dark_frame,
    deflicker::deflicker,
    detect::detect_focus_dot_mode,
    frame::RawFrame,
    kernels::{BadPixelParams, CorrectionKernels, DualIsoOptions, FocusPixelParams, Levels, StripeParams},
    modes::{BadPixelMode, ChromaSmooth, DarkFrameMode, DualIsoMode, FocusPixelMode, VerticalStripeMode},
    state::{CorrectionState, InitPhase, ReadyState},
};
use crate::image_pipeline::kernels::BuiltinKernels;

/// Lossless clips with a white level below this are limited to 8-12 bit data.
pub const RESTRICTED_LOSSLESS_WHITE_LEVEL: i32 = 15000;

/// Focus pixel bias passed for clips restricted to the 8-12 bit lossless range.
pub const RESTRICTED_LOSSLESS_BIAS: i32 = 5;

/// Level scale after the 20-bit dual ISO merge, which adds two bits of range.
pub const DUAL_ISO_LEVEL_SCALE: i32 = 4;

/// Runs the correction passes over one frame at a time.
///
/// The pipeline holds no per-clip data, so one instance can serve any number of clips,
/// each with its own [`CorrectionState`].
pub struct CorrectionPipeline<K: CorrectionKernels> {
    kernels: K,
}

impl CorrectionPipeline<BuiltinKernels> {
    pub fn new() -> Self {
        Self { kernels: BuiltinKernels::new() }
    }
}

impl Default for CorrectionPipeline<BuiltinKernels> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CorrectionKernels> CorrectionPipeline<K> {
    pub fn with_kernels(kernels: K) -> Self {
        Self { kernels }
    }

    pub fn kernels(&self) -> &K {
        &self.kernels
    }

    /// Corrects `buffer` in place.
    ///
    /// Nothing happens, not even clip initialisation, while `fix_raw` is off. The passes
    /// run in a fixed order since each one expects the output of the previous ones:
    /// deflicker, dark frame, pattern noise, focus pixels, bad pixels, dual ISO, chroma
    /// smoothing, vertical stripes.
    #[instrument(skip_all, fields(samples = buffer.len()))]
    pub fn process(&self, state: &mut CorrectionState, buffer: &mut [u16]) {
        if !state.config.fix_raw {
            return;
        }

        let width = state.clip.x_res as usize;
        let height = state.clip.y_res as usize;
        let mut frame = match RawFrame::new(buffer, width, height) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping raw correction: {}", e);
                return;
            }
        };

        state.ensure_initialized(&self.kernels, &frame);

        let CorrectionState {
            config,
            clip,
            phase,
            exposure_bias,
            focus_pixel_map,
            bad_pixel_map,
            stripe_correction,
            compute_stripes,
            dark_frame,
            ..
        } = state;
        let InitPhase::Ready(ReadyState { is_dual_iso, luts }) = &*phase else {
            return;
        };
        let is_dual_iso = *is_dual_iso;
        let raw_info = &clip.raw_info;
        let levels = Levels { black: raw_info.black_level, white: raw_info.white_level };
        let hq_dual_iso = config.dual_iso == DualIsoMode::Full20Bit && is_dual_iso;
        // Deflicker and dark frame work on the full code range, not up to white
        let max_code = raw_info.max_code();

        if config.deflicker_target != 0 {
            let _span = debug_span!("deflicker", target = config.deflicker_target).entered();
            if let Some(bias) = deflicker(frame.buffer(), levels.black, max_code, config.deflicker_target) {
                *exposure_bias = bias;
            }
        }

        if config.dark_frame != DarkFrameMode::Off {
            let _span = debug_span!("dark_frame").entered();
            subtract_dark_frame(frame.buffer_mut(), dark_frame.as_deref(), levels.black, max_code);
        }

        if config.pattern_noise {
            let _span = debug_span!("pattern_noise").entered();
            self.kernels
                .fix_pattern_noise(frame.as_signed_mut(), width, height, levels.white, false);
        }

        let restricted_lossless = clip.lossless && raw_info.white_level < RESTRICTED_LOSSLESS_WHITE_LEVEL;

        if config.focus_pixels != FocusPixelMode::Off && focus_pixel_map.status().needs_processing() {
            let _span = debug_span!("focus_pixels", status = ?focus_pixel_map.status()).entered();
            let detected = detect_focus_dot_mode(clip.camera_model, clip.sensor_sampling.as_ref(), raw_info.height);
            let crop_rec = detected == FocusPixelMode::CropRec || config.focus_pixels == FocusPixelMode::CropRec;
            let params = FocusPixelParams {
                camera_model: clip.camera_model,
                width: clip.x_res,
                height: clip.y_res,
                pan_x: clip.pan_x,
                pan_y: clip.pan_y,
                raw_width: raw_info.width,
                raw_height: raw_info.height,
                crop_rec,
                restricted_lossless_bias: if restricted_lossless { RESTRICTED_LOSSLESS_BIAS } else { 0 },
                method: config.focus_pixel_interpolation,
                dual_iso: is_dual_iso,
                luts,
            };
            debug!(crop_rec, restricted_lossless, "Fixing focus pixels");
            self.kernels.fix_focus_pixels(focus_pixel_map, &mut frame, &params);
        }

        if config.bad_pixels != BadPixelMode::Off && bad_pixel_map.status().needs_processing() {
            let _span = debug_span!("bad_pixels", status = ?bad_pixel_map.status()).entered();
            let params = BadPixelParams {
                camera_model: clip.camera_model,
                width: clip.x_res,
                height: clip.y_res,
                pan_x: clip.pan_x,
                pan_y: clip.pan_y,
                raw_width: raw_info.width,
                raw_height: raw_info.height,
                black_level: levels.black,
                aggressive: config.bad_pixels == BadPixelMode::Aggressive,
                search: config.bad_pixel_search,
                method: config.bad_pixel_interpolation,
                dual_iso: is_dual_iso,
                luts,
            };
            self.kernels.fix_bad_pixels(bad_pixel_map, &mut frame, &params);
        }

        if is_dual_iso {
            match config.dual_iso {
                DualIsoMode::Full20Bit => {
                    let _span = debug_span!("dual_iso_full20bit").entered();
                    let full_frame = raw_info.full_frame(clip.x_res, clip.y_res);
                    let options = DualIsoOptions {
                        averaging: config.dual_iso_interpolation,
                        alias_map: config.dual_iso_alias_map,
                        full_res_blending: config.dual_iso_full_res_blending,
                        chroma_smooth: config.chroma_smooth,
                    };
                    self.kernels.dual_iso_full20bit(&full_frame, &mut frame, options);
                }
                DualIsoMode::Preview => {
                    let _span = debug_span!("dual_iso_preview").entered();
                    self.kernels.dual_iso_preview(&mut frame, levels);
                }
                DualIsoMode::Off => {}
            }
        }

        // 20-bit dual ISO output has a different range and colour structure
        if config.chroma_smooth != ChromaSmooth::Off && !hq_dual_iso {
            let _span = debug_span!("chroma_smooth", radius = config.chroma_smooth.radius()).entered();
            self.kernels.chroma_smooth(config.chroma_smooth, &mut frame, levels, luts);
        }

        if config.vertical_stripes != VerticalStripeMode::Off {
            let _span = debug_span!("vertical_stripes", compute = *compute_stripes).entered();
            let stripe_levels = if hq_dual_iso {
                Levels {
                    black: levels.black * DUAL_ISO_LEVEL_SCALE,
                    white: levels.white * DUAL_ISO_LEVEL_SCALE,
                }
            } else {
                levels
            };
            let params = StripeParams {
                levels: stripe_levels,
                frame_size: raw_info.frame_size,
                width: clip.x_res,
                height: clip.y_res,
                mode: config.vertical_stripes,
            };
            self.kernels
                .fix_vertical_stripes(stripe_correction, compute_stripes, &mut frame, &params);
        }
    }
}
