#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::image_pipeline::correction::{
        BadPixelParams, ChromaSmooth, ClipInfo, CorrectionConfig, CorrectionKernels, CorrectionPipeline,
        CorrectionState, DarkFrameMode, DualIsoMode, DualIsoOptions, ExposureBias, ExposureLuts, FocusPixelMode,
        FocusPixelParams, Levels, MapStatus, PixelMap, RawFrame, RawInfo, SensorSampling, StripeCorrection,
        StripeParams, VerticalStripeMode, BadPixelMode,
    };

    const WIDTH: u32 = 8;
    const HEIGHT: u32 = 8;
    const BLACK: i32 = 2048;
    const WHITE: i32 = 16383;
    const MAX_CODE: i32 = (1 << 14) - 1;

    #[derive(Debug, Clone, PartialEq)]
    enum KernelCall {
        DetectDualIso,
        DualIsoPreview(Levels),
        DualIsoFull20Bit { raw_info: RawInfo, options: DualIsoOptions },
        PatternNoise { width: usize, height: usize, white_level: i32 },
        FocusPixels { status: MapStatus, crop_rec: bool, restricted_lossless_bias: i32 },
        BadPixels { status: MapStatus, aggressive: bool },
        ChromaSmooth(ChromaSmooth, Levels),
        VerticalStripes { levels: Levels, compute: bool },
    }

    /// Records every call and walks the pixel maps one status step per frame.
    struct RecordingKernels {
        dual_iso: bool,
        calls: Arc<Mutex<Vec<KernelCall>>>,
    }

    impl RecordingKernels {
        fn new(dual_iso: bool) -> (Self, Arc<Mutex<Vec<KernelCall>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (Self { dual_iso, calls: calls.clone() }, calls)
        }

        fn record(&self, call: KernelCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn next_status(status: MapStatus) -> MapStatus {
        MapStatus::from_code(status.code() + 1)
    }

    impl CorrectionKernels for RecordingKernels {
        fn detect_dual_iso(&self, _frame: &RawFrame<'_>, _levels: Levels) -> bool {
            self.record(KernelCall::DetectDualIso);
            self.dual_iso
        }

        fn dual_iso_preview(&self, _frame: &mut RawFrame<'_>, levels: Levels) {
            self.record(KernelCall::DualIsoPreview(levels));
        }

        fn dual_iso_full20bit(&self, raw_info: &RawInfo, _frame: &mut RawFrame<'_>, options: DualIsoOptions) {
            self.record(KernelCall::DualIsoFull20Bit { raw_info: raw_info.clone(), options });
        }

        fn fix_pattern_noise(&self, _samples: &mut [i16], width: usize, height: usize, white_level: i32, _debug: bool) {
            self.record(KernelCall::PatternNoise { width, height, white_level });
        }

        fn fix_focus_pixels(&self, map: &mut PixelMap, _frame: &mut RawFrame<'_>, params: &FocusPixelParams<'_>) {
            self.record(KernelCall::FocusPixels {
                status: map.status(),
                crop_rec: params.crop_rec,
                restricted_lossless_bias: params.restricted_lossless_bias,
            });
            map.promote(next_status(map.status()));
        }

        fn fix_bad_pixels(&self, map: &mut PixelMap, _frame: &mut RawFrame<'_>, params: &BadPixelParams<'_>) {
            self.record(KernelCall::BadPixels { status: map.status(), aggressive: params.aggressive });
            map.promote(next_status(map.status()));
        }

        fn chroma_smooth(&self, radius: ChromaSmooth, _frame: &mut RawFrame<'_>, levels: Levels, _luts: &ExposureLuts) {
            self.record(KernelCall::ChromaSmooth(radius, levels));
        }

        fn fix_vertical_stripes(
            &self,
            _cache: &mut StripeCorrection,
            compute: &mut bool,
            _frame: &mut RawFrame<'_>,
            params: &StripeParams,
        ) {
            self.record(KernelCall::VerticalStripes { levels: params.levels, compute: *compute });
            *compute = false;
        }
    }

    fn clip() -> ClipInfo {
        ClipInfo::new(WIDTH, HEIGHT, 14, BLACK, WHITE)
    }

    /// Config with every pass off except the master switch.
    fn quiet_config() -> CorrectionConfig {
        CorrectionConfig::builder()
            .fix_raw(true)
            .vertical_stripes(VerticalStripeMode::Off)
            .focus_pixels(FocusPixelMode::Off)
            .bad_pixels(BadPixelMode::Off)
            .build()
    }

    fn frame(value: u16) -> Vec<u16> {
        vec![value; (WIDTH * HEIGHT) as usize]
    }

    #[test]
    fn test_fix_raw_off_leaves_everything_untouched() {
        let (kernels, calls) = RecordingKernels::new(true);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let config = CorrectionConfig::builder()
            .deflicker_target(3000)
            .pattern_noise(true)
            .chroma_smooth(ChromaSmooth::TwoByTwo)
            .build();
        let mut state = CorrectionState::with_config(clip(), config);
        let mut buffer: Vec<u16> = (0..(WIDTH * HEIGHT) as u16).map(|i| 2048 + i * 7).collect();
        let original = buffer.clone();

        pipeline.process(&mut state, &mut buffer);

        assert_eq!(buffer, original);
        assert!(!state.is_initialized());
        assert!(state.compute_stripes());
        assert_eq!(state.exposure_bias(), ExposureBias::ZERO);
        assert_eq!(state.focus_pixel_map().status(), MapStatus::Unknown);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dual_iso_detection_runs_once_per_clip() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut state = CorrectionState::with_config(clip(), quiet_config());

        for _ in 0..3 {
            pipeline.process(&mut state, &mut frame(3000));
        }

        let detections = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == KernelCall::DetectDualIso)
            .count();
        assert_eq!(detections, 1);
        assert!(state.is_initialized());
        assert_eq!(state.luts().map(|luts| luts.black_level()), Some(BLACK));
    }

    #[test]
    fn test_passes_run_in_order() {
        let (kernels, calls) = RecordingKernels::new(true);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let config = CorrectionConfig::builder()
            .fix_raw(true)
            .pattern_noise(true)
            .dual_iso(DualIsoMode::Preview)
            .chroma_smooth(ChromaSmooth::ThreeByThree)
            .build();
        let mut state = CorrectionState::with_config(clip(), config);

        pipeline.process(&mut state, &mut frame(3000));

        let levels = Levels { black: BLACK, white: WHITE };
        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                KernelCall::DetectDualIso,
                KernelCall::PatternNoise { width: WIDTH as usize, height: HEIGHT as usize, white_level: WHITE },
                KernelCall::FocusPixels { status: MapStatus::Unknown, crop_rec: false, restricted_lossless_bias: 0 },
                KernelCall::BadPixels { status: MapStatus::Unknown, aggressive: false },
                KernelCall::DualIsoPreview(levels),
                KernelCall::ChromaSmooth(ChromaSmooth::ThreeByThree, levels),
                KernelCall::VerticalStripes { levels, compute: true },
            ]
        );
        assert!(!state.compute_stripes());
    }

    #[test]
    fn test_dual_iso_passes_skipped_when_not_detected() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let config = CorrectionConfig::builder()
            .fix_raw(true)
            .dual_iso(DualIsoMode::Full20Bit)
            .chroma_smooth(ChromaSmooth::TwoByTwo)
            .build();
        let mut state = CorrectionState::with_config(clip(), config);

        pipeline.process(&mut state, &mut frame(3000));

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|call| matches!(
            call,
            KernelCall::DualIsoFull20Bit { .. } | KernelCall::DualIsoPreview(_)
        )));
        // Chroma smoothing still applies to a plain clip
        assert!(calls.iter().any(|call| matches!(call, KernelCall::ChromaSmooth(..))));
        assert!(!state.hq_dual_iso());
        assert_eq!(state.output_shift(), 2);
    }

    #[test]
    fn test_dark_frame_subtraction_stays_in_range() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let config = CorrectionConfig::builder()
            .fix_raw(true)
            .vertical_stripes(VerticalStripeMode::Off)
            .focus_pixels(FocusPixelMode::Off)
            .bad_pixels(BadPixelMode::Off)
            .dark_frame(DarkFrameMode::External)
            .build();
        let mut state = CorrectionState::with_config(clip(), config);

        let count = (WIDTH * HEIGHT) as usize;
        let mut dark = vec![2100u16; count];
        dark[1] = 5000;
        dark[2] = 0;
        state.set_dark_frame(dark.clone());

        let mut buffer = vec![3000u16; count];
        buffer[1] = 100;
        buffer[2] = 16000;
        let original = buffer.clone();

        pipeline.process(&mut state, &mut buffer);

        assert_eq!(buffer[0], 3000 - 2100 + 2048);
        assert_eq!(buffer[1], 0);
        assert_eq!(buffer[2], MAX_CODE as u16);
        for (i, &sample) in buffer.iter().enumerate() {
            let expected = (original[i] as i32 - dark[i] as i32 + BLACK).clamp(0, MAX_CODE);
            assert_eq!(sample as i32, expected);
        }
    }

    #[test]
    fn test_dark_frame_keeps_highlights_above_white_level() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.dark_frame = DarkFrameMode::External;
        let low_white = ClipInfo::new(WIDTH, HEIGHT, 14, BLACK, 15000);
        let mut state = CorrectionState::with_config(low_white, config);
        state.set_dark_frame(frame(BLACK as u16));

        let mut buffer = frame(16000);
        buffer[1] = 16383;
        pipeline.process(&mut state, &mut buffer);

        assert_eq!(buffer[0], 16000);
        assert_eq!(buffer[1], 16383);
    }

    #[test]
    fn test_dark_frame_matches_whole_padded_buffer() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.dark_frame = DarkFrameMode::External;
        let padded = (WIDTH * HEIGHT) as usize + 2;

        let mut state = CorrectionState::with_config(clip(), config.clone());
        state.set_dark_frame(vec![2148; padded]);
        let mut buffer = vec![3000u16; padded];
        pipeline.process(&mut state, &mut buffer);
        assert_eq!(buffer, vec![2900u16; padded]);

        // A dark frame covering only the image is a size mismatch for a padded buffer
        let mut state = CorrectionState::with_config(clip(), config);
        state.set_dark_frame(frame(2148));
        let mut buffer = vec![3000u16; padded];
        pipeline.process(&mut state, &mut buffer);
        assert_eq!(buffer, vec![3000u16; padded]);
    }

    #[test]
    fn test_dark_frame_mode_without_dark_frame_is_a_no_op() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.dark_frame = DarkFrameMode::External;
        let mut state = CorrectionState::with_config(clip(), config);

        let mut buffer = frame(3000);
        pipeline.process(&mut state, &mut buffer);

        assert_eq!(buffer, frame(3000));
    }

    #[test]
    fn test_deflicker_stores_one_stop_correction() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.deflicker_target = BLACK + 1000;
        let mut state = CorrectionState::with_config(clip(), config);

        let mut buffer: Vec<u16> = (0..(WIDTH * HEIGHT) as usize)
            .map(|i| if i % 2 == 1 { (BLACK + 500) as u16 } else { 9000 })
            .collect();
        pipeline.process(&mut state, &mut buffer);

        assert_eq!(state.exposure_bias(), ExposureBias { numerator: 10000, denominator: 10000 });

        // A frame with its median on the black level keeps the previous correction
        pipeline.process(&mut state, &mut frame(BLACK as u16));
        assert_eq!(state.exposure_bias(), ExposureBias { numerator: 10000, denominator: 10000 });
    }

    #[test]
    fn test_deflicker_median_may_sit_above_white_level() {
        let (kernels, _calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.deflicker_target = BLACK + 4000;
        let low_white = ClipInfo::new(WIDTH, HEIGHT, 14, BLACK, 6000);
        let mut state = CorrectionState::with_config(low_white, config);

        let mut buffer: Vec<u16> = (0..(WIDTH * HEIGHT) as usize)
            .map(|i| if i % 2 == 1 { (BLACK + 8000) as u16 } else { 0 })
            .collect();
        pipeline.process(&mut state, &mut buffer);

        assert_eq!(state.exposure_bias(), ExposureBias { numerator: -10000, denominator: 10000 });
    }

    #[test]
    fn test_map_status_only_moves_forward_until_reset() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let config = CorrectionConfig::builder()
            .fix_raw(true)
            .vertical_stripes(VerticalStripeMode::Off)
            .build();
        let mut state = CorrectionState::with_config(clip(), config);

        let mut seen = Vec::new();
        for _ in 0..6 {
            pipeline.process(&mut state, &mut frame(3000));
            seen.push(state.focus_pixel_map().status());
        }

        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(state.focus_pixel_map().status(), MapStatus::Stable);
        assert_eq!(state.bad_pixel_map().status(), MapStatus::Stable);

        // Stable maps are no longer handed to the kernels
        let focus_calls = |calls: &Arc<Mutex<Vec<KernelCall>>>| {
            calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| matches!(call, KernelCall::FocusPixels { .. }))
                .count()
        };
        assert_eq!(focus_calls(&calls), 3);

        state.reset_focus_pixel_map();
        assert_eq!(state.focus_pixel_map().status(), MapStatus::Unknown);
        pipeline.process(&mut state, &mut frame(3000));
        assert_eq!(focus_calls(&calls), 4);
        assert_eq!(state.focus_pixel_map().status(), MapStatus::Computing);
        assert_eq!(state.bad_pixel_map().status(), MapStatus::Stable);
    }

    #[test]
    fn test_chroma_smoothing_skipped_for_20bit_dual_iso() {
        let (kernels, calls) = RecordingKernels::new(true);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.dual_iso = DualIsoMode::Full20Bit;
        config.chroma_smooth = ChromaSmooth::FiveByFive;
        let mut state = CorrectionState::with_config(clip(), config);

        for _ in 0..10 {
            pipeline.process(&mut state, &mut frame(3000));
        }

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|call| matches!(call, KernelCall::ChromaSmooth(..))));
        let merges = calls
            .iter()
            .filter(|call| matches!(call, KernelCall::DualIsoFull20Bit { .. }))
            .count();
        assert_eq!(merges, 10);
        assert!(state.hq_dual_iso());
        assert_eq!(state.output_shift(), 0);
    }

    #[test]
    fn test_20bit_merge_gets_full_frame_geometry() {
        let (kernels, calls) = RecordingKernels::new(true);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.dual_iso = DualIsoMode::Full20Bit;
        config.dual_iso_alias_map = false;

        let mut clip = clip();
        clip.raw_info.width = 5208;
        clip.raw_info.height = 3478;
        clip.raw_info.pitch = 5208 * 14 / 8;
        let mut state = CorrectionState::with_config(clip, config);

        pipeline.process(&mut state, &mut frame(3000));

        let calls = calls.lock().unwrap();
        let Some(KernelCall::DualIsoFull20Bit { raw_info, options }) =
            calls.iter().find(|call| matches!(call, KernelCall::DualIsoFull20Bit { .. }))
        else {
            panic!("full 20-bit merge not called");
        };
        assert_eq!((raw_info.width, raw_info.height, raw_info.pitch), (WIDTH, HEIGHT, WIDTH));
        assert_eq!((raw_info.active_area.x1, raw_info.active_area.y1), (0, 0));
        assert_eq!((raw_info.active_area.x2, raw_info.active_area.y2), (WIDTH, HEIGHT));
        assert_eq!(raw_info.black_level, BLACK);
        assert!(!options.alias_map);
        assert!(options.full_res_blending);
        // The clip's own descriptor is left alone
        assert_eq!(state.clip().raw_info.width, 5208);
    }

    #[test]
    fn test_stripe_levels_scaled_for_20bit_dual_iso() {
        let run = |dual_iso: bool| {
            let (kernels, calls) = RecordingKernels::new(dual_iso);
            let pipeline = CorrectionPipeline::with_kernels(kernels);
            let mut config = quiet_config();
            config.dual_iso = DualIsoMode::Full20Bit;
            config.vertical_stripes = VerticalStripeMode::Force;
            let mut state = CorrectionState::with_config(clip(), config);
            pipeline.process(&mut state, &mut frame(3000));
            let calls = calls.lock().unwrap();
            calls
                .iter()
                .find_map(|call| match call {
                    KernelCall::VerticalStripes { levels, .. } => Some(*levels),
                    _ => None,
                })
                .unwrap()
        };

        assert_eq!(run(true), Levels { black: BLACK * 4, white: WHITE * 4 });
        assert_eq!(run(false), Levels { black: BLACK, white: WHITE });
    }

    #[test]
    fn test_compute_stripes_on_requests_recomputation() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.vertical_stripes = VerticalStripeMode::Normal;
        let mut state = CorrectionState::with_config(clip(), config);

        pipeline.process(&mut state, &mut frame(3000));
        pipeline.process(&mut state, &mut frame(3000));
        state.compute_stripes_on();
        pipeline.process(&mut state, &mut frame(3000));

        let computes: Vec<bool> = calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                KernelCall::VerticalStripes { compute, .. } => Some(*compute),
                _ => None,
            })
            .collect();
        assert_eq!(computes, vec![true, false, true]);
    }

    #[test]
    fn test_focus_pixel_arguments_follow_clip() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut config = quiet_config();
        config.focus_pixels = FocusPixelMode::On;
        config.bad_pixels = BadPixelMode::Aggressive;

        let clip = ClipInfo::new(WIDTH, HEIGHT, 12, 512, 4000)
            .with_camera_model(0x80000331)
            .with_sensor_sampling(SensorSampling { binning_x: 1, skipping_x: 0, binning_y: 1, skipping_y: 0 })
            .with_lossless(true);
        let mut state = CorrectionState::with_config(clip, config);

        pipeline.process(&mut state, &mut frame(1000));

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&KernelCall::FocusPixels {
            status: MapStatus::Unknown,
            crop_rec: true,
            restricted_lossless_bias: 5,
        }));
        assert!(calls.contains(&KernelCall::BadPixels { status: MapStatus::Unknown, aggressive: true }));
    }

    #[test]
    fn test_frame_size_mismatch_is_skipped() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut state = CorrectionState::with_config(clip(), CorrectionConfig::builder().fix_raw(true).build());

        let mut short = vec![3000u16; 10];
        pipeline.process(&mut state, &mut short);

        assert_eq!(short, vec![3000u16; 10]);
        assert!(!state.is_initialized());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clips_processed_in_parallel_keep_separate_state() {
        let (kernels, calls) = RecordingKernels::new(false);
        let pipeline = CorrectionPipeline::with_kernels(kernels);
        let mut first = CorrectionState::with_config(clip(), quiet_config());
        let mut second = CorrectionState::with_config(clip(), quiet_config());
        second.set_deflicker_target(BLACK + 1000);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..4 {
                    pipeline.process(&mut first, &mut frame(3000));
                }
            });
            scope.spawn(|| {
                for _ in 0..4 {
                    pipeline.process(&mut second, &mut frame((BLACK + 500) as u16));
                }
            });
        });

        assert!(first.is_initialized());
        assert!(second.is_initialized());
        assert_eq!(first.exposure_bias(), ExposureBias::ZERO);
        assert_eq!(second.exposure_bias().numerator, 10000);
        let detections = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == KernelCall::DetectDualIso)
            .count();
        assert_eq!(detections, 2);
    }
}
