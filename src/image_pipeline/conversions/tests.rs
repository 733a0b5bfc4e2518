#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    use crate::image_pipeline::common::error::{RawProcError, Result};
    use crate::image_pipeline::conversions::RawToTiffPipeline;
    use crate::image_pipeline::correction::{BadPixelMode, CorrectionConfig, DarkFrameMode};
    use crate::image_pipeline::debayer::RgbImageData;
    use crate::image_pipeline::kernels::BuiltinKernels;
    use crate::image_pipeline::raw::{RawImageData, RawImageReader};
    use crate::image_pipeline::tiff::{ExportConfig, TiffCompression, TiffWriter};

    const WIDTH: usize = 8;
    const HEIGHT: usize = 8;

    /// Decodes every input into a flat 14-bit frame whose level is the first input byte
    /// times 100.
    struct MockReader {
        should_fail: bool,
        width: usize,
        height: usize,
    }

    impl MockReader {
        fn new() -> Self {
            Self { should_fail: false, width: WIDTH, height: HEIGHT }
        }
    }

    impl RawImageReader for MockReader {
        fn read_raw(&self, data: &[u8]) -> Result<RawImageData> {
            if self.should_fail {
                return Err(RawProcError::DecodeError("Mock decode error".to_string()));
            }
            let level = data.first().copied().unwrap_or(0) as u16 * 100;
            Ok(RawImageData::from_samples(
                self.width,
                self.height,
                vec![level; self.width * self.height],
                14,
            ))
        }
    }

    #[derive(Default)]
    struct MockWriter {
        should_fail: bool,
        gray: Arc<Mutex<Vec<RawImageData>>>,
        rgb: Arc<Mutex<Vec<RgbImageData>>>,
    }

    impl TiffWriter for MockWriter {
        fn write_tiff(&self, image: &RawImageData, output: &mut dyn Write, _config: &ExportConfig) -> Result<()> {
            if self.should_fail {
                return Err(RawProcError::EncodeError("Mock encode error".to_string()));
            }
            output.write_all(b"gray")?;
            self.gray.lock().unwrap().push(image.clone());
            Ok(())
        }

        fn write_rgb_tiff(&self, image: &RgbImageData, output: &mut dyn Write, _config: &ExportConfig) -> Result<()> {
            if self.should_fail {
                return Err(RawProcError::EncodeError("Mock encode error".to_string()));
            }
            output.write_all(b"rgb")?;
            self.rgb.lock().unwrap().push(image.clone());
            Ok(())
        }
    }

    fn pipeline_with(
        reader: MockReader,
        writer: MockWriter,
        config: ExportConfig,
        correction: CorrectionConfig,
    ) -> RawToTiffPipeline<MockReader, MockWriter> {
        RawToTiffPipeline::with_custom(reader, writer, BuiltinKernels::new(), config, correction)
    }

    #[test]
    fn test_config_builder() {
        let config = ExportConfig::builder()
            .compression(TiffCompression::DeflateBest)
            .predictor(None)
            .validate_dimensions(false)
            .max_dimension(Some(10000))
            .debayer(true)
            .build();

        assert_eq!(config.compression, TiffCompression::DeflateBest);
        assert_eq!(config.predictor, None);
        assert!(!config.validate_dimensions);
        assert_eq!(config.max_dimension, Some(10000));
        assert!(config.debayer);
    }

    #[test]
    fn test_successful_conversion_expands_to_16bit() {
        let writer = MockWriter::default();
        let gray = writer.gray.clone();
        let pipeline = pipeline_with(MockReader::new(), writer, ExportConfig::default(), CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        pipeline.convert(&[10], &mut output).unwrap();

        let written = gray.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].bits_per_sample, 16);
        assert!(written[0].data.iter().all(|&s| s == 1000 << 2));
        assert_eq!(output.into_inner(), b"gray");
    }

    #[test]
    fn test_reader_failure() {
        let reader = MockReader { should_fail: true, ..MockReader::new() };
        let pipeline = pipeline_with(reader, MockWriter::default(), ExportConfig::default(), CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        let result = pipeline.convert(&[10], &mut output);

        assert!(matches!(result.unwrap_err(), RawProcError::DecodeError(_)));
    }

    #[test]
    fn test_writer_failure() {
        let writer = MockWriter { should_fail: true, ..MockWriter::default() };
        let pipeline = pipeline_with(MockReader::new(), writer, ExportConfig::default(), CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        let result = pipeline.convert(&[10], &mut output);

        assert!(matches!(result.unwrap_err(), RawProcError::EncodeError(_)));
        assert!(output.into_inner().is_empty());
    }

    #[test]
    fn test_dimension_validation_failure() {
        let config = ExportConfig::builder().max_dimension(Some(4)).build();
        let pipeline = pipeline_with(MockReader::new(), MockWriter::default(), config, CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        let result = pipeline.convert(&[10], &mut output);

        assert!(matches!(result.unwrap_err(), RawProcError::InvalidDimensions(WIDTH, HEIGHT)));
    }

    #[test]
    fn test_frame_from_other_clip_rejected() {
        let writer = MockWriter::default();
        let gray = writer.gray.clone();
        let pipeline = pipeline_with(MockReader::new(), writer, ExportConfig::default(), CorrectionConfig::default());

        let first = pipeline.read(&[10]).unwrap();
        let mut state = pipeline.new_state(&first);
        let other = RawImageData::from_samples(4, 4, vec![0; 16], 14);

        let mut output = Cursor::new(Vec::new());
        let result = pipeline.convert_image(&mut state, other, &mut output);

        assert!(matches!(
            result.unwrap_err(),
            RawProcError::FrameSizeMismatch { expected: 64, actual: 16 }
        ));
        assert!(gray.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clip_state_applies_dark_frame() {
        let writer = MockWriter::default();
        let gray = writer.gray.clone();
        let correction = CorrectionConfig::builder()
            .fix_raw(true)
            .dark_frame(DarkFrameMode::External)
            .bad_pixels(BadPixelMode::Off)
            .build();
        let pipeline = pipeline_with(MockReader::new(), writer, ExportConfig::default(), correction);

        let frame = pipeline.read(&[30]).unwrap();
        let mut state = pipeline.new_state(&frame);
        state.set_dark_frame(vec![1000; WIDTH * HEIGHT]);

        let mut output = Cursor::new(Vec::new());
        pipeline.convert_image(&mut state, frame, &mut output).unwrap();
        let next = pipeline.read(&[20]).unwrap();
        pipeline.convert_image(&mut state, next, &mut output).unwrap();

        // Black level of decoded stills is zero here
        let written = gray.lock().unwrap();
        assert!(written[0].data.iter().all(|&s| s == 2000 << 2));
        assert!(written[1].data.iter().all(|&s| s == 1000 << 2));
    }

    #[test]
    fn test_debayer_writes_rgb() {
        let writer = MockWriter::default();
        let rgb = writer.rgb.clone();
        let gray = writer.gray.clone();
        let config = ExportConfig::builder().debayer(true).build();
        let pipeline = pipeline_with(MockReader::new(), writer, config, CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        pipeline.convert(&[10], &mut output).unwrap();

        let written = rgb.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].data.len(), WIDTH * HEIGHT * 3);
        assert!(gray.lock().unwrap().is_empty());
        assert_eq!(output.into_inner(), b"rgb");
    }

    #[test]
    fn test_convert_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.raw");
        let output = dir.path().join("frame.tiff");
        std::fs::write(&input, [10u8]).unwrap();

        let pipeline = pipeline_with(MockReader::new(), MockWriter::default(), ExportConfig::default(), CorrectionConfig::default());
        pipeline.convert_file(&input, &output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"gray");
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(MockReader::new(), MockWriter::default(), ExportConfig::default(), CorrectionConfig::default());

        let result = pipeline.convert_file(dir.path().join("absent.raw"), dir.path().join("out.tiff"));

        assert!(matches!(result.unwrap_err(), RawProcError::InputReadError(_)));
    }

    #[test]
    fn test_average_dark_frames() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<_> = [1u8, 2, 6]
            .iter()
            .map(|&level| {
                let path = dir.path().join(format!("dark_{}.raw", level));
                std::fs::write(&path, [level]).unwrap();
                path
            })
            .collect();

        let writer = MockWriter::default();
        let gray = writer.gray.clone();
        let pipeline = pipeline_with(MockReader::new(), writer, ExportConfig::default(), CorrectionConfig::default());

        let mut output = Cursor::new(Vec::new());
        let frames = pipeline.average_dark_frames(&inputs, &mut output).unwrap();

        assert_eq!(frames, 3);
        let written = gray.lock().unwrap();
        assert_eq!((written[0].width, written[0].height), (WIDTH, HEIGHT));
        assert!(written[0].data.iter().all(|&s| s == 300));
    }

    #[test]
    fn test_average_without_frames_fails() {
        let pipeline = pipeline_with(MockReader::new(), MockWriter::default(), ExportConfig::default(), CorrectionConfig::default());
        let mut output = Cursor::new(Vec::new());
        let inputs: Vec<std::path::PathBuf> = Vec::new();

        let result = pipeline.average_dark_frames(&inputs, &mut output);

        assert!(matches!(result.unwrap_err(), RawProcError::EmptyAverage));
    }

    #[test]
    fn test_camera_model_reaches_clip() {
        let mut pipeline = pipeline_with(MockReader::new(), MockWriter::default(), ExportConfig::default(), CorrectionConfig::default());
        pipeline.set_camera_model(0x80000218);

        let frame = pipeline.read(&[10]).unwrap();
        let state = pipeline.new_state(&frame);

        assert_eq!(state.clip().camera_model, 0x80000218);
    }
}
