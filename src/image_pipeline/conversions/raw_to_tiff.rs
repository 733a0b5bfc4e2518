use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{info, instrument};

use crate::image_pipeline::{
    common::error::{RawProcError, Result},
    correction::{
        ClipInfo, CorrectionConfig, CorrectionKernels, CorrectionPipeline, CorrectionState, DarkFrameAverager,
        DUAL_ISO_LEVEL_SCALE, expand_to_16bit,
    },
    debayer::CpuDebayer,
    kernels::BuiltinKernels,
    raw::{RawImageData, RawImageReader, RawLoaderReader},
    tiff::{ExportConfig, StandardTiffWriter, TiffWriter},
};

/// Decodes raw files, corrects them and writes them out as TIFF.
pub struct RawToTiffPipeline<R: RawImageReader, W: TiffWriter, K: CorrectionKernels = BuiltinKernels> {
    reader: R,
    writer: W,
    correction: CorrectionPipeline<K>,
    correction_config: CorrectionConfig,
    config: ExportConfig,
    debayer: CpuDebayer,
    camera_model: Option<u32>,
}

impl RawToTiffPipeline<RawLoaderReader, StandardTiffWriter> {
    pub fn new(config: ExportConfig, correction_config: CorrectionConfig) -> Self {
        Self::with_custom(RawLoaderReader, StandardTiffWriter, BuiltinKernels::new(), config, correction_config)
    }
}

impl<R: RawImageReader, W: TiffWriter, K: CorrectionKernels> RawToTiffPipeline<R, W, K> {
    pub fn with_custom(
        reader: R,
        writer: W,
        kernels: K,
        config: ExportConfig,
        correction_config: CorrectionConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            correction: CorrectionPipeline::with_kernels(kernels),
            correction_config,
            config,
            debayer: CpuDebayer::new(),
            camera_model: None,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(RawProcError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                return Err(RawProcError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    pub fn read(&self, input_data: &[u8]) -> Result<RawImageData> {
        let _span = tracing::info_span!("decode_raw").entered();
        self.reader.read_raw(input_data)
    }

    /// Correction state for a clip whose frames look like `image`.
    pub fn new_state(&self, image: &RawImageData) -> CorrectionState {
        let mut clip = ClipInfo::from_image(image);
        if let Some(camera_model) = self.camera_model {
            clip = clip.with_camera_model(camera_model);
        }
        CorrectionState::with_config(clip, self.correction_config.clone())
    }

    /// Camera id used to look up focus pixel maps. Decoded stills do not carry one.
    pub fn set_camera_model(&mut self, camera_model: u32) {
        self.camera_model = Some(camera_model);
    }

    /// Converts a single still with its own correction state.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting RAW to TIFF conversion");
        let image = self.read(input_data)?;
        let mut state = self.new_state(&image);
        self.convert_image(&mut state, image, output)
    }

    /// Corrects and writes one decoded frame of the clip `state` belongs to.
    #[instrument(skip_all, fields(width = image.width, height = image.height))]
    pub fn convert_image(&self, state: &mut CorrectionState, mut image: RawImageData, output: &mut dyn Write) -> Result<()> {
        {
            let _span = tracing::info_span!("validate_dimensions").entered();
            self.validate_dimensions(image.width, image.height)?;
            let clip = state.clip();
            if image.width != clip.x_res as usize || image.height != clip.y_res as usize {
                return Err(RawProcError::FrameSizeMismatch {
                    expected: clip.pixel_count(),
                    actual: image.width * image.height,
                });
            }
        }

        {
            let _span = tracing::info_span!("correct_frame").entered();
            self.correction.process(state, &mut image.data);
        }

        if self.config.debayer {
            if state.hq_dual_iso() {
                image.black_level = (image.black_level as i32 * DUAL_ISO_LEVEL_SCALE).min(u16::MAX as i32) as u16;
                image.white_level = (image.white_level as i32 * DUAL_ISO_LEVEL_SCALE).min(u16::MAX as i32) as u16;
            }
            let rgb = {
                let _span = tracing::info_span!("debayer").entered();
                self.debayer.process(&image, state.exposure_bias().gain())?
            };
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_rgb_tiff(&rgb, output, &self.config)?;
        } else {
            expand_to_16bit(&mut image.data, state.output_shift());
            image.bits_per_sample = 16;
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_tiff(&image, output, &self.config)?;
        }

        info!(width = image.width, height = image.height, "Conversion complete");
        Ok(())
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input_path: P, output_path: Q) -> Result<()> {
        let image = self.reader.read_raw_file(input_path.as_ref())?;
        let mut state = self.new_state(&image);
        self.convert_image_to_file(&mut state, image, output_path)
    }

    pub fn convert_image_to_file<Q: AsRef<Path>>(
        &self,
        state: &mut CorrectionState,
        image: RawImageData,
        output_path: Q,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        info!(output = %output_path.display(), "Writing file");
        let mut output_file = create_output(output_path)?;
        self.convert_image(state, image, &mut output_file)
    }

    /// Averages dark exposures into a master dark frame, written as a grayscale TIFF of raw
    /// codes. Returns the number of frames averaged.
    #[instrument(skip_all, fields(frames = inputs.len()))]
    pub fn average_dark_frames<P: AsRef<Path>>(&self, inputs: &[P], output: &mut dyn Write) -> Result<u32> {
        let mut averager = DarkFrameAverager::new();
        let mut geometry = None;
        for input in inputs {
            let image = self.reader.read_raw_file(input.as_ref())?;
            averager.add(&image.data)?;
            geometry.get_or_insert((image.width, image.height, image.bits_per_sample));
        }
        let (width, height, bits) = geometry.ok_or(RawProcError::EmptyAverage)?;
        let average = averager.average()?;

        let master = RawImageData::from_samples(width, height, average, bits);
        self.writer.write_tiff(&master, output, &self.config)?;
        info!(frames = averager.frames(), width, height, "Master dark frame written");
        Ok(averager.frames())
    }

    pub fn correction_config(&self) -> &CorrectionConfig {
        &self.correction_config
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ExportConfig) {
        self.config = config;
    }
}

pub(crate) fn create_output(path: &Path) -> Result<File> {
    let _span = tracing::info_span!("create_output_file").entered();
    File::create(path).map_err(|e| RawProcError::OutputWriteError(format!("{}: {}", path.display(), e)))
}
