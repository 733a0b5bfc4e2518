use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rawfix_rs::image_pipeline::correction::{
    BadPixelMode, BadPixelSearch, ChromaSmooth, CorrectionConfig, CorrectionState, DarkFrameMode,
    DualIsoInterpolation, DualIsoMode, FocusPixelMode, PixelInterpolation, VerticalStripeMode,
};
use rawfix_rs::image_pipeline::{
    BuiltinKernels, ExportConfig, RawImageData, RawImageReader, RawLoaderReader, RawProcError, RawToTiffPipeline,
    StandardTiffWriter, TiffCompression, TiffFrameReader,
};
use rawfix_rs::logger;

use tracing::{info, warn};

type Pipeline = RawToTiffPipeline<RawLoaderReader, StandardTiffWriter, BuiltinKernels>;

#[derive(Parser)]
#[command(name = "rawfix", version, about = "Correct raw Bayer frames and export them as TIFF")]
struct Args {
    /// Raw frames of one clip, corrected in the given order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the TIFF files are written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Average the inputs into a master dark frame written to this file, then exit
    #[arg(long, value_name = "FILE")]
    average_dark: Option<PathBuf>,

    /// Dark frame subtracted from every frame (TIFF master or a raw file)
    #[arg(long, value_name = "FILE")]
    dark_frame: Option<PathBuf>,

    /// Export without any correction
    #[arg(long)]
    no_fix: bool,

    /// Vertical stripes: 0 off, 1 normal, 2 force
    #[arg(long, value_parser = parse_mode::<VerticalStripeMode>)]
    vertical_stripes: Option<VerticalStripeMode>,

    /// Focus pixels: 0 off, 1 on, 2 crop record
    #[arg(long, value_parser = parse_mode::<FocusPixelMode>)]
    focus_pixels: Option<FocusPixelMode>,

    /// Focus pixel interpolation: 0 mlvfs, 1 raw2dng
    #[arg(long, value_parser = parse_mode::<PixelInterpolation>)]
    focus_interpolation: Option<PixelInterpolation>,

    /// Bad pixels: 0 off, 1 on, 2 aggressive
    #[arg(long, value_parser = parse_mode::<BadPixelMode>)]
    bad_pixels: Option<BadPixelMode>,

    /// Bad pixel search: 0 once per clip, 1 every frame
    #[arg(long, value_parser = parse_mode::<BadPixelSearch>)]
    bad_pixel_search: Option<BadPixelSearch>,

    /// Bad pixel interpolation: 0 mlvfs, 1 raw2dng
    #[arg(long, value_parser = parse_mode::<PixelInterpolation>)]
    bad_interpolation: Option<PixelInterpolation>,

    /// Chroma smoothing window: 0, 2, 3 or 5
    #[arg(long, value_parser = parse_mode::<ChromaSmooth>)]
    chroma_smooth: Option<ChromaSmooth>,

    /// Remove row pattern noise
    #[arg(long)]
    pattern_noise: bool,

    /// Deflicker target median, 0 disables
    #[arg(long, default_value_t = 0)]
    deflicker: i32,

    /// Dual ISO: 0 off, 1 full 20-bit, 2 preview
    #[arg(long, value_parser = parse_mode::<DualIsoMode>)]
    dual_iso: Option<DualIsoMode>,

    /// Dual ISO interpolation: 0 amaze, 1 mean23
    #[arg(long, value_parser = parse_mode::<DualIsoInterpolation>)]
    dual_iso_interpolation: Option<DualIsoInterpolation>,

    /// Disable the dual ISO alias map
    #[arg(long)]
    no_alias_map: bool,

    /// Disable dual ISO full resolution blending
    #[arg(long)]
    no_full_res_blending: bool,

    /// Directory holding focus pixel maps (`<camera>_<w>x<h>[_crop].fpm`)
    #[arg(long, value_name = "DIR")]
    focus_maps: Option<PathBuf>,

    /// Camera id in hex, used to pick the focus pixel map
    #[arg(long, value_parser = parse_hex)]
    camera_model: Option<u32>,

    /// Debayer into an RGB preview instead of writing the Bayer data
    #[arg(long)]
    debayer: bool,

    #[arg(long, value_enum, default_value_t = Compression::None)]
    compression: Compression,
}

#[derive(Clone, Copy, ValueEnum)]
enum Compression {
    None,
    Lzw,
    DeflateFast,
    Deflate,
    DeflateBest,
}

impl From<Compression> for TiffCompression {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => TiffCompression::None,
            Compression::Lzw => TiffCompression::Lzw,
            Compression::DeflateFast => TiffCompression::DeflateFast,
            Compression::Deflate => TiffCompression::DeflateBalanced,
            Compression::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

fn parse_mode<T: TryFrom<i32, Error = RawProcError>>(value: &str) -> std::result::Result<T, String> {
    let code: i32 = value.parse().map_err(|e| format!("{}: {}", value, e))?;
    T::try_from(code).map_err(|e| e.to_string())
}

fn parse_hex(value: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16)
}

impl Args {
    fn correction_config(&self) -> CorrectionConfig {
        let mut config = CorrectionConfig::builder()
            .fix_raw(!self.no_fix)
            .pattern_noise(self.pattern_noise)
            .deflicker_target(self.deflicker)
            .dual_iso_alias_map(!self.no_alias_map)
            .dual_iso_full_res_blending(!self.no_full_res_blending)
            .build();

        if let Some(mode) = self.vertical_stripes {
            config.vertical_stripes = mode;
        }
        if let Some(mode) = self.focus_pixels {
            config.focus_pixels = mode;
        }
        if let Some(method) = self.focus_interpolation {
            config.focus_pixel_interpolation = method;
        }
        if let Some(mode) = self.bad_pixels {
            config.bad_pixels = mode;
        }
        if let Some(method) = self.bad_pixel_search {
            config.bad_pixel_search = method;
        }
        if let Some(method) = self.bad_interpolation {
            config.bad_pixel_interpolation = method;
        }
        if let Some(radius) = self.chroma_smooth {
            config.chroma_smooth = radius;
        }
        if let Some(mode) = self.dual_iso {
            config.dual_iso = mode;
        }
        if let Some(method) = self.dual_iso_interpolation {
            config.dual_iso_interpolation = method;
        }
        if self.dark_frame.is_some() {
            config.dark_frame = DarkFrameMode::External;
        }
        config
    }

    fn export_config(&self) -> ExportConfig {
        ExportConfig::builder()
            .compression(self.compression.into())
            .debayer(self.debayer)
            .build()
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

fn load_dark_frame(state: &mut CorrectionState, path: &Path) -> Result<()> {
    state.set_dark_frame_filename(path);
    let loaded = if is_tiff(path) {
        state.init_dark_frame(DarkFrameMode::External, &TiffFrameReader)
    } else {
        state.init_dark_frame(DarkFrameMode::External, &RawLoaderReader)
    };
    loaded.with_context(|| format!("Failed to load dark frame {}", path.display()))?;

    if state.dark_frame_size() != state.clip().pixel_count() * 2 {
        warn!(
            dark_bytes = state.dark_frame_size(),
            frame_bytes = state.clip().pixel_count() * 2,
            "Dark frame does not match the clip, it will not be applied"
        );
    }
    Ok(())
}

fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().map_or_else(|| "frame".into(), |stem| stem.to_string_lossy());
    output_dir.join(format!("{}.tiff", stem))
}

fn decode(input: &Path) -> Result<RawImageData> {
    RawLoaderReader
        .read_raw_file(input)
        .with_context(|| format!("Failed to decode {}", input.display()))
}

fn open_clip(pipeline: &Pipeline, image: &RawImageData, args: &Args) -> Result<CorrectionState> {
    let mut state = pipeline.new_state(image);
    if let Some(dark_frame) = &args.dark_frame {
        load_dark_frame(&mut state, dark_frame)?;
    }
    info!(
        width = image.width,
        height = image.height,
        bits = image.bits_per_sample,
        camera = %image.camera,
        "Clip opened"
    );
    Ok(state)
}

fn convert_clip(pipeline: &Pipeline, args: &Args) -> Result<()> {
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let (first, rest) = args.inputs.split_first().context("No input frames")?;
    let first_image = decode(first)?;
    let mut state = open_clip(pipeline, &first_image, args)?;

    let frames = std::iter::once(Ok((first, first_image)))
        .chain(rest.iter().map(|input| decode(input).map(|image| (input, image))));
    for frame in frames {
        let (input, image) = frame?;
        let output = output_path(&args.output, input);
        pipeline
            .convert_image_to_file(&mut state, image, &output)
            .with_context(|| format!("Failed to convert {}", input.display()))?;
        info!(input = %input.display(), output = %output.display(), "Frame written");
    }

    info!(
        frames = args.inputs.len(),
        dual_iso = state.is_dual_iso(),
        bad_pixel_map = ?state.bad_pixel_map().status(),
        focus_pixel_map = ?state.focus_pixel_map().status(),
        "Clip finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    info!("Starting rawfix...");

    let kernels = match &args.focus_maps {
        Some(dir) => BuiltinKernels::with_focus_map_dir(dir),
        None => BuiltinKernels::new(),
    };
    let mut pipeline = RawToTiffPipeline::with_custom(
        RawLoaderReader,
        StandardTiffWriter,
        kernels,
        args.export_config(),
        args.correction_config(),
    );
    if let Some(camera_model) = args.camera_model {
        pipeline.set_camera_model(camera_model);
    }

    info!("Compression: {:?}", pipeline.config().compression);
    info!(
        "Debayering: {}",
        if pipeline.config().debayer {
            "enabled"
        } else {
            "disabled"
        }
    );

    if let Some(master) = &args.average_dark {
        let mut output = std::fs::File::create(master)
            .with_context(|| format!("Failed to create {}", master.display()))?;
        let frames = pipeline.average_dark_frames(&args.inputs, &mut output)?;
        info!(frames, output = %master.display(), "Master dark frame created");
        return Ok(());
    }

    convert_clip(&pipeline, &args)
}
