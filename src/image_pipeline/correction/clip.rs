//! Per-clip sensor metadata supplied by the container layer.

use crate::image_pipeline::raw::types::{ActiveArea, RawImageData};

/// Sensor geometry and levels of the recorded raw buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInfo {
    pub bits_per_pixel: u32,
    pub black_level: i32,
    pub white_level: i32,
    /// Full sensor readout width, which can exceed the recorded frame width
    pub width: u32,
    pub height: u32,
    /// Row length in samples
    pub pitch: u32,
    /// Packed frame size in bytes
    pub frame_size: u32,
    pub active_area: ActiveArea,
}

impl RawInfo {
    /// Largest code a `bits_per_pixel` sample can hold.
    pub fn max_code(&self) -> i32 {
        ((1u32 << self.bits_per_pixel.min(16)) - 1) as i32
    }

    /// Geometry descriptor for a buffer that holds exactly `width` x `height` samples with
    /// no margins, keeping the levels of `self`.
    pub fn full_frame(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pitch: width,
            active_area: ActiveArea::full(width, height),
            ..self.clone()
        }
    }
}

/// Sensor binning and line skipping used by the capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSampling {
    pub binning_x: u16,
    pub skipping_x: u16,
    pub binning_y: u16,
    pub skipping_y: u16,
}

impl SensorSampling {
    /// Combined horizontal and vertical sampling factors, binning plus skipping.
    pub fn factors(&self) -> (u32, u32) {
        (
            self.binning_x as u32 + self.skipping_x as u32,
            self.binning_y as u32 + self.skipping_y as u32,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub raw_info: RawInfo,
    /// Recorded frame width in samples
    pub x_res: u32,
    /// Recorded frame height in samples
    pub y_res: u32,
    /// Horizontal position of the recorded window on the sensor, updated per frame
    pub pan_x: u16,
    pub pan_y: u16,
    /// Camera model identifier
    pub camera_model: u32,
    /// Present only when the clip carries a sampling block
    pub sensor_sampling: Option<SensorSampling>,
    /// Frames are stored with lossless JPEG compression
    pub lossless: bool,
    /// The clip embeds its own dark frame block
    pub has_internal_dark_frame: bool,
}

impl ClipInfo {
    pub fn new(x_res: u32, y_res: u32, bits_per_pixel: u32, black_level: i32, white_level: i32) -> Self {
        let raw_info = RawInfo {
            bits_per_pixel,
            black_level,
            white_level,
            width: x_res,
            height: y_res,
            pitch: x_res,
            frame_size: (x_res as u64 * y_res as u64 * bits_per_pixel as u64 / 8) as u32,
            active_area: ActiveArea::full(x_res, y_res),
        };
        Self {
            raw_info,
            x_res,
            y_res,
            pan_x: 0,
            pan_y: 0,
            camera_model: 0,
            sensor_sampling: None,
            lossless: false,
            has_internal_dark_frame: false,
        }
    }

    /// Clip description for a single decoded still, which has no container metadata
    /// beyond levels and the active area.
    pub fn from_image(image: &RawImageData) -> Self {
        let mut clip = Self::new(
            image.width as u32,
            image.height as u32,
            image.bits_per_sample,
            image.black_level as i32,
            image.white_level as i32,
        );
        clip.raw_info.active_area = image.active_area;
        clip
    }

    pub fn with_camera_model(mut self, camera_model: u32) -> Self {
        self.camera_model = camera_model;
        self
    }

    pub fn with_sensor_sampling(mut self, sampling: SensorSampling) -> Self {
        self.sensor_sampling = Some(sampling);
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.x_res as usize * self.y_res as usize
    }
}
