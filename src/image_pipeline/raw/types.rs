//! RAW image data types

/// Sensor area holding valid image data, in raw buffer coordinates (x2/y2 exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveArea {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl ActiveArea {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x1: 0, y1: 0, x2: width, y2: height }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// Represents decoded RAW image data
#[derive(Debug, Clone)]
pub struct RawImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Raw pixel data (single channel Bayer pattern)
    pub data: Vec<u16>,
    /// Actual bits per sample from the sensor (e.g., 12, 14, or 16)
    pub bits_per_sample: u32,
    /// Sensor black level
    pub black_level: u16,
    /// Sensor white (saturation) level
    pub white_level: u16,
    pub active_area: ActiveArea,
    /// White balance multipliers normalized to green: [R, G, B]
    pub wb_coeffs: [f32; 3],
    /// Camera make and model as reported by the decoder
    pub camera: String,
}

impl RawImageData {
    /// Builds image data from bare samples, with neutral metadata.
    pub fn from_samples(width: usize, height: usize, data: Vec<u16>, bits_per_sample: u32) -> Self {
        let white_level = if bits_per_sample >= 16 {
            u16::MAX
        } else {
            ((1u32 << bits_per_sample) - 1) as u16
        };
        Self {
            width,
            height,
            data,
            bits_per_sample,
            black_level: 0,
            white_level,
            active_area: ActiveArea::full(width as u32, height as u32),
            wb_coeffs: [1.0, 1.0, 1.0],
            camera: String::new(),
        }
    }
}
