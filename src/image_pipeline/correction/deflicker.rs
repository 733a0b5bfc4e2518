//! Per-frame exposure normalisation from the sample median.

use tracing::{debug, warn};

use crate::image_pipeline::correction::histogram::Histogram;

/// Fixed point denominator of the stored exposure correction.
pub const EXPOSURE_BIAS_SCALE: i32 = 10000;

/// Rational exposure correction in stops, applied by the render stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureBias {
    pub numerator: i32,
    pub denominator: i32,
}

impl ExposureBias {
    pub const ZERO: Self = Self { numerator: 0, denominator: 1 };

    pub fn from_stops(stops: f64) -> Self {
        Self {
            numerator: (stops * EXPOSURE_BIAS_SCALE as f64).round() as i32,
            denominator: EXPOSURE_BIAS_SCALE,
        }
    }

    pub fn stops(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Linear gain equivalent of the correction.
    pub fn gain(&self) -> f64 {
        self.stops().exp2()
    }
}

impl Default for ExposureBias {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Exposure correction that moves the median of the odd-indexed samples onto `target`.
///
/// Returns `None` when no finite correction exists: an empty frame, a median sitting on the
/// black level, or a median and target on opposite sides of it.
///
/// The histogram spans `0..=max_code`, the sensor code range.
pub fn deflicker(samples: &[u16], black_level: i32, max_code: i32, target: i32) -> Option<ExposureBias> {
    let mut histogram = Histogram::new(max_code.clamp(0, u16::MAX as i32) as u16);
    histogram.add(samples, 1, samples.len() / 2, 2);
    let median = histogram.median()? as i32;

    if median == black_level {
        warn!(median, black_level, "Deflicker skipped, median sits on the black level");
        return None;
    }

    let correction = ((target - black_level) as f64 / (median - black_level) as f64).log2();
    if !correction.is_finite() {
        warn!(median, black_level, target, "Deflicker skipped, no finite correction");
        return None;
    }

    let bias = ExposureBias::from_stops(correction);
    debug!(median, target, stops = correction, "Deflicker correction");
    Some(bias)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_odd_median(len: usize, median: u16) -> Vec<u16> {
        (0..len)
            .map(|i| if i % 2 == 1 { median } else { 4000 })
            .collect()
    }

    #[test]
    fn test_double_target_is_one_stop() {
        let samples = frame_with_odd_median(64, 500);
        let bias = deflicker(&samples, 0, 16383, 1000).unwrap();
        assert_eq!(bias, ExposureBias { numerator: 10000, denominator: 10000 });
        assert!((bias.gain() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_target_is_minus_one_stop() {
        let samples = frame_with_odd_median(64, 2048 + 1000);
        let bias = deflicker(&samples, 2048, 16383, 2048 + 500).unwrap();
        assert_eq!(bias.numerator, -10000);
    }

    #[test]
    fn test_median_on_black_level_gives_no_correction() {
        let samples = vec![2048u16; 64];
        assert_eq!(deflicker(&samples, 2048, 16383, 3000), None);
    }

    #[test]
    fn test_median_below_black_gives_no_correction() {
        let samples = vec![1000u16; 64];
        assert_eq!(deflicker(&samples, 2048, 16383, 3000), None);
    }

    #[test]
    fn test_empty_frame_gives_no_correction() {
        assert_eq!(deflicker(&[], 0, 16383, 3000), None);
        assert_eq!(deflicker(&[7], 0, 16383, 3000), None);
    }
}
