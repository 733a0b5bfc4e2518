//! Capture mode detection from camera identity and sensor sampling.
//!
//! The camera table is empirical: only the models listed here are known to have focus
//! pixels, and the crop-record rule was worked out on exactly these bodies. Models not
//! in the table always report [`FocusPixelMode::Off`].

use crate::image_pipeline::correction::clip::SensorSampling;
use crate::image_pipeline::correction::modes::FocusPixelMode;

/// Camera models with focus pixels on the sensor.
pub const FOCUS_DOT_CAMERAS: &[(u32, &str)] = &[
    (0x80000331, "EOS M"),
    (0x80000346, "EOS 100D"),
    (0x80000301, "EOS 650D"),
    (0x80000326, "EOS 700D"),
];

/// Frames shorter than this are only produced by crop-record capture.
const CROP_REC_MAX_HEIGHT: u32 = 900;

/// Sampling factors (horizontal, vertical) of the regular 1080p video mode.
const REGULAR_VIDEO_SAMPLING: (u32, u32) = (3, 5);

/// Focus dot fix mode for a clip: off, on, or crop-record layout.
pub fn detect_focus_dot_mode(
    camera_model: u32,
    sampling: Option<&SensorSampling>,
    frame_height: u32,
) -> FocusPixelMode {
    if !FOCUS_DOT_CAMERAS.iter().any(|&(model, _)| model == camera_model) {
        return FocusPixelMode::Off;
    }

    match sampling {
        Some(sampling)
            if frame_height < CROP_REC_MAX_HEIGHT
                && sampling.factors() != REGULAR_VIDEO_SAMPLING =>
        {
            FocusPixelMode::CropRec
        }
        _ => FocusPixelMode::On,
    }
}

pub fn camera_name(camera_model: u32) -> Option<&'static str> {
    FOCUS_DOT_CAMERAS
        .iter()
        .find(|&&(model, _)| model == camera_model)
        .map(|&(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampling(x: u16, y: u16) -> SensorSampling {
        SensorSampling { binning_x: x, skipping_x: 0, binning_y: 1, skipping_y: y - 1 }
    }

    #[test]
    fn test_crop_record_on_listed_camera() {
        let mode = detect_focus_dot_mode(0x80000331, Some(&sampling(2, 2)), 800);
        assert_eq!(mode, FocusPixelMode::CropRec);
        assert_eq!(mode.code(), 2);
    }

    #[test]
    fn test_regular_sampling_is_plain_on() {
        let mode = detect_focus_dot_mode(0x80000331, Some(&sampling(3, 5)), 800);
        assert_eq!(mode, FocusPixelMode::On);
        assert_eq!(mode.code(), 1);
    }

    #[test]
    fn test_tall_frames_and_missing_sampling_are_on() {
        assert_eq!(detect_focus_dot_mode(0x80000346, Some(&sampling(1, 1)), 1080), FocusPixelMode::On);
        assert_eq!(detect_focus_dot_mode(0x80000301, None, 600), FocusPixelMode::On);
    }

    #[test]
    fn test_unlisted_camera_is_off() {
        for height in [400, 1080] {
            for s in [None, Some(sampling(1, 1)), Some(sampling(3, 5))] {
                let mode = detect_focus_dot_mode(0xDEADBEEF, s.as_ref(), height);
                assert_eq!(mode.code(), 0);
            }
        }
    }

    #[test]
    fn test_camera_names() {
        assert_eq!(camera_name(0x80000326), Some("EOS 700D"));
        assert_eq!(camera_name(0x80000285), None);
    }
}
