//! Dual ISO detection and reconstruction.
//!
//! Dual ISO frames expose alternating pairs of rows at two different gains. Rows are
//! grouped by `y % 4`; the two adjacent groups with the higher median are the bright
//! exposure. The gain between the exposures comes from the ratio of the group medians.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::image_pipeline::correction::clip::RawInfo;
use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::histogram::Histogram;
use crate::image_pipeline::correction::kernels::{DualIsoOptions, Levels};
use crate::image_pipeline::correction::modes::{ChromaSmooth, DualIsoInterpolation};
use crate::image_pipeline::kernels::chroma::{LogScale, chroma_smooth};
use crate::image_pipeline::kernels::median_i32;

const ROW_GROUPS: usize = 4;

/// Smallest exposure difference, in stops, that counts as dual ISO.
const MIN_GAIN_STOPS: f64 = 1.0;

/// Extra bits of range produced by the full merge.
const FULL_MERGE_SCALE: i32 = 4;

/// Bright samples within this fraction of the range below white count as clipped.
const CLIP_MARGIN_DIVISOR: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RowExposures {
    bright: [bool; ROW_GROUPS],
    gain: f64,
}

impl RowExposures {
    fn is_bright(&self, y: usize) -> bool {
        self.bright[y % ROW_GROUPS]
    }
}

/// Splits the row groups into the two exposures. `None` unless the frame holds two
/// exposures at least [`MIN_GAIN_STOPS`] apart.
pub(crate) fn row_exposures(frame: &RawFrame<'_>, levels: Levels) -> Option<RowExposures> {
    let (width, height) = (frame.width(), frame.height());
    if height < ROW_GROUPS * 2 {
        return None;
    }

    let max = levels.white.clamp(0, u16::MAX as i32) as u16;
    let mut medians = [0i32; ROW_GROUPS];
    for (group, median) in medians.iter_mut().enumerate() {
        let mut histogram = Histogram::new(max);
        for y in (group..height).step_by(ROW_GROUPS) {
            histogram.add(frame.samples(), y * width, width, 1);
        }
        *median = histogram.median()? as i32 - levels.black;
    }

    let mut order = [0usize, 1, 2, 3];
    order.sort_by_key(|&group| std::cmp::Reverse(medians[group]));
    let (first, second) = (order[0], order[1]);
    if (first + 1) % ROW_GROUPS != second && (second + 1) % ROW_GROUPS != first {
        return None;
    }

    let bright = (medians[first] + medians[second]) as f64 / 2.0;
    let dark = (medians[order[2]] + medians[order[3]]) as f64 / 2.0;
    if dark <= 0.0 {
        return None;
    }
    let gain = bright / dark;
    trace!(?medians, gain, "Row group medians");
    if gain.log2() < MIN_GAIN_STOPS {
        return None;
    }

    let mut bright_rows = [false; ROW_GROUPS];
    bright_rows[first] = true;
    bright_rows[second] = true;
    Some(RowExposures { bright: bright_rows, gain })
}

pub(crate) fn detect(frame: &RawFrame<'_>, levels: Levels) -> bool {
    row_exposures(frame, levels).is_some()
}

/// Brings the dark rows up to the bright exposure by the measured gain.
pub(crate) fn preview(frame: &mut RawFrame<'_>, levels: Levels) {
    let Some(exposures) = row_exposures(frame, levels) else {
        debug!("No dual ISO row pattern found, preview skipped");
        return;
    };
    let width = frame.width();
    let white = levels.white.min(u16::MAX as i32) as f64;
    frame
        .samples_mut()
        .par_chunks_mut(width)
        .enumerate()
        .filter(|(y, _)| !exposures.is_bright(*y))
        .for_each(|(_, row)| {
            for sample in row.iter_mut() {
                let above_black = (*sample as i32 - levels.black) as f64;
                let value = levels.black as f64 + above_black * exposures.gain;
                *sample = value.round().clamp(0.0, white) as u16;
            }
        });
}

/// Unclipped same-colour samples of the other exposure, two rows up and down.
struct Neighbourhood<'a> {
    merged: &'a [i32],
    source: &'a [u16],
    width: usize,
    height: usize,
    clip_level: i32,
}

impl Neighbourhood<'_> {
    fn collect(&self, x: usize, y: usize, averaging: DualIsoInterpolation, out: &mut Vec<i32>) {
        out.clear();
        let columns: &[isize] = match averaging {
            DualIsoInterpolation::Amaze => &[-2, 0, 2],
            DualIsoInterpolation::Mean23 => &[0],
        };
        for ny in [y.checked_sub(2), (y + 2 < self.height).then_some(y + 2)].into_iter().flatten() {
            for &dx in columns {
                let Some(nx) = x.checked_add_signed(dx).filter(|&nx| nx < self.width) else {
                    continue;
                };
                let index = ny * self.width + nx;
                if (self.source[index] as i32) < self.clip_level {
                    out.push(self.merged[index]);
                }
            }
        }
    }
}

fn combine(values: &mut [i32], averaging: DualIsoInterpolation) -> Option<i32> {
    match averaging {
        DualIsoInterpolation::Amaze => median_i32(values),
        DualIsoInterpolation::Mean23 => {
            if values.is_empty() {
                return None;
            }
            Some(values.iter().sum::<i32>() / values.len() as i32)
        }
    }
}

/// Merges both exposures into one frame with two extra bits of range.
///
/// Both exposures are scaled onto the dark exposure, widened by two bits, so the
/// highlights the dark rows still hold fit in the output. With full resolution blending,
/// clipped bright samples are rebuilt from the dark rows around them. With the alias map,
/// dark samples that disagree with the bright rows around them by more than a stop are
/// treated as aliasing and replaced from the bright rows.
pub(crate) fn full20bit(raw_info: &RawInfo, frame: &mut RawFrame<'_>, options: DualIsoOptions) {
    let levels = Levels { black: raw_info.black_level, white: raw_info.white_level };
    let Some(exposures) = row_exposures(frame, levels) else {
        debug!("No dual ISO row pattern found, full merge skipped");
        return;
    };
    let (width, height) = (frame.width(), frame.height());
    let black = levels.black * FULL_MERGE_SCALE;
    let white = (levels.white * FULL_MERGE_SCALE).min(u16::MAX as i32);
    let clip_level = levels.white - (levels.white - levels.black) / CLIP_MARGIN_DIVISOR;

    let source = frame.samples();
    let merged: Vec<i32> = source
        .par_iter()
        .enumerate()
        .map(|(i, &sample)| {
            let above_black = (sample as i32 - levels.black) as f64 * FULL_MERGE_SCALE as f64;
            let scale = if exposures.is_bright(i / width) { 1.0 / exposures.gain } else { 1.0 };
            black + (above_black * scale).round() as i32
        })
        .collect();

    let neighbourhood = Neighbourhood { merged: &merged, source, width, height, clip_level };
    let blended: Vec<i32> = merged
        .par_chunks(width)
        .enumerate()
        .flat_map_iter(|(y, row)| {
            let bright_row = exposures.is_bright(y);
            let mut neighbours = Vec::with_capacity(6);
            let neighbourhood = &neighbourhood;
            row.iter().enumerate().map(move |(x, &value)| {
                let clipped = source[y * width + x] as i32 >= clip_level;
                if bright_row {
                    if !options.full_res_blending || !clipped {
                        return value;
                    }
                    neighbourhood.collect(x, y, options.averaging, &mut neighbours);
                    return combine(&mut neighbours, options.averaging).map_or(value, |v| v.max(value));
                }
                if !options.alias_map || clipped {
                    return value;
                }
                neighbourhood.collect(x, y, options.averaging, &mut neighbours);
                match combine(&mut neighbours, options.averaging) {
                    Some(reference) if reference > black => {
                        let ratio = (value - black).max(1) as f64 / (reference - black) as f64;
                        if ratio.log2().abs() > 1.0 { reference } else { value }
                    }
                    _ => value,
                }
            })
        })
        .collect();

    for (sample, value) in frame.samples_mut().iter_mut().zip(blended) {
        *sample = value.clamp(0, white) as u16;
    }
    debug!(gain = exposures.gain, "Dual ISO frames merged");

    if options.chroma_smooth != ChromaSmooth::Off {
        chroma_smooth(options.chroma_smooth, frame, Levels { black, white }, &LogScale { black_level: black });
    }
}
