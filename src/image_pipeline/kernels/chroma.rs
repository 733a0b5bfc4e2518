//! Chroma smoothing of red and blue samples.
//!
//! Works on the log-domain difference between a red or blue sample and the green around
//! it. That difference is median filtered over a square window of same-colour samples,
//! then the sample is rebuilt from its own green and the filtered difference. Assumes a
//! Bayer layout with green on the (x + y) odd sites.

use rayon::prelude::*;

use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::kernels::Levels;
use crate::image_pipeline::correction::lut::{EV_RESOLUTION, ExposureLuts};
use crate::image_pipeline::correction::modes::ChromaSmooth;
use crate::image_pipeline::kernels::median_i32;

/// Conversion between raw codes and fixed point stops above black.
pub(crate) trait EvScale: Sync {
    fn to_ev(&self, raw: i32) -> i32;
    fn to_raw(&self, ev: i32) -> i32;
}

impl EvScale for ExposureLuts {
    fn to_ev(&self, raw: i32) -> i32 {
        self.raw2ev(raw.clamp(0, u16::MAX as i32) as u16)
    }

    fn to_raw(&self, ev: i32) -> i32 {
        self.ev2raw(ev)
    }
}

/// Computed scale for ranges no lookup table was built for, like the widened 20-bit one.
pub(crate) struct LogScale {
    pub black_level: i32,
}

impl EvScale for LogScale {
    fn to_ev(&self, raw: i32) -> i32 {
        let above_black = (raw - self.black_level).max(1) as f64;
        (above_black.log2() * EV_RESOLUTION as f64) as i32
    }

    fn to_raw(&self, ev: i32) -> i32 {
        let raw = self.black_level as f64 + (ev as f64 / EV_RESOLUTION as f64).exp2();
        raw.round().clamp(0.0, u16::MAX as f64) as i32
    }
}

fn window_offsets(radius: ChromaSmooth) -> &'static [isize] {
    match radius {
        ChromaSmooth::Off => &[],
        ChromaSmooth::TwoByTwo => &[0, 2],
        ChromaSmooth::ThreeByThree => &[-2, 0, 2],
        ChromaSmooth::FiveByFive => &[-4, -2, 0, 2, 4],
    }
}

/// Largest window offset plus the green ring around it.
const MARGIN: usize = 5;

pub(crate) fn chroma_smooth<S: EvScale + ?Sized>(radius: ChromaSmooth, frame: &mut RawFrame<'_>, levels: Levels, scale: &S) {
    let offsets = window_offsets(radius);
    let (width, height) = (frame.width(), frame.height());
    if offsets.is_empty() || width <= 2 * MARGIN || height <= 2 * MARGIN {
        return;
    }

    let source = frame.samples().to_vec();
    let white = levels.white.min(u16::MAX as i32);
    let green_ev = |x: usize, y: usize| {
        let sum = source[y * width + x - 1] as i32
            + source[y * width + x + 1] as i32
            + source[(y - 1) * width + x] as i32
            + source[(y + 1) * width + x] as i32;
        scale.to_ev(sum / 4)
    };

    frame
        .samples_mut()
        .par_chunks_mut(width)
        .enumerate()
        .skip(MARGIN)
        .take(height - 2 * MARGIN)
        .for_each(|(y, row)| {
            let mut chroma = Vec::with_capacity(offsets.len() * offsets.len());
            for x in MARGIN..width - MARGIN {
                if (x + y) % 2 == 1 || source[y * width + x] as i32 >= white {
                    continue;
                }
                chroma.clear();
                for &dy in offsets {
                    for &dx in offsets {
                        let nx = (x as isize + dx) as usize;
                        let ny = (y as isize + dy) as usize;
                        chroma.push(scale.to_ev(source[ny * width + nx] as i32) - green_ev(nx, ny));
                    }
                }
                let Some(median) = median_i32(&mut chroma) else {
                    continue;
                };
                row[x] = scale.to_raw(green_ev(x, y) + median).clamp(0, white) as u16;
            }
        });
}
