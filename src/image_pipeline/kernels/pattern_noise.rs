//! Horizontal pattern noise removal.
//!
//! Each row gets one offset: the median difference between the row and the per-column
//! median of the nearby same-colour rows. Scene content mostly cancels out of that
//! difference while a row-wide readout offset does not.

use rayon::prelude::*;
use tracing::trace;

use crate::image_pipeline::kernels::median_i32;

/// Same-colour rows a row is compared against.
const REFERENCE_ROWS: [isize; 6] = [-6, -4, -2, 2, 4, 6];

pub(crate) fn fix_pattern_noise(samples: &mut [i16], width: usize, height: usize, white_level: i32, debug: bool) {
    if width == 0 || height < 3 || samples.len() < width * height {
        return;
    }

    let offsets: Vec<i32> = {
        let source: &[i16] = samples;
        (0..height)
            .into_par_iter()
            .map(|y| row_offset(source, width, height, y))
            .collect()
    };

    let max = white_level.clamp(0, i16::MAX as i32);
    samples
        .par_chunks_mut(width)
        .take(height)
        .zip(offsets.par_iter())
        .enumerate()
        .for_each(|(y, (row, &offset))| {
            if offset == 0 {
                return;
            }
            if debug {
                trace!(y, offset, "row offset");
            }
            for sample in row.iter_mut() {
                *sample = (*sample as i32 - offset).clamp(0, max) as i16;
            }
        });
}

fn row_offset(samples: &[i16], width: usize, height: usize, y: usize) -> i32 {
    let references: Vec<usize> = REFERENCE_ROWS
        .iter()
        .filter_map(|&dy| y.checked_add_signed(dy))
        .filter(|&r| r < height)
        .collect();
    if references.is_empty() {
        return 0;
    }

    let mut column = Vec::with_capacity(references.len());
    let mut diffs: Vec<i32> = (0..width)
        .map(|x| {
            column.clear();
            column.extend(references.iter().map(|&r| samples[r * width + x] as i32));
            let reference = median_i32(&mut column).unwrap_or(0);
            samples[y * width + x] as i32 - reference
        })
        .collect();
    median_i32(&mut diffs).unwrap_or(0)
}
