//! Vertical stripe correction.
//!
//! The sensor reads columns through eight amplifiers, so banding repeats every eight
//! columns. Each column class gets a gain that brings its mean level onto the median of
//! the classes of the same colour.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::image_pipeline::correction::frame::RawFrame;
use crate::image_pipeline::correction::kernels::{Levels, STRIPE_FIXP_ONE, StripeCorrection, StripeParams};
use crate::image_pipeline::correction::modes::VerticalStripeMode;

const COLUMN_CLASSES: usize = 8;

/// Coefficients closer than this to one are not worth applying.
const MIN_COEFF_DELTA: i32 = 8;

pub(crate) fn fix_vertical_stripes(
    cache: &mut StripeCorrection,
    compute: &mut bool,
    frame: &mut RawFrame<'_>,
    params: &StripeParams,
) {
    if *compute {
        *cache = compute_correction(frame, params.levels);
        *compute = false;
        debug!(
            coeffs = ?cache.coeffs,
            needed = cache.correction_needed,
            frame_size = params.frame_size,
            "Stripe coefficients computed"
        );
    }
    if cache.correction_needed || params.mode == VerticalStripeMode::Force {
        apply_correction(cache, frame, params.levels);
    }
}

fn compute_correction(frame: &RawFrame<'_>, levels: Levels) -> StripeCorrection {
    let width = frame.width();
    if width < COLUMN_CLASSES * 2 || levels.white <= levels.black {
        return StripeCorrection::default();
    }

    let (sums, counts) = frame
        .buffer()
        .par_chunks(width)
        .map(|row| {
            let mut sums = [0f64; COLUMN_CLASSES];
            let mut counts = [0u64; COLUMN_CLASSES];
            for (x, &sample) in row.iter().enumerate() {
                let sample = sample as i32;
                if sample > levels.black && sample < levels.white {
                    sums[x % COLUMN_CLASSES] += (sample - levels.black) as f64;
                    counts[x % COLUMN_CLASSES] += 1;
                }
            }
            (sums, counts)
        })
        .reduce(
            || ([0f64; COLUMN_CLASSES], [0u64; COLUMN_CLASSES]),
            |(mut sums, mut counts), (row_sums, row_counts)| {
                for class in 0..COLUMN_CLASSES {
                    sums[class] += row_sums[class];
                    counts[class] += row_counts[class];
                }
                (sums, counts)
            },
        );

    let means: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
        .collect();

    let mut correction = StripeCorrection::default();
    for parity in 0..2 {
        let mut same_colour: Vec<f64> = means.iter().skip(parity).step_by(2).flatten().copied().collect();
        if same_colour.len() < 2 {
            continue;
        }
        same_colour.sort_by(f64::total_cmp);
        let mid = same_colour.len() / 2;
        let reference = (same_colour[mid - 1] + same_colour[mid]) / 2.0;
        for class in (parity..COLUMN_CLASSES).step_by(2) {
            if let Some(mean) = means[class] {
                correction.coeffs[class] = (reference / mean * STRIPE_FIXP_ONE as f64).round() as i32;
            }
        }
    }
    trace!(?means, "Column class means");

    correction.correction_needed = correction
        .coeffs
        .iter()
        .any(|&coeff| (coeff - STRIPE_FIXP_ONE).abs() >= MIN_COEFF_DELTA);
    correction
}

fn apply_correction(correction: &StripeCorrection, frame: &mut RawFrame<'_>, levels: Levels) {
    let width = frame.width();
    let white = levels.white.min(u16::MAX as i32) as i64;
    let black = levels.black as i64;
    let one = STRIPE_FIXP_ONE as i64;
    frame.buffer_mut().par_chunks_mut(width).for_each(|row| {
        for (x, sample) in row.iter_mut().enumerate() {
            let value = *sample as i64;
            let coeff = correction.coeffs[x % COLUMN_CLASSES] as i64;
            if value <= black || value >= white || coeff == one {
                continue;
            }
            let corrected = black + ((value - black) * coeff + one / 2) / one;
            *sample = corrected.clamp(0, white) as u16;
        }
    });
}
