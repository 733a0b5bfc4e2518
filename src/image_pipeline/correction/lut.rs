//! Lookup tables between raw code values and a logarithmic exposure domain.
//!
//! `raw2ev` maps every 16-bit code to `log2(raw - black)` in fixed point with
//! [`EV_RESOLUTION`] steps per stop. `ev2raw` is its inverse over -10..+14 EV.

use rayon::prelude::*;
use tracing::debug;

/// Fixed point steps per stop.
pub const EV_RESOLUTION: i32 = 65536;

const EV_MIN_STOPS: i32 = -10;
const EV_MAX_STOPS: i32 = 14;

#[derive(Clone)]
pub struct ExposureLuts {
    black_level: i32,
    raw2ev: Vec<i32>,
    ev2raw: Vec<i32>,
}

impl ExposureLuts {
    pub fn new(black_level: i32) -> Self {
        let raw2ev: Vec<i32> = (0..=u16::MAX as i32)
            .map(|raw| {
                let above_black = (raw - black_level).max(1) as f64;
                (above_black.log2() * EV_RESOLUTION as f64) as i32
            })
            .collect();

        let ev2raw_len = ((EV_MAX_STOPS - EV_MIN_STOPS) * EV_RESOLUTION) as usize;
        let ev2raw: Vec<i32> = (0..ev2raw_len)
            .into_par_iter()
            .map(|index| {
                let ev = index as i32 + EV_MIN_STOPS * EV_RESOLUTION;
                let raw = black_level as f64 + (ev as f64 / EV_RESOLUTION as f64).exp2();
                raw.clamp(black_level as f64, u16::MAX as f64) as i32
            })
            .collect();

        debug!(black_level, ev2raw_len, "Built exposure lookup tables");

        Self { black_level, raw2ev, ev2raw }
    }

    pub fn black_level(&self) -> i32 {
        self.black_level
    }

    pub fn raw2ev(&self, raw: u16) -> i32 {
        self.raw2ev[raw as usize]
    }

    /// Inverse lookup; exposures outside the table range saturate at its ends.
    pub fn ev2raw(&self, ev: i32) -> i32 {
        let index = (ev - EV_MIN_STOPS * EV_RESOLUTION).clamp(0, self.ev2raw.len() as i32 - 1);
        self.ev2raw[index as usize]
    }

    pub fn raw2ev_table(&self) -> &[i32] {
        &self.raw2ev
    }

    pub fn ev2raw_table(&self) -> &[i32] {
        &self.ev2raw
    }
}

impl std::fmt::Debug for ExposureLuts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureLuts")
            .field("black_level", &self.black_level)
            .field("raw2ev_len", &self.raw2ev.len())
            .field("ev2raw_len", &self.ev2raw.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_stop_per_doubling() {
        let luts = ExposureLuts::new(2048);
        assert_eq!(luts.raw2ev(2048 + 1024) - luts.raw2ev(2048 + 512), EV_RESOLUTION);
        assert_eq!(luts.raw2ev(100), 0);
    }

    #[test]
    fn test_inverse_lookup_recovers_raw_values() {
        let luts = ExposureLuts::new(2048);
        for raw in [2049u16, 2100, 4000, 10000, 15000] {
            let back = luts.ev2raw(luts.raw2ev(raw));
            assert!((back - raw as i32).abs() <= 1, "{} -> {}", raw, back);
        }
    }

    #[test]
    fn test_inverse_lookup_saturates() {
        let luts = ExposureLuts::new(0);
        assert_eq!(luts.ev2raw(i32::MIN / 2), 0);
        assert_eq!(luts.ev2raw(40 * EV_RESOLUTION), luts.ev2raw(14 * EV_RESOLUTION));
    }
}
