//! Frequency histogram of raw code values.

/// Histogram over `0..=max_value`; larger samples are counted in the top bin.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Vec<u32>,
    count: u64,
}

impl Histogram {
    pub fn new(max_value: u16) -> Self {
        Self { bins: vec![0; max_value as usize + 1], count: 0 }
    }

    /// Adds `count` samples starting at `offset`, taking one sample every `stride` elements.
    pub fn add(&mut self, samples: &[u16], offset: usize, count: usize, stride: usize) {
        let top = self.bins.len() - 1;
        for &value in samples.iter().skip(offset).step_by(stride.max(1)).take(count) {
            self.bins[(value as usize).min(top)] += 1;
            self.count += 1;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Lowest code value at which the cumulative count reaches half of all samples.
    pub fn median(&self) -> Option<u16> {
        if self.count == 0 {
            return None;
        }
        let half = self.count.div_ceil(2);
        let mut cumulative = 0u64;
        for (value, &bin) in self.bins.iter().enumerate() {
            cumulative += bin as u64;
            if cumulative >= half {
                return Some(value as u16);
            }
        }
        Some((self.bins.len() - 1) as u16)
    }
}
