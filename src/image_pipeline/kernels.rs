//! CPU implementations of the correction kernels
//!
//! This module provides [`BuiltinKernels`], the kernel set the correction pipeline uses
//! unless another one is injected.

mod builtin;
mod chroma;
mod dual_iso;
mod pattern_noise;
mod pixel_fix;
mod stripes;

pub use builtin::BuiltinKernels;
pub use pixel_fix::{focus_map_file_name, load_focus_map};

/// Median of `values`, reordering them. The upper middle element for even lengths.
pub(crate) fn median_i32(values: &mut [i32]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable(mid);
    Some(*median)
}
