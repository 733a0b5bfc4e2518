//! Typed view over a caller-owned frame buffer.

use crate::image_pipeline::common::error::{RawProcError, Result};

/// Mutable view of one frame's raw samples, checked once against its geometry.
///
/// The view never reallocates: every correction pass writes through it into the
/// caller's buffer. The buffer may be longer than `width * height`; [`samples`](Self::samples)
/// covers the image, [`buffer`](Self::buffer) the whole buffer.
pub struct RawFrame<'a> {
    samples: &'a mut [u16],
    width: usize,
    height: usize,
}

impl<'a> RawFrame<'a> {
    pub fn new(samples: &'a mut [u16], width: usize, height: usize) -> Result<Self> {
        let expected = width * height;
        if width == 0 || height == 0 {
            return Err(RawProcError::InvalidDimensions(width, height));
        }
        if samples.len() < expected {
            return Err(RawProcError::FrameSizeMismatch { expected, actual: samples.len() });
        }
        Ok(Self { samples, width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Image samples, `width * height` of them.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the whole caller buffer in bytes, two per sample.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(&*self.samples)
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples[..self.width * self.height]
    }

    pub fn samples_mut(&mut self) -> &mut [u16] {
        let len = self.len();
        &mut self.samples[..len]
    }

    /// The caller's buffer including any samples past the image.
    pub fn buffer(&self) -> &[u16] {
        &*self.samples
    }

    pub fn buffer_mut(&mut self) -> &mut [u16] {
        &mut *self.samples
    }

    /// Image samples read as signed values; bit patterns are preserved.
    pub fn as_signed_mut(&mut self) -> &mut [i16] {
        bytemuck::cast_slice_mut(self.samples_mut())
    }

    pub fn row(&self, y: usize) -> &[u16] {
        &self.samples[y * self.width..(y + 1) * self.width]
    }

    pub fn get(&self, x: isize, y: isize) -> Option<u16> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.samples[y as usize * self.width + x as usize])
    }

    pub fn set(&mut self, x: usize, y: usize, value: u16) {
        self.samples[y * self.width + x] = value;
    }
}

/// Left shift that places processed samples of `bits_per_pixel` depth in the 16-bit range.
pub fn expand_to_16bit(samples: &mut [u16], shift: u32) {
    if shift == 0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample = sample.checked_shl(shift).unwrap_or(0);
    }
}
