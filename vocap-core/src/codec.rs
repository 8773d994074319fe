//! Fixed-width signed PCM sample codec.
//!
//! Device buffers carry little-endian signed integers of 1–4 bytes. The
//! capture pipeline works on canonical `i32` samples, so every frame read
//! from a stream goes through [`Codec::decode`] and every sample written to
//! an artifact goes back through [`Codec::encode`].
//!
//! Sign extension for sub-word widths masks the value to `8·N` bits, tests
//! the sign bit, ORs in the high-order one-bits when set, and widens through
//! a 64-bit intermediate before truncating back to 32 bits.

use crate::error::{Result, VocapError};

/// Encoder/decoder for one sample width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    sample_size: usize,
}

impl Codec {
    /// Create a codec for `sample_size` bytes per sample.
    ///
    /// # Errors
    /// `VocapError::UnsupportedSampleSize` for widths outside {1, 2, 3, 4} —
    /// a configuration defect, fatal to the stream that requested it.
    pub fn new(sample_size: usize) -> Result<Self> {
        match sample_size {
            1..=4 => Ok(Self { sample_size }),
            _ => Err(VocapError::UnsupportedSampleSize(sample_size)),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn bits(&self) -> u32 {
        self.sample_size as u32 * 8
    }

    /// Smallest representable sample at this width.
    pub fn min_value(&self) -> i32 {
        if self.sample_size == 4 {
            i32::MIN
        } else {
            -(1i32 << (self.bits() - 1))
        }
    }

    /// Largest representable sample at this width.
    pub fn max_value(&self) -> i32 {
        if self.sample_size == 4 {
            i32::MAX
        } else {
            (1i32 << (self.bits() - 1)) - 1
        }
    }

    /// Decode one little-endian sample into a sign-extended `i32`.
    ///
    /// `bytes` must hold exactly `sample_size` bytes.
    pub fn decode(&self, bytes: &[u8]) -> i32 {
        debug_assert_eq!(bytes.len(), self.sample_size);

        let mut value: u32 = 0;
        for (i, b) in bytes.iter().enumerate() {
            value |= (*b as u32) << (8 * i);
        }

        if self.sample_size < 4 {
            let mask = (1u32 << self.bits()) - 1;
            value &= mask;
            if value >> (self.bits() - 1) == 1 {
                value |= !mask;
            }
        }

        // Widen through 64 bits before truncating back down.
        let wide = value as i32 as i64;
        wide as i32
    }

    /// Encode a sample as its `sample_size` low-order bytes, little-endian.
    ///
    /// `out` must hold exactly `sample_size` bytes. Values outside the
    /// width's range wrap; callers clamp beforehand where that matters.
    pub fn encode(&self, value: i32, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.sample_size);
        let raw = value as u32;
        for (i, b) in out.iter_mut().enumerate() {
            *b = (raw >> (8 * i)) as u8;
        }
    }
}

/// Convert a sample between two bit widths by shifting.
///
/// Used by the device bridge when the hardware's native format differs from
/// the configured capture width (e.g. a 16-bit device feeding a 24-bit
/// profile).
pub fn rescale(value: i32, from_bits: u32, to_bits: u32) -> i32 {
    if to_bits >= from_bits {
        value << (to_bits - from_bits)
    } else {
        value >> (from_bits - to_bits)
    }
}
