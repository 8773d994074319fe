//! Amplitude normalization.
//!
//! One scalar gain for the whole take, derived from the loudest analysis
//! window anywhere in the raw capture and a target fraction of full scale.
//! Scaled samples are truncated toward zero when cast back to integers;
//! byte-for-byte parity with the recorder's output depends on that.

use super::max_window_rms;

/// Gain that brings the loudest window to `full_scale * ratio`.
///
/// Unity when bypass is active (the take is a reference environment
/// recording) or when the capture is pure silence.
pub fn compute_scale(max_rms: f64, full_scale: f64, ratio: f64, bypass: bool) -> f64 {
    if bypass || max_rms == 0.0 {
        1.0
    } else {
        full_scale * ratio / max_rms
    }
}

/// Apply `scale` to every sample, truncating toward zero.
pub fn apply_gain(samples: &[i32], scale: f64) -> Vec<i32> {
    samples.iter().map(|s| (scale * *s as f64) as i32).collect()
}

/// Convenience: maximum windowed RMS of a raw interleaved capture.
pub fn max_rms(samples: &[i32], frames: usize, channels: usize, len: usize, shift: usize) -> f64 {
    max_window_rms(samples, frames, channels, len, shift)
}
