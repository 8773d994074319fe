//! Acoustic statistics for a finished take.
//!
//! Both figures are computed from the RAW capture: the peak ratio reports
//! how hot the microphone signal actually ran, and the power reflects the
//! true captured energy rather than the post-normalization scale.

/// Peak absolute amplitude as a percentage of full scale.
pub fn peak_amplitude_ratio(samples: &[i32], full_scale: f64) -> f64 {
    let max = samples
        .iter()
        .map(|s| (*s as i64).abs())
        .max()
        .unwrap_or(0);
    100.0 * max as f64 / full_scale
}

/// Average signal power in dB over the speech region
/// `[top_speech, end_speech)`, in frames.
///
/// Only meaningful for a confirmed speech region; an empty region yields
/// negative infinity.
pub fn region_power_db(
    samples: &[i32],
    channels: usize,
    top_speech: usize,
    end_speech: usize,
) -> f64 {
    if end_speech <= top_speech {
        return f64::NEG_INFINITY;
    }
    let region_frames = end_speech - top_speech;
    let lo = top_speech * channels;
    let hi = end_speech * channels;
    let sqr: f64 = samples[lo..hi].iter().map(|s| *s as f64 * *s as f64).sum();
    10.0 * (sqr / region_frames as f64 / channels as f64).log10()
}
