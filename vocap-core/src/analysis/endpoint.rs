//! Speech endpoint detection.
//!
//! Two windowed-RMS scans over the (normalized) capture locate the first and
//! last windows louder than the silence threshold, then back off by the
//! configured margins to pick the cut points:
//!
//! ```text
//! [ 0 .. top_file .. top_speech .. end_speech .. end_file .. frames ]
//! ```
//!
//! An out-of-range cut point is not an error — it means the take had too
//! little leading/trailing silence (or no speech at all) and is reported as
//! an invalid result.

use super::window_rms;

/// Inputs to one detection pass, all in frames at the capture rate.
#[derive(Debug, Clone, Copy)]
pub struct EndpointParams {
    pub channels: usize,
    pub sample_rate: u32,
    /// Analysis window length `L`.
    pub frame_length: usize,
    /// Analysis window shift `S`.
    pub frame_shift: usize,
    /// Silence margin kept ahead of the first speech window.
    pub top_margin: usize,
    /// Silence margin kept after the last speech window.
    pub end_margin: usize,
    /// RMS threshold separating silence from speech.
    pub silence_rms: f64,
    /// Skip the scans and fix the boundaries from the margins alone.
    pub bypass: bool,
}

/// Cut points chosen by one detection pass.
///
/// Indices are signed: `top_file` goes negative when the take starts with
/// less silence than the top margin, `end_file` overruns `frames` when the
/// tail is too short. `top_silence`/`end_silence` are the cut-point times in
/// seconds (the amount trimmed off each side); both equal the configured
/// margin in bypass mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointResult {
    pub top_file: i64,
    pub top_speech: i64,
    pub end_speech: i64,
    pub end_file: i64,
    /// Frame count of the scanned capture.
    pub frames: usize,
    pub top_silence: f64,
    pub end_silence: f64,
}

impl EndpointResult {
    /// Whether the cut points describe a usable speech region.
    pub fn is_valid(&self) -> bool {
        self.top_file >= 0 && self.end_file < self.frames as i64 && self.top_file < self.end_file
    }

    /// Frames in the trimmed output, `[top_file, end_file)`.
    pub fn cut_frames(&self) -> usize {
        if self.is_valid() {
            (self.end_file - self.top_file) as usize
        } else {
            0
        }
    }
}

/// Scan `samples` (interleaved, `frames` frames) for speech boundaries.
pub fn detect(samples: &[i32], frames: usize, p: &EndpointParams) -> EndpointResult {
    let rate = p.sample_rate as f64;
    let len = p.frame_length;
    let shift = p.frame_shift;

    let (top_speech, top_file) = if p.bypass {
        (p.top_margin as i64, p.top_margin as i64)
    } else {
        let mut f = 0usize;
        while f + len < frames {
            if window_rms(samples, f, len, p.channels) > p.silence_rms {
                break;
            }
            f += shift;
        }
        (f as i64, f as i64 - p.top_margin as i64)
    };

    let (end_speech, end_file) = if p.bypass {
        let e = frames as i64 - p.end_margin as i64;
        (e, e)
    } else {
        let mut f = frames as i64 - 1;
        while f - len as i64 >= 0 {
            // Window (f - len, f]: the `len` frames ending at f inclusive.
            let start = (f - len as i64 + 1) as usize;
            if window_rms(samples, start, len, p.channels) > p.silence_rms {
                break;
            }
            f -= shift as i64;
        }
        (f, f + p.end_margin as i64)
    };

    EndpointResult {
        top_file,
        top_speech,
        end_speech,
        end_file,
        frames,
        top_silence: top_file as f64 / rate,
        end_silence: (frames as i64 - end_file) as f64 / rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // 48 kHz mono, 25 ms windows, 5 ms shift, 400/600 ms margins — the
    // default capture configuration.
    fn params(silence_rms: f64, bypass: bool) -> EndpointParams {
        EndpointParams {
            channels: 1,
            sample_rate: 48_000,
            frame_length: 1200,
            frame_shift: 240,
            top_margin: 19_200,
            end_margin: 28_800,
            silence_rms,
            bypass,
        }
    }

    fn buffer_with_burst(frames: usize, burst: std::ops::Range<usize>, amp: i32) -> Vec<i32> {
        let mut samples = vec![0i32; frames];
        for s in &mut samples[burst] {
            *s = amp;
        }
        samples
    }

    #[test]
    fn bypass_fixes_boundaries_from_margins() {
        let samples = buffer_with_burst(96_000, 10..90_000, 1_000_000);
        let res = detect(&samples, 96_000, &params(125_829.12, true));
        assert_eq!(res.top_file, 19_200);
        assert_eq!(res.top_speech, 19_200);
        assert_eq!(res.end_file, 96_000 - 28_800);
        assert_eq!(res.end_speech, 96_000 - 28_800);
        assert!(res.is_valid());
        assert_relative_eq!(res.top_silence, 0.4);
        assert_relative_eq!(res.end_silence, 0.6);
    }

    #[test]
    fn all_silent_buffer_is_invalid() {
        let samples = vec![0i32; 96_000];
        let res = detect(&samples, 96_000, &params(125_829.12, false));
        assert!(!res.is_valid());
        // The forward scan ran off the far end, the backward scan off the
        // near end, so the cut points crossed.
        assert!(res.top_file >= res.end_file);
    }

    #[test]
    fn single_loud_window_flanked_by_margins_is_found() {
        // 2 s take, 41.7 ms burst centred with ample silence either side.
        let samples = buffer_with_burst(96_000, 40_000..42_000, 1_258_291);
        let res = detect(&samples, 96_000, &params(125_829.12, false));

        assert!(res.is_valid());
        assert!(res.top_file >= 0);
        assert_eq!(res.top_speech, 38_880);
        assert_eq!(res.top_file, 38_880 - 19_200);
        assert_eq!(res.end_speech, 42_959);
        assert_eq!(res.end_file, 42_959 + 28_800);
    }

    #[test]
    fn half_second_lead_silence_cuts_near_100ms() {
        // Silence 0.5 s, tone 1 s, silence 0.5 s: speech onset detects at
        // ~0.48 s (one window early), so the cut lands at ~0.08–0.10 s.
        let samples = buffer_with_burst(96_000, 24_000..72_000, 1_258_291);
        let res = detect(&samples, 96_000, &params(125_829.12, false));

        assert_eq!(res.top_speech, 23_040);
        assert_eq!(res.top_file, 3_840);
        assert!((res.top_silence - 0.1).abs() < 0.05, "{}", res.top_silence);

        // The 0.5 s tail is shorter than the 600 ms end margin, so the end
        // cut overruns the take and the result is unusable.
        assert_eq!(res.end_speech, 72_959);
        assert_eq!(res.end_file, 72_959 + 28_800);
        assert!(res.end_file >= res.frames as i64);
        assert!(!res.is_valid());
    }

    #[test]
    fn ample_tail_silence_yields_a_valid_cut() {
        // Same take with a 0.7 s tail: both margins fit.
        let samples = buffer_with_burst(105_600, 24_000..72_000, 1_258_291);
        let res = detect(&samples, 105_600, &params(125_829.12, false));

        assert!(res.is_valid());
        assert_eq!(res.top_file, 3_840);
        assert_eq!(res.end_file, 101_759);
        assert_eq!(res.cut_frames(), 97_919);
        assert_relative_eq!(res.end_silence, 3_841.0 / 48_000.0);
    }

    #[test]
    fn zero_threshold_behaves_like_bypass_when_flagged() {
        // Callers translate silence_level == 0 into bypass; the detector
        // itself only honours the flag.
        let samples = vec![0i32; 96_000];
        let res = detect(&samples, 96_000, &params(0.0, true));
        assert_eq!(res.top_file, 19_200);
        assert_eq!(res.end_file, 67_200);
        assert!(res.is_valid());
    }

    #[test]
    fn stereo_detection_matches_mono_layout() {
        // Same burst duplicated on both channels; indices are frames, so the
        // result matches the mono case.
        let frames = 105_600usize;
        let mut samples = vec![0i32; frames * 2];
        for f in 24_000..72_000 {
            samples[f * 2] = 1_258_291;
            samples[f * 2 + 1] = 1_258_291;
        }
        let mut p = params(125_829.12, false);
        p.channels = 2;
        let res = detect(&samples, frames, &p);
        assert!(res.is_valid());
        assert_eq!(res.top_file, 3_840);
        assert_eq!(res.end_file, 101_759);
    }
}
