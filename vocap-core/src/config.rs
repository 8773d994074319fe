//! Recorder configuration.
//!
//! All tunables are plain public fields, immutable for the duration of a
//! session. `Default` carries the values the recorder ships with:
//! 48 kHz / 24-bit / mono capture, a 20 kHz / 16-bit auxiliary profile for
//! sample prompts, 25 ms analysis windows at a 5 ms shift, a 20 s recording
//! cap, and 400/600 ms silence margins.

use serde::{Deserialize, Serialize};

/// Shape of one audio stream: rate, sample width, and channel count.
///
/// Capture, beep playback, and sample-prompt playback each carry their own
/// profile so prompt material recorded at a different rate or width can be
/// played back without touching the capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamProfile {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bytes per sample, in {1, 2, 3, 4}.
    pub sample_size: usize,
    /// Interleaved channel count.
    pub channels: u16,
}

impl StreamProfile {
    pub fn new(sample_rate: u32, sample_size: usize, channels: u16) -> Self {
        Self {
            sample_rate,
            sample_size,
            channels,
        }
    }

    /// Bytes occupied by one interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_size
    }

    /// Maximum magnitude of a signed sample at this width:
    /// half the representable range, `2^(8·size) / 2`.
    pub fn full_scale(&self) -> f64 {
        (2f64).powi(self.sample_size as i32 * 8) * 0.5
    }
}

/// Configuration for a [`Recorder`](crate::recorder::Recorder) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Live microphone capture profile. Default: 48 kHz, 3 bytes, mono.
    pub capture: StreamProfile,
    /// Profile for beep cue playback. Default: 48 kHz, 3 bytes, mono.
    pub beep: StreamProfile,
    /// Profile for pre-recorded sample-prompt playback.
    /// Default: 20 kHz, 2 bytes, mono.
    pub sample_prompt: StreamProfile,
    /// Analysis window length in milliseconds. Default: 25.
    pub frame_length_ms: u32,
    /// Analysis window shift in milliseconds. Default: 5.
    pub frame_shift_ms: u32,
    /// Frames per device I/O buffer, also the level-event cadence.
    /// Default: 1024.
    pub frames_per_buffer: u32,
    /// Maximum recording duration in milliseconds; capture beyond this is
    /// dropped silently. Default: 20 000.
    pub max_recording_ms: u32,
    /// Silence margin kept ahead of detected speech, in milliseconds.
    /// Default: 400.
    pub top_silence_ms: u32,
    /// Silence margin kept after detected speech, in milliseconds.
    /// Default: 600.
    pub end_silence_ms: u32,
    /// RMS threshold for the silence scan, as a fraction of the normalized
    /// full-scale amplitude. Zero disables content-based detection.
    /// Default: 0.10.
    pub silence_level: f64,
    /// Normalization target as a fraction of full-scale amplitude.
    /// Default: 0.15.
    pub normalization_ratio: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capture: StreamProfile::new(48_000, 3, 1),
            beep: StreamProfile::new(48_000, 3, 1),
            sample_prompt: StreamProfile::new(20_000, 2, 1),
            frame_length_ms: 25,
            frame_shift_ms: 5,
            frames_per_buffer: 1024,
            max_recording_ms: 20_000,
            top_silence_ms: 400,
            end_silence_ms: 600,
            silence_level: 0.10,
            normalization_ratio: 0.15,
        }
    }
}

impl RecorderConfig {
    /// Analysis window length in frames at the capture rate.
    pub fn frame_length(&self) -> usize {
        ms_to_frames(self.frame_length_ms, self.capture.sample_rate)
    }

    /// Analysis window shift in frames at the capture rate.
    pub fn frame_shift(&self) -> usize {
        ms_to_frames(self.frame_shift_ms, self.capture.sample_rate)
    }

    /// Top silence margin in frames at the capture rate.
    pub fn top_margin(&self) -> usize {
        ms_to_frames(self.top_silence_ms, self.capture.sample_rate)
    }

    /// End silence margin in frames at the capture rate.
    pub fn end_margin(&self) -> usize {
        ms_to_frames(self.end_silence_ms, self.capture.sample_rate)
    }
}

fn ms_to_frames(ms: u32, sample_rate: u32) -> usize {
    sample_rate as usize * ms as usize / 1000
}
