//! Finalization of a frozen capture.
//!
//! Runs the whole post-capture pipeline in one pass:
//!
//! ```text
//! raw artifact → max RMS → gain → normalize → peak ratio
//!             → endpoint scan → region power → trimmed artifact
//! ```
//!
//! The raw artifact is written unconditionally, before anything can fail for
//! content reasons. The trimmed artifact and the power figure exist only
//! when endpoint detection confirms a usable speech region; anything else is
//! a [`FinalizeStatus`] outcome, not an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::endpoint::{self, EndpointParams, EndpointResult};
use crate::analysis::{normalize, summary};
use crate::artifact;
use crate::capture::buffer::CaptureBuffer;
use crate::codec::Codec;
use crate::config::RecorderConfig;
use crate::error::Result;

/// Outcome of one finalize pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalizeStatus {
    /// Speech found, both artifacts written.
    Success,
    /// The take started with less silence than the top margin
    /// (`top_file < 0`).
    TopSilenceTooShort,
    /// The take ended with less silence than the end margin
    /// (`end_file` past the capture).
    EndSilenceTooShort,
    /// Cut points crossed — nothing in the take cleared the threshold.
    NoSpeech,
}

/// Everything a caller learns from one finalize pass.
#[derive(Debug, Clone, Copy)]
pub struct FinalizeReport {
    pub status: FinalizeStatus,
    pub endpoints: EndpointResult,
    /// Frames in the raw capture.
    pub frames: usize,
    /// Peak absolute amplitude of the raw capture, percent of full scale.
    pub max_amplitude: f64,
    /// Seconds trimmed off the top (the cut-point time).
    pub top_silence: f64,
    /// Seconds trimmed off the end.
    pub end_silence: f64,
    /// Average raw signal power over the speech region, dB.
    /// Present only on success.
    pub power: Option<f64>,
}

impl FinalizeReport {
    pub fn speech_detected(&self) -> bool {
        self.status == FinalizeStatus::Success
    }
}

/// Finalize a frozen capture into `raw_path` and (on success) `cut_path`.
///
/// `environment` marks a known-clean reference take: content-based
/// detection and normalization are both skipped and the boundaries come
/// from the margins alone.
pub fn finalize(
    buffer: &CaptureBuffer,
    config: &RecorderConfig,
    raw_path: &Path,
    cut_path: &Path,
    environment: bool,
) -> Result<FinalizeReport> {
    let codec = Codec::new(config.capture.sample_size)?;
    let samples = buffer.samples();
    let frames = buffer.frames();
    let channels = buffer.channels();

    info!(path = %raw_path.display(), frames, "writing raw capture");
    artifact::write_pcm(raw_path, samples, &codec)?;

    let len = config.frame_length();
    let shift = config.frame_shift();
    let full_scale = config.capture.full_scale();
    let bypass = environment || config.silence_level == 0.0;

    let max_rms = normalize::max_rms(samples, frames, channels, len, shift);
    let scale = normalize::compute_scale(max_rms, full_scale, config.normalization_ratio, bypass);
    let normalized = normalize::apply_gain(samples, scale);

    let max_amplitude = summary::peak_amplitude_ratio(samples, full_scale);

    let endpoints = endpoint::detect(
        &normalized,
        frames,
        &EndpointParams {
            channels,
            sample_rate: buffer.sample_rate(),
            frame_length: len,
            frame_shift: shift,
            top_margin: config.top_margin(),
            end_margin: config.end_margin(),
            silence_rms: config.silence_level * full_scale * config.normalization_ratio,
            bypass,
        },
    );

    if !endpoints.is_valid() {
        let status = if endpoints.top_file < 0 {
            FinalizeStatus::TopSilenceTooShort
        } else if endpoints.end_file >= frames as i64 {
            FinalizeStatus::EndSilenceTooShort
        } else {
            FinalizeStatus::NoSpeech
        };
        warn!(
            ?status,
            top_file = endpoints.top_file,
            end_file = endpoints.end_file,
            frames,
            "no usable speech detected — raw capture kept, cut skipped"
        );
        return Ok(FinalizeReport {
            status,
            endpoints,
            frames,
            max_amplitude,
            top_silence: endpoints.top_silence,
            end_silence: endpoints.end_silence,
            power: None,
        });
    }

    let power = summary::region_power_db(
        samples,
        channels,
        endpoints.top_speech as usize,
        endpoints.end_speech as usize,
    );

    let lo = endpoints.top_file as usize * channels;
    let hi = endpoints.end_file as usize * channels;
    info!(
        path = %cut_path.display(),
        frames = endpoints.cut_frames(),
        scale,
        "writing normalized cut"
    );
    artifact::write_pcm(cut_path, &normalized[lo..hi], &codec)?;

    Ok(FinalizeReport {
        status: FinalizeStatus::Success,
        endpoints,
        frames,
        max_amplitude,
        top_silence: endpoints.top_silence,
        end_silence: endpoints.end_silence,
        power: Some(power),
    })
}
