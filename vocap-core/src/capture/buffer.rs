//! Bounded in-memory capture store.
//!
//! One preallocated interleaved `i32` buffer sized from the maximum
//! recording duration. The write position only moves while the buffer is
//! armed; once the capacity is reached further frames are dropped silently —
//! recording keeps running, the take just stops growing. That is the
//! backpressure policy, not an error.

use crate::error::{Result, VocapError};

/// Preallocated interleaved multi-channel sample store.
#[derive(Debug)]
pub struct CaptureBuffer {
    data: Vec<i32>,
    channels: usize,
    sample_rate: u32,
    max_frames: usize,
    frames: usize,
    recording: bool,
}

impl CaptureBuffer {
    /// Allocate and zero-fill a buffer holding up to `max_recording_ms` of
    /// audio at `sample_rate` across `channels`.
    ///
    /// # Errors
    /// `VocapError::Allocation` if the backing store cannot be reserved.
    /// Nothing is touched on failure.
    pub fn open(max_recording_ms: u32, channels: usize, sample_rate: u32) -> Result<Self> {
        let max_frames = sample_rate as usize * max_recording_ms as usize / 1000;
        let slots = max_frames * channels;

        let mut data = Vec::new();
        data.try_reserve_exact(slots)
            .map_err(|_| VocapError::Allocation(slots))?;
        data.resize(slots, 0);

        Ok(Self {
            data,
            channels,
            sample_rate,
            max_frames,
            frames: 0,
            recording: false,
        })
    }

    /// Reset the write position and start accepting frames.
    pub fn arm(&mut self) {
        self.frames = 0;
        self.recording = true;
    }

    /// Stop accepting frames. The write position is preserved.
    pub fn disarm(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Append one interleaved frame if armed and not full.
    pub fn write_frame(&mut self, frame: &[i32]) {
        debug_assert_eq!(frame.len(), self.channels);
        if !self.recording || self.frames >= self.max_frames {
            return;
        }
        let base = self.frames * self.channels;
        self.data[base..base + self.channels].copy_from_slice(frame);
        self.frames += 1;
    }

    /// Frames written so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The written prefix, interleaved.
    pub fn samples(&self) -> &[i32] {
        &self.data[..self.frames * self.channels]
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}
