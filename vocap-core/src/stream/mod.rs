//! Device stream seam.
//!
//! The recorder core never talks to audio hardware directly. It consumes
//! blocking, frame-at-a-time byte streams through the traits below; the
//! capture and playback loops own one stream for their whole lifetime and
//! drop it on every exit path.
//!
//! Stream handles are deliberately **not** `Send`: the cpal-backed
//! implementation wraps a `cpal::Stream`, which is bound to its creation
//! thread on Windows/macOS. Open a stream on the thread that will read or
//! write it — in practice, inside the recorder's `spawn_blocking` closure.

#[cfg(feature = "audio-cpal")]
pub mod cpal_backend;

#[cfg(feature = "audio-cpal")]
pub use cpal_backend::CpalBackend;

use crate::config::StreamProfile;
use crate::error::Result;

/// Blocking source of interleaved audio frames.
pub trait FrameInput {
    /// Read exactly one interleaved frame (`channels × sample_size` bytes).
    ///
    /// Blocks until a full frame is available. Any error is fatal to the
    /// capture that issued the read.
    fn read_frame(&mut self, frame: &mut [u8]) -> Result<()>;
}

/// Blocking sink for interleaved audio frames.
pub trait FrameOutput {
    /// Write exactly one interleaved frame, blocking on device backpressure.
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;
}

/// Factory for device streams.
///
/// Shared across threads (the recorder hands it into its blocking tasks),
/// but the streams it opens stay on the opening thread.
pub trait AudioBackend: Send + Sync {
    /// Open an input stream with the profile's rate, width and channel
    /// count. `frames_per_buffer` is the device I/O granularity hint.
    fn open_input(
        &self,
        profile: &StreamProfile,
        frames_per_buffer: u32,
    ) -> Result<Box<dyn FrameInput>>;

    /// Open an output stream, same parameters as [`open_input`](Self::open_input).
    fn open_output(
        &self,
        profile: &StreamProfile,
        frames_per_buffer: u32,
    ) -> Result<Box<dyn FrameOutput>>;
}
