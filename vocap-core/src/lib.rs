//! # vocap-core
//!
//! Voice capture engine: record a microphone take into memory, locate the
//! speech inside it, and emit clean artifacts.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → FrameInput (cpal + SPSC ring) → capture loop
//!                  │                              │
//!            LevelMeter side-channel        CaptureBuffer (bounded)
//!                                                 │  stream close
//!                                            frozen capture
//!                                                 │  finalize
//!              raw artifact ◄── endpoint scan + normalize ──► trimmed artifact
//! ```
//!
//! The capture loop is frame-atomic and stops cooperatively; everything
//! after stream close runs single-threaded over the frozen buffer.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod analysis;
pub mod artifact;
pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod finalize;
pub mod playback;
pub mod recorder;
pub mod stream;

// Convenience re-exports for downstream crates
pub use analysis::endpoint::EndpointResult;
pub use capture::{buffer::CaptureBuffer, meter::LevelMeter};
pub use codec::Codec;
pub use config::{RecorderConfig, StreamProfile};
pub use error::{Result, VocapError};
pub use events::{LevelEvent, RecorderStatus, RecorderStatusEvent};
pub use finalize::{FinalizeReport, FinalizeStatus};
pub use playback::PlaybackSource;
pub use recorder::{Recorder, RecordingStats};
pub use stream::{AudioBackend, FrameInput, FrameOutput};

#[cfg(feature = "audio-cpal")]
pub use stream::CpalBackend;
