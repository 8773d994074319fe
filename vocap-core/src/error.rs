use thiserror::Error;

/// All errors produced by vocap-core.
///
/// A failed endpoint detection ("no speech") is deliberately absent here:
/// it is a normal recording outcome, reported through
/// [`FinalizeStatus`](crate::finalize::FinalizeStatus).
#[derive(Debug, Error)]
pub enum VocapError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("unsupported sample size: {0} bytes per sample")]
    UnsupportedSampleSize(usize),

    #[error("cannot allocate capture buffer of {0} samples")]
    Allocation(usize),

    #[error("capture stream is already open")]
    AlreadyOpen,

    #[error("capture stream is not open")]
    NotOpen,

    #[error("capture stream is still open — close it before finalizing")]
    StreamStillOpen,

    #[error("no captured audio to finalize")]
    NoCapture,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VocapError>;
