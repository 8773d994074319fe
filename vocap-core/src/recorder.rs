//! `Recorder` — top-level session controller.
//!
//! ## Lifecycle
//!
//! ```text
//! Recorder::new()
//!     └─► open_stream()       → device open, capture loop spawned, status = Open
//!         ├─► record()        → armed, frames accumulate
//!         ├─► stop_recording()
//!         └─► close_stream()  → loop exits, capture frozen, status = Closed
//!             └─► finalize()  → artifacts written, stats updated
//! ```
//!
//! One `Recorder` value is one session; there is no process-wide state. All
//! fields use interior mutability, so wrap it in `Arc` to share with event
//! consumers.
//!
//! ## Threading
//!
//! Device streams are `!Send` (cpal binds them to their creation thread), so
//! capture and playback each open their stream *inside* a `spawn_blocking`
//! closure and never move it. A bounded(1) channel hands the open result
//! back to the caller.

use std::fs::File;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::capture::{self, buffer::CaptureBuffer, meter::LevelMeter, CaptureContext};
use crate::config::RecorderConfig;
use crate::error::{Result, VocapError};
use crate::events::{LevelEvent, RecorderStatus, RecorderStatusEvent};
use crate::finalize::{self, FinalizeReport};
use crate::playback::{self, PlaybackContext, PlaybackSource};
use crate::stream::AudioBackend;

/// Broadcast capacity for level and status events.
const BROADCAST_CAP: usize = 256;

/// Analysis results written back for the host after finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStats {
    /// Peak amplitude of the last take, percent of full scale.
    pub max_amplitude: f64,
    /// Seconds trimmed off the top of the last take.
    pub top_silence: f64,
    /// Seconds trimmed off the end of the last take.
    pub end_silence: f64,
    /// Speech-region power of the last take, dB (0 when no speech found).
    pub power: f64,
}

/// An owned recording session.
pub struct Recorder {
    config: RecorderConfig,
    backend: Arc<dyn AudioBackend>,
    /// `true` while the capture stream and loop are running.
    open: Arc<AtomicBool>,
    /// Recording arm state, independent of the stream.
    armed: Arc<AtomicBool>,
    /// Stop flag of the *current* playback; replaced on every `play`.
    playing: Arc<Mutex<Arc<AtomicBool>>>,
    meter: Arc<LevelMeter>,
    stats: Arc<Mutex<RecordingStats>>,
    /// The frozen capture, parked here by the loop at stream close.
    captured: Arc<Mutex<Option<CaptureBuffer>>>,
    status: Arc<Mutex<RecorderStatus>>,
    status_tx: broadcast::Sender<RecorderStatusEvent>,
    level_tx: broadcast::Sender<LevelEvent>,
}

impl Recorder {
    /// Create a session using the given device backend.
    pub fn new(config: RecorderConfig, backend: Arc<dyn AudioBackend>) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (level_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            config,
            backend,
            open: Arc::new(AtomicBool::new(false)),
            armed: Arc::new(AtomicBool::new(false)),
            playing: Arc::new(Mutex::new(Arc::new(AtomicBool::new(false)))),
            meter: Arc::new(LevelMeter::new()),
            stats: Arc::new(Mutex::new(RecordingStats::default())),
            captured: Arc::new(Mutex::new(None)),
            status: Arc::new(Mutex::new(RecorderStatus::Idle)),
            status_tx,
            level_tx,
        }
    }

    /// Create a session on the system's default audio devices.
    #[cfg(feature = "audio-cpal")]
    pub fn with_default_backend(config: RecorderConfig) -> Self {
        Self::new(config, Arc::new(crate::stream::CpalBackend))
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Open the capture stream and start the blocking capture loop.
    ///
    /// Returns once the device is confirmed open (or failed). The loop keeps
    /// running in a background blocking task until [`close_stream`](Self::close_stream).
    ///
    /// # Errors
    /// `VocapError::AlreadyOpen` when called twice; device errors otherwise.
    pub fn open_stream(&self) -> Result<()> {
        if self.open.load(Ordering::SeqCst) {
            return Err(VocapError::AlreadyOpen);
        }

        // A stale capture from the previous take is superseded.
        self.captured.lock().take();
        self.meter.reset();
        self.open.store(true, Ordering::SeqCst);
        self.set_status(RecorderStatus::Open, None);

        let config = self.config.clone();
        let backend = Arc::clone(&self.backend);
        let open = Arc::clone(&self.open);
        let armed = Arc::clone(&self.armed);
        let meter = Arc::clone(&self.meter);
        let captured = Arc::clone(&self.captured);
        let status = Arc::clone(&self.status);
        let status_tx = self.status_tx.clone();
        let level_tx = self.level_tx.clone();

        // Bounded(1): the capture task reports device-open success/failure.
        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        tokio::task::spawn_blocking(move || {
            // The stream must be created on THIS thread — it is !Send.
            let input = match backend.open_input(&config.capture, config.frames_per_buffer) {
                Ok(input) => {
                    let _ = open_tx.send(Ok(()));
                    input
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    open.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let result = capture::run(CaptureContext {
                profile: config.capture,
                max_recording_ms: config.max_recording_ms,
                frames_per_buffer: config.frames_per_buffer,
                input,
                open: Arc::clone(&open),
                armed: Arc::clone(&armed),
                meter,
                level_tx,
            });

            match result {
                Ok(buffer) => {
                    info!(frames = buffer.frames(), "capture frozen");
                    *captured.lock() = Some(buffer);
                    publish_status(&status, &status_tx, RecorderStatus::Closed, None);
                }
                Err(e) => {
                    error!("capture failed: {e}");
                    open.store(false, Ordering::SeqCst);
                    armed.store(false, Ordering::SeqCst);
                    publish_status(
                        &status,
                        &status_tx,
                        RecorderStatus::Error,
                        Some(e.to_string()),
                    );
                }
            }
            // Stream drops here, releasing the device on its own thread.
        });

        match open_rx.recv() {
            Ok(Ok(())) => {
                info!("capture stream open");
                Ok(())
            }
            Ok(Err(e)) => {
                self.open.store(false, Ordering::SeqCst);
                self.set_status(RecorderStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                self.open.store(false, Ordering::SeqCst);
                self.set_status(RecorderStatus::Error, Some("capture task died".into()));
                Err(VocapError::Other(anyhow::anyhow!(
                    "capture task died unexpectedly"
                )))
            }
        }
    }

    /// Ask the capture loop to stop; it exits within one device read and
    /// freezes the capture for [`finalize`](Self::finalize).
    pub fn close_stream(&self) -> Result<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(VocapError::NotOpen);
        }
        self.open.store(false, Ordering::SeqCst);
        info!("capture stream close requested");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Arm recording. The loop resets the write position when it sees the
    /// edge, so a re-arm starts a fresh take.
    pub fn record(&self) {
        debug!("recording armed");
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Disarm recording, keeping what was captured so far.
    pub fn stop_recording(&self) {
        debug!("recording disarmed");
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Current running peak level.
    pub fn level(&self) -> i32 {
        self.meter.peak()
    }

    /// Read the running peak and reset it, for host-side level polling.
    pub fn take_level(&self) -> i32 {
        self.meter.take()
    }

    /// Analysis results of the last finalized take.
    pub fn stats(&self) -> RecordingStats {
        *self.stats.lock()
    }

    /// Zero the stats and the level meter between takes.
    pub fn clear_stats(&self) {
        *self.stats.lock() = RecordingStats::default();
        self.meter.reset();
    }

    pub fn status(&self) -> RecorderStatus {
        *self.status.lock()
    }

    /// Finalize the frozen capture into the two artifacts.
    ///
    /// The capture is consumed: a new take requires a new stream.
    ///
    /// # Errors
    /// `StreamStillOpen` while the loop is running, `NoCapture` when there is
    /// nothing frozen, plus artifact I/O failures.
    pub fn finalize(
        &self,
        raw_path: &Path,
        cut_path: &Path,
        environment: bool,
    ) -> Result<FinalizeReport> {
        if self.open.load(Ordering::SeqCst) {
            return Err(VocapError::StreamStillOpen);
        }
        let buffer = self
            .captured
            .lock()
            .take()
            .ok_or(VocapError::NoCapture)?;

        let report = finalize::finalize(&buffer, &self.config, raw_path, cut_path, environment)?;

        let mut stats = self.stats.lock();
        stats.max_amplitude = report.max_amplitude;
        stats.top_silence = report.top_silence;
        stats.end_silence = report.end_silence;
        stats.power = report.power.unwrap_or(0.0);

        Ok(report)
    }

    /// Play a raw PCM file on the output device, stopping any playback that
    /// is already running.
    ///
    /// Returns once the file and the output device are confirmed open; the
    /// audio itself plays in a background blocking task.
    pub fn play(&self, path: &Path, source: PlaybackSource) -> Result<()> {
        // Each playback gets its own stop flag; stopping the previous one
        // cannot race with this one starting.
        let flag = Arc::new(AtomicBool::new(true));
        {
            let mut current = self.playing.lock();
            current.store(false, Ordering::SeqCst);
            *current = Arc::clone(&flag);
        }

        let file = File::open(path)?;
        let profile = source.profile(&self.config);
        info!(
            path = %path.display(),
            ?source,
            sample_rate = profile.sample_rate,
            sample_size = profile.sample_size,
            "playback requested"
        );

        let backend = Arc::clone(&self.backend);
        let frames_per_buffer = self.config.frames_per_buffer;
        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        tokio::task::spawn_blocking(move || {
            let output = match backend.open_output(&profile, frames_per_buffer) {
                Ok(output) => {
                    let _ = open_tx.send(Ok(()));
                    output
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    flag.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let result = playback::run(
                file,
                PlaybackContext {
                    output,
                    playing: Arc::clone(&flag),
                    frame_bytes: profile.frame_bytes(),
                },
            );
            if let Err(e) = result {
                error!("playback failed: {e}");
            }
            flag.store(false, Ordering::SeqCst);
        });

        match open_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(VocapError::Other(anyhow::anyhow!(
                "playback task died unexpectedly"
            ))),
        }
    }

    /// Stop the current playback at its next frame boundary.
    pub fn stop_playback(&self) {
        self.playing.lock().store(false, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.lock().load(Ordering::SeqCst)
    }

    /// Subscribe to live level events from the capture loop.
    pub fn subscribe_levels(&self) -> broadcast::Receiver<LevelEvent> {
        self.level_tx.subscribe()
    }

    /// Subscribe to session state changes.
    pub fn subscribe_status(&self) -> broadcast::Receiver<RecorderStatusEvent> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, new_status: RecorderStatus, detail: Option<String>) {
        publish_status(&self.status, &self.status_tx, new_status, detail);
    }
}

fn publish_status(
    status: &Mutex<RecorderStatus>,
    status_tx: &broadcast::Sender<RecorderStatusEvent>,
    new_status: RecorderStatus,
    detail: Option<String>,
) {
    *status.lock() = new_status;
    let _ = status_tx.send(RecorderStatusEvent {
        status: new_status,
        detail,
    });
}
