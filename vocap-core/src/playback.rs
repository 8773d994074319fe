//! Sequential raw-PCM file playback.
//!
//! Mirrors the capture side: one interleaved frame per blocking write, a
//! cooperative stop flag checked each iteration, latency bounded by one
//! device write. A truncated final frame is treated as end-of-file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{RecorderConfig, StreamProfile};
use crate::error::Result;
use crate::stream::FrameOutput;

/// What kind of material is being played; selects the stream profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackSource {
    /// Recording start/stop cue.
    Beep,
    /// Pre-recorded sample prompt.
    Sample,
    /// The raw capture artifact.
    VoiceOrg,
    /// The trimmed/normalized artifact.
    VoiceCut,
    /// A scratch take awaiting confirmation.
    VoiceTmp,
    /// A WAV-wrapped export.
    VoiceWav,
}

impl PlaybackSource {
    /// The stream profile this material was produced with.
    pub fn profile(self, config: &RecorderConfig) -> StreamProfile {
        match self {
            PlaybackSource::Beep => config.beep,
            PlaybackSource::Sample => config.sample_prompt,
            _ => config.capture,
        }
    }
}

/// State for one playback pass.
pub struct PlaybackContext {
    pub output: Box<dyn FrameOutput>,
    /// Cleared from another thread of control to stop early.
    pub playing: Arc<AtomicBool>,
    /// Bytes per interleaved frame.
    pub frame_bytes: usize,
}

/// Play `file` to the output sink until EOF or until the flag is cleared.
/// Returns the number of frames written.
pub fn run(file: File, mut ctx: PlaybackContext) -> Result<u64> {
    let mut reader = BufReader::new(file);
    let mut frame = vec![0u8; ctx.frame_bytes];
    let mut frames: u64 = 0;

    while ctx.playing.load(Ordering::Relaxed) {
        if !read_full_frame(&mut reader, &mut frame)? {
            break;
        }
        ctx.output.write_frame(&frame)?;
        frames += 1;
    }

    info!(frames, "playback finished");
    Ok(frames)
}

/// Read one frame; `Ok(false)` on clean EOF or a trailing partial frame.
fn read_full_frame(reader: &mut BufReader<File>, frame: &mut [u8]) -> Result<bool> {
    match reader.read_exact(frame) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Sink that stores every frame and optionally clears the flag after a
    /// fixed number of writes.
    struct RecordingSink {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        playing: Arc<AtomicBool>,
        stop_after: Option<usize>,
    }

    impl FrameOutput for RecordingSink {
        fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
            let mut frames = self.frames.lock().unwrap();
            frames.push(frame.to_vec());
            if Some(frames.len()) == self.stop_after {
                self.playing.store(false, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("vocap-playback-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn plays_whole_frames_and_drops_a_trailing_partial() {
        // 3.5 frames of 2 bytes each.
        let path = temp_file("partial.raw", &[1, 2, 3, 4, 5, 6, 7]);
        let playing = Arc::new(AtomicBool::new(true));
        let frames = Arc::new(Mutex::new(Vec::new()));

        let ctx = PlaybackContext {
            output: Box::new(RecordingSink {
                frames: Arc::clone(&frames),
                playing: Arc::clone(&playing),
                stop_after: None,
            }),
            playing: Arc::clone(&playing),
            frame_bytes: 2,
        };

        let played = run(File::open(&path).unwrap(), ctx).unwrap();
        assert_eq!(played, 3);
        assert_eq!(
            &*frames.lock().unwrap(),
            &vec![vec![1, 2], vec![3, 4], vec![5, 6]]
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn stop_flag_ends_playback_at_the_next_frame() {
        let path = temp_file("stop.raw", &[0u8; 100]);
        let playing = Arc::new(AtomicBool::new(true));
        let frames = Arc::new(Mutex::new(Vec::new()));

        let ctx = PlaybackContext {
            output: Box::new(RecordingSink {
                frames: Arc::clone(&frames),
                playing: Arc::clone(&playing),
                stop_after: Some(4),
            }),
            playing: Arc::clone(&playing),
            frame_bytes: 2,
        };

        let played = run(File::open(&path).unwrap(), ctx).unwrap();
        assert_eq!(played, 4);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn source_selects_the_matching_profile() {
        let cfg = RecorderConfig::default();
        assert_eq!(PlaybackSource::Beep.profile(&cfg), cfg.beep);
        assert_eq!(PlaybackSource::Sample.profile(&cfg), cfg.sample_prompt);
        assert_eq!(PlaybackSource::VoiceOrg.profile(&cfg), cfg.capture);
        assert_eq!(PlaybackSource::VoiceCut.profile(&cfg), cfg.capture);
    }
}
