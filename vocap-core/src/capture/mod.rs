//! The blocking capture loop.
//!
//! ## Loop body (per device frame)
//!
//! ```text
//! 1. Blocking read of one interleaved frame from the input stream
//! 2. Decode every channel to canonical i32
//! 3. Fold the frame into the level meter
//! 4. Sync the arm flag (a false→true edge resets the write position)
//! 5. Conditionally append the frame to the capture buffer
//! 6. Once per device buffer: broadcast a LevelEvent
//! ```
//!
//! The loop stops cooperatively: it checks the shared `open` flag once per
//! iteration, so stop latency is bounded by one device read. Work is
//! frame-atomic — there is nothing to roll back on stop or error.

pub mod buffer;
pub mod meter;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::config::StreamProfile;
use crate::error::Result;
use crate::events::LevelEvent;
use crate::stream::FrameInput;
use buffer::CaptureBuffer;
use meter::LevelMeter;

/// Everything the capture loop needs, passed as one struct so the
/// spawn-blocking closure stays tidy.
pub struct CaptureContext {
    pub profile: StreamProfile,
    pub max_recording_ms: u32,
    pub frames_per_buffer: u32,
    pub input: Box<dyn FrameInput>,
    /// Cleared from another thread of control to end the loop.
    pub open: Arc<AtomicBool>,
    /// Recording arm state, independent of stream lifetime.
    pub armed: Arc<AtomicBool>,
    pub meter: Arc<LevelMeter>,
    pub level_tx: broadcast::Sender<LevelEvent>,
}

/// Run the capture loop until `ctx.open` is cleared, returning the frozen
/// capture buffer.
///
/// # Errors
/// Device read failures and unsupported sample widths abort the capture;
/// whatever was recorded up to that point is discarded with the stream.
pub fn run(mut ctx: CaptureContext) -> Result<CaptureBuffer> {
    let codec = Codec::new(ctx.profile.sample_size)?;
    let channels = ctx.profile.channels as usize;
    let width = codec.sample_size();

    let mut buffer = CaptureBuffer::open(ctx.max_recording_ms, channels, ctx.profile.sample_rate)?;

    info!(
        sample_rate = ctx.profile.sample_rate,
        sample_size = width,
        channels,
        max_frames = buffer.max_frames(),
        "capture loop started"
    );

    let mut frame_bytes = vec![0u8; channels * width];
    let mut decoded = vec![0i32; channels];
    let event_period = ctx.frames_per_buffer.max(1) as u64;
    let mut reads: u64 = 0;
    let mut seq: u64 = 0;

    while ctx.open.load(Ordering::Relaxed) {
        ctx.input.read_frame(&mut frame_bytes)?;

        for (slot, raw) in decoded.iter_mut().zip(frame_bytes.chunks_exact(width)) {
            *slot = codec.decode(raw);
        }

        let level = ctx.meter.observe(&decoded);

        let armed = ctx.armed.load(Ordering::Relaxed);
        if armed != buffer.is_recording() {
            if armed {
                debug!(reads, "recording armed");
                buffer.arm();
            } else {
                debug!(frames = buffer.frames(), "recording disarmed");
                buffer.disarm();
            }
        }

        buffer.write_frame(&decoded);

        if reads % event_period == 0 {
            let _ = ctx.level_tx.send(LevelEvent {
                seq,
                level,
                peak: ctx.meter.peak(),
                armed,
            });
            seq += 1;
        }
        reads += 1;
    }

    info!(frames = buffer.frames(), "capture loop stopped");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VocapError;
    use std::collections::VecDeque;

    /// Scripted frame source: serves canned frames, then clears the shared
    /// flags and pads with silence so the loop winds down deterministically.
    struct ScriptedInput {
        frames: VecDeque<Vec<u8>>,
        open: Arc<AtomicBool>,
        armed: Arc<AtomicBool>,
        /// Arm the recorder right before serving this read index.
        arm_at: Option<usize>,
        /// Fail this read index with a stream error.
        fail_at: Option<usize>,
        reads: usize,
    }

    impl ScriptedInput {
        fn new(frames: Vec<Vec<u8>>, open: &Arc<AtomicBool>, armed: &Arc<AtomicBool>) -> Self {
            Self {
                frames: frames.into(),
                open: Arc::clone(open),
                armed: Arc::clone(armed),
                arm_at: None,
                fail_at: None,
                reads: 0,
            }
        }
    }

    impl FrameInput for ScriptedInput {
        fn read_frame(&mut self, frame: &mut [u8]) -> Result<()> {
            if self.fail_at == Some(self.reads) {
                return Err(VocapError::Stream("scripted failure".into()));
            }
            if self.arm_at == Some(self.reads) {
                self.armed.store(true, Ordering::Relaxed);
            }
            self.reads += 1;

            match self.frames.pop_front() {
                Some(bytes) => {
                    frame.copy_from_slice(&bytes);
                    Ok(())
                }
                None => {
                    // Script exhausted: wind the session down and pad with
                    // one silent frame while the loop notices.
                    self.armed.store(false, Ordering::Relaxed);
                    self.open.store(false, Ordering::Relaxed);
                    frame.fill(0);
                    Ok(())
                }
            }
        }
    }

    fn encode_frames(values: &[i32]) -> Vec<Vec<u8>> {
        let codec = Codec::new(2).unwrap();
        values
            .iter()
            .map(|v| {
                let mut bytes = vec![0u8; 2];
                codec.encode(*v, &mut bytes);
                bytes
            })
            .collect()
    }

    fn context(input: ScriptedInput, open: Arc<AtomicBool>, armed: Arc<AtomicBool>) -> CaptureContext {
        let (level_tx, _) = broadcast::channel(64);
        CaptureContext {
            profile: StreamProfile::new(1000, 2, 1),
            max_recording_ms: 1000,
            frames_per_buffer: 4,
            input: Box::new(input),
            open,
            armed,
            meter: Arc::new(LevelMeter::new()),
            level_tx,
        }
    }

    #[test]
    fn records_scripted_frames_while_armed() {
        let open = Arc::new(AtomicBool::new(true));
        let armed = Arc::new(AtomicBool::new(true));
        let input = ScriptedInput::new(encode_frames(&[100, -200, 300]), &open, &armed);

        let buffer = run(context(input, open, armed)).unwrap();
        assert_eq!(buffer.samples(), &[100, -200, 300]);
    }

    #[test]
    fn frames_before_arming_are_not_recorded() {
        let open = Arc::new(AtomicBool::new(true));
        let armed = Arc::new(AtomicBool::new(false));
        let mut input = ScriptedInput::new(encode_frames(&[1, 2, 3, 4]), &open, &armed);
        input.arm_at = Some(2);

        let buffer = run(context(input, open, armed)).unwrap();
        // Armed just before the third read; only frames 3 and 4 land.
        assert_eq!(buffer.samples(), &[3, 4]);
    }

    #[test]
    fn meter_runs_whether_or_not_armed() {
        let open = Arc::new(AtomicBool::new(true));
        let armed = Arc::new(AtomicBool::new(false));
        let input = ScriptedInput::new(encode_frames(&[-500, 20]), &open, &armed);

        let meter = Arc::new(LevelMeter::new());
        let mut ctx = context(input, open, armed);
        ctx.meter = Arc::clone(&meter);

        let buffer = run(ctx).unwrap();
        assert_eq!(buffer.frames(), 0);
        assert_eq!(meter.peak(), 500);
    }

    #[test]
    fn device_error_aborts_the_capture() {
        let open = Arc::new(AtomicBool::new(true));
        let armed = Arc::new(AtomicBool::new(true));
        let mut input = ScriptedInput::new(encode_frames(&[1, 2, 3]), &open, &armed);
        input.fail_at = Some(1);

        let err = run(context(input, open, armed)).unwrap_err();
        assert!(matches!(err, VocapError::Stream(_)));
    }

    #[test]
    fn level_events_are_emitted_per_device_buffer() {
        let open = Arc::new(AtomicBool::new(true));
        let armed = Arc::new(AtomicBool::new(true));
        let input = ScriptedInput::new(encode_frames(&[10; 10]), &open, &armed);

        let mut ctx = context(input, open, armed);
        let mut rx = ctx.level_tx.subscribe();
        run(ctx).unwrap();

        // 11 reads (10 scripted + 1 silent tail) at a period of 4 → seq 0, 1, 2.
        let first = rx.try_recv().unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(first.level, 10);
        assert!(first.armed);
        assert_eq!(rx.try_recv().unwrap().seq, 1);
        assert_eq!(rx.try_recv().unwrap().seq, 2);
        assert!(rx.try_recv().is_err());
    }
}
