//! cpal-backed device streams.
//!
//! # Design constraints
//!
//! The cpal callback runs on an OS audio thread at elevated priority. It
//! must not allocate, block on a mutex, or perform I/O. Both directions
//! therefore bridge through a lock-free SPSC byte ring: the input callback
//! encodes device samples into the ring with a wait-free `push_slice`, and
//! the blocking `read_frame` on the consumer side sleeps in 1 ms steps until
//! a full frame is buffered (output is symmetric).
//!
//! Samples are carried as little-endian signed integers at the profile's
//! configured width. When the device's native format is narrower or wider,
//! the callback rescales by bit-shifting, so a 16-bit device feeding a
//! 24-bit capture profile produces the expected left-justified samples.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use tracing::{error, info, warn};

use super::{AudioBackend, FrameInput, FrameOutput};
use crate::codec::{rescale, Codec};
use crate::config::StreamProfile;
use crate::error::{Result, VocapError};

/// Ring capacity in bytes: 2^22 ≈ 29 s of 48 kHz / 24-bit mono audio.
/// Large enough that a stalled consumer never drops frames mid-take.
const RING_CAPACITY: usize = 1 << 22;

/// Poll interval for the blocking side of the ring.
const RING_POLL: Duration = Duration::from_millis(1);

/// Default [`AudioBackend`] talking to the system's audio host through cpal.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open_input(
        &self,
        profile: &StreamProfile,
        frames_per_buffer: u32,
    ) -> Result<Box<dyn FrameInput>> {
        let codec = Codec::new(profile.sample_size)?;

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(VocapError::NoDefaultInputDevice)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = profile.sample_rate,
            sample_size = profile.sample_size,
            channels = profile.channels,
            "opening input stream"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| VocapError::Device(e.to_string()))?;

        let config = StreamConfig {
            channels: profile.channels,
            sample_rate: SampleRate(profile.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(frames_per_buffer),
        };

        let (producer, consumer) = HeapRb::<u8>::new(RING_CAPACITY).split();
        let failed = Arc::new(AtomicBool::new(false));

        let stream = build_input_stream(
            &device,
            &config,
            supported.sample_format(),
            codec,
            producer,
            Arc::clone(&failed),
        )?;

        stream
            .play()
            .map_err(|e| VocapError::Stream(e.to_string()))?;

        Ok(Box::new(CpalInput {
            _stream: stream,
            consumer,
            failed,
        }))
    }

    fn open_output(
        &self,
        profile: &StreamProfile,
        frames_per_buffer: u32,
    ) -> Result<Box<dyn FrameOutput>> {
        let codec = Codec::new(profile.sample_size)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(VocapError::NoDefaultOutputDevice)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = profile.sample_rate,
            sample_size = profile.sample_size,
            channels = profile.channels,
            "opening output stream"
        );

        let supported = device
            .default_output_config()
            .map_err(|e| VocapError::Device(e.to_string()))?;

        let config = StreamConfig {
            channels: profile.channels,
            sample_rate: SampleRate(profile.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(frames_per_buffer),
        };

        let (producer, consumer) = HeapRb::<u8>::new(RING_CAPACITY).split();
        let failed = Arc::new(AtomicBool::new(false));

        let stream = build_output_stream(
            &device,
            &config,
            supported.sample_format(),
            codec,
            consumer,
            Arc::clone(&failed),
        )?;

        stream
            .play()
            .map_err(|e| VocapError::Stream(e.to_string()))?;

        Ok(Box::new(CpalOutput {
            _stream: stream,
            producer,
            failed,
        }))
    }
}

/// Input stream handle. Not `Send` — create and drop on one thread.
struct CpalInput {
    /// Kept alive so the stream is not dropped prematurely.
    _stream: Stream,
    consumer: HeapCons<u8>,
    failed: Arc<AtomicBool>,
}

impl FrameInput for CpalInput {
    fn read_frame(&mut self, frame: &mut [u8]) -> Result<()> {
        while self.consumer.occupied_len() < frame.len() {
            if self.failed.load(Ordering::Relaxed) {
                return Err(VocapError::Stream("input stream failed".into()));
            }
            std::thread::sleep(RING_POLL);
        }
        self.consumer.pop_slice(frame);
        Ok(())
    }
}

/// Output stream handle. Not `Send` — create and drop on one thread.
struct CpalOutput {
    _stream: Stream,
    producer: HeapProd<u8>,
    failed: Arc<AtomicBool>,
}

impl FrameOutput for CpalOutput {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        while self.producer.vacant_len() < frame.len() {
            if self.failed.load(Ordering::Relaxed) {
                return Err(VocapError::Stream("output stream failed".into()));
            }
            std::thread::sleep(RING_POLL);
        }
        self.producer.push_slice(frame);
        Ok(())
    }
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    codec: Codec,
    mut producer: HeapProd<u8>,
    failed: Arc<AtomicBool>,
) -> Result<Stream> {
    let bits = codec.bits();
    let min = codec.min_value();
    let max = codec.max_value();
    let full_scale = (1i64 << (bits - 1)) as f64;

    let err_failed = Arc::clone(&failed);
    let err_fn = move |err| {
        error!("input stream error: {err}");
        err_failed.store(true, Ordering::Relaxed);
    };

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _info| {
                let mut scratch = [0u8; 4];
                let mut dropped = 0usize;
                for sample in data {
                    let value = ((*sample as f64 * full_scale) as i32).clamp(min, max);
                    codec.encode(value, &mut scratch[..codec.sample_size()]);
                    dropped += codec.sample_size()
                        - producer.push_slice(&scratch[..codec.sample_size()]);
                }
                if dropped > 0 {
                    warn!("input ring full: dropped {dropped} bytes");
                }
            },
            err_fn,
            None,
        ),

        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _info| {
                let mut scratch = [0u8; 4];
                let mut dropped = 0usize;
                for sample in data {
                    let value = rescale(*sample as i32, 16, bits);
                    codec.encode(value, &mut scratch[..codec.sample_size()]);
                    dropped += codec.sample_size()
                        - producer.push_slice(&scratch[..codec.sample_size()]);
                }
                if dropped > 0 {
                    warn!("input ring full: dropped {dropped} bytes");
                }
            },
            err_fn,
            None,
        ),

        SampleFormat::I32 => device.build_input_stream(
            config,
            move |data: &[i32], _info| {
                let mut scratch = [0u8; 4];
                let mut dropped = 0usize;
                for sample in data {
                    let value = rescale(*sample, 32, bits);
                    codec.encode(value, &mut scratch[..codec.sample_size()]);
                    dropped += codec.sample_size()
                        - producer.push_slice(&scratch[..codec.sample_size()]);
                }
                if dropped > 0 {
                    warn!("input ring full: dropped {dropped} bytes");
                }
            },
            err_fn,
            None,
        ),

        fmt => {
            return Err(VocapError::Stream(format!(
                "unsupported device sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| VocapError::Stream(e.to_string()))?;

    Ok(stream)
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    codec: Codec,
    mut consumer: HeapCons<u8>,
    failed: Arc<AtomicBool>,
) -> Result<Stream> {
    let bits = codec.bits();
    let full_scale = (1i64 << (bits - 1)) as f64;

    let err_failed = Arc::clone(&failed);
    let err_fn = move |err| {
        error!("output stream error: {err}");
        err_failed.store(true, Ordering::Relaxed);
    };

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _info| {
                let mut scratch = [0u8; 4];
                for slot in data.iter_mut() {
                    *slot = match pop_sample(&mut consumer, &codec, &mut scratch) {
                        Some(value) => (value as f64 / full_scale) as f32,
                        None => 0.0,
                    };
                }
            },
            err_fn,
            None,
        ),

        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _info| {
                let mut scratch = [0u8; 4];
                for slot in data.iter_mut() {
                    *slot = match pop_sample(&mut consumer, &codec, &mut scratch) {
                        Some(value) => rescale(value, bits, 16) as i16,
                        None => 0,
                    };
                }
            },
            err_fn,
            None,
        ),

        SampleFormat::I32 => device.build_output_stream(
            config,
            move |data: &mut [i32], _info| {
                let mut scratch = [0u8; 4];
                for slot in data.iter_mut() {
                    *slot = match pop_sample(&mut consumer, &codec, &mut scratch) {
                        Some(value) => rescale(value, bits, 32),
                        None => 0,
                    };
                }
            },
            err_fn,
            None,
        ),

        fmt => {
            return Err(VocapError::Stream(format!(
                "unsupported device sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| VocapError::Stream(e.to_string()))?;

    Ok(stream)
}

/// Pop one encoded sample from the ring, or `None` when it has run dry
/// (the callback then emits silence).
fn pop_sample(consumer: &mut HeapCons<u8>, codec: &Codec, scratch: &mut [u8; 4]) -> Option<i32> {
    let width = codec.sample_size();
    if consumer.occupied_len() < width {
        return None;
    }
    consumer.pop_slice(&mut scratch[..width]);
    Some(codec.decode(&scratch[..width]))
}
