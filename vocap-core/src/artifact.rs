//! Recording artifacts.
//!
//! Takes are stored as flat interleaved little-endian PCM at the configured
//! sample width — no header, no framing. Channel count and width travel
//! out-of-band with the configuration that produced the file. A raw artifact
//! can be wrapped into a RIFF/WAVE container afterwards for tools that need
//! one.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;

use crate::codec::Codec;
use crate::config::StreamProfile;
use crate::error::Result;

/// Write interleaved samples as headerless PCM at the codec's width.
///
/// A failure may leave a partial file behind; nothing is rolled back.
pub fn write_pcm(path: &Path, samples: &[i32], codec: &Codec) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut scratch = [0u8; 4];
    let width = codec.sample_size();
    for sample in samples {
        codec.encode(*sample, &mut scratch[..width]);
        writer.write_all(&scratch[..width])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a headerless PCM file back into interleaved samples.
///
/// Trailing bytes that do not fill a whole sample are discarded, matching
/// the playback loop's treatment of a truncated final frame.
pub fn read_pcm(path: &Path, codec: &Codec) -> Result<Vec<i32>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let width = codec.sample_size();
    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| codec.decode(chunk))
        .collect())
}

/// Wrap a raw PCM artifact into a WAV file with the profile's shape.
pub fn pcm_to_wav(raw: &Path, wav: &Path, profile: &StreamProfile) -> Result<()> {
    let codec = Codec::new(profile.sample_size)?;
    let samples = read_pcm(raw, &codec)?;

    let spec = hound::WavSpec {
        channels: profile.channels,
        sample_rate: profile.sample_rate,
        bits_per_sample: codec.bits() as u16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(wav, spec)
        .with_context(|| format!("create wav file {}", wav.display()))?;
    for sample in &samples {
        writer
            .write_sample(*sample)
            .context("write wav sample")?;
    }
    writer.finalize().context("finalize wav file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vocap-artifact-{}-{name}", std::process::id()))
    }

    #[test]
    fn pcm_round_trip_at_24_bit() {
        let codec = Codec::new(3).unwrap();
        let samples = vec![0, 1, -1, 8_388_607, -8_388_608, 1_258_291];
        let path = temp_path("roundtrip.raw");

        write_pcm(&path, &samples, &codec).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 18);
        assert_eq!(read_pcm(&path, &codec).unwrap(), samples);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn pcm_bytes_are_little_endian() {
        let codec = Codec::new(2).unwrap();
        let path = temp_path("le.raw");
        write_pcm(&path, &[0x0102, -2], &codec).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x02, 0x01, 0xFE, 0xFF]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn wav_wrapping_preserves_samples() {
        let profile = StreamProfile::new(20_000, 2, 1);
        let codec = Codec::new(2).unwrap();
        let samples = vec![100, -100, 32_767, -32_768];

        let raw = temp_path("wrap.raw");
        let wav = temp_path("wrap.wav");
        write_pcm(&raw, &samples, &codec).unwrap();
        pcm_to_wav(&raw, &wav, &profile).unwrap();

        let mut reader = hound::WavReader::open(&wav).unwrap();
        assert_eq!(reader.spec().sample_rate, 20_000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let read: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);

        std::fs::remove_file(&raw).ok();
        std::fs::remove_file(&wav).ok();
    }
}
