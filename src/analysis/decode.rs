//! Audio decoding with symphonia

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono PCM decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono f32 samples (channel average), capped at the decode limit
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source stream
    pub channels: u16,
    /// Total duration of the stream in seconds, not just the decoded part
    pub duration_secs: f32,
}

/// Decode an audio file to mono f32 samples
///
/// At most `max_secs` seconds are kept in memory. The reported duration
/// comes from the container when it knows the frame count.
pub fn decode_to_mono(path: &Path, max_secs: f32) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Failed to probe audio format: {:?}", path))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("No sample rate in audio track")?;
    let total_frames = track.codec_params.n_frames;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let max_samples = (sample_rate as f32 * max_secs.max(1.0)) as usize;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet in {:?}: {:?}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Skipping undecodable packet in {:?}: {:?}", path, e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let count = spec.channels.count();
        if channels == 0 {
            channels = count as u16;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        if count > 1 {
            samples.extend(
                sample_buf
                    .samples()
                    .chunks(count)
                    .map(|frame| frame.iter().sum::<f32>() / count as f32),
            );
        } else {
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.len() >= max_samples {
            samples.truncate(max_samples);
            break;
        }
    }

    if samples.is_empty() {
        anyhow::bail!("No audio could be decoded from {:?}", path);
    }

    let duration_secs = match total_frames {
        Some(frames) => frames as f32 / sample_rate as f32,
        None => samples.len() as f32 / sample_rate as f32,
    };

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_requires_file() {
        assert!(decode_to_mono(Path::new("/nonexistent/file.mp3"), 30.0).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();

        assert!(decode_to_mono(&path, 30.0).is_err());
    }
}
