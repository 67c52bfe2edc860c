//! WAV encoding for transcription uploads.

use crate::error::{MeetmindError, Result};
use std::io::Cursor;

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory.
///
/// Samples are clamped to [-1.0, 1.0] before conversion. The transcription
/// endpoints accept WAV uploads directly, so no temp file is needed.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| MeetmindError::Other(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let value = (clamped * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| MeetmindError::Other(format!("Failed to write WAV sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| MeetmindError::Other(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// Resample mono audio with linear interpolation.
///
/// Good enough for speech going to a transcription model; a proper
/// band-limited resampler is not worth the dependency here.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples[idx.min(samples.len() - 1)]
        };
        output.push(sample);
    }

    output
}
