//! Chunk emission: turns drained sample batches into transcribable segments.

use crate::audio::wav;
use crate::defaults;
use crate::error::Result;
use crate::signal::energy::rms;

/// Configuration for chunk emission.
#[derive(Debug, Clone, Copy)]
pub struct ChunkEmitterConfig {
    /// Segments with fewer samples than this are dropped.
    pub min_samples: usize,
    /// Segments whose RMS falls below this are dropped as silence.
    pub energy_threshold: f32,
    /// Sample rate carried into the emitted segment.
    pub sample_rate: u32,
}

impl Default for ChunkEmitterConfig {
    fn default() -> Self {
        Self {
            min_samples: defaults::MIN_CHUNK_SAMPLES,
            energy_threshold: defaults::CHUNK_ENERGY_THRESHOLD,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// A voiced audio segment ready for transcription.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// RMS level measured at emission time.
    pub level: f32,
}

impl AudioSegment {
    /// Encodes the segment as a 16-bit mono WAV file for upload.
    pub fn wav_bytes(&self) -> Result<Vec<u8>> {
        wav::encode_wav(&self.samples, self.sample_rate)
    }

    /// Segment duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Gates drained sample batches on size and energy.
#[derive(Debug, Clone, Copy)]
pub struct ChunkEmitter {
    config: ChunkEmitterConfig,
}

impl ChunkEmitter {
    pub fn new(config: ChunkEmitterConfig) -> Self {
        Self { config }
    }

    /// Evaluates one drained batch. Returns a segment only when the batch
    /// is long enough and carries audible energy; otherwise the samples
    /// are discarded without reaching the transcription backend.
    pub fn emit(&self, samples: Vec<f32>) -> Option<AudioSegment> {
        if samples.len() < self.config.min_samples {
            return None;
        }

        let level = rms(&samples);
        if level < self.config.energy_threshold {
            return None;
        }

        Some(AudioSegment {
            samples,
            sample_rate: self.config.sample_rate,
            level,
        })
    }
}
