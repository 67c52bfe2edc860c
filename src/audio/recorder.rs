use crate::defaults;
use crate::error::{MeetmindError, Result};
use std::collections::VecDeque;

/// A device the pipeline can pull audio from.
///
/// Implementations hand out mono f32 samples in [-1, 1] at
/// [`sample_rate`](AudioSource::sample_rate). The pipeline polls
/// [`read_samples`](AudioSource::read_samples) and expects each call to
/// drain whatever accumulated since the previous one.
pub trait AudioSource: Send + Sync {
    /// Begin capturing.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and release the device.
    fn stop(&mut self) -> Result<()>;

    /// Take all samples captured since the last call. Empty when
    /// nothing new arrived.
    fn read_samples(&mut self) -> Result<Vec<f32>>;

    /// Capture rate in Hz.
    fn sample_rate(&self) -> u32;
}

/// In-memory source for tests.
///
/// Either loops a single frame forever ([`with_samples`]) or plays a
/// script of frames once and then goes silent ([`with_frames`]).
///
/// [`with_samples`]: MockAudioSource::with_samples
/// [`with_frames`]: MockAudioSource::with_frames
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    started: bool,
    script: VecDeque<Vec<f32>>,
    looped: Option<Vec<f32>>,
    fail_start: bool,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            started: false,
            script: VecDeque::new(),
            looped: Some(vec![0.0; 160]),
            fail_start: false,
        }
    }

    /// Every read returns a copy of `samples`.
    pub fn with_samples(mut self, samples: Vec<f32>) -> Self {
        self.looped = Some(samples);
        self.script.clear();
        self
    }

    /// Reads consume `frames` in order, then return empty.
    pub fn with_frames(mut self, frames: Vec<Vec<f32>>) -> Self {
        self.script = frames.into();
        self.looped = None;
        self
    }

    /// Makes [`start`](AudioSource::start) fail, for error path tests.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(MeetmindError::AudioCapture {
                message: "mock refused to start".to_string(),
            });
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if let Some(frame) = self.script.pop_front() {
            return Ok(frame);
        }
        Ok(self.looped.clone().unwrap_or_default())
    }

    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looped_frame_repeats() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let mut source = MockAudioSource::new().with_samples(samples.clone());

        assert_eq!(source.read_samples().unwrap(), samples);
        assert_eq!(source.read_samples().unwrap(), samples);
    }

    #[test]
    fn test_scripted_frames_then_silence() {
        let mut source =
            MockAudioSource::new().with_frames(vec![vec![0.5f32; 10], vec![0.0f32; 10]]);

        assert_eq!(source.read_samples().unwrap(), vec![0.5f32; 10]);
        assert_eq!(source.read_samples().unwrap(), vec![0.0f32; 10]);
        assert!(source.read_samples().unwrap().is_empty());
    }

    #[test]
    fn test_start_stop_transitions() {
        let mut source = MockAudioSource::new();

        assert!(!source.is_started());
        source.start().unwrap();
        assert!(source.is_started());
        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_start_failure_leaves_source_stopped() {
        let mut source = MockAudioSource::new().with_start_failure();

        let err = source.start().unwrap_err();
        assert!(!source.is_started());
        assert!(matches!(err, MeetmindError::AudioCapture { .. }));
    }

    #[test]
    fn test_source_works_as_trait_object() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_samples(vec![0.25f32; 5]));

        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap(), vec![0.25f32; 5]);
        assert_eq!(source.sample_rate(), 16000);
        source.stop().unwrap();
    }
}
