//! End-to-end pipeline tests with mock audio, transcription and answer
//! clients under paused tokio time.

use async_trait::async_trait;
use meetmind::answer::client::AnswerClient;
use meetmind::answer::AnswerOrchestrator;
use meetmind::audio::recorder::MockAudioSource;
use meetmind::error::Result;
use meetmind::pipeline::{Pipeline, PipelineConfig};
use meetmind::present::RecordingSurface;
use meetmind::signal::{AudioSegment, ChunkEmitterConfig, Clock};
use meetmind::stt::{MockTranscriptionClient, TranscriptionClient};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const REPLY: &str = r#"{"hasQuestion": true, "question": "What is a trait object?", "answer": "A dynamically dispatched value.", "codeSnippet": null, "language": null}"#;

/// Clock that follows tokio's (pausable) time.
struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Answer client that records every user message it receives.
struct CapturingClient {
    requests: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AnswerClient for CapturingClient {
    async fn complete(&self, _system_prompt: &str, user_content: &str) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(user_content.to_string());
        }
        Ok(REPLY.to_string())
    }

    fn model_name(&self) -> &str {
        "capturing"
    }
}

fn orchestrator_capturing(
    requests: Arc<Mutex<Vec<String>>>,
    surface: Arc<RecordingSurface>,
) -> Arc<AnswerOrchestrator> {
    let mut orch = AnswerOrchestrator::new(Box::new(move || {
        Ok(Box::new(CapturingClient {
            requests: Arc::clone(&requests),
        }))
    }));
    orch.add_surface(surface);
    Arc::new(orch)
}

/// Frames the capture loop will read, one per 100 ms poll.
fn scripted_frames() -> Vec<Vec<f32>> {
    let voiced = vec![0.1f32; 1600];
    let quiet = vec![0.0005f32; 1600];

    let mut frames = Vec::new();
    // Three 3-second voiced chunks (30 polls each)
    for _ in 0..90 {
        frames.push(voiced.clone());
    }
    // Then sustained quiet, enough for the 1.5 s / 20-frame trigger
    for _ in 0..30 {
        frames.push(quiet.clone());
    }
    frames
}

#[tokio::test(start_paused = true)]
async fn three_chunks_then_silence_produce_one_answer_request() {
    let source = Box::new(MockAudioSource::new().with_frames(scripted_frames()));
    let transcription = Arc::new(
        MockTranscriptionClient::new().with_responses(&["what is", "a trait object", "in Rust?"]),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(Arc::clone(&requests), Arc::clone(&surface));

    let config = PipelineConfig {
        quiet: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    let handle = pipeline
        .start(source, transcription.clone(), orchestrator)
        .expect("pipeline start");

    // Scripted audio covers 12 s; give the trigger and answer time to land
    tokio::time::sleep(Duration::from_secs(15)).await;
    handle.stop().await;

    // Three voiced drains reached transcription, the quiet tail did not
    assert_eq!(transcription.call_count(), 3);

    // Exactly one end-of-utterance trigger, one answer request
    let requests = requests.lock().expect("requests");
    assert_eq!(requests.len(), 1);
    assert!(
        requests[0].contains("what is a trait object in Rust?"),
        "context should join the three fragments: {}",
        requests[0]
    );

    assert_eq!(surface.processing_count(), 1);
    assert_eq!(surface.answers().len(), 1);
    assert_eq!(surface.answers()[0].question, "What is a trait object?");
}

#[tokio::test(start_paused = true)]
async fn surface_dismiss_request_clears_the_shown_answer() {
    let source = Box::new(MockAudioSource::new().with_frames(scripted_frames()));
    let transcription = Arc::new(
        MockTranscriptionClient::new().with_responses(&["what is", "a trait object", "in Rust?"]),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(requests, Arc::clone(&surface));

    let config = PipelineConfig {
        quiet: true,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    pipeline.add_surface(surface.clone());
    let handle = pipeline
        .start(source, transcription, orchestrator)
        .expect("pipeline start");

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(surface.answers().len(), 1);
    assert_eq!(surface.dismiss_count(), 0);

    // A user action on the surface must reach the presenter and fan a
    // dismiss back out, well before the 30s auto-dismiss
    surface.request_dismiss();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(surface.dismiss_count(), 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn quiet_audio_never_reaches_transcription() {
    let frames = vec![vec![0.0005f32; 1600]; 60];
    let source = Box::new(MockAudioSource::new().with_frames(frames));
    let transcription = Arc::new(MockTranscriptionClient::new());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(Arc::clone(&requests), Arc::clone(&surface));

    let config = PipelineConfig {
        quiet: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    let handle = pipeline
        .start(source, transcription.clone(), orchestrator)
        .expect("pipeline start");

    tokio::time::sleep(Duration::from_secs(8)).await;
    handle.stop().await;

    assert_eq!(transcription.call_count(), 0);
    assert!(requests.lock().expect("requests").is_empty());
    assert_eq!(surface.processing_count(), 0);
}

/// Transcription client that records the rate and duration of every
/// segment it is handed.
struct SegmentRecordingClient {
    segments: Arc<Mutex<Vec<(u32, u64)>>>,
}

#[async_trait]
impl TranscriptionClient for SegmentRecordingClient {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        if let Ok(mut segments) = self.segments.lock() {
            segments.push((segment.sample_rate, segment.duration_ms()));
        }
        Ok(String::new())
    }

    fn model_name(&self) -> &str {
        "segment-recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn segment_rate_follows_the_audio_source() {
    // Emitter config claims 44.1kHz but the source delivers 16kHz;
    // the segment must carry the source's rate or the WAV upload is
    // mislabeled and plays back sped up.
    let voiced = vec![0.1f32; 1600];
    let mut frames = vec![voiced; 30];
    frames.extend(vec![vec![0.0005f32; 1600]; 10]);

    let source = Box::new(MockAudioSource::new().with_frames(frames));
    let segments = Arc::new(Mutex::new(Vec::new()));
    let transcription = Arc::new(SegmentRecordingClient {
        segments: Arc::clone(&segments),
    });
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(requests, surface);

    let config = PipelineConfig {
        emitter: ChunkEmitterConfig {
            sample_rate: 44_100,
            ..Default::default()
        },
        quiet: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    let handle = pipeline
        .start(source, transcription, orchestrator)
        .expect("pipeline start");

    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.stop().await;

    let segments = segments.lock().expect("segments");
    assert_eq!(segments.len(), 1);
    let (rate, duration_ms) = segments[0];
    assert_eq!(rate, 16_000);
    // 3 seconds of voiced audio, give or take a poll
    assert!((2_700..=3_300).contains(&duration_ms), "duration {duration_ms}");
}

#[tokio::test(start_paused = true)]
async fn hallucinated_fragments_do_not_trigger_answers() {
    // Voiced audio whose transcription is a known hallucination phrase
    let voiced = vec![0.1f32; 1600];
    let quiet = vec![0.0005f32; 1600];
    let mut frames = vec![voiced; 30];
    frames.extend(vec![quiet; 30]);

    let source = Box::new(MockAudioSource::new().with_frames(frames));
    let transcription = Arc::new(MockTranscriptionClient::new().with_responses(&["Thank you."]));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(Arc::clone(&requests), Arc::clone(&surface));

    let config = PipelineConfig {
        quiet: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    let handle = pipeline
        .start(source, transcription.clone(), orchestrator)
        .expect("pipeline start");

    tokio::time::sleep(Duration::from_secs(8)).await;
    handle.stop().await;

    assert_eq!(transcription.call_count(), 1);
    // The trigger fires on silence, but the window is empty so the
    // orchestrator declines the request
    assert!(requests.lock().expect("requests").is_empty());
    assert!(surface.answers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_releases_the_audio_source() {
    let source = Box::new(MockAudioSource::new().with_samples(vec![0.1f32; 1600]));
    let transcription = Arc::new(MockTranscriptionClient::new());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let surface = Arc::new(RecordingSurface::new());
    let orchestrator = orchestrator_capturing(requests, surface);

    let config = PipelineConfig {
        quiet: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).with_clock(Arc::new(TokioClock));
    let handle = pipeline
        .start(source, transcription, orchestrator)
        .expect("pipeline start");

    assert!(handle.is_running());
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.stop().await;
}
