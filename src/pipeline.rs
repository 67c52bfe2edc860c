//! Audio-to-answer pipeline that runs from startup until shutdown.

use crate::answer::AnswerOrchestrator;
use crate::defaults;
use crate::error::{MeetmindError, Result};
use crate::audio::recorder::AudioSource;
use crate::output;
use crate::present::{DisplaySurface, PresentationState, Presenter, SurfaceEvent, SurfaceEvents};
use crate::signal::{
    rms, ChunkEmitter, ChunkEmitterConfig, Clock, SignalBuffer, SilenceTrigger,
    SilenceTriggerConfig, SystemClock,
};
use crate::stt::TranscriptionClient;
use crate::transcript::UtteranceAccumulator;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often captured samples are pulled and the silence trigger is fed.
const POLL_INTERVAL_MS: u64 = 100;

/// How often the auto-dismiss deadline is checked.
const DISMISS_POLL_MS: u64 = 250;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between chunk emissions.
    pub chunk_interval: Duration,
    /// Chunk gating (size floor, energy threshold).
    pub emitter: ChunkEmitterConfig,
    /// End-of-utterance detection.
    pub silence: SilenceTriggerConfig,
    /// Rolling transcript window length.
    pub window: Duration,
    /// Pre-resolved hallucination phrases (lowercased).
    pub denylist: HashSet<String>,
    /// Seconds before a shown answer auto-dismisses. 0 = never.
    pub dismiss_secs: u64,
    /// Suppress status messages.
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_millis(defaults::CHUNK_INTERVAL_MS),
            emitter: ChunkEmitterConfig::default(),
            silence: SilenceTriggerConfig::default(),
            window: Duration::from_millis(defaults::ROLLING_WINDOW_MS),
            denylist: defaults::HALLUCINATION_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            dismiss_secs: defaults::DISMISS_SECS,
            quiet: false,
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Stops the pipeline: loops exit on their next tick and the audio
    /// source is released. An in-flight remote call completes on its own
    /// but its result is discarded.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);

        for task in self.tasks.drain(..) {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) if join_err.is_panic() => {
                    eprintln!("meetmind: pipeline task panicked: {}", join_err);
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    eprintln!("meetmind: shutdown timeout, detaching task");
                }
            }
        }
    }

    /// Returns true if the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Audio pipeline: AudioSource → SignalBuffer → {ChunkEmitter,
/// SilenceTrigger} → TranscriptionClient → UtteranceAccumulator →
/// AnswerOrchestrator → surfaces.
pub struct Pipeline {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    surfaces: Vec<Arc<dyn DisplaySurface>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            surfaces: Vec::new(),
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a surface for dismiss notifications. Answer and
    /// processing notifications come from the orchestrator, which carries
    /// its own surface list.
    pub fn add_surface(&mut self, surface: Arc<dyn DisplaySurface>) {
        self.surfaces.push(surface);
    }

    /// Starts the pipeline.
    ///
    /// # Arguments
    /// * `audio_source` - Audio capture source
    /// * `transcription` - Remote speech-to-text client
    /// * `orchestrator` - Answer request driver (surfaces already registered)
    pub fn start(
        self,
        mut audio_source: Box<dyn AudioSource>,
        transcription: Arc<dyn TranscriptionClient>,
        orchestrator: Arc<AnswerOrchestrator>,
    ) -> Result<PipelineHandle> {
        audio_source.start()?;

        // Segments must be labeled with the rate the source actually
        // delivers, or the WAV upload plays back at the wrong speed.
        let mut emitter_config = self.config.emitter;
        emitter_config.sample_rate = audio_source.sample_rate();

        let running = Arc::new(AtomicBool::new(true));
        let buffer = Arc::new(Mutex::new(SignalBuffer::new()));
        let accumulator = Arc::new(Mutex::new(UtteranceAccumulator::with_clock(
            self.config.denylist.clone(),
            self.config.window,
            Arc::clone(&self.clock),
        )));
        let presenter = Arc::new(Mutex::new(Presenter::with_clock(
            Duration::from_secs(self.config.dismiss_secs),
            Arc::clone(&self.clock),
        )));
        let (trigger_tx, trigger_rx) = tokio::sync::mpsc::channel::<()>(4);

        // Inbound channel for user actions coming back from surfaces
        let (surface_events, surface_events_rx) = SurfaceEvents::channel();
        for surface in &self.surfaces {
            surface.connect(surface_events.clone());
        }

        let mut tasks = Vec::new();
        tasks.push(self.spawn_capture_loop(
            audio_source,
            Arc::clone(&running),
            Arc::clone(&buffer),
            trigger_tx,
        ));
        tasks.push(self.spawn_chunk_loop(
            Arc::clone(&running),
            Arc::clone(&buffer),
            transcription,
            Arc::clone(&accumulator),
            emitter_config,
        ));
        tasks.push(self.spawn_answer_loop(
            Arc::clone(&running),
            trigger_rx,
            accumulator,
            orchestrator,
            Arc::clone(&presenter),
        ));
        tasks.push(self.spawn_dismiss_loop(Arc::clone(&running), presenter, surface_events_rx));

        Ok(PipelineHandle { running, tasks })
    }

    /// Pulls captured samples into the buffer and feeds the silence
    /// trigger with per-frame energy.
    fn spawn_capture_loop(
        &self,
        mut audio_source: Box<dyn AudioSource>,
        running: Arc<AtomicBool>,
        buffer: Arc<Mutex<SignalBuffer>>,
        trigger_tx: tokio::sync::mpsc::Sender<()>,
    ) -> JoinHandle<()> {
        let mut trigger =
            SilenceTrigger::with_clock(self.config.silence, Arc::clone(&self.clock));
        let quiet = self.config.quiet;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
            while running.load(Ordering::SeqCst) {
                interval.tick().await;

                let frame = match audio_source.read_samples() {
                    Ok(frame) => frame,
                    Err(err) => {
                        output::error_notice(&err, quiet);
                        continue;
                    }
                };
                if frame.is_empty() {
                    continue;
                }

                let level = rms(&frame);
                if let Ok(mut buf) = buffer.lock() {
                    buf.push(&frame);
                }
                if trigger.observe(level) {
                    // Full channel means a trigger is already pending
                    let _ = trigger_tx.try_send(());
                }
            }

            if let Err(err) = audio_source.stop() {
                output::error_notice(&err, quiet);
            }
        })
    }

    /// Drains the buffer on each interval, gates the batch, and feeds
    /// accepted transcripts into the rolling window.
    fn spawn_chunk_loop(
        &self,
        running: Arc<AtomicBool>,
        buffer: Arc<Mutex<SignalBuffer>>,
        transcription: Arc<dyn TranscriptionClient>,
        accumulator: Arc<Mutex<UtteranceAccumulator<Arc<dyn Clock>>>>,
        emitter_config: ChunkEmitterConfig,
    ) -> JoinHandle<()> {
        let emitter = ChunkEmitter::new(emitter_config);
        let chunk_interval = self.config.chunk_interval;
        let quiet = self.config.quiet;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(chunk_interval);
            // The first tick of a tokio interval fires immediately
            interval.tick().await;

            while running.load(Ordering::SeqCst) {
                interval.tick().await;

                let drained = match buffer.lock() {
                    Ok(mut buf) => buf.drain(),
                    Err(_) => continue,
                };
                let Some(segment) = emitter.emit(drained) else {
                    continue;
                };

                let text = match transcription.transcribe(&segment).await {
                    Ok(text) => text,
                    Err(err) => {
                        output::error_notice(&err, quiet);
                        continue;
                    }
                };
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if let Ok(mut acc) = accumulator.lock() {
                    if acc.add_fragment(&text) && !quiet {
                        output::transcript_line(&text, acc.word_count());
                    }
                }
            }
        })
    }

    /// Waits for end-of-utterance triggers and runs the answer flow.
    fn spawn_answer_loop(
        &self,
        running: Arc<AtomicBool>,
        mut trigger_rx: tokio::sync::mpsc::Receiver<()>,
        accumulator: Arc<Mutex<UtteranceAccumulator<Arc<dyn Clock>>>>,
        orchestrator: Arc<AnswerOrchestrator>,
        presenter: Arc<Mutex<Presenter<Arc<dyn Clock>>>>,
    ) -> JoinHandle<()> {
        let quiet = self.config.quiet;

        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let received = tokio::time::timeout(
                    Duration::from_millis(POLL_INTERVAL_MS),
                    trigger_rx.recv(),
                )
                .await;
                match received {
                    Ok(Some(())) => {}
                    Ok(None) => break,
                    Err(_) => continue,
                }
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let (utterance, context) = match accumulator.lock() {
                    Ok(mut acc) => {
                        (acc.last_fragment().unwrap_or_default(), acc.current_window())
                    }
                    Err(_) => continue,
                };

                if let Ok(mut p) = presenter.lock() {
                    p.request_submitted();
                }
                let outcome = orchestrator.request_answer(&utterance, &context).await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                match outcome {
                    Ok(Some(answer)) => {
                        if let Ok(mut p) = presenter.lock() {
                            p.answer_ready(answer);
                        }
                    }
                    Ok(None) => {
                        if let Ok(mut p) = presenter.lock() {
                            p.request_settled_empty();
                        }
                    }
                    Err(MeetmindError::RequestInProgress) => {
                        // Keep the in-flight request; this trigger is dropped
                    }
                    Err(err) => {
                        output::error_notice(&err, quiet);
                        if let Ok(mut p) = presenter.lock() {
                            p.request_settled_empty();
                        }
                    }
                }
            }
        })
    }

    /// Polls the auto-dismiss deadline and handles user actions coming
    /// back from surfaces.
    fn spawn_dismiss_loop(
        &self,
        running: Arc<AtomicBool>,
        presenter: Arc<Mutex<Presenter<Arc<dyn Clock>>>>,
        mut events_rx: tokio::sync::mpsc::UnboundedReceiver<SurfaceEvent>,
    ) -> JoinHandle<()> {
        let surfaces = self.surfaces.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(DISMISS_POLL_MS));
            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {
                        let fired = presenter.lock().map(|mut p| p.tick()).unwrap_or(false);
                        if fired {
                            for surface in &surfaces {
                                surface.dismiss();
                            }
                        }
                    }
                    Some(event) = events_rx.recv() => match event {
                        SurfaceEvent::DismissRequested => {
                            let was_showing = presenter
                                .lock()
                                .map(|mut p| {
                                    let showing = p.state() == PresentationState::Showing;
                                    p.dismiss();
                                    showing
                                })
                                .unwrap_or(false);
                            if was_showing {
                                for surface in &surfaces {
                                    surface.dismiss();
                                }
                            }
                        }
                        SurfaceEvent::CopyRequested => {
                            if let Ok(p) = presenter.lock()
                                && let Some(answer) = p.current()
                            {
                                output::answer_text(answer);
                            }
                        }
                    }
                }
            }
        })
    }
}
