//! Answer orchestration: serialization, retry, parse, notify.

use crate::answer::client::AnswerClient;
use crate::answer::parse::{parse_response, ParseOutcome};
use crate::answer::StructuredAnswer;
use crate::defaults;
use crate::error::{MeetmindError, Result};
use crate::present::surface::DisplaySurface;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a fresh answer client from current settings.
///
/// Called on every request so provider, credential, and model changes
/// take effect without restarting the pipeline.
pub type ClientFactory = Box<dyn Fn() -> Result<Box<dyn AnswerClient>> + Send + Sync>;

/// Serializes answer requests and drives the retry loop.
pub struct AnswerOrchestrator {
    factory: ClientFactory,
    surfaces: Vec<Arc<dyn DisplaySurface>>,
    system_prompt: String,
    in_flight: AtomicBool,
    running: Option<Arc<AtomicBool>>,
    max_attempts: u32,
    backoff_base_ms: u64,
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AnswerOrchestrator {
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            surfaces: Vec::new(),
            system_prompt: defaults::SYSTEM_PROMPT.to_string(),
            in_flight: AtomicBool::new(false),
            running: None,
            max_attempts: defaults::MAX_ATTEMPTS,
            backoff_base_ms: defaults::BACKOFF_BASE_MS,
        }
    }

    /// Ties the orchestrator to a pipeline running flag. When the flag
    /// drops while a request is in flight, the completed result is
    /// discarded and no surface is notified.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Registers a surface to be notified of request lifecycle events.
    pub fn add_surface(&mut self, surface: Arc<dyn DisplaySurface>) {
        self.surfaces.push(surface);
    }

    /// Overrides the default system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Requests an answer for the utterance, with the rolling window as
    /// context.
    ///
    /// Returns `Ok(None)` when there is nothing to ask or the model found
    /// no question; `Ok(Some)` carries an answer that was already pushed
    /// to surfaces. At most one request runs at a time; a concurrent call
    /// fails fast with `RequestInProgress` and leaves the in-flight
    /// request untouched.
    pub async fn request_answer(
        &self,
        utterance: &str,
        context: &str,
    ) -> Result<Option<StructuredAnswer>> {
        let utterance = utterance.trim();
        let context = context.trim();
        if utterance.is_empty() && context.is_empty() {
            return Ok(None);
        }

        // Empty utterance falls back to the freshest slice of context
        let effective_utterance = if utterance.is_empty() {
            tail_chars(context, defaults::UTTERANCE_FALLBACK_CHARS)
        } else {
            utterance.to_string()
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MeetmindError::RequestInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        // Resolve provider and credentials now, not at startup
        let client = (self.factory)()?;

        for surface in &self.surfaces {
            surface.question_processing();
        }

        let user_content = build_user_content(&effective_utterance, context);
        let text = self.complete_with_retry(client.as_ref(), &user_content).await?;

        // The pipeline stopped while we were waiting; drop the result
        if let Some(running) = &self.running
            && !running.load(Ordering::Acquire)
        {
            return Ok(None);
        }

        let outcome = parse_response(&text, &effective_utterance);
        let answer = match outcome {
            ParseOutcome::Parsed(a) | ParseOutcome::Synthesized(a) => a,
            ParseOutcome::Unparseable(_) => return Ok(None),
        };

        if !answer.has_question {
            return Ok(None);
        }

        for surface in &self.surfaces {
            surface.new_answer(&answer);
        }
        Ok(Some(answer))
    }

    async fn complete_with_retry(
        &self,
        client: &dyn AnswerClient,
        user_content: &str,
    ) -> Result<String> {
        let mut attempt = 1;
        loop {
            match client.complete(&self.system_prompt, user_content).await {
                Ok(text) => return Ok(text),
                // Everything out of `complete` is a remote failure,
                // including a body that fails to decode, so every error
                // is worth the remaining attempts.
                Err(err) if attempt < self.max_attempts => {
                    let delay = self.backoff_base_ms * (1 << (attempt - 1));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Message layout the answer model receives.
fn build_user_content(utterance: &str, context: &str) -> String {
    let transcript = if context.is_empty() { utterance } else { context };
    format!("Transcript:\n{}\n\nLast utterance: {}", transcript, utterance)
}

/// Last `max` characters of a string, on char boundaries.
fn tail_chars(s: &str, max: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(max)).collect()
}
