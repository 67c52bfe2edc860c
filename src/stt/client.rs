//! Speech-to-text clients.

use crate::config::ResolvedTranscription;
use crate::defaults;
use crate::error::{MeetmindError, Result};
use crate::signal::AudioSegment;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (remote API vs mock).
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe a voiced audio segment to text.
    ///
    /// Returns the raw transcript, which may be empty or a known
    /// hallucination; filtering happens downstream.
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String>;

    /// Name of the model handling transcription.
    fn model_name(&self) -> &str;
}

/// Remote transcription over an OpenAI-compatible `/audio/transcriptions`
/// endpoint (Groq and OpenAI both speak it).
pub struct HttpTranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    language: Option<String>,
}

impl HttpTranscriptionClient {
    pub fn new(resolved: ResolvedTranscription) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MeetmindError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: resolved.base_url,
            api_key: resolved.api_key,
            model: resolved.model,
            language: resolved.language,
        })
    }
}

/// Map a non-success HTTP response to the error taxonomy.
pub(crate) async fn map_status_error(response: reqwest::Response) -> MeetmindError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 | 403 => MeetmindError::Unauthorized,
        429 => MeetmindError::RateLimited,
        _ => MeetmindError::Server {
            status: status.as_u16(),
            body: truncate_body(&body),
        },
    }
}

/// Map a reqwest transport error (timeout, DNS, connect) to the taxonomy.
pub(crate) fn map_transport_error(err: reqwest::Error) -> MeetmindError {
    if err.is_timeout() {
        MeetmindError::Timeout {
            secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    } else {
        MeetmindError::Network {
            message: err.to_string(),
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let end = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        body[..end].to_string()
    }
}

#[async_trait]
impl TranscriptionClient for HttpTranscriptionClient {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        if segment.samples.is_empty() {
            return Ok(String::new());
        }

        let wav = segment.wav_bytes()?;
        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| MeetmindError::Network {
                message: format!("Failed to build upload part: {}", e),
            })?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_status_error(response).await);
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| MeetmindError::MalformedResponse {
                    message: format!("Transcription response was not JSON: {}", e),
                })?;

        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock transcription client for testing.
///
/// Returns scripted responses in order, then empty strings. Records how
/// many times it was called.
pub struct MockTranscriptionClient {
    responses: Mutex<Vec<String>>,
    calls: Mutex<usize>,
    should_fail: bool,
}

impl MockTranscriptionClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
            should_fail: false,
        }
    }

    /// Queue scripted responses, returned one per call in order.
    pub fn with_responses(self, responses: &[&str]) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            *queue = responses.iter().rev().map(|s| s.to_string()).collect();
        }
        self
    }

    /// Configure the mock to fail every call with a network error.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcribe calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

impl Default for MockTranscriptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptionClient for MockTranscriptionClient {
    async fn transcribe(&self, _segment: &AudioSegment) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        if self.should_fail {
            return Err(MeetmindError::Network {
                message: "mock transcription failure".to_string(),
            });
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop());
        Ok(next.unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
