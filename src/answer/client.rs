//! Remote answer-model clients.

use crate::config::ResolvedAnswer;
use crate::defaults;
use crate::error::{MeetmindError, Result};
use crate::stt::client::{map_status_error, map_transport_error};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Trait for answer-model completion.
///
/// One call per answer request attempt; retry policy lives in the
/// orchestrator, not here.
#[async_trait]
pub trait AnswerClient: Send + Sync {
    /// Send a system + user message pair, returning the model's raw text.
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String>;

    /// Name of the model answering.
    fn model_name(&self) -> &str;
}

/// Build the right client for a resolved answer provider.
pub fn build_client(resolved: ResolvedAnswer) -> Result<Box<dyn AnswerClient>> {
    match resolved.provider.as_str() {
        "claude" => Ok(Box::new(AnthropicClient::new(resolved)?)),
        "groq" => Ok(Box::new(OpenAiCompatClient::new(GROQ_BASE_URL, resolved)?)),
        "openai" => Ok(Box::new(OpenAiCompatClient::new(OPENAI_BASE_URL, resolved)?)),
        other => Err(MeetmindError::ConfigInvalidValue {
            key: "answer.provider".to_string(),
            message: format!("unknown provider '{}' (expected groq, openai, or claude)", other),
        }),
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| MeetmindError::Network {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, Groq).
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, resolved: ResolvedAnswer) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: resolved.api_key,
            model: resolved.model,
            max_tokens: resolved.max_tokens,
            temperature: resolved.temperature,
        })
    }
}

#[async_trait]
impl AnswerClient for OpenAiCompatClient {
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content},
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_status_error(response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| MeetmindError::MalformedResponse {
                message: format!("Completion response was not JSON: {}", e),
            })?;

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Messages-API client for Anthropic models.
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(resolved: ResolvedAnswer) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: resolved.api_key,
            model: resolved.model,
            max_tokens: resolved.max_tokens,
        })
    }
}

#[async_trait]
impl AnswerClient for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system_prompt,
            "messages": [
                {"role": "user", "content": user_content},
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_status_error(response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| MeetmindError::MalformedResponse {
                message: format!("Messages response was not JSON: {}", e),
            })?;

        let text = json["content"][0]["text"].as_str().unwrap_or("").to_string();
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock answer client with scripted per-attempt outcomes.
pub struct MockAnswerClient {
    outcomes: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<usize>,
}

impl MockAnswerClient {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// Queue one attempt outcome; consumed in order.
    pub fn push_outcome(self, outcome: Result<String>) -> Self {
        if let Ok(mut queue) = self.outcomes.lock() {
            queue.push_back(outcome);
        }
        self
    }

    /// Convenience: a client that always succeeds with `reply`.
    pub fn always(reply: &str) -> Self {
        let reply = reply.to_string();
        let mock = Self::new();
        // Empty queue means fall through to the stored default
        if let Ok(mut queue) = mock.outcomes.lock() {
            queue.push_back(Ok(reply));
        }
        mock
    }

    /// Number of complete calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

impl Default for MockAnswerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerClient for MockAnswerClient {
    async fn complete(&self, _system_prompt: &str, _user_content: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        let next = self.outcomes.lock().ok().and_then(|mut queue| {
            // Keep replaying the last outcome if it was a success
            if queue.len() == 1
                && let Some(Ok(reply)) = queue.front()
            {
                return Some(Ok(reply.clone()));
            }
            queue.pop_front()
        });
        next.unwrap_or_else(|| {
            Err(MeetmindError::Network {
                message: "mock answer client exhausted".to_string(),
            })
        })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(provider: &str) -> ResolvedAnswer {
        ResolvedAnswer {
            provider: provider.to_string(),
            api_key: "key".to_string(),
            model: "m".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
        }
    }

    #[test]
    fn test_build_client_known_providers() {
        assert!(build_client(resolved("groq")).is_ok());
        assert!(build_client(resolved("openai")).is_ok());
        assert!(build_client(resolved("claude")).is_ok());
    }

    #[test]
    fn test_build_client_unknown_provider() {
        match build_client(resolved("cohere")) {
            Err(err) => assert!(!err.is_transient()),
            Ok(_) => panic!("unknown provider must be rejected"),
        }
    }

    #[tokio::test]
    async fn test_mock_scripted_outcomes() {
        let mock = MockAnswerClient::new()
            .push_outcome(Err(MeetmindError::RateLimited))
            .push_outcome(Ok("second try".to_string()));

        assert!(mock.complete("s", "u").await.is_err());
        assert_eq!(mock.complete("s", "u").await.unwrap(), "second try");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_always_replays() {
        let mock = MockAnswerClient::always("hi");
        assert_eq!(mock.complete("s", "u").await.unwrap(), "hi");
        assert_eq!(mock.complete("s", "u").await.unwrap(), "hi");
    }
}
