//! Error types for meetmind.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeetmindError {
    #[error("config file not found: {path}")]
    ConfigFileNotFound { path: String },

    #[error("bad config value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Missing credential is a local precondition failure, checked
    /// before any remote call is made. Never retried.
    #[error("No API key configured for provider '{provider}'")]
    MissingCredential { provider: String },

    #[error("capture device '{device}' not found")]
    AudioDeviceNotFound { device: String },

    #[error("audio capture: {message}")]
    AudioCapture { message: String },

    // Transient remote errors, retried per policy. Only the final
    // attempt's error surfaces.
    #[error("Provider rejected the API key (401)")]
    Unauthorized,

    #[error("Provider rate limit hit (429)")]
    RateLimited,

    #[error("Remote call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Provider error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {message}")]
    Network { message: String },

    // Model output that could not be parsed. Recovered locally via
    // best-effort synthesis; callers should not treat it as fatal.
    #[error("Unparseable model response: {message}")]
    MalformedResponse { message: String },

    /// A second answer request arrived while one was outstanding.
    /// Surfaced immediately, never queued or retried.
    #[error("Answer request already in progress")]
    RequestInProgress,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl MeetmindError {
    /// Whether the error is worth another attempt.
    ///
    /// All remote failures are retryable; local preconditions
    /// (missing credential, request-in-progress) are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MeetmindError::Unauthorized
                | MeetmindError::RateLimited
                | MeetmindError::Timeout { .. }
                | MeetmindError::Server { .. }
                | MeetmindError::Network { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MeetmindError>;
