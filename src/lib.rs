//! meetmind - live meeting answer assistant
//!
//! Captures audio continuously, transcribes it remotely, detects when a
//! question has finished, and renders a structured answer.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod answer;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod signal;
pub mod stt;
pub mod transcript;

// Core traits (source → process → notify)
pub use audio::recorder::AudioSource;
pub use present::surface::DisplaySurface;
pub use stt::client::TranscriptionClient;

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle};

// Answer flow
pub use answer::{AnswerOrchestrator, StructuredAnswer};

// Error handling
pub use error::{MeetmindError, Result};

// Config
pub use config::Config;

/// Crate version, suffixed with the git commit hash when one was baked
/// in at build time (`"0.3.1+abc1234"`).
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{version}+{hash}"),
        _ => version.to_string(),
    }
}
