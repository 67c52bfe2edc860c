//! Remote speech-to-text.

pub mod client;

pub use client::{HttpTranscriptionClient, MockTranscriptionClient, TranscriptionClient};
