//! Command-line interface for meetmind
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live meeting answer assistant
#[derive(Parser, Debug)]
#[command(name = "meetmind", version, about = "Live meeting answer assistant")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (answers still render)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Audio input device (see `meetmind devices`)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Language code hint for transcription (e.g., en, de, es)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Answer provider override (groq, openai, claude)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Auto-dismiss shown answers after this long (0 = never). Examples: 30s, 2m
    #[arg(long, value_name = "DURATION", value_parser = parse_dismiss_secs)]
    pub dismiss: Option<u64>,
}

/// Parse a dismiss duration string into seconds.
///
/// Supports any duration format accepted by `humantime` plus bare numbers
/// (seconds). `0` disables auto-dismiss.
fn parse_dismiss_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// Ask a typed question through the answer flow (no audio needed)
    Ask {
        /// The question text
        question: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
}
