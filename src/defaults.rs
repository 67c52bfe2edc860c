//! Default configuration constants for meetmind.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and upload size for remote transcription.
pub const SAMPLE_RATE: u32 = 16000;

/// Interval between chunk-emitter ticks in milliseconds.
///
/// Every tick drains the signal buffer into one audio segment. 3 seconds
/// keeps transcription latency low without flooding the provider with
/// tiny uploads.
pub const CHUNK_INTERVAL_MS: u64 = 3000;

/// Minimum number of samples a drained segment must contain.
///
/// Drains shorter than this are too short to carry intelligible speech
/// and are discarded without computing energy.
pub const MIN_CHUNK_SAMPLES: usize = 1000;

/// Minimum RMS energy for a drained segment to be sent for transcription.
///
/// Segments below this are silence or ambient noise. Skipping them avoids
/// needless remote calls and the hallucinated output speech-to-text models
/// produce on near-silent audio. Samples are on a [-1, 1] scale.
pub const CHUNK_ENERGY_THRESHOLD: f32 = 0.01;

/// RMS threshold the silence trigger uses for its sustained-quiet judgment.
///
/// Separate from [`CHUNK_ENERGY_THRESHOLD`]: the per-segment drop
/// decision and the end-of-utterance decision are tuned independently
/// and only happen to share a value today.
pub const SILENCE_TRIGGER_THRESHOLD: f32 = 0.01;

/// Sustained quiet duration in milliseconds before the silence trigger fires.
///
/// 1.5 seconds of continuous sub-threshold energy marks the end of an
/// utterance. The trigger is edge-triggered: it fires once and latches
/// until energy rises above threshold again.
pub const SILENCE_DURATION_MS: u64 = 1500;

/// Number of most-recent buffered frames the silence trigger inspects.
pub const SILENCE_CHECK_FRAMES: usize = 20;

/// Retention window for transcript fragments in milliseconds.
///
/// Fragments older than 60 seconds are evicted lazily on the next read;
/// the joined survivors form both the live transcript and the context
/// sent with answer requests.
pub const ROLLING_WINDOW_MS: u64 = 60_000;

/// Total attempts for a remote call (initial try + retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay in milliseconds.
///
/// Attempt n sleeps `BACKOFF_BASE_MS * 2^(n-1)` before retrying: 1s, 2s.
pub const BACKOFF_BASE_MS: u64 = 1000;

/// Timeout for remote provider calls in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default auto-dismiss duration for a displayed answer in seconds.
///
/// 0 means never auto-dismiss.
pub const DISMISS_SECS: u64 = 30;

/// Maximum length of a synthesized question, in characters.
pub const QUESTION_TRUNCATE_CHARS: usize = 200;

/// Maximum length of a synthesized answer, in characters.
pub const ANSWER_TRUNCATE_CHARS: usize = 4000;

/// Default answer provider.
pub const DEFAULT_ANSWER_PROVIDER: &str = "groq";

/// Default transcription provider.
pub const DEFAULT_TRANSCRIPTION_PROVIDER: &str = "groq";

/// System prompt establishing the JSON answer contract.
///
/// The contract matters more than the prose: the model must reply with a
/// single JSON object whose `answer` and `codeSnippet` fields are flat
/// strings. Parsing tolerates violations, but the prompt keeps them rare.
pub const SYSTEM_PROMPT: &str = r#"You are an expert interview assistant helping a candidate during a live technical/behavioral interview. Provide clear, well-structured answers the candidate can quickly scan and mentally map.

CRITICAL RULES:
1. Respond with ONLY one valid JSON object - no text outside the JSON.
2. The "answer" field MUST be a single flat STRING (not an object, not an array). Put ALL formatting inside that one string using newlines.
3. The "codeSnippet" field must be a single flat STRING of code, or null.

ANSWER FORMATTING (inside the answer string):
- Start with a 1-line definition
- Use bullet points for key concepts, each on a new line
- Use numbered lists (1. 2. 3.) for processes/steps
- Use CAPS or brackets for section headers like [DEFINITION], [KEY POINTS], [EXAMPLE], [FOLLOW-UP]
- For comparisons, use simple text tables with | separators
- Keep it 150-400 words, structured for instant scanning under interview pressure
- For coding questions, put the code in codeSnippet and explain the approach in answer
- For behavioral questions, use STAR format (Situation, Task, Action, Result)

QUALITY: Give interview-perfect answers covering definition, key points, example, and common follow-ups.

EXACT JSON shape (all values are strings or null):
{"hasQuestion": true, "question": "the question", "answer": "your full answer as a single string with newlines", "codeSnippet": null, "language": null}"#;

/// When the latest utterance is empty, fall back to this many trailing
/// characters of the window text.
pub const UTTERANCE_FALLBACK_CHARS: usize = 500;

/// Phrases speech-to-text models emit on low-information audio.
///
/// Matched case-insensitively against the whole trimmed fragment; a hit
/// means the fragment is dropped before it can pollute the transcript or
/// trigger an answer. Partial matches pass through.
pub const HALLUCINATION_PHRASES: &[&str] = &[
    "thank you",
    "thank you.",
    "thanks.",
    "thanks for watching.",
    "thanks for watching",
    "thank you for watching.",
    "thank you for watching",
    "thanks for listening.",
    "thanks for listening",
    "amen.",
    "amen",
    "beep.",
    "beep",
    "bye.",
    "bye",
    "goodbye.",
    "goodbye",
    "hello?",
    "hello.",
    "hello",
    "hmm.",
    "hmm",
    "hm.",
    "oh.",
    "ah.",
    "shh.",
    "shh",
    "you",
    "you.",
    ".",
    "..",
    "...",
    "the end.",
    "the end",
    "subtitles by the amara.org community",
    "please subscribe.",
    "please subscribe",
    "like and subscribe.",
    "like and subscribe",
    "silence.",
    "silence",
    "so.",
    "so",
    "yeah.",
    "yeah",
];
