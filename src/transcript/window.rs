//! Rolling transcript window with hallucination filtering.
//!
//! Transcription models emit stock phrases ("thank you", "subtitles by
//! the amara.org community") on near-silent audio. Fragments matching the
//! denylist are rejected before they ever enter the window, so they can
//! neither pad the context nor trigger an answer.

use crate::defaults;
use crate::signal::{Clock, SystemClock};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// One accepted transcript fragment with its arrival time.
#[derive(Debug, Clone)]
struct TranscriptFragment {
    timestamp: Instant,
    text: String,
}

/// Accumulates transcript fragments over a rolling time window.
pub struct UtteranceAccumulator<C: Clock = SystemClock> {
    fragments: VecDeque<TranscriptFragment>,
    denylist: HashSet<String>,
    window: Duration,
    clock: C,
}

impl<C: Clock> UtteranceAccumulator<C> {
    /// Creates an accumulator with the given denylist (phrases must be
    /// pre-lowercased) and window length.
    pub fn with_clock(denylist: HashSet<String>, window: Duration, clock: C) -> Self {
        Self {
            fragments: VecDeque::new(),
            denylist,
            window,
            clock,
        }
    }

    /// Offers a fragment to the window. Returns true if it was accepted.
    ///
    /// Rejects whitespace-only text and case-insensitive exact matches
    /// against the denylist.
    pub fn add_fragment(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.denylist.contains(&trimmed.to_lowercase()) {
            return false;
        }

        self.fragments.push_back(TranscriptFragment {
            timestamp: self.clock.now(),
            text: trimmed.to_string(),
        });
        true
    }

    /// Evicts expired fragments, then returns the window text: fragments
    /// in arrival order, joined with single spaces.
    pub fn current_window(&mut self) -> String {
        self.evict();
        let parts: Vec<&str> = self.fragments.iter().map(|f| f.text.as_str()).collect();
        parts.join(" ")
    }

    /// Most recent accepted fragment still inside the window, if any.
    pub fn last_fragment(&mut self) -> Option<String> {
        self.evict();
        self.fragments.back().map(|f| f.text.clone())
    }

    /// Word count over the live window (whitespace-separated).
    pub fn word_count(&mut self) -> usize {
        self.evict();
        self.fragments
            .iter()
            .map(|f| f.text.split_whitespace().count())
            .sum()
    }

    /// Discards all fragments.
    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    fn evict(&mut self) {
        let now = self.clock.now();
        while let Some(front) = self.fragments.front() {
            if now.duration_since(front.timestamp) > self.window {
                self.fragments.pop_front();
            } else {
                break;
            }
        }
    }
}

impl UtteranceAccumulator<SystemClock> {
    /// Creates an accumulator with the system clock and default window.
    pub fn new(denylist: HashSet<String>) -> Self {
        Self::with_clock(
            denylist,
            Duration::from_millis(defaults::ROLLING_WINDOW_MS),
            SystemClock,
        )
    }
}
