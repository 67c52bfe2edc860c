//! End-of-utterance detection.
//!
//! Watches per-frame energy levels and fires once when speech is followed
//! by sustained quiet. The trigger is edge-latched: after firing it stays
//! quiet until voice resumes, so an ongoing pause produces exactly one
//! end-of-utterance event.

use crate::defaults;
use crate::signal::{Clock, SystemClock};
use std::collections::VecDeque;
use std::time::Instant;

/// Configuration for the silence trigger.
#[derive(Debug, Clone, Copy)]
pub struct SilenceTriggerConfig {
    /// RMS level below which a frame counts as quiet (0.0 to 1.0).
    pub threshold: f32,
    /// Sustained quiet needed before the trigger fires (milliseconds).
    pub silence_duration_ms: u64,
    /// Number of recent frames that must all be quiet.
    pub check_frames: usize,
}

impl Default for SilenceTriggerConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::SILENCE_TRIGGER_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            check_frames: defaults::SILENCE_CHECK_FRAMES,
        }
    }
}

/// Edge-latched end-of-utterance trigger.
pub struct SilenceTrigger<C: Clock = SystemClock> {
    config: SilenceTriggerConfig,
    recent_levels: VecDeque<f32>,
    quiet_since: Option<Instant>,
    heard_voice: bool,
    fired: bool,
    clock: C,
}

impl<C: Clock> SilenceTrigger<C> {
    /// Creates a trigger with the given configuration and clock.
    pub fn with_clock(config: SilenceTriggerConfig, clock: C) -> Self {
        Self {
            config,
            recent_levels: VecDeque::with_capacity(config.check_frames),
            quiet_since: None,
            heard_voice: false,
            fired: false,
            clock,
        }
    }

    /// Feeds one frame's energy level. Returns true exactly when speech
    /// followed by sustained quiet is confirmed.
    ///
    /// Never fires before any voice has been heard, and never fires twice
    /// within the same pause.
    pub fn observe(&mut self, level: f32) -> bool {
        if self.recent_levels.len() == self.config.check_frames {
            self.recent_levels.pop_front();
        }
        self.recent_levels.push_back(level);

        let is_quiet = level < self.config.threshold;
        let now = self.clock.now();

        if !is_quiet {
            self.heard_voice = true;
            self.quiet_since = None;
            self.fired = false;
            return false;
        }

        let quiet_since = *self.quiet_since.get_or_insert(now);

        if self.fired || !self.heard_voice {
            return false;
        }

        let quiet_elapsed = now.duration_since(quiet_since).as_millis() as u64;
        if quiet_elapsed < self.config.silence_duration_ms {
            return false;
        }

        let all_recent_quiet = self
            .recent_levels
            .iter()
            .all(|&l| l < self.config.threshold);
        if !all_recent_quiet {
            return false;
        }

        self.fired = true;
        true
    }

    /// Clears all state, as if no audio had been seen.
    pub fn reset(&mut self) {
        self.recent_levels.clear();
        self.quiet_since = None;
        self.heard_voice = false;
        self.fired = false;
    }
}

impl SilenceTrigger<SystemClock> {
    /// Creates a trigger with the system clock.
    pub fn new(config: SilenceTriggerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MockClock;
    use std::time::Duration;

    const VOICE: f32 = 0.1;
    const QUIET: f32 = 0.001;

    fn trigger_with_clock() -> (SilenceTrigger<MockClock>, MockClock) {
        let clock = MockClock::new();
        let trigger = SilenceTrigger::with_clock(SilenceTriggerConfig::default(), clock.clone());
        (trigger, clock)
    }

    #[test]
    fn test_fires_after_voice_then_sustained_quiet() {
        let (mut trigger, clock) = trigger_with_clock();

        assert!(!trigger.observe(VOICE));
        // 20 quiet frames spread over 2 seconds
        let mut fired = 0;
        for _ in 0..20 {
            clock.advance(Duration::from_millis(100));
            if trigger.observe(QUIET) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_never_fires_without_prior_voice() {
        let (mut trigger, clock) = trigger_with_clock();
        for _ in 0..40 {
            clock.advance(Duration::from_millis(100));
            assert!(!trigger.observe(QUIET));
        }
    }

    #[test]
    fn test_latch_prevents_second_fire_in_same_pause() {
        let (mut trigger, clock) = trigger_with_clock();
        trigger.observe(VOICE);
        let mut fires = 0;
        for _ in 0..100 {
            clock.advance(Duration::from_millis(100));
            if trigger.observe(QUIET) {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn test_voice_resets_latch_allowing_next_fire() {
        let (mut trigger, clock) = trigger_with_clock();
        trigger.observe(VOICE);
        for _ in 0..20 {
            clock.advance(Duration::from_millis(100));
            trigger.observe(QUIET);
        }
        // New utterance
        clock.advance(Duration::from_millis(100));
        assert!(!trigger.observe(VOICE));
        let mut fires = 0;
        for _ in 0..20 {
            clock.advance(Duration::from_millis(100));
            if trigger.observe(QUIET) {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn test_brief_pause_does_not_fire() {
        let (mut trigger, clock) = trigger_with_clock();
        trigger.observe(VOICE);
        // 1 second of quiet, under the 1.5s duration
        for _ in 0..10 {
            clock.advance(Duration::from_millis(100));
            assert!(!trigger.observe(QUIET));
        }
        // Speech resumes
        clock.advance(Duration::from_millis(100));
        assert!(!trigger.observe(VOICE));
    }

    #[test]
    fn test_recent_voiced_frame_blocks_fire() {
        let config = SilenceTriggerConfig {
            check_frames: 5,
            ..Default::default()
        };
        let clock = MockClock::new();
        let mut trigger = SilenceTrigger::with_clock(config, clock.clone());

        trigger.observe(VOICE);
        clock.advance(Duration::from_millis(1600));
        // A voiced frame inside the check window resets quiet tracking
        assert!(!trigger.observe(VOICE));
        clock.advance(Duration::from_millis(100));
        assert!(!trigger.observe(QUIET));
    }

    #[test]
    fn test_reset_clears_voice_history() {
        let (mut trigger, clock) = trigger_with_clock();
        trigger.observe(VOICE);
        trigger.reset();
        for _ in 0..30 {
            clock.advance(Duration::from_millis(100));
            assert!(!trigger.observe(QUIET));
        }
    }
}
