//! Presentation lifecycle state machine.
//!
//! Auto-dismiss is a stored deadline checked by `tick()`, not a spawned
//! timer. That keeps the invariants cheap: at most one deadline exists,
//! and leaving Showing for any reason clears it.

use crate::answer::StructuredAnswer;
use crate::defaults;
use crate::signal::{Clock, SystemClock};
use std::time::{Duration, Instant};

/// Where the presentation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    /// Nothing pending or shown.
    Idle,
    /// A request was submitted; waiting for its answer.
    Loading,
    /// An answer is on screen.
    Showing,
}

/// Drives answer visibility through Idle → Loading → Showing → Idle.
pub struct Presenter<C: Clock = SystemClock> {
    state: PresentationState,
    current: Option<StructuredAnswer>,
    deadline: Option<Instant>,
    dismiss_after: Duration,
    clock: C,
}

impl<C: Clock> Presenter<C> {
    /// Creates a presenter. `dismiss_after` of zero means answers stay
    /// until explicitly dismissed or superseded.
    pub fn with_clock(dismiss_after: Duration, clock: C) -> Self {
        Self {
            state: PresentationState::Idle,
            current: None,
            deadline: None,
            dismiss_after,
            clock,
        }
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    /// The answer currently shown, if any.
    pub fn current(&self) -> Option<&StructuredAnswer> {
        self.current.as_ref()
    }

    /// A new request went out. Supersedes whatever was showing.
    pub fn request_submitted(&mut self) {
        self.state = PresentationState::Loading;
        self.current = None;
        self.deadline = None;
    }

    /// The request produced a displayable answer.
    pub fn answer_ready(&mut self, answer: StructuredAnswer) {
        self.state = PresentationState::Showing;
        self.current = Some(answer);
        self.deadline = if self.dismiss_after.is_zero() {
            None
        } else {
            Some(self.clock.now() + self.dismiss_after)
        };
    }

    /// The request failed or was suppressed; return to idle.
    pub fn request_settled_empty(&mut self) {
        if self.state == PresentationState::Loading {
            self.state = PresentationState::Idle;
        }
    }

    /// Explicit user dismissal.
    pub fn dismiss(&mut self) {
        self.state = PresentationState::Idle;
        self.current = None;
        self.deadline = None;
    }

    /// Polls the auto-dismiss deadline. Returns true exactly when the
    /// deadline fired and the answer was cleared.
    pub fn tick(&mut self) -> bool {
        if self.state != PresentationState::Showing {
            return false;
        }
        match self.deadline {
            Some(deadline) if self.clock.now() >= deadline => {
                self.dismiss();
                true
            }
            _ => false,
        }
    }
}

impl Presenter<SystemClock> {
    /// Creates a presenter with the system clock and default timeout.
    pub fn new() -> Self {
        Self::with_clock(Duration::from_secs(defaults::DISMISS_SECS), SystemClock)
    }
}

impl Default for Presenter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}
