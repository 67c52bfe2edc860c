//! Display surfaces for answers.

use crate::answer::StructuredAnswer;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Actions a user can take on a displayed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Clear the current answer.
    DismissRequested,
    /// Write the current answer's text to stdout.
    CopyRequested,
}

/// Sender half handed to every surface, for user actions flowing back
/// into the pipeline.
#[derive(Clone)]
pub struct SurfaceEvents {
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl SurfaceEvents {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn dismiss_requested(&self) {
        let _ = self.tx.send(SurfaceEvent::DismissRequested);
    }

    pub fn copy_requested(&self) {
        let _ = self.tx.send(SurfaceEvent::CopyRequested);
    }
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Destination for answer lifecycle events.
///
/// Implementations must tolerate being called from async tasks; keep the
/// methods non-blocking.
pub trait DisplaySurface: Send + Sync {
    /// A question was detected and a request is on its way.
    fn question_processing(&self);

    /// A displayable answer arrived.
    fn new_answer(&self, answer: &StructuredAnswer);

    /// The current answer should disappear.
    fn dismiss(&self);

    /// Hands the surface a channel for sending user actions back.
    /// Surfaces with no input of their own can ignore it.
    fn connect(&self, _events: SurfaceEvents) {}
}

/// Renders answer cards to stderr.
///
/// stderr keeps the cards out of anything piped from stdout.
pub struct TerminalSurface {
    quiet: bool,
}

impl TerminalSurface {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl DisplaySurface for TerminalSurface {
    fn question_processing(&self) {
        if !self.quiet {
            eprintln!("{DIM}thinking...{RESET}");
        }
    }

    fn new_answer(&self, answer: &StructuredAnswer) {
        eprintln!();
        eprintln!("{CYAN}{BOLD}Q:{RESET} {}", answer.question);
        eprintln!("{GREEN}{BOLD}A:{RESET}");
        for line in answer.answer.lines() {
            eprintln!("  {}", line);
        }
        if let Some(code) = &answer.code_snippet {
            let lang = answer.language.as_deref().unwrap_or("");
            eprintln!();
            eprintln!("{DIM}--- code {} ---{RESET}", lang);
            for line in code.lines() {
                eprintln!("  {}", line);
            }
            eprintln!("{DIM}---{RESET}");
        }
        eprintln!();
    }

    fn dismiss(&self) {
        if !self.quiet {
            eprintln!("{DIM}(answer dismissed){RESET}");
        }
    }
}

/// Surface that records every event, for assertions in tests.
#[derive(Default)]
pub struct RecordingSurface {
    processing: Mutex<usize>,
    answers: Mutex<Vec<StructuredAnswer>>,
    dismissals: Mutex<usize>,
    events: Mutex<Option<SurfaceEvents>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a dismiss action, as a user closing the answer would.
    pub fn request_dismiss(&self) {
        if let Ok(events) = self.events.lock()
            && let Some(events) = events.as_ref()
        {
            events.dismiss_requested();
        }
    }

    /// Sends a copy action.
    pub fn request_copy(&self) {
        if let Ok(events) = self.events.lock()
            && let Some(events) = events.as_ref()
        {
            events.copy_requested();
        }
    }

    pub fn processing_count(&self) -> usize {
        self.processing.lock().map(|c| *c).unwrap_or(0)
    }

    pub fn answers(&self) -> Vec<StructuredAnswer> {
        self.answers.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn dismiss_count(&self) -> usize {
        self.dismissals.lock().map(|c| *c).unwrap_or(0)
    }
}

impl DisplaySurface for RecordingSurface {
    fn question_processing(&self) {
        if let Ok(mut count) = self.processing.lock() {
            *count += 1;
        }
    }

    fn new_answer(&self, answer: &StructuredAnswer) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push(answer.clone());
        }
    }

    fn dismiss(&self) {
        if let Ok(mut count) = self.dismissals.lock() {
            *count += 1;
        }
    }

    fn connect(&self, events: SurfaceEvents) {
        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(events);
        }
    }
}
