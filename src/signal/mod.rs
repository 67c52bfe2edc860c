//! Signal-level processing: buffering, energy measurement, chunk emission
//! and the end-of-utterance silence trigger.

pub mod buffer;
pub mod chunker;
pub mod energy;
pub mod silence;

pub use buffer::SignalBuffer;
pub use chunker::{AudioSegment, ChunkEmitter, ChunkEmitterConfig};
pub use energy::rms;
pub use silence::{SilenceTrigger, SilenceTriggerConfig};

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Allow sharing one clock across pipeline components.
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mock clock for testing that allows manual time advancement.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Creates a new mock clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Advances the mock clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += duration;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.current
            .lock()
            .map(|current| *current)
            .unwrap_or_else(|_| Instant::now())
    }
}
