//! Shared sample buffer between the capture callback and the chunk loop.

/// Append-only store of captured samples, drained in chunk-sized batches.
///
/// `drain()` hands the accumulated samples to the chunker in one move and
/// leaves an empty buffer behind, so no sample is lost between reads and
/// none is read twice. `recent(n)` is a non-consuming view of the
/// freshest audio for callers that want to peek without disturbing the
/// next drain.
#[derive(Debug, Default)]
pub struct SignalBuffer {
    samples: Vec<f32>,
}

impl SignalBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Appends a frame of samples in arrival order.
    pub fn push(&mut self, frame: &[f32]) {
        self.samples.extend_from_slice(frame);
    }

    /// Takes all accumulated samples, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    /// Returns up to the last `n` samples without consuming them.
    pub fn recent(&self, n: usize) -> &[f32] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Discards all buffered samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut buf = SignalBuffer::new();
        buf.push(&[0.1, 0.2]);
        buf.push(&[0.3]);
        assert_eq!(buf.drain(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_drain_leaves_empty_buffer() {
        let mut buf = SignalBuffer::new();
        buf.push(&[0.5; 100]);
        let drained = buf.drain();
        assert_eq!(drained.len(), 100);
        assert!(buf.is_empty());
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn test_samples_never_duplicated_across_drains() {
        let mut buf = SignalBuffer::new();
        buf.push(&[1.0, 2.0]);
        let first = buf.drain();
        buf.push(&[3.0]);
        let second = buf.drain();
        assert_eq!(first, vec![1.0, 2.0]);
        assert_eq!(second, vec![3.0]);
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut buf = SignalBuffer::new();
        buf.push(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(buf.recent(2), &[0.3, 0.4]);
        // Non-consuming
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_recent_clamps_to_available() {
        let mut buf = SignalBuffer::new();
        buf.push(&[0.1, 0.2]);
        assert_eq!(buf.recent(10), &[0.1, 0.2]);
        assert!(SignalBuffer::new().recent(5).is_empty());
    }
}
