//! Work queue port.

use std::collections::VecDeque;
use streamkernel_core::Envelope;

/// FIFO work queue of envelopes.
///
/// The runner dequeues strictly one envelope at a time; a node's
/// fan-out is enqueued contiguously, but no cross-branch ordering is
/// promised beyond FIFO dequeue order.
pub trait QueuePort {
    /// Enqueue an envelope at the back
    fn push(&mut self, envelope: Envelope);

    /// Dequeue the front envelope, if any
    fn pop(&mut self) -> Option<Envelope>;

    /// Number of pending envelopes
    fn size(&self) -> usize;
}

/// In-memory FIFO queue
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    inner: VecDeque<Envelope>,
}

impl InMemoryQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueuePort for InMemoryQueue {
    fn push(&mut self, envelope: Envelope) {
        self.inner.push_back(envelope);
    }

    fn pop(&mut self) -> Option<Envelope> {
        self.inner.pop_front()
    }

    fn size(&self) -> usize {
        self.inner.len()
    }
}

impl From<Vec<Envelope>> for InMemoryQueue {
    fn from(envelopes: Vec<Envelope>) -> Self {
        Self {
            inner: envelopes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamkernel_core::TypedValue;

    fn envelope(message_type: &str) -> Envelope {
        Envelope::new(TypedValue::marker(message_type).into_payload())
    }

    #[test]
    fn test_queue_fifo_order() {
        let mut queue = InMemoryQueue::new();
        queue.push(envelope("a"));
        queue.push(envelope("b"));
        queue.push(envelope("c"));

        assert_eq!(queue.size(), 3);
        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.payload.message_type().as_str().to_string())
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_queue_pop_empty() {
        let mut queue = InMemoryQueue::new();
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_queue_from_vec() {
        let mut queue = InMemoryQueue::from(vec![envelope("x"), envelope("y")]);
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.pop().unwrap().payload.message_type().as_str(), "x");
    }
}
