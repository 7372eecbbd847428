//! Thread-safe sequence counter for chat message ids.
//!
//! Chat entries carry a monotonically increasing id so that clients can
//! order them and de-duplicate redeliveries.  The counter is atomic so it
//! can be shared by reference without a lock, although on the server it
//! normally lives inside a session that is already locked.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing id source.
///
/// The first id handed out is 1; 0 is never issued, so clients may use it
/// as a "nothing seen yet" marker.
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter whose first [`next`](Self::next) value is 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// `Ordering::Relaxed` is sufficient: ids only need to be unique and
    /// increasing, they do not publish any other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_counter_starts_at_one() {
        let counter = SequenceCounter::new();

        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }

    #[test]
    fn test_sequence_counter_is_thread_safe() {
        let counter = Arc::new(SequenceCounter::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..500).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();
        all.sort_unstable();
        all.dedup();

        assert_eq!(all.len(), 2000, "every id must be unique across threads");
        assert_eq!(all.first(), Some(&1));
    }
}
