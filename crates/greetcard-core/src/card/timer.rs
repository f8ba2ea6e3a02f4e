//! Virtual-time timer queue
//!
//! Deadlines are offsets from the owning card's mount time. Timers fire in
//! deadline order; timers sharing a deadline fire in scheduling order.
//! Dropping or clearing the queue cancels everything still pending.

use std::collections::BTreeMap;
use std::time::Duration;

/// Deadline-ordered queue of pending timers
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), T>,
}

impl<T> TimerQueue<T> {
    /// Create an empty queue at time zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Current virtual time
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `item` to fire `after` from now
    pub fn schedule(&mut self, after: Duration, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((self.now + after, seq), item);
    }

    /// Deadline of the earliest pending timer
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer if it is due at or before `until`
    ///
    /// Moves the clock to that timer's deadline so anything scheduled by its
    /// handler is measured from the moment it fired.
    pub fn fire_next(&mut self, until: Duration) -> Option<T> {
        let deadline = self.next_deadline()?;
        if deadline > until {
            return None;
        }
        let (_, item) = self.pending.pop_first()?;
        self.now = self.now.max(deadline);
        Some(item)
    }

    /// Move the clock forward to `at` (never backwards)
    #[inline]
    pub fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }

    /// Cancel every pending timer
    #[inline]
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending timers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no timers are pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
