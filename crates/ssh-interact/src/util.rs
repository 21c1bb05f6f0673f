//! Small internal helpers.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline bookkeeping for polling loops.
///
/// `None` means no deadline at all: expect and tail loops treat an absent
/// deadline as "poll forever", which is the explicit no-timeout opt-in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    deadline: Option<Instant>,
}

impl Deadline {
    /// Create a deadline `timeout` from now, or an unbounded one.
    pub(crate) fn from_now(timeout: Option<Duration>) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Check if the deadline has passed. Unbounded deadlines never expire.
    pub(crate) fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left until the deadline, saturating at zero.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Shrink a poll slice so it never overshoots the deadline.
    pub(crate) fn clamp(&self, slice: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => slice.min(remaining),
            None => slice,
        }
    }
}
