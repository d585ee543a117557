//! Send scheduling
//!
//! Decides when the trailing document text is due to be transmitted. Two
//! signals feed it: word-boundary activity and a fixed idle poll. Both are
//! subject to a minimum interval between transmissions so fast typists
//! can't flood the generation service.

use std::time::{Duration, Instant};

/// Tracks send bookkeeping for one session
///
/// Time is always passed in by the caller so the gate can be driven
/// deterministically in tests.
#[derive(Debug, Clone)]
pub struct SendScheduler {
    /// Minimum time between two transmissions
    min_interval: Duration,
    /// When the last transmission went out (None = never)
    last_sent_at: Option<Instant>,
    /// A word boundary was seen since the last transmission
    unsent: bool,
}

impl SendScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent_at: None,
            unsent: false,
        }
    }

    /// Whether the minimum-interval gate is open at `now`
    ///
    /// Always open before the first transmission.
    pub fn gate_open(&self, now: Instant) -> bool {
        match self.last_sent_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Record a word-boundary event
    ///
    /// Marks a send as owed. Returns true if the gate is open and the
    /// caller should transmit right away.
    pub fn mark_activity(&mut self, now: Instant) -> bool {
        self.unsent = true;
        self.gate_open(now)
    }

    /// Idle poll
    ///
    /// Returns true when a send is owed, or when the cursor sits at the end
    /// of the document with no candidates on display (the writer stopped
    /// without hitting the trigger key). Either way the gate must be open.
    pub fn tick(&self, now: Instant, cursor_at_end: bool, has_candidates: bool) -> bool {
        let forgot_trigger = cursor_at_end && !has_candidates;
        (self.unsent || forgot_trigger) && self.gate_open(now)
    }

    /// Record an actual transmission
    pub fn record_sent(&mut self, now: Instant) {
        self.unsent = false;
        self.last_sent_at = Some(now);
    }

    pub fn is_unsent(&self) -> bool {
        self.unsent
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }
}

/// Trailing slice of `text` to use as a prompt
///
/// Keeps the last `window` characters. Returns None when that slice is
/// empty or whitespace-only, in which case nothing should be sent.
pub fn prompt_window(text: &str, window: usize) -> Option<&str> {
    let total = text.chars().count();
    let start = if total > window {
        text.char_indices()
            .nth(total - window)
            .map_or(text.len(), |(i, _)| i)
    } else {
        0
    };
    let slice = &text[start..];

    if slice.trim().is_empty() {
        return None;
    }
    Some(slice)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
