//! Hayes `+++` escape detection for online mode.
//!
//! A sequence counts only when it is surrounded by silence: one guard time
//! before the first escape character, each following one within a guard
//! time of the previous, and one guard time of quiet afterwards. The
//! detector only sees bytes; the trailing quiet is confirmed by whoever
//! holds the ticket returned from [`EscapeDetector::feed`], after sleeping
//! for the guard time.

use std::time::{Duration, Instant};

const SEQUENCE_LEN: u8 = 3;

#[derive(Debug, Default, Clone)]
pub struct EscapeDetector {
    last_input: Option<Instant>,
    count: u8,
    pending: Option<u64>,
    next_ticket: u64,
}

impl EscapeDetector {
    /// Feeds one online-mode byte. Returns a ticket when the third escape
    /// character arrived in time; the escape is pending until
    /// [`confirm`](Self::confirm)ed or cancelled by further input.
    ///
    /// `escape_char` of `None` disables detection. A zero `guard_time`
    /// disables the timing checks.
    pub fn feed(
        &mut self,
        byte: u8,
        now: Instant,
        escape_char: Option<u8>,
        guard_time: Duration,
    ) -> Option<u64> {
        let since_last = self
            .last_input
            .map(|t| now.saturating_duration_since(t));
        self.last_input = Some(now);
        self.pending = None;

        if escape_char != Some(byte) {
            self.count = 0;
            return None;
        }

        let untimed = guard_time.is_zero();
        let quiet_before = untimed || since_last.is_none_or(|d| d >= guard_time);
        let in_time = if self.count == 0 {
            quiet_before
        } else {
            untimed || since_last.is_some_and(|d| d < guard_time)
        };

        if !in_time {
            // too slow for the running sequence, but the pause may open a new one
            self.count = if quiet_before { 1 } else { 0 };
            return None;
        }

        self.count += 1;
        if self.count < SEQUENCE_LEN {
            return None;
        }

        self.count = 0;
        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        self.pending
    }

    /// True (once) if `ticket` is still pending, i.e. nothing was typed
    /// since the sequence completed.
    pub fn confirm(&mut self, ticket: u64) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget sequence progress as of `now`. Outstanding tickets stay
    /// invalid and the leading silence is measured from `now`.
    pub fn reset_at(&mut self, now: Instant) {
        self.last_input = Some(now);
        self.count = 0;
        self.pending = None;
    }
}
