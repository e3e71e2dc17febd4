//! Cancelable one-shot timers for the reconnect loop.
//!
//! The client never sleeps itself. It asks a [`Scheduler`] for a timer and
//! keeps the returned [`TimerId`]; the driver reports the timer back through
//! `StreamClient::on_timer` when it fires. Runtimes plug in their own
//! scheduler (a tokio deadline, `setTimeout` in the browser), and tests use
//! [`ManualScheduler`] to fire timers by hand.

use std::time::Duration;

/// Handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

pub trait Scheduler {
    /// Arm a one-shot timer `delay` from now.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Revoke a timer. Cancelling a fired or unknown timer is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Scheduler that only records requests; timers fire when the owner says so.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<(TimerId, Duration)>,
    scheduled_total: usize,
    cancelled_total: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers armed and not yet fired or cancelled, oldest first.
    pub fn pending(&self) -> &[(TimerId, Duration)] {
        &self.pending
    }

    /// Remove and return the oldest pending timer, as if it had fired.
    pub fn fire_next(&mut self) -> Option<TimerId> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0).0)
        }
    }

    /// Timers ever armed.
    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total
    }

    /// Timers revoked before firing.
    pub fn cancelled_total(&self) -> usize {
        self.cancelled_total
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((id, delay));
        self.scheduled_total += 1;
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != id);
        if self.pending.len() != before {
            self.cancelled_total += 1;
        }
    }
}
