use std::time::{Duration, Instant};

use crate::core::TimestampKey;

/// One firing of the poll timer, stamped with the batch it was armed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub batch_key: TimestampKey,
    pub seq: u64,
    pub at: Instant,
}

/// Recurring poll task bound to one batch.
///
/// Re-arming supersedes every tick handed out before, even when the same
/// batch is armed again: a tick is current only if its key matches and it
/// was issued after the latest `arm`.
#[derive(Debug)]
pub struct TickSchedule {
    interval: Duration,
    armed_for: Option<TimestampKey>,
    armed_seq: u64,
    next_due: Option<Instant>,
    seq: u64,
}

impl TickSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed_for: None,
            armed_seq: 0,
            next_due: None,
            seq: 0,
        }
    }

    /// The first poll after arming fires immediately.
    pub fn arm(&mut self, batch_key: TimestampKey) {
        self.armed_for = Some(batch_key);
        self.armed_seq = self.seq;
        self.next_due = None;
    }

    pub fn cancel(&mut self) {
        self.armed_for = None;
        self.next_due = None;
    }

    /// Fires at most once per call. A caller that polls late gets one tick,
    /// not a burst of missed ones.
    pub fn poll(&mut self, now: Instant) -> Option<Tick> {
        let batch_key = self.armed_for.clone()?;
        if self.next_due.map_or(false, |due| now < due) {
            return None;
        }
        self.next_due = Some(now + self.interval);
        self.seq += 1;
        Some(Tick {
            batch_key,
            seq: self.seq,
            at: now,
        })
    }

    /// Fires regardless of the interval.
    #[cfg(test)]
    pub fn fire(&mut self) -> Option<Tick> {
        let batch_key = self.armed_for.clone()?;
        self.seq += 1;
        Some(Tick {
            batch_key,
            seq: self.seq,
            at: Instant::now(),
        })
    }

    pub fn is_current(&self, tick: &Tick) -> bool {
        self.armed_for.as_ref() == Some(&tick.batch_key) && tick.seq > self.armed_seq
    }

    /// Time left until the next tick is due, for repaint scheduling.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.armed_for.as_ref()?;
        Some(
            self.next_due
                .map_or(Duration::ZERO, |due| due.saturating_duration_since(now)),
        )
    }
}
