//! Retry timing shared by the readiness and shutdown poll loops.

use std::time::Duration;

use tokio::time::Instant;

/// Ceiling, starting interval and floor of a halving poll.
///
/// Each failed attempt halves the sleep interval until it reaches `floor`.
/// The whole loop is bounded by `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub ceiling: Duration,
    pub initial: Duration,
    pub floor: Duration,
}

impl Backoff {
    pub const DEFAULT_INITIAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_FLOOR: Duration = Duration::from_millis(100);

    pub fn new(ceiling: Duration) -> Self {
        Self {
            ceiling,
            initial: Self::DEFAULT_INITIAL,
            floor: Self::DEFAULT_FLOOR,
        }
    }

    /// Policy used while waiting for a server to come up.
    pub fn readiness(ceiling: Duration) -> Self {
        Self::new(ceiling)
    }

    /// Policy used while waiting for a server to go away.
    pub fn shutdown(ceiling: Duration) -> Self {
        Self::new(ceiling)
    }

    pub fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_floor(mut self, floor: Duration) -> Self {
        self.floor = floor;
        self
    }

    /// Start counting down.
    pub fn start(&self) -> RetryBudget {
        let now = Instant::now();
        RetryBudget {
            started: now,
            deadline: now + self.ceiling,
            interval: self.initial.max(self.floor),
            floor: self.floor,
        }
    }
}

/// A running countdown owned by one poll loop.
#[derive(Debug)]
pub struct RetryBudget {
    started: Instant,
    deadline: Instant,
    interval: Duration,
    floor: Duration,
}

impl RetryBudget {
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_exhausted(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Interval the next `pause` will sleep, before clamping to the deadline.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep the current interval (never past the deadline) and halve it.
    ///
    /// Returns `false` without sleeping once the budget is spent.
    pub async fn pause(&mut self) -> bool {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return false;
        }
        tokio::time::sleep(self.interval.min(remaining)).await;
        self.interval = (self.interval / 2).max(self.floor);
        true
    }
}
