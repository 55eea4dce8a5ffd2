//! Heartbeat throttling
//!
//! The host delivers heartbeats at a fixed cadence; a poll cycle runs only on
//! every `interval + 1`-th heartbeat. The first poll after start is delayed by
//! a full interval so the host can finish its own startup.

/// Fixed-interval heartbeat counter
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: u32,
    count: u32,
}

impl RefreshScheduler {
    pub fn new(interval: u32) -> Self {
        Self { interval, count: 0 }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Heartbeats counted since the last poll
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Count one heartbeat; returns true when a poll cycle is due
    pub fn tick(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        if self.count > self.interval {
            self.count = 0;
            return true;
        }
        false
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(10)
    }
}
