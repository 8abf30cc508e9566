//! Activity counters behind the monitoring endpoint.
//!
//! Workspace mutations and chat lines bump a counter; the server rolls the
//! window once a minute and publishes the closed window's figure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Window length for the events-per-minute figure.
pub const ROLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct ServerStats {
    events_this_minute: AtomicU64,
    events_per_minute: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one workspace mutation or chat line.
    pub fn record_event(&self) {
        self.events_this_minute.fetch_add(1, Ordering::Relaxed);
    }

    /// Figure from the last completed window.
    pub fn events_per_minute(&self) -> u64 {
        self.events_per_minute.load(Ordering::Relaxed)
    }

    /// Close the current window: publish its count and start the next one.
    /// Returns the closed window's figure.
    pub fn roll_window(&self) -> u64 {
        let events = self.events_this_minute.swap(0, Ordering::Relaxed);
        self.events_per_minute.store(events, Ordering::Relaxed);
        events
    }
}
