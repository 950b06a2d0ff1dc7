//! # Game Clock
//!
//! Single logical clock for the whole engine. All timestamps (round
//! expiry, vote timeline marks, closing windows) come from here so that
//! integration tests can steer time forward instead of sleeping through
//! three-minute round windows.
//!
//! The offset is additive and monotonically grows during a test; the
//! production binary never touches it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Cloneable handle to the engine's clock.
#[derive(Clone)]
pub struct Clock {
    offset: Arc<Mutex<Duration>>,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            offset: Arc::new(Mutex::new(Duration::zero())),
        }
    }

    /// Current instant in UTC, shifted by any test offset.
    pub fn now(&self) -> DateTime<Utc> {
        let offset = *self.offset.lock().expect("clock offset poisoned");
        Utc::now() + offset
    }

    /// Calendar date in UTC. Drives daily-bonus eligibility.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Moves the clock forward. Only tests call this.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("clock offset poisoned");
        *offset = *offset + by;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_shifts_now() {
        let clock = Clock::new();
        let before = clock.now();
        clock.advance(Duration::seconds(600));
        let after = clock.now();
        assert!(after - before >= Duration::seconds(600));
    }

    #[test]
    fn clones_share_the_offset() {
        let clock = Clock::new();
        let other = clock.clone();
        clock.advance(Duration::days(1));
        assert!(other.now() - Utc::now() >= Duration::hours(23));
    }
}
