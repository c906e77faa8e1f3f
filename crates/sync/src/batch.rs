use tracing::debug;

/// Default lower bound for one request window.
pub const BATCH_MIN: u64 = 8;
/// Default upper bound for one request window.
pub const BATCH_MAX: u64 = 128;

/// Self-tuning request-size controller for one peer session.
///
/// Halves on trouble, doubles back after a streak of clean responses.
/// The value never leaves `[min, max]`; shrinking at the floor and
/// expanding at the ceiling are no-ops. One instance belongs to one
/// downloader and persists across sync calls so learned peer behavior
/// is retained.
#[derive(Debug, Clone)]
pub struct SyncBatchSize {
    current: u64,
    since_last_timeout: u32,
    min: u64,
    max: u64,
}

impl SyncBatchSize {
    /// Start at `max`: an unknown peer gets the benefit of the doubt.
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min >= 1 && min <= max);
        Self {
            current: max,
            since_last_timeout: 0,
            min,
            max,
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Whether the controller has no room left to degrade.
    pub fn is_min(&self) -> bool {
        self.current == self.min
    }

    /// Consecutive completed requests since the last timeout or shrink.
    pub fn streak(&self) -> u32 {
        self.since_last_timeout
    }

    /// Halve the window, floored at the minimum. Resets the streak.
    pub fn shrink(&mut self) {
        let previous = self.current;
        self.current = (self.current / 2).max(self.min);
        self.since_last_timeout = 0;
        if self.current != previous {
            debug!(from = previous, to = self.current, "sync batch size shrunk");
        }
    }

    /// Double the window, capped at the maximum.
    pub fn expand(&mut self) {
        let previous = self.current;
        self.current = (self.current * 2).min(self.max);
        if self.current != previous {
            debug!(from = previous, to = self.current, "sync batch size expanded");
        }
    }

    /// Count a completed, non-timeout request and expand once the
    /// streak reaches `expand_streak`.
    pub fn record_success(&mut self, expand_streak: u32) {
        self.since_last_timeout = self.since_last_timeout.saturating_add(1);
        if self.since_last_timeout >= expand_streak {
            self.expand();
        }
    }

    /// Forget the success streak without touching the window.
    pub fn reset_streak(&mut self) {
        self.since_last_timeout = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_max() {
        let batch = SyncBatchSize::new(BATCH_MIN, BATCH_MAX);
        assert_eq!(batch.current(), BATCH_MAX);
        assert!(!batch.is_min());
    }

    #[test]
    fn shrink_floors_at_min() {
        let mut batch = SyncBatchSize::new(BATCH_MIN, BATCH_MAX);
        for _ in 0..20 {
            batch.shrink();
        }
        assert_eq!(batch.current(), BATCH_MIN);
        assert!(batch.is_min());
        // idempotent at the bound
        batch.shrink();
        assert_eq!(batch.current(), BATCH_MIN);
    }

    #[test]
    fn expand_caps_at_max() {
        let mut batch = SyncBatchSize::new(BATCH_MIN, BATCH_MAX);
        batch.shrink();
        for _ in 0..20 {
            batch.expand();
        }
        assert_eq!(batch.current(), BATCH_MAX);
    }

    #[test]
    fn shrink_resets_streak() {
        let mut batch = SyncBatchSize::new(BATCH_MIN, BATCH_MAX);
        batch.record_success(10);
        batch.record_success(10);
        assert_eq!(batch.streak(), 2);
        batch.shrink();
        assert_eq!(batch.streak(), 0);
    }

    #[test]
    fn success_streak_gates_expansion() {
        let mut batch = SyncBatchSize::new(BATCH_MIN, BATCH_MAX);
        batch.shrink();
        batch.shrink();
        let shrunk = batch.current();

        batch.record_success(2);
        assert_eq!(batch.current(), shrunk);
        batch.record_success(2);
        assert_eq!(batch.current(), shrunk * 2);
    }
}
