use std::time::{Duration, Instant};

use tracing::info;

/// Progress sink the downloader reports into after every applied
/// batch. Fire-and-forget: the engine relies on no return value.
pub trait SyncReporter: Send {
    fn report(&mut self, local_best: u64, peer_head: u64);
}

/// Default reporter: throttled progress lines with a rough blocks/sec
/// estimate.
pub struct ProgressLog {
    interval: Duration,
    last_report: Instant,
    last_number: u64,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(1),
            last_report: Instant::now(),
            last_number: 0,
        }
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncReporter for ProgressLog {
    fn report(&mut self, local_best: u64, peer_head: u64) {
        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return;
        }
        let synced = local_best.saturating_sub(self.last_number);
        let speed = synced as f64 / elapsed.as_secs_f64();
        info!(
            local_best,
            peer_head,
            blocks_per_sec = format_args!("{speed:.1}"),
            "sync progress"
        );
        self.last_report = Instant::now();
        self.last_number = local_best;
    }
}
