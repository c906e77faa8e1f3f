use serde::Deserialize;

use crate::batch::{BATCH_MAX, BATCH_MIN};

/// Tuning knobs for the downloader. Embedders deserialize overrides
/// from their node configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SyncConfig {
    /// Smallest request window.
    pub batch_min: u64,
    /// Largest request window.
    pub batch_max: u64,
    /// Consecutive empty responses tolerated before shrinking, and
    /// before failing once the window is already at the minimum.
    pub empty_response_limit: u32,
    /// Success streak required to expand during header-only sync.
    pub header_expand_streak: u32,
    /// Success streak required to expand during full-block sync.
    /// Higher than the header threshold: an oversized body request
    /// wastes far more peer bandwidth than an oversized header request.
    pub body_expand_streak: u32,
    /// The header loop stops this many blocks short of the peer head;
    /// the remaining distance is left to full-block sync.
    pub full_sync_threshold: u64,
    /// Fan-out width for parallel seal validation.
    pub seal_workers: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_min: BATCH_MIN,
            batch_max: BATCH_MAX,
            empty_response_limit: 10,
            header_expand_streak: 2,
            body_expand_streak: 8,
            full_sync_threshold: 32,
            seal_workers: 4,
        }
    }
}

impl SyncConfig {
    /// Deepest cumulative ancestor retreat before a peer is declared to
    /// be on an irreconcilable fork.
    pub fn max_reorganization_length(&self) -> u64 {
        2 * self.batch_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_reorg_follows_batch_max() {
        let config = SyncConfig::default();
        assert_eq!(config.max_reorganization_length(), 2 * config.batch_max);
    }
}
