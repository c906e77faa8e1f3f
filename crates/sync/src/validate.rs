use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use chain::{Block, BlockHeader};

use crate::error::SyncError;

/// Hard failure inside the seal engine (as opposed to a seal that
/// simply does not verify).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SealEngineError(pub String);

/// Cryptographic seal check (PoW/PoA) for a single header.
pub trait SealValidator: Send + Sync {
    fn validate_seal(&self, header: &BlockHeader) -> Result<bool, SealEngineError>;
}

/// Structural/semantic validation invoked per item as it is about to be
/// accepted.
pub trait BlockValidator: Send + Sync {
    fn validate_header(&self, header: &BlockHeader, is_post_merge: bool) -> bool;
    fn validate_suggested_block(&self, block: &Block) -> bool;
}

/// Stage 1: every adjacent pair in the response must be parent-linked.
/// Fails at the first broken pair; trailing empty slots are ignored.
pub fn check_batch_consistency(headers: &[Option<BlockHeader>]) -> Result<(), SyncError> {
    for pair in headers.windows(2) {
        if let [Some(prev), Some(current)] = pair {
            if current.parent_hash != prev.hash() {
                trace!(
                    number = current.number,
                    expected = %prev.hash(),
                    got = %current.parent_hash,
                    "inconsistent header list from peer"
                );
                return Err(SyncError::InconsistentBatch);
            }
        }
    }
    Ok(())
}

enum SealFailure {
    Invalid { number: u64 },
    Engine(SealEngineError),
}

/// Result of a seal pass that produced no failure. A cancelled pass may
/// have skipped headers, so it is reported distinctly and must not be
/// treated as a validated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealOutcome {
    Validated,
    Cancelled,
}

/// Stage 2: seal-check every header in the batch on a bounded blocking
/// fan-out.
///
/// Workers stop picking up new headers as soon as the token is
/// cancelled or any worker has seen a failure; checks already in flight
/// run to completion. Failures are joined before deciding batch
/// fatality and win over cancellation; an interrupted pass with no
/// observed failure yields [`SealOutcome::Cancelled`], and the caller
/// returns partial progress.
pub async fn validate_seals(
    validator: &Arc<dyn SealValidator>,
    headers: &[Option<BlockHeader>],
    workers: usize,
    token: &CancellationToken,
) -> Result<SealOutcome, SyncError> {
    let present: Vec<BlockHeader> = headers.iter().flatten().cloned().collect();
    if present.is_empty() {
        return Ok(SealOutcome::Validated);
    }
    trace!(count = present.len(), "starting seal validation");

    let workers = workers.max(1).min(present.len());
    let chunk_size = present.len().div_ceil(workers);
    let stop = Arc::new(AtomicBool::new(false));

    let mut tasks: JoinSet<Result<(), SealFailure>> = JoinSet::new();
    for chunk in present.chunks(chunk_size) {
        let chunk = chunk.to_vec();
        let validator = Arc::clone(validator);
        let stop = Arc::clone(&stop);
        let token = token.clone();
        tasks.spawn_blocking(move || {
            for header in &chunk {
                if token.is_cancelled() || stop.load(Ordering::Relaxed) {
                    return Ok(());
                }
                match validator.validate_seal(header) {
                    Ok(true) => {}
                    Ok(false) => {
                        stop.store(true, Ordering::Relaxed);
                        return Err(SealFailure::Invalid {
                            number: header.number,
                        });
                    }
                    Err(e) => {
                        stop.store(true, Ordering::Relaxed);
                        return Err(SealFailure::Engine(e));
                    }
                }
            }
            Ok(())
        });
    }

    let mut invalid: Option<u64> = None;
    let mut engine_failure: Option<SealEngineError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(SealFailure::Invalid { number })) => invalid = Some(number),
            Ok(Err(SealFailure::Engine(e))) => engine_failure = Some(e),
            Err(e) => engine_failure = Some(SealEngineError(e.to_string())),
        }
    }
    trace!("seal validation complete");

    if let Some(e) = engine_failure {
        return Err(SyncError::SealEngine(e));
    }
    if let Some(number) = invalid {
        debug!(number, "seal validation failure");
        return Err(SyncError::InvalidSeal);
    }
    if token.is_cancelled() {
        return Ok(SealOutcome::Cancelled);
    }
    Ok(SealOutcome::Validated)
}
