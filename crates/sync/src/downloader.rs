use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::U256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use chain::{AddResult, Block, BlockBody, BlockHeader, ChainStore};

use crate::batch::SyncBatchSize;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::peer::{PeerTarget, SyncPeer};
use crate::stats::{ProgressLog, SyncReporter};
use crate::validate::{
    check_batch_consistency, validate_seals, BlockValidator, SealOutcome, SealValidator,
};

/// Which convergence loop is running. Both loops share one state
/// machine; the mode selects the fetch/accept steps and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncMode {
    Headers,
    FullBlocks,
}

/// One unit of work in the acceptance loop.
enum BatchItem {
    Header(BlockHeader),
    Block(Block),
}

impl BatchItem {
    fn header(&self) -> &BlockHeader {
        match self {
            BatchItem::Header(h) => h,
            BatchItem::Block(b) => &b.header,
        }
    }
}

/// Peer-driven chain downloader.
///
/// Given a peer claiming a heavier chain, incrementally fetches
/// headers (and, in full-block mode, bodies), validates each batch,
/// resolves reorganizations by walking back to a common ancestor, and
/// suggests the results to the chain store. One instance serves one
/// peer session; the batch-size controller it owns persists across
/// calls, the rest of the loop state does not. The two download
/// operations must not run concurrently on the same instance.
pub struct BlockDownloader<C> {
    chain: C,
    block_validator: Arc<dyn BlockValidator>,
    seal_validator: Arc<dyn SealValidator>,
    reporter: Box<dyn SyncReporter>,
    batch: SyncBatchSize,
    config: SyncConfig,
}

impl<C: ChainStore> BlockDownloader<C> {
    pub fn new(
        chain: C,
        block_validator: Arc<dyn BlockValidator>,
        seal_validator: Arc<dyn SealValidator>,
        config: SyncConfig,
    ) -> Self {
        let batch = SyncBatchSize::new(config.batch_min, config.batch_max);
        Self {
            chain,
            block_validator,
            seal_validator,
            reporter: Box::new(ProgressLog::new()),
            batch,
            config,
        }
    }

    /// Replace the default progress logger.
    pub fn with_reporter(mut self, reporter: Box<dyn SyncReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Current request window of the adaptive controller.
    pub fn batch_size(&self) -> u64 {
        self.batch.current()
    }

    /// Sync headers only, stopping `full_sync_threshold` short of the
    /// peer head. Returns the number of headers the store accepted.
    pub async fn download_headers(
        &mut self,
        peer: &PeerTarget<impl SyncPeer>,
        token: &CancellationToken,
    ) -> Result<usize, SyncError> {
        self.sync_with_peer(peer, token, SyncMode::Headers).await
    }

    /// Sync full blocks (headers plus bodies). Returns the number of
    /// blocks the store accepted.
    pub async fn download_blocks(
        &mut self,
        peer: &PeerTarget<impl SyncPeer>,
        token: &CancellationToken,
    ) -> Result<usize, SyncError> {
        self.sync_with_peer(peer, token, SyncMode::FullBlocks).await
    }

    async fn sync_with_peer(
        &mut self,
        peer: &PeerTarget<impl SyncPeer>,
        token: &CancellationToken,
        mode: SyncMode,
    ) -> Result<usize, SyncError> {
        let max_reorg = self.config.max_reorganization_length();
        let mut synced: usize = 0;
        let mut ancestor_lookup_level: u64 = 0;
        let mut empty_response_counter: u32 = 0;
        let mut current_number = self
            .chain
            .best_known_number()
            .min(peer.head_number.saturating_sub(1));

        while self.peer_is_heavier(peer) && current_number <= peer.head_number {
            if token.is_cancelled() {
                trace!("sync cancelled between batches");
                return Ok(synced);
            }
            trace!(
                mode = ?mode,
                current = current_number,
                our_best = self.chain.best_known_number(),
                peer_head = peer.head_number,
                "continuing sync"
            );

            if ancestor_lookup_level > max_reorg {
                warn!(
                    level = ancestor_lookup_level,
                    max_reorg, "could not find common ancestor with peer"
                );
                return Err(SyncError::InconsistentChain);
            }

            let margin = match mode {
                SyncMode::Headers => self.config.full_sync_threshold,
                SyncMode::FullBlocks => 0,
            };
            let blocks_left =
                peer.head_number as i128 - current_number as i128 - margin as i128;
            let window = (blocks_left + 1).min(self.batch.current() as i128);
            if window <= 1 {
                break;
            }
            let window = window as u64;

            trace!(start = current_number, count = window, "requesting headers");
            let headers = match self
                .request_headers(peer, current_number, window, token)
                .await?
            {
                Some(headers) => headers,
                None => return Ok(synced),
            };

            // The slot at index 0 anchors the window at the cursor and
            // is already known locally; the usable run starts at 1.
            let usable = leading_usable(&headers);
            trace!(usable, window, "usable run in response");

            if usable == 0 {
                if headers.len() <= 1 {
                    // The cursor starts one below the claimed head, and
                    // total difficulty can race ahead of the peer's
                    // header announcements. A lone empty slot is not
                    // misbehavior; the loop has simply caught up.
                    break;
                }
                match mode {
                    SyncMode::Headers => {
                        empty_response_counter += 1;
                        if empty_response_counter >= self.config.empty_response_limit {
                            if self.batch.is_min() {
                                info!(
                                    requested = window,
                                    "peer sent no usable headers, cancelling"
                                );
                                return Err(SyncError::EmptyHeaderList);
                            }
                            info!(requested = window, "peer sent no usable headers");
                            self.batch.shrink();
                        }
                        continue;
                    }
                    SyncMode::FullBlocks => return Err(SyncError::EmptyHeaderList),
                }
            }

            let items: Vec<BatchItem> = match mode {
                SyncMode::Headers => {
                    empty_response_counter = 0;
                    self.batch.record_success(self.config.header_expand_streak);
                    headers[1..=usable]
                        .iter()
                        .flatten()
                        .cloned()
                        .map(BatchItem::Header)
                        .collect()
                }
                SyncMode::FullBlocks => {
                    let mut hashes = Vec::with_capacity(usable);
                    let mut by_hash: HashMap<_, BlockHeader> =
                        HashMap::with_capacity(usable);
                    for header in headers[1..=usable].iter().flatten() {
                        let hash = header.hash();
                        hashes.push(hash);
                        by_hash.insert(hash, header.clone());
                    }

                    let bodies: Vec<BlockBody> = match self
                        .request_bodies(peer, hashes.clone(), token)
                        .await?
                    {
                        Some(bodies) => bodies,
                        None => return Ok(synced),
                    };

                    if bodies.is_empty() {
                        if blocks_left == 1 {
                            debug!(hash = %hashes[0], "peer does not have the block body");
                        }
                        empty_response_counter += 1;
                        if empty_response_counter >= self.config.empty_response_limit {
                            if self.batch.is_min() {
                                info!(
                                    requested = window,
                                    "peer sent no block bodies, cancelling"
                                );
                                return Err(SyncError::EmptyBlockList);
                            }
                            info!(requested = window, "peer sent no block bodies");
                            self.batch.shrink();
                        }
                        continue;
                    }
                    empty_response_counter = 0;
                    self.batch.record_success(self.config.body_expand_streak);

                    if bodies.len() > hashes.len() {
                        warn!(
                            got = bodies.len(),
                            requested = hashes.len(),
                            "peer sent more bodies than requested, ignoring extras"
                        );
                    }
                    // Bodies arrive in request order; pair each back to
                    // its header through the hash it was requested by.
                    bodies
                        .into_iter()
                        .take(hashes.len())
                        .enumerate()
                        .filter_map(|(i, body)| {
                            by_hash
                                .remove(&hashes[i])
                                .map(|header| BatchItem::Block(Block::new(header, body)))
                        })
                        .collect()
                }
            };

            let Some(first_item) = items.first() else {
                continue;
            };

            if self.chain.find_parent(first_item.header()).is_none() {
                let step = self.batch.current();
                ancestor_lookup_level += step;
                current_number = current_number.saturating_sub(step);
                debug!(
                    level = ancestor_lookup_level,
                    current = current_number,
                    "parent not found locally, walking back"
                );
                continue;
            }

            for (i, item) in items.iter().enumerate() {
                if token.is_cancelled() {
                    trace!("sync cancelled inside batch");
                    return Ok(synced);
                }
                let first_in_batch = i == 0;
                let number = item.header().number;

                let valid = match item {
                    BatchItem::Header(h) => self.block_validator.validate_header(h, false),
                    BatchItem::Block(b) => self.block_validator.validate_suggested_block(b),
                };
                if !valid {
                    if first_in_batch {
                        warn!(number, "first item in batch failed validation");
                        return Err(SyncError::InvalidBatchStart);
                    }
                    warn!(number, "block skipped (validation failed)");
                    continue;
                }

                let result = match item {
                    BatchItem::Header(h) => self.chain.suggest_header(h.clone()),
                    BatchItem::Block(b) => self.chain.suggest_block(b.clone()),
                };
                match result {
                    AddResult::Added => {
                        trace!(number, "suggested for processing");
                        synced += 1;
                    }
                    AddResult::AlreadyKnown => {
                        trace!(number, "skipped, already known");
                    }
                    AddResult::UnknownParent => {
                        warn!(number, first_in_batch, "chain store reported unknown parent");
                        return Err(if first_in_batch {
                            SyncError::OrphanedBatchStart
                        } else {
                            SyncError::BatchUnknownParent
                        });
                    }
                    AddResult::CannotAccept => return Err(SyncError::CannotAccept),
                    AddResult::InvalidBlock => return Err(SyncError::InvalidBlock),
                }
                current_number = number;
            }

            let local_best = self
                .chain
                .best_suggested()
                .map(|head| head.number)
                .unwrap_or(0);
            self.reporter.report(local_best, peer.head_number);
        }

        Ok(synced)
    }

    fn peer_is_heavier(&self, peer: &PeerTarget<impl SyncPeer>) -> bool {
        let local_td = self
            .chain
            .best_suggested()
            .map(|head| head.total_difficulty)
            .unwrap_or(U256::ZERO);
        peer.total_difficulty > local_td
    }

    /// Fetch one header window and run the link and seal checks on it,
    /// in that order: with both defects in one response the
    /// inconsistency is reported, not the bad seal. `Ok(None)` means
    /// the call was cancelled.
    async fn request_headers(
        &mut self,
        peer: &PeerTarget<impl SyncPeer>,
        start: u64,
        count: u64,
        token: &CancellationToken,
    ) -> Result<Option<Vec<Option<BlockHeader>>>, SyncError> {
        let result = peer.peer.fetch_headers(start, count, 0, token).await;
        if token.is_cancelled() {
            trace!("headers request cancelled");
            return Ok(None);
        }
        let headers = match result {
            Ok(headers) => headers,
            Err(err) => {
                self.batch.reset_streak();
                if err.is_timeout() {
                    self.batch.shrink();
                    debug!(%err, "failed to retrieve headers while synchronizing (timeout)");
                } else {
                    warn!(%err, "failed to retrieve headers while synchronizing");
                }
                return Err(SyncError::HeadersRequest(err));
            }
        };

        check_batch_consistency(&headers)?;
        match validate_seals(
            &self.seal_validator,
            &headers,
            self.config.seal_workers,
            token,
        )
        .await?
        {
            SealOutcome::Validated => {}
            SealOutcome::Cancelled => return Ok(None),
        }
        if token.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(headers))
    }

    /// Fetch bodies for `hashes`. `Ok(None)` means the call was
    /// cancelled; any fault is fatal.
    async fn request_bodies(
        &mut self,
        peer: &PeerTarget<impl SyncPeer>,
        hashes: Vec<alloy_primitives::B256>,
        token: &CancellationToken,
    ) -> Result<Option<Vec<BlockBody>>, SyncError> {
        let result = peer.peer.fetch_bodies(hashes, token).await;
        if token.is_cancelled() {
            trace!("bodies request cancelled");
            return Ok(None);
        }
        match result {
            Ok(bodies) => Ok(Some(bodies)),
            Err(err) => {
                self.batch.reset_streak();
                if err.is_timeout() {
                    debug!(%err, "failed to retrieve bodies while synchronizing (timeout)");
                } else {
                    warn!(%err, "failed to retrieve bodies while synchronizing");
                }
                Err(SyncError::BodiesRequest(err))
            }
        }
    }
}

/// Length of the leading run of present headers after the anchor slot.
fn leading_usable(headers: &[Option<BlockHeader>]) -> usize {
    headers.iter().skip(1).take_while(|h| h.is_some()).count()
}
