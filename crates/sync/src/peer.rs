use std::future::Future;

use alloy_primitives::{B256, U256};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use chain::{BlockBody, BlockHeader};

/// Failure of a single wire request. Timeouts are classified separately
/// because the batch-size controller reacts to them; cancellation is
/// never reported through this type — callers consult the token.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

impl PeerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PeerError::Timeout)
    }
}

/// Wire-request capability of one remote peer. Implemented by the
/// network layer; the downloader never sees sockets or encodings.
pub trait SyncPeer: Send + Sync {
    /// Fetch up to `limit` headers starting at block `start`, every
    /// `skip + 1`-th block. The response is positional: index 0
    /// corresponds to `start`, and trailing `None` entries mean the
    /// peer ran out of headers before filling the window.
    fn fetch_headers(
        &self,
        start: u64,
        limit: u64,
        skip: u64,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Option<BlockHeader>>, PeerError>> + Send;

    /// Fetch block bodies for `hashes`, returned in request order. The
    /// peer may return fewer bodies than requested.
    fn fetch_bodies(
        &self,
        hashes: Vec<B256>,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<BlockBody>, PeerError>> + Send;
}

/// Immutable snapshot of a peer's claimed chain state, valid for one
/// sync call. The caller refreshes head number and total difficulty
/// between calls.
#[derive(Debug)]
pub struct PeerTarget<P> {
    pub head_number: u64,
    pub total_difficulty: U256,
    pub peer: P,
}

impl<P: SyncPeer> PeerTarget<P> {
    pub fn new(head_number: u64, total_difficulty: U256, peer: P) -> Self {
        Self {
            head_number,
            total_difficulty,
            peer,
        }
    }
}
