use thiserror::Error;

use crate::peer::PeerError;
use crate::validate::SealEngineError;

/// Fatal synchronization failures. Any of these aborts the whole sync
/// call; the peer-management layer is expected to demote or drop the
/// peer. Cancellation is not an error and never appears here — a
/// cancelled call returns its partial progress instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Ancestor search walked back past the maximum reorganization
    /// depth without finding a locally-known parent.
    #[error("peer with inconsistent chain in sync")]
    InconsistentChain,

    /// Adjacent headers in one response were not parent-linked.
    #[error("peer sent an inconsistent block list")]
    InconsistentBatch,

    /// At least one header in the batch carried an invalid seal.
    #[error("peer sent a block with an invalid seal")]
    InvalidSeal,

    /// The seal engine itself failed (hard crypto error).
    #[error("seal engine failure: {0}")]
    SealEngine(#[from] SealEngineError),

    /// Empty-response streak exhausted with the window already at its
    /// minimum during header sync.
    #[error("peer sent an empty header list")]
    EmptyHeaderList,

    /// Empty-body streak exhausted with the window already at its
    /// minimum during full-block sync.
    #[error("peer sent an empty block list")]
    EmptyBlockList,

    #[error("headers request failed: {0}")]
    HeadersRequest(#[source] PeerError),

    #[error("bodies request failed: {0}")]
    BodiesRequest(#[source] PeerError),

    /// The first item of a batch failed structural/semantic validation.
    /// A bad anchor means continuing would silently skip the chain tip.
    #[error("first block in batch failed validation")]
    InvalidBatchStart,

    /// The store did not know the parent of the first item in a batch.
    #[error("peer sent orphaned blocks at the start of a batch")]
    OrphanedBatchStart,

    /// The store did not know the parent of an interior item even
    /// though the batch passed the consistency check.
    #[error("peer sent a batch with an unknown parent inside it")]
    BatchUnknownParent,

    /// Store-level rejection of a suggested item.
    #[error("chain store rejected a suggested block")]
    CannotAccept,

    /// The store detected an invalidity the pipeline missed.
    #[error("peer sent an invalid block")]
    InvalidBlock,
}
