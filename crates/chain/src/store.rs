use std::collections::HashMap;
use std::sync::RwLock;

use alloy_primitives::{B256, U256};
use tracing::info;

use crate::types::{Block, BlockBody, BlockHeader};

/// Outcome of suggesting a header or block to the chain store.
///
/// Closed set: callers match exhaustively, so a store cannot produce a
/// result the sync engine does not know how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// Accepted into the candidate set.
    Added,
    /// Duplicate of a known header/block; not an error.
    AlreadyKnown,
    /// The parent is not known to the store.
    UnknownParent,
    /// Store-level rejection (e.g. pre-genesis suggestion).
    CannotAccept,
    /// The store detected an invalidity the validation pipeline missed.
    InvalidBlock,
}

/// Best-suggested chain tip with its cumulative weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    pub number: u64,
    pub hash: B256,
    pub total_difficulty: U256,
}

/// Chain-store seam the sync engine drives. Implementations own
/// persistence and fork bookkeeping; the engine only suggests items and
/// queries the best-known state.
pub trait ChainStore: Send + Sync {
    /// Highest block number the store has seen a header for.
    fn best_known_number(&self) -> u64;

    /// The suggested tip with the highest total difficulty, if any.
    fn best_suggested(&self) -> Option<ChainHead>;

    /// Look up the parent header of `header`, if known.
    fn find_parent(&self, header: &BlockHeader) -> Option<BlockHeader>;

    /// Submit a header to the candidate set.
    fn suggest_header(&self, header: BlockHeader) -> AddResult;

    /// Submit a full block to the candidate set.
    fn suggest_block(&self, block: Block) -> AddResult;
}

struct StoredHeader {
    header: BlockHeader,
    total_difficulty: U256,
}

struct Inner {
    headers: HashMap<B256, StoredHeader>,
    bodies: HashMap<B256, BlockBody>,
    best_known: u64,
    best_suggested: ChainHead,
}

/// In-memory reference store: parent-linked insertion with cumulative
/// total-difficulty tracking. Used by tests and embedders that do not
/// persist.
pub struct InMemoryChain {
    inner: RwLock<Inner>,
}

impl InMemoryChain {
    /// Create a store seeded with a genesis header (TD = its difficulty).
    pub fn new(genesis: BlockHeader) -> Self {
        let hash = genesis.hash();
        let td = genesis.difficulty;
        let head = ChainHead {
            number: genesis.number,
            hash,
            total_difficulty: td,
        };
        info!(number = genesis.number, hash = %hash, td = %td, "chain store initialized");
        let mut headers = HashMap::new();
        headers.insert(
            hash,
            StoredHeader {
                header: genesis,
                total_difficulty: td,
            },
        );
        Self {
            inner: RwLock::new(Inner {
                headers,
                bodies: HashMap::new(),
                best_known: head.number,
                best_suggested: head,
            }),
        }
    }

    /// Number of headers the store holds (genesis included).
    pub fn header_count(&self) -> usize {
        self.inner.read().unwrap().headers.len()
    }

    /// Body stored for `hash`, if any.
    pub fn body(&self, hash: &B256) -> Option<BlockBody> {
        self.inner.read().unwrap().bodies.get(hash).cloned()
    }

    fn insert(inner: &mut Inner, header: BlockHeader) -> AddResult {
        if header.number == 0 {
            return AddResult::CannotAccept;
        }
        let hash = header.hash();
        if inner.headers.contains_key(&hash) {
            return AddResult::AlreadyKnown;
        }
        let parent = match inner.headers.get(&header.parent_hash) {
            Some(p) => p,
            None => return AddResult::UnknownParent,
        };
        if header.number != parent.header.number + 1 {
            return AddResult::InvalidBlock;
        }
        let td = parent.total_difficulty + header.difficulty;
        let number = header.number;
        inner.headers.insert(
            hash,
            StoredHeader {
                header,
                total_difficulty: td,
            },
        );
        inner.best_known = inner.best_known.max(number);
        if td > inner.best_suggested.total_difficulty {
            inner.best_suggested = ChainHead {
                number,
                hash,
                total_difficulty: td,
            };
        }
        AddResult::Added
    }
}

impl ChainStore for InMemoryChain {
    fn best_known_number(&self) -> u64 {
        self.inner.read().unwrap().best_known
    }

    fn best_suggested(&self) -> Option<ChainHead> {
        Some(self.inner.read().unwrap().best_suggested)
    }

    fn find_parent(&self, header: &BlockHeader) -> Option<BlockHeader> {
        self.inner
            .read()
            .unwrap()
            .headers
            .get(&header.parent_hash)
            .map(|stored| stored.header.clone())
    }

    fn suggest_header(&self, header: BlockHeader) -> AddResult {
        let mut inner = self.inner.write().unwrap();
        Self::insert(&mut inner, header)
    }

    fn suggest_block(&self, block: Block) -> AddResult {
        let mut inner = self.inner.write().unwrap();
        let hash = block.header.hash();
        let result = Self::insert(&mut inner, block.header);
        if result == AddResult::Added {
            inner.bodies.insert(hash, block.body);
        }
        result
    }
}
