pub mod store;
pub mod types;

pub use store::{AddResult, ChainHead, ChainStore, InMemoryChain};
pub use types::{Block, BlockBody, BlockHeader, Withdrawal};
