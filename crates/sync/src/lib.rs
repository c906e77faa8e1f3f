//! Peer-driven chain synchronization engine.
//!
//! Catch-up logic against a single remote peer claiming a heavier
//! chain: batched header/body fetching with adaptive request sizing,
//! a three-stage validation pipeline, and bounded ancestor search
//! after reorganizations. Networking, persistence and consensus
//! execution stay behind the [`peer::SyncPeer`], [`chain::ChainStore`]
//! and validator seams.

pub mod batch;
pub mod config;
pub mod downloader;
pub mod error;
pub mod peer;
pub mod stats;
pub mod validate;

pub use batch::SyncBatchSize;
pub use config::SyncConfig;
pub use downloader::BlockDownloader;
pub use error::SyncError;
pub use peer::{PeerError, PeerTarget, SyncPeer};
pub use stats::{ProgressLog, SyncReporter};
pub use validate::{BlockValidator, SealEngineError, SealOutcome, SealValidator};
