//! Client for the Fortune game program.
//!
//! - [`FortuneClient`] one-shot typed reads with timeouts and retries
//! - [`LiveFeedSynchronizer`] keeps a tier's live feed in sync and emits
//!   [`DiffEvent`]s per change
//! - [`PredictionWatcher`] streams one game's predictions through a
//!   client-side filter
//! - [`FeedStore`] owned state for presentation layers
//!
//! All network access goes through a [`ChainTransport`].

pub mod client;
pub mod config;
pub mod diff;
pub mod errors;
pub mod live_feed;
pub mod predictions;
pub mod retry;
pub mod store;
pub mod transport;

pub use client::FortuneClient;
pub use config::{ClientConfig, Commitment};
pub use diff::{diff, DiffEvent};
pub use errors::{ClientError, Result, TransportError};
pub use fortune_accounts;
pub use live_feed::{LiveFeedHandler, LiveFeedSynchronizer, LiveFeedUpdate, SyncPhase};
pub use predictions::{
    FilterCounts, FilterStats, PredictionHandler, PredictionScope, PredictionWatcher,
};
pub use retry::RetryConfig;
pub use store::{FeedState, FeedStore};
pub use transport::{
    memory::MemoryTransport, solana::SolanaTransport, AccountBlob, AccountFilter,
    ChainTransport, Subscription,
};
