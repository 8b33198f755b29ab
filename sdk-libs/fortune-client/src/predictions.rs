//! Scoped prediction streams and batch screening.
//!
//! Server-side filters narrow a program-wide stream to one (game, tier)
//! scope, but nothing guarantees the node applied them. Every account is
//! re-checked here before it becomes a [`PredictionRecord`].

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use fortune_accounts::{
    decode_account, discriminator::read_discriminator, AccountLayout, DecodeError,
    NumberUniverse, Prediction, PredictionRecord, PREDICTION_GAME_EPOCH_OFFSET,
    PREDICTION_TIER_OFFSET,
};
use solana_pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    config::Commitment,
    errors::{ClientError, Result},
    transport::{
        AccountFilter, ChainTransport, KeyedAccountBlob, ProgramAccountUpdate, Subscription,
    },
};

/// The (game, tier) pair a prediction query is restricted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PredictionScope {
    /// `first_epoch_in_chain` of the game.
    pub game_epoch: u64,
    pub tier: u8,
}

impl PredictionScope {
    pub fn new(game_epoch: u64, tier: u8) -> Self {
        Self { game_epoch, tier }
    }

    /// Exact size, discriminator, game and tier.
    pub fn filters(&self) -> Vec<AccountFilter> {
        vec![
            AccountFilter::DataSize(Prediction::LEN as u64),
            AccountFilter::memcmp(0, Prediction::DISCRIMINATOR),
            AccountFilter::memcmp(PREDICTION_GAME_EPOCH_OFFSET, self.game_epoch.to_le_bytes()),
            AccountFilter::memcmp(PREDICTION_TIER_OFFSET, [self.tier]),
        ]
    }

    pub fn matches(&self, prediction: &Prediction) -> bool {
        prediction.game_epoch == self.game_epoch && prediction.tier == self.tier
    }
}

/// Why an account that reached the client was not a prediction in scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    DataSize { actual: usize },
    Discriminator,
    Scope { game_epoch: u64, tier: u8 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screened {
    Accepted(PredictionRecord),
    /// The server-side filter let through something it should not have.
    Rejected(Rejection),
    /// Right shape and scope but undecodable, e.g. a corrupt choice.
    Malformed(DecodeError),
}

/// Re-validates one account against `scope`.
pub fn screen(
    scope: &PredictionScope,
    universe: &NumberUniverse,
    address: Pubkey,
    data: &[u8],
) -> Screened {
    if data.len() != Prediction::LEN {
        return Screened::Rejected(Rejection::DataSize { actual: data.len() });
    }
    if read_discriminator(data) != Some(Prediction::DISCRIMINATOR) {
        return Screened::Rejected(Rejection::Discriminator);
    }
    let prediction = match decode_account::<Prediction>(data) {
        Ok(prediction) => prediction,
        Err(e) => return Screened::Malformed(e),
    };
    if !scope.matches(&prediction) {
        return Screened::Rejected(Rejection::Scope {
            game_epoch: prediction.game_epoch,
            tier: prediction.tier,
        });
    }
    match PredictionRecord::new(address, prediction, universe) {
        Ok(record) => Screened::Accepted(record),
        Err(e) => Screened::Malformed(e),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
}

/// Counters for one prediction stream or fetch path.
#[derive(Debug, Default)]
pub struct FilterStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    malformed: AtomicU64,
}

impl FilterStats {
    pub fn record(&self, screened: &Screened) {
        let counter = match screened {
            Screened::Accepted(_) => &self.accepted,
            Screened::Rejected(_) => &self.rejected,
            Screened::Malformed(_) => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self) -> FilterCounts {
        FilterCounts {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Screens a batch, keeping only accepted records. Rejected and malformed
/// accounts are counted and dropped.
pub fn screen_batch(
    scope: &PredictionScope,
    universe: &NumberUniverse,
    stats: &FilterStats,
    accounts: impl IntoIterator<Item = KeyedAccountBlob>,
) -> Vec<PredictionRecord> {
    accounts
        .into_iter()
        .filter_map(|keyed| {
            let screened = screen(scope, universe, keyed.address, &keyed.account.data);
            stats.record(&screened);
            match screened {
                Screened::Accepted(record) => Some(record),
                Screened::Rejected(reason) => {
                    debug!("Dropping {} from prediction batch: {:?}", keyed.address, reason);
                    None
                }
                Screened::Malformed(e) => {
                    warn!("Dropping malformed prediction {}: {}", keyed.address, e);
                    None
                }
            }
        })
        .collect()
}

pub trait PredictionHandler: Send + Sync + 'static {
    fn on_prediction(&self, record: &PredictionRecord, slot: u64);

    /// A transport failure or an in-scope account that failed to decode.
    fn on_error(&self, _error: &ClientError) {}
}

/// Program-wide prediction stream restricted to one scope.
pub struct PredictionWatcher<T: ChainTransport, H: PredictionHandler> {
    transport: Arc<T>,
    program_id: Pubkey,
    scope: PredictionScope,
    universe: NumberUniverse,
    commitment: Commitment,
    handler: Arc<H>,
    stats: Arc<FilterStats>,
    subscription: Option<Subscription>,
}

impl<T: ChainTransport, H: PredictionHandler> PredictionWatcher<T, H> {
    pub fn new(
        transport: Arc<T>,
        program_id: Pubkey,
        scope: PredictionScope,
        commitment: Commitment,
        handler: Arc<H>,
    ) -> Self {
        Self {
            transport,
            program_id,
            scope,
            universe: NumberUniverse::LIVE_FEED,
            commitment,
            handler,
            stats: Arc::new(FilterStats::default()),
            subscription: None,
        }
    }

    pub fn with_universe(mut self, universe: NumberUniverse) -> Self {
        self.universe = universe;
        self
    }

    pub fn scope(&self) -> PredictionScope {
        self.scope
    }

    pub fn stats(&self) -> FilterCounts {
        self.stats.counts()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn subscribe(&mut self) -> Result<()> {
        self.unsubscribe();

        let scope = self.scope;
        let universe = self.universe;
        let stats = self.stats.clone();
        let handler = self.handler.clone();
        let listener = Box::new(move |update: ProgramAccountUpdate| {
            let keyed = match update {
                Ok(keyed) => keyed,
                Err(e) => {
                    warn!("Prediction stream error: {}", e);
                    handler.on_error(&e.into());
                    return;
                }
            };
            let screened = screen(&scope, &universe, keyed.address, &keyed.account.data);
            stats.record(&screened);
            match screened {
                Screened::Accepted(record) => handler.on_prediction(&record, keyed.account.slot),
                Screened::Rejected(reason) => {
                    debug!("Dropping {} from prediction stream: {:?}", keyed.address, reason);
                }
                Screened::Malformed(e) => {
                    warn!("Malformed prediction {}: {}", keyed.address, e);
                    handler.on_error(&e.into());
                }
            }
        });

        let subscription = self
            .transport
            .on_program_account_change(
                &self.program_id,
                &self.scope.filters(),
                self.commitment,
                listener,
            )
            .await?;
        self.subscription = Some(subscription);
        info!(
            "Watching predictions for game {} tier {}",
            self.scope.game_epoch, self.scope.tier
        );
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!(
                "Stopped watching predictions for game {} tier {}",
                self.scope.game_epoch, self.scope.tier
            );
        }
    }
}

impl<T: ChainTransport, H: PredictionHandler> Drop for PredictionWatcher<T, H> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
