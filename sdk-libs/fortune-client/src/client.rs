use std::{fmt, sync::Arc, time::Duration};

use fortune_accounts::{
    constants::is_valid_tier, decode_account, decode_any, AccountLayout, DecodedAccount,
    GameConfig, LiveFeed, NumberUniverse, PlayerProfile, PredictionRecord, ProgramAddresses,
    ResolvedGame, Treasury,
};
use solana_pubkey::Pubkey;
use tracing::debug;

use crate::{
    config::{ClientConfig, Commitment},
    errors::{ClientError, Result, TransportError},
    live_feed::{LiveFeedHandler, LiveFeedSynchronizer},
    predictions::{
        screen, screen_batch, FilterCounts, FilterStats, PredictionHandler, PredictionScope,
        PredictionWatcher, Screened,
    },
    retry::{retry, with_timeout, RetryConfig},
    transport::{solana::SolanaTransport, AccountBlob, ChainTransport, KeyedAccountBlob},
};

/// Upper bound of addresses per `getMultipleAccounts` request.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// One-shot typed reads of the game program's accounts, and the factory for
/// its live streams.
///
/// Every network call is bounded by the request timeout and retried per
/// [`RetryConfig`].
pub struct FortuneClient<T: ChainTransport> {
    transport: Arc<T>,
    addresses: ProgramAddresses,
    commitment: Commitment,
    request_timeout: Duration,
    retry: RetryConfig,
    universe: NumberUniverse,
    stats: FilterStats,
}

impl<T: ChainTransport> fmt::Debug for FortuneClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FortuneClient")
            .field("program_id", &self.addresses.program_id)
            .field("commitment", &self.commitment)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl FortuneClient<SolanaTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Arc::new(SolanaTransport::from_config(config)), config)
    }
}

impl<T: ChainTransport> FortuneClient<T> {
    pub fn new(transport: Arc<T>, config: &ClientConfig) -> Self {
        Self {
            transport,
            addresses: ProgramAddresses::new(config.program_id),
            commitment: config.commitment,
            request_timeout: config.request_timeout(),
            retry: config.retry,
            universe: NumberUniverse::LIVE_FEED,
            stats: FilterStats::default(),
        }
    }

    pub fn with_universe(mut self, universe: NumberUniverse) -> Self {
        self.universe = universe;
        self
    }

    pub fn program_id(&self) -> Pubkey {
        self.addresses.program_id
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Counters for one-shot prediction reads.
    pub fn filter_stats(&self) -> FilterCounts {
        self.stats.counts()
    }

    async fn fetch_blob(&self, operation: &'static str, address: Pubkey) -> Result<AccountBlob> {
        let transport = &self.transport;
        let commitment = self.commitment;
        let blob = retry(&self.retry, operation, || {
            with_timeout(operation, self.request_timeout, async move {
                transport
                    .get_account_info(&address, commitment)
                    .await
                    .map_err(ClientError::from)
            })
        })
        .await?;
        blob.ok_or(ClientError::AccountNotFound(address))
    }

    async fn fetch_optional<A: AccountLayout>(
        &self,
        operation: &'static str,
        address: Pubkey,
    ) -> Result<Option<A>> {
        match self.fetch_blob(operation, address).await {
            Ok(blob) => Ok(Some(decode_account::<A>(&blob.data)?)),
            Err(ClientError::AccountNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_required<A: AccountLayout>(
        &self,
        operation: &'static str,
        address: Pubkey,
    ) -> Result<A> {
        let blob = self.fetch_blob(operation, address).await?;
        Ok(decode_account::<A>(&blob.data)?)
    }

    pub async fn config(&self) -> Result<GameConfig> {
        let (address, _) = self.addresses.config()?;
        self.fetch_required("get_config", address).await
    }

    pub async fn treasury(&self) -> Result<Treasury> {
        let (address, _) = self.addresses.treasury()?;
        self.fetch_required("get_treasury", address).await
    }

    pub async fn live_feed(&self, tier: u8) -> Result<LiveFeed> {
        check_tier(tier)?;
        let (address, _) = self.addresses.live_feed(tier)?;
        let feed: LiveFeed = self.fetch_required("get_live_feed", address).await?;
        if feed.tier != tier {
            return Err(ClientError::TierMismatch {
                prev: tier,
                next: feed.tier,
            });
        }
        Ok(feed)
    }

    /// `None` for a player who has never bet.
    pub async fn profile(&self, player: &Pubkey) -> Result<Option<PlayerProfile>> {
        let (address, _) = self.addresses.profile(player)?;
        self.fetch_optional("get_profile", address).await
    }

    pub async fn resolved_game(&self, game_epoch: u64, tier: u8) -> Result<Option<ResolvedGame>> {
        check_tier(tier)?;
        let (address, _) = self.addresses.resolved_game(game_epoch, tier)?;
        self.fetch_optional("get_resolved_game", address).await
    }

    /// The player's prediction for one game, if placed.
    ///
    /// An account at the derived address that does not pass screening is
    /// treated as absent, except for a corrupt choice which is an error.
    pub async fn prediction(
        &self,
        player: &Pubkey,
        game_epoch: u64,
        tier: u8,
    ) -> Result<Option<PredictionRecord>> {
        check_tier(tier)?;
        let (address, _) = self.addresses.prediction(player, game_epoch, tier)?;
        let blob = match self.fetch_blob("get_prediction", address).await {
            Ok(blob) => blob,
            Err(ClientError::AccountNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let scope = PredictionScope::new(game_epoch, tier);
        let screened = screen(&scope, &self.universe, address, &blob.data);
        self.stats.record(&screened);
        match screened {
            Screened::Accepted(record) => Ok(Some(record)),
            Screened::Rejected(reason) => {
                debug!("Prediction {} rejected: {:?}", address, reason);
                Ok(None)
            }
            Screened::Malformed(e) => Err(e.into()),
        }
    }

    /// Batch read of prediction accounts by address. Missing, out-of-scope
    /// and undecodable accounts are dropped.
    pub async fn predictions(
        &self,
        addresses: &[Pubkey],
        scope: &PredictionScope,
    ) -> Result<Vec<PredictionRecord>> {
        check_tier(scope.tier)?;
        let mut records = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let transport = &self.transport;
            let commitment = self.commitment;
            let accounts = retry(&self.retry, "get_predictions", || {
                with_timeout("get_predictions", self.request_timeout, async move {
                    transport
                        .get_multiple_accounts_info(chunk, commitment)
                        .await
                        .map_err(ClientError::from)
                })
            })
            .await?;
            let keyed = key_accounts(chunk, accounts)?;
            records.extend(screen_batch(scope, &self.universe, &self.stats, keyed));
        }
        Ok(records)
    }

    /// Batch read of each player's prediction for one game.
    pub async fn player_predictions(
        &self,
        players: &[Pubkey],
        scope: &PredictionScope,
    ) -> Result<Vec<PredictionRecord>> {
        let addresses = players
            .iter()
            .map(|player| {
                self.addresses
                    .prediction(player, scope.game_epoch, scope.tier)
                    .map(|(address, _)| address)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.predictions(&addresses, scope).await
    }

    /// Every prediction in scope, found with a filtered program scan.
    pub async fn scan_predictions(&self, scope: &PredictionScope) -> Result<Vec<PredictionRecord>> {
        check_tier(scope.tier)?;
        let transport = &self.transport;
        let commitment = self.commitment;
        let program_id = self.addresses.program_id;
        let filters = scope.filters();
        let filters = &filters;
        let accounts = retry(&self.retry, "scan_predictions", || {
            with_timeout("scan_predictions", self.request_timeout, async move {
                transport
                    .get_program_accounts(&program_id, filters, commitment)
                    .await
                    .map_err(ClientError::from)
            })
        })
        .await?;
        Ok(screen_batch(scope, &self.universe, &self.stats, accounts))
    }

    /// Decodes whatever program account lives at `address`.
    pub async fn account(&self, address: &Pubkey) -> Result<DecodedAccount> {
        let blob = self.fetch_blob("get_account", *address).await?;
        Ok(decode_any(&blob.data)?)
    }

    pub fn live_feed_synchronizer<H: LiveFeedHandler>(
        &self,
        handler: Arc<H>,
    ) -> LiveFeedSynchronizer<T, H> {
        LiveFeedSynchronizer::new(
            self.transport.clone(),
            self.addresses,
            self.commitment,
            self.request_timeout,
            self.retry,
            handler,
        )
    }

    pub fn prediction_watcher<H: PredictionHandler>(
        &self,
        scope: PredictionScope,
        handler: Arc<H>,
    ) -> PredictionWatcher<T, H> {
        PredictionWatcher::new(
            self.transport.clone(),
            self.addresses.program_id,
            scope,
            self.commitment,
            handler,
        )
        .with_universe(self.universe)
    }
}

/// Pairs a `getMultipleAccounts` response with the addresses it was asked
/// for, skipping empty slots. The response must be positional.
fn key_accounts(
    addresses: &[Pubkey],
    accounts: Vec<Option<AccountBlob>>,
) -> Result<Vec<KeyedAccountBlob>> {
    if accounts.len() != addresses.len() {
        return Err(TransportError::Rpc(format!(
            "requested {} accounts, got {}",
            addresses.len(),
            accounts.len()
        ))
        .into());
    }
    Ok(addresses
        .iter()
        .zip(accounts)
        .filter_map(|(address, account)| {
            account.map(|account| KeyedAccountBlob {
                address: *address,
                account,
            })
        })
        .collect())
}

fn check_tier(tier: u8) -> Result<()> {
    if is_valid_tier(tier) {
        Ok(())
    } else {
        Err(ClientError::InvalidTier(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(slot: u64) -> AccountBlob {
        AccountBlob {
            data: vec![1, 2, 3],
            lamports: 1_000,
            owner: Pubkey::new_from_array([9u8; 32]),
            slot,
        }
    }

    #[test]
    fn test_key_accounts_skips_missing() {
        let addresses = [
            Pubkey::new_from_array([1u8; 32]),
            Pubkey::new_from_array([2u8; 32]),
            Pubkey::new_from_array([3u8; 32]),
        ];
        let keyed = key_accounts(&addresses, vec![Some(blob(5)), None, Some(blob(6))]).unwrap();
        assert_eq!(
            keyed,
            vec![
                KeyedAccountBlob {
                    address: addresses[0],
                    account: blob(5),
                },
                KeyedAccountBlob {
                    address: addresses[2],
                    account: blob(6),
                },
            ]
        );
    }

    #[test]
    fn test_key_accounts_rejects_short_response() {
        let addresses = [
            Pubkey::new_from_array([1u8; 32]),
            Pubkey::new_from_array([2u8; 32]),
        ];
        let result = key_accounts(&addresses, vec![Some(blob(5))]);
        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::Rpc(ref message)))
                if message == "requested 2 accounts, got 1"
        ));
    }
}
