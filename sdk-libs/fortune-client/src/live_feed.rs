use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use fortune_accounts::{constants::is_valid_tier, decode_account, LiveFeed, ProgramAddresses};
use solana_pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    config::Commitment,
    diff::{diff, DiffEvent},
    errors::{ClientError, Result},
    retry::{retry, with_timeout, RetryConfig},
    transport::{AccountBlob, AccountUpdate, ChainTransport, Subscription},
};

/// A decoded live feed frame and what changed since the previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveFeedUpdate {
    pub tier: u8,
    pub address: Pubkey,
    pub slot: u64,
    pub snapshot: LiveFeed,
    /// Empty for the first frame after (re)subscribing, which only seeds the
    /// baseline.
    pub events: Vec<DiffEvent>,
}

impl LiveFeedUpdate {
    pub fn is_seed(&self) -> bool {
        self.events.is_empty()
    }
}

/// Receives synchronizer output. Called on the delivery thread; must not
/// block.
pub trait LiveFeedHandler: Send + Sync + 'static {
    fn on_update(&self, update: &LiveFeedUpdate);

    /// A frame failed to arrive or decode. The subscription stays open and
    /// the last good snapshot remains the baseline.
    fn on_error(&self, tier: u8, error: &ClientError);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Subscribed { tier: u8, address: Pubkey },
    Unsubscribed,
}

#[derive(Debug, Default)]
struct SyncState {
    baseline: Option<LiveFeed>,
    /// Bumped on every (un)subscribe. Frames from an older subscription are
    /// dropped.
    generation: u64,
    frames: u64,
}

fn lock(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps one tier's live feed in sync and turns each push into diff events.
pub struct LiveFeedSynchronizer<T: ChainTransport, H: LiveFeedHandler> {
    transport: Arc<T>,
    addresses: ProgramAddresses,
    commitment: Commitment,
    request_timeout: Duration,
    retry: RetryConfig,
    handler: Arc<H>,
    state: Arc<Mutex<SyncState>>,
    phase: SyncPhase,
    subscription: Option<Subscription>,
}

impl<T: ChainTransport, H: LiveFeedHandler> LiveFeedSynchronizer<T, H> {
    pub fn new(
        transport: Arc<T>,
        addresses: ProgramAddresses,
        commitment: Commitment,
        request_timeout: Duration,
        retry: RetryConfig,
        handler: Arc<H>,
    ) -> Self {
        Self {
            transport,
            addresses,
            commitment,
            request_timeout,
            retry,
            handler,
            state: Arc::new(Mutex::new(SyncState::default())),
            phase: SyncPhase::Idle,
            subscription: None,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn baseline(&self) -> Option<LiveFeed> {
        lock(&self.state).baseline.clone()
    }

    /// Frames processed since the last subscribe.
    pub fn frames(&self) -> u64 {
        lock(&self.state).frames
    }

    /// Subscribes to `tier`'s live feed, replacing any current subscription.
    ///
    /// The baseline is cleared first, so the first frame of the new tier
    /// seeds it and produces no events.
    pub async fn subscribe(&mut self, tier: u8) -> Result<Pubkey> {
        if !is_valid_tier(tier) {
            return Err(ClientError::InvalidTier(tier));
        }
        let (address, _) = self.addresses.live_feed(tier)?;
        self.unsubscribe();

        let generation = {
            let mut state = lock(&self.state);
            state.baseline = None;
            state.frames = 0;
            state.generation += 1;
            state.generation
        };

        let state = self.state.clone();
        let handler = self.handler.clone();
        let listener = Box::new(move |update: AccountUpdate| {
            process_frame(&state, generation, tier, &address, handler.as_ref(), update);
        });

        let transport = &self.transport;
        let commitment = self.commitment;
        let subscription = with_timeout("subscribe_live_feed", self.request_timeout, async move {
            transport
                .on_account_change(&address, commitment, listener)
                .await
                .map_err(ClientError::from)
        })
        .await?;
        self.subscription = Some(subscription);
        self.phase = SyncPhase::Subscribed { tier, address };
        info!("Subscribed to live feed of tier {} at {}", tier, address);
        Ok(address)
    }

    /// Fetches the current feed once and runs it through the same path as a
    /// push, seeding the baseline if none exists yet. The fetch is bounded by
    /// the request timeout and retried like any one-shot read.
    pub async fn refresh(&self) -> Result<Option<LiveFeed>> {
        let SyncPhase::Subscribed { tier, address } = self.phase else {
            return Ok(None);
        };
        let generation = lock(&self.state).generation;
        let transport = &self.transport;
        let commitment = self.commitment;
        let account = retry(&self.retry, "refresh_live_feed", || {
            with_timeout("refresh_live_feed", self.request_timeout, async move {
                transport
                    .get_account_info(&address, commitment)
                    .await
                    .map_err(ClientError::from)
            })
        })
        .await?
        .ok_or(ClientError::AccountNotFound(address))?;
        process_frame(
            &self.state,
            generation,
            tier,
            &address,
            self.handler.as_ref(),
            Ok(account),
        );
        Ok(self.baseline())
    }

    /// Stops delivery. Safe to call in any phase and more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            lock(&self.state).generation += 1;
            if let SyncPhase::Subscribed { tier, .. } = self.phase {
                info!("Unsubscribed from live feed of tier {}", tier);
            }
            self.phase = SyncPhase::Unsubscribed;
        }
    }
}

impl<T: ChainTransport, H: LiveFeedHandler> Drop for LiveFeedSynchronizer<T, H> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn process_frame<H: LiveFeedHandler + ?Sized>(
    state: &Mutex<SyncState>,
    generation: u64,
    tier: u8,
    address: &Pubkey,
    handler: &H,
    update: AccountUpdate,
) {
    if lock(state).generation != generation {
        debug!("Dropping live feed frame from {} of a closed subscription", address);
        return;
    }

    let AccountBlob { data, slot, .. } = match update {
        Ok(blob) => blob,
        Err(e) => {
            warn!("Live feed {} stream error: {}", address, e);
            handler.on_error(tier, &e.into());
            return;
        }
    };

    let snapshot = match decode_account::<LiveFeed>(&data) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Failed to decode live feed {} at slot {}: {}", address, slot, e);
            handler.on_error(tier, &e.into());
            return;
        }
    };
    if snapshot.tier != tier {
        let error = ClientError::TierMismatch {
            prev: tier,
            next: snapshot.tier,
        };
        warn!("Dropping live feed frame from {}: {}", address, error);
        handler.on_error(tier, &error);
        return;
    }

    let events = {
        let mut state = lock(state);
        // Re-checked under the lock that stores the baseline.
        if state.generation != generation {
            debug!("Dropping stale live feed frame from {} at slot {}", address, slot);
            return;
        }
        let events = match &state.baseline {
            Some(prev) => diff(prev, &snapshot),
            None => Ok(Vec::new()),
        };
        match events {
            Ok(events) => {
                state.baseline = Some(snapshot.clone());
                state.frames += 1;
                events
            }
            Err(e) => {
                drop(state);
                handler.on_error(tier, &e);
                return;
            }
        }
    };

    debug!(
        "Live feed tier {} slot {}: {} events",
        tier,
        slot,
        events.len()
    );
    handler.on_update(&LiveFeedUpdate {
        tier,
        address: *address,
        slot,
        snapshot,
        events,
    });
}

#[cfg(test)]
mod tests {
    use fortune_accounts::encode_account;

    use super::*;
    use crate::errors::TransportError;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<LiveFeedUpdate>>,
        errors: Mutex<Vec<String>>,
    }

    impl LiveFeedHandler for Recorder {
        fn on_update(&self, update: &LiveFeedUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }

        fn on_error(&self, _tier: u8, error: &ClientError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn blob(data: Vec<u8>) -> AccountBlob {
        AccountBlob {
            data,
            lamports: 1_000_000,
            owner: Pubkey::default(),
            slot: 7,
        }
    }

    #[test]
    fn test_closed_subscription_frames_are_silent() {
        let state = Mutex::new(SyncState {
            generation: 2,
            ..SyncState::default()
        });
        let recorder = Recorder::default();
        let address = Pubkey::new_from_array([3u8; 32]);

        process_frame(&state, 1, 1, &address, &recorder, Err(TransportError::Closed));
        process_frame(&state, 1, 1, &address, &recorder, Ok(blob(vec![0u8; 3])));
        let other_tier = encode_account(&LiveFeed::new(2, 10, Pubkey::default(), 300)).unwrap();
        process_frame(&state, 1, 1, &address, &recorder, Ok(blob(other_tier)));
        let good = encode_account(&LiveFeed::new(1, 10, Pubkey::default(), 300)).unwrap();
        process_frame(&state, 1, 1, &address, &recorder, Ok(blob(good.clone())));

        assert!(recorder.errors.lock().unwrap().is_empty());
        assert!(recorder.updates.lock().unwrap().is_empty());
        assert!(state.lock().unwrap().baseline.is_none());

        process_frame(&state, 2, 1, &address, &recorder, Err(TransportError::Closed));
        process_frame(&state, 2, 1, &address, &recorder, Ok(blob(good)));
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);
        assert_eq!(recorder.updates.lock().unwrap().len(), 1);
        assert_eq!(state.lock().unwrap().frames, 1);
    }
}
