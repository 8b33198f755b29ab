#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fortune_client::{
    fortune_accounts::{
        encode_account, encode_choice, BetType, LiveFeed, NumberUniverse, Prediction,
        PredictionRecord, ProgramAddresses,
    },
    ClientConfig, ClientError, LiveFeedHandler, LiveFeedUpdate, MemoryTransport,
    PredictionHandler, RetryConfig,
};
use solana_pubkey::Pubkey;

pub fn program_id() -> Pubkey {
    Pubkey::new_from_array([42u8; 32])
}

pub fn addresses() -> ProgramAddresses {
    ProgramAddresses::new(program_id())
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new(program_id()).with_retry(RetryConfig {
        max_retries: 3,
        retry_delay_ms: 1,
        timeout_ms: 5_000,
    })
}

pub fn feed(tier: u8, epoch: u64) -> LiveFeed {
    LiveFeed::new(tier, epoch, Pubkey::new_from_array([7u8; 32]), 300)
}

/// Writes `feed` at its tier's live feed address.
pub fn publish_feed(transport: &MemoryTransport, feed: &LiveFeed) -> u64 {
    let (address, _) = addresses().live_feed(feed.tier).unwrap();
    transport.set_account(address, program_id(), encode_account(feed).unwrap(), 1_000_000)
}

pub fn prediction(player: Pubkey, game_epoch: u64, tier: u8, numbers: &[u8]) -> Prediction {
    let bet_type = BetType::for_selection_len(numbers.len()).unwrap();
    Prediction {
        player,
        game_epoch,
        tier,
        epoch: game_epoch,
        choice: encode_choice(bet_type, numbers, &NumberUniverse::LIVE_FEED).unwrap(),
        lamports: 100_000_000,
        placed_slot: 1,
        claimed: 0,
        bump: 255,
        version: 1,
        _reserved: [0u8; 16],
    }
}

/// Writes `prediction` at its derived address.
pub fn publish_prediction(transport: &MemoryTransport, prediction: &Prediction) -> Pubkey {
    let (address, _) = addresses()
        .prediction(&prediction.player, prediction.game_epoch, prediction.tier)
        .unwrap();
    transport.set_account(address, program_id(), encode_account(prediction).unwrap(), 1);
    address
}

#[derive(Default)]
pub struct RecordingFeedHandler {
    pub updates: Mutex<Vec<LiveFeedUpdate>>,
    pub errors: Mutex<Vec<ClientError>>,
}

impl RecordingFeedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updates(&self) -> Vec<LiveFeedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ClientError> {
        self.errors.lock().unwrap().clone()
    }
}

impl LiveFeedHandler for RecordingFeedHandler {
    fn on_update(&self, update: &LiveFeedUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn on_error(&self, _tier: u8, error: &ClientError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

#[derive(Default)]
pub struct RecordingPredictionHandler {
    pub records: Mutex<Vec<PredictionRecord>>,
    pub errors: Mutex<Vec<ClientError>>,
}

impl RecordingPredictionHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<PredictionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ClientError> {
        self.errors.lock().unwrap().clone()
    }
}

impl PredictionHandler for RecordingPredictionHandler {
    fn on_prediction(&self, record: &PredictionRecord, _slot: u64) {
        self.records.lock().unwrap().push(record.clone());
    }

    fn on_error(&self, error: &ClientError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
