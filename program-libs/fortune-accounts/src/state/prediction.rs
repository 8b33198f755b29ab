use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{
    choice::{NumberUniverse, Selection},
    decode::decode_account,
    discriminator::{AccountLayout, DISCRIMINATOR_LEN},
    error::DecodeError,
};

/// Byte offset of `game_epoch` in the raw account, discriminator included.
pub const PREDICTION_GAME_EPOCH_OFFSET: usize = DISCRIMINATOR_LEN + 32;
/// Byte offset of `tier` in the raw account, discriminator included.
pub const PREDICTION_TIER_OFFSET: usize = PREDICTION_GAME_EPOCH_OFFSET + 8;

/// One player's bet for a (game, tier) pair.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub player: Pubkey,
    /// `first_epoch_in_chain` of the game this bet belongs to.
    pub game_epoch: u64,
    pub tier: u8,
    /// Epoch in which the bet was placed.
    pub epoch: u64,
    /// Packed bet type and numbers, see [`crate::choice`].
    pub choice: u32,
    pub lamports: u64,
    pub placed_slot: u64,
    pub claimed: u8,
    pub bump: u8,
    pub version: u8,
    pub _reserved: [u8; 16],
}

impl AccountLayout for Prediction {
    const NAME: &'static str = "Prediction";
    const DISCRIMINATOR: [u8; 8] = [98, 127, 141, 187, 218, 33, 8, 14];
    const SPACE: usize = 32 // player
        + 8 // game_epoch
        + 1 // tier
        + 8 // epoch
        + 4 // choice
        + 8 // lamports
        + 8 // placed_slot
        + 1 // claimed
        + 1 // bump
        + 1 // version
        + 16; // reserved
}

impl Prediction {
    pub fn is_claimed(&self) -> bool {
        self.claimed != 0
    }
}

/// A decoded prediction together with the address it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictionRecord {
    pub address: Pubkey,
    pub prediction: Prediction,
    pub selection: Selection,
}

impl PredictionRecord {
    /// Decodes the account and unpacks its choice. Numbers outside `universe`
    /// fail the decode instead of producing a record.
    pub fn from_account(
        address: Pubkey,
        data: &[u8],
        universe: &NumberUniverse,
    ) -> Result<Self, DecodeError> {
        let prediction = decode_account::<Prediction>(data)?;
        Self::new(address, prediction, universe)
    }

    pub fn new(
        address: Pubkey,
        prediction: Prediction,
        universe: &NumberUniverse,
    ) -> Result<Self, DecodeError> {
        let selection = Selection::unpack(prediction.choice)?;
        selection.validate(universe)?;
        Ok(Self {
            address,
            prediction,
            selection,
        })
    }

    pub fn lamports(&self) -> u64 {
        self.prediction.lamports
    }
}
