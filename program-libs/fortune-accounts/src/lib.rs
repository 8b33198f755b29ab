//! Typed views over the Fortune game program's accounts.
//!
//! - [`decode`] turns raw account bytes into layouts from [`state`]
//! - [`pda`] derives the addresses those accounts live at
//! - [`choice`] packs and unpacks the bet type and numbers stored in a
//!   prediction

pub mod choice;
pub mod constants;
pub mod decode;
pub mod discriminator;
pub mod error;
pub mod pda;
pub mod state;

pub use choice::{decode_choice, encode_choice, BetType, NumberUniverse, Selection};
pub use decode::{decode_account, decode_any, encode_account, AccountKind, DecodedAccount};
pub use discriminator::{AccountLayout, DISCRIMINATOR_LEN};
pub use error::{DecodeError, PdaError, SelectionError};
pub use pda::{derive_address, ProgramAddresses, Seed};
pub use state::{
    GameConfig, LiveFeed, PlayerProfile, Prediction, PredictionRecord, ResolvedGame,
    TierSettings, Treasury, PREDICTION_GAME_EPOCH_OFFSET, PREDICTION_TIER_OFFSET,
};

/// Converts lamports to SOL for display only.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / constants::LAMPORTS_PER_SOL as f64
}
