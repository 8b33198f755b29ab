use thiserror::Error;

use crate::choice::BetType;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("{account} account too small: expected at least {expected} bytes, got {actual}")]
    AccountTooSmall {
        account: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{account} discriminator mismatch: expected {expected:?}, got {actual:?}")]
    DiscriminatorMismatch {
        account: &'static str,
        expected: [u8; 8],
        actual: [u8; 8],
    },
    #[error("Unknown account discriminator {0:?}")]
    UnknownDiscriminator([u8; 8]),
    #[error("Malformed {account} account: {reason}")]
    Malformed {
        account: &'static str,
        reason: String,
    },
    #[error("Invalid packed choice: {0}")]
    InvalidChoice(#[from] SelectionError),
}

/// Rejected selections. Surfaced to the caller building or trusting a choice,
/// never coerced into a valid one.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SelectionError {
    #[error("Selection is empty")]
    Empty,
    #[error("Number {0} is not part of the allowed universe")]
    OutOfUniverse(u8),
    #[error("{bet_type:?} requires {expected} distinct numbers, got {actual}")]
    CountMismatch {
        bet_type: BetType,
        expected: usize,
        actual: usize,
    },
    #[error("Unknown bet type tag {0}")]
    UnknownBetType(u8),
    #[error("Packed choice {0:#x} has bits set above its last number slot")]
    TrailingBits(u32),
    #[error("Packed choice {0:#x} does not hold strictly ascending numbers")]
    NotCanonical(u32),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PdaError {
    /// Every bump from 255 down to 0 produced an on-curve point.
    #[error("No valid program address found for seeds {seeds}")]
    NoValidAddress { seeds: String },
    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),
}
