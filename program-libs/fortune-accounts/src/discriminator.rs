use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::DecodeError;

pub const DISCRIMINATOR_LEN: usize = 8;

/// A fixed account layout owned by the game program.
///
/// `DISCRIMINATOR` is the first 8 bytes of `sha256("account:<Name>")`.
/// `SPACE` is the serialized size without the discriminator.
pub trait AccountLayout: BorshSerialize + BorshDeserialize + Sized {
    const NAME: &'static str;
    const DISCRIMINATOR: [u8; 8];
    const SPACE: usize;
    const LEN: usize = DISCRIMINATOR_LEN + Self::SPACE;

    fn discriminator() -> [u8; 8] {
        Self::DISCRIMINATOR
    }
}

/// Checks:
/// 1. account size is at least T::LEN
/// 2. account discriminator
pub fn check_discriminator<T: AccountLayout>(bytes: &[u8]) -> Result<(), DecodeError> {
    if bytes.len() < T::LEN {
        return Err(DecodeError::AccountTooSmall {
            account: T::NAME,
            expected: T::LEN,
            actual: bytes.len(),
        });
    }
    let actual = read_discriminator(bytes).ok_or(DecodeError::AccountTooSmall {
        account: T::NAME,
        expected: T::LEN,
        actual: bytes.len(),
    })?;
    if actual != T::DISCRIMINATOR {
        return Err(DecodeError::DiscriminatorMismatch {
            account: T::NAME,
            expected: T::DISCRIMINATOR,
            actual,
        });
    }
    Ok(())
}

pub fn read_discriminator(bytes: &[u8]) -> Option<[u8; 8]> {
    bytes
        .get(..DISCRIMINATOR_LEN)
        .and_then(|slice| slice.try_into().ok())
}
