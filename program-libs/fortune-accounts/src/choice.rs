//! Packing of a player's bet type and chosen numbers into a single `u32`.
//!
//! Layout, from the least significant bit:
//! - bits `0..4`: bet type tag
//! - bits `4 + 4i .. 8 + 4i`: the i-th chosen number, ascending
//!
//! Every bit above the last number slot is zero. Numbers are sorted and
//! de-duplicated before packing, so a set of numbers has exactly one encoding.

use std::ops::RangeInclusive;

use crate::{constants::NUMBER_SLOTS, error::SelectionError};

pub const TAG_BITS: u32 = 4;
pub const NUMBER_BITS: u32 = 4;
const TAG_MASK: u32 = (1 << TAG_BITS) - 1;
const NUMBER_MASK: u32 = (1 << NUMBER_BITS) - 1;

/// Largest number a slot can hold.
pub const MAX_NUMBER: u8 = NUMBER_MASK as u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BetType {
    Single = 0,
    Double = 1,
    Triple = 2,
    Quad = 3,
}

impl BetType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, SelectionError> {
        match tag {
            0 => Ok(BetType::Single),
            1 => Ok(BetType::Double),
            2 => Ok(BetType::Triple),
            3 => Ok(BetType::Quad),
            other => Err(SelectionError::UnknownBetType(other)),
        }
    }

    /// How many distinct numbers this bet type selects.
    pub fn selection_len(self) -> usize {
        self as usize + 1
    }

    pub fn for_selection_len(len: usize) -> Option<Self> {
        match len {
            1 => Some(BetType::Single),
            2 => Some(BetType::Double),
            3 => Some(BetType::Triple),
            4 => Some(BetType::Quad),
            _ => None,
        }
    }
}

/// The set of numbers a selection may draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NumberUniverse {
    mask: u16,
}

impl NumberUniverse {
    /// Every index of the live feed distribution arrays.
    pub const LIVE_FEED: NumberUniverse = NumberUniverse {
        mask: (1 << NUMBER_SLOTS) - 1,
    };

    pub fn new(numbers: impl IntoIterator<Item = u8>) -> Result<Self, SelectionError> {
        let mut mask = 0u16;
        for number in numbers {
            if number > MAX_NUMBER {
                return Err(SelectionError::OutOfUniverse(number));
            }
            mask |= 1 << number;
        }
        Ok(Self { mask })
    }

    pub fn range(range: RangeInclusive<u8>) -> Result<Self, SelectionError> {
        Self::new(range)
    }

    pub fn contains(&self, number: u8) -> bool {
        number <= MAX_NUMBER && self.mask & (1 << number) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=MAX_NUMBER).filter(move |n| self.contains(*n))
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }
}

impl Default for NumberUniverse {
    fn default() -> Self {
        Self::LIVE_FEED
    }
}

/// A canonical selection: numbers strictly ascending, count matching the bet
/// type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    bet_type: BetType,
    numbers: Vec<u8>,
}

impl Selection {
    /// Validates and canonicalizes `numbers` for `bet_type`.
    ///
    /// Duplicates are removed before the count is checked, so `[1, 1]` is a
    /// valid `Single` and an invalid `Double`.
    pub fn new(
        bet_type: BetType,
        numbers: &[u8],
        universe: &NumberUniverse,
    ) -> Result<Self, SelectionError> {
        if numbers.is_empty() {
            return Err(SelectionError::Empty);
        }
        if let Some(&outside) = numbers.iter().find(|n| !universe.contains(**n)) {
            return Err(SelectionError::OutOfUniverse(outside));
        }

        let mut numbers = numbers.to_vec();
        numbers.sort_unstable();
        numbers.dedup();

        if numbers.len() != bet_type.selection_len() {
            return Err(SelectionError::CountMismatch {
                bet_type,
                expected: bet_type.selection_len(),
                actual: numbers.len(),
            });
        }
        Ok(Self { bet_type, numbers })
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.binary_search(&number).is_ok()
    }

    pub fn pack(&self) -> u32 {
        self.numbers
            .iter()
            .enumerate()
            .fold(self.bet_type.tag() as u32, |packed, (i, n)| {
                packed | (*n as u32) << (TAG_BITS + NUMBER_BITS * i as u32)
            })
    }

    /// Inverse of [`Selection::pack`].
    ///
    /// Rejects unknown tags, stray high bits and non-ascending slots. The
    /// numbers are not checked against any universe, use
    /// [`Selection::validate`] before trusting them.
    pub fn unpack(packed: u32) -> Result<Self, SelectionError> {
        let bet_type = BetType::from_tag((packed & TAG_MASK) as u8)?;
        let len = bet_type.selection_len();

        let used_bits = TAG_BITS + NUMBER_BITS * len as u32;
        if packed >> used_bits != 0 {
            return Err(SelectionError::TrailingBits(packed));
        }

        let numbers: Vec<u8> = (0..len as u32)
            .map(|i| ((packed >> (TAG_BITS + NUMBER_BITS * i)) & NUMBER_MASK) as u8)
            .collect();
        if numbers.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(SelectionError::NotCanonical(packed));
        }
        Ok(Self { bet_type, numbers })
    }

    pub fn validate(&self, universe: &NumberUniverse) -> Result<(), SelectionError> {
        match self.numbers.iter().find(|n| !universe.contains(**n)) {
            Some(&outside) => Err(SelectionError::OutOfUniverse(outside)),
            None => Ok(()),
        }
    }
}

pub fn encode_choice(
    bet_type: BetType,
    numbers: &[u8],
    universe: &NumberUniverse,
) -> Result<u32, SelectionError> {
    Selection::new(bet_type, numbers, universe).map(|selection| selection.pack())
}

pub fn decode_choice(packed: u32) -> Result<Selection, SelectionError> {
    Selection::unpack(packed)
}
