use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    constants::{NUMBER_SLOTS, RESOLVED_GAME_VERSION},
    discriminator::AccountLayout,
};

/// Final result of a game, written once when the game resolves.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedGame {
    /// `first_epoch_in_chain` of the resolved game.
    pub game_epoch: u64,
    /// Epoch in which the game resolved.
    pub last_epoch: u64,
    pub tier: u8,
    pub version: u8,
    pub winning_number: u8,
    pub secondary_rollover_number: u8,
    pub total_pot_lamports: u64,
    pub total_bets: u32,
    pub winning_bets: u32,
    pub net_prize_lamports: u64,
    pub fee_bps: u16,
    pub resolved_slot: u64,
    pub lamports_per_number: [u64; NUMBER_SLOTS],
    pub bets_per_number: [u32; NUMBER_SLOTS],
    pub bump: u8,
    pub _reserved: [u8; 32],
}

impl AccountLayout for ResolvedGame {
    const NAME: &'static str = "ResolvedGame";
    const DISCRIMINATOR: [u8; 8] = [169, 201, 220, 86, 101, 0, 53, 209];
    const SPACE: usize = 8 // game_epoch
        + 8 // last_epoch
        + 1 // tier
        + 1 // version
        + 1 // winning_number
        + 1 // secondary_rollover_number
        + 8 // total_pot_lamports
        + 4 // total_bets
        + 4 // winning_bets
        + 8 // net_prize_lamports
        + 2 // fee_bps
        + 8 // resolved_slot
        + (8 * NUMBER_SLOTS) // lamports_per_number
        + (4 * NUMBER_SLOTS) // bets_per_number
        + 1 // bump
        + 32; // reserved
}

impl ResolvedGame {
    pub fn is_current_version(&self) -> bool {
        self.version == RESOLVED_GAME_VERSION
    }

    /// The game rolled over instead of paying out.
    pub fn rolled_over(&self) -> bool {
        self.winning_bets == 0
    }

    pub fn lamports_on_winner(&self) -> u64 {
        self.lamports_per_number
            .get(self.winning_number as usize)
            .copied()
            .unwrap_or(0)
    }
}
