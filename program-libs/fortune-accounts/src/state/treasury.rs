use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::discriminator::AccountLayout;

/// Program-owned PDA that holds SOL for the game.
/// A single global treasury uses `tier == 0`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Treasury {
    pub authority: Pubkey,

    /// 0 = global, otherwise the tier it serves.
    pub tier: u8,

    pub bump: u8,

    /// Monotonic counter of lamports received as bets.
    pub total_in_lamports: u64,

    /// Total lamports paid out to winners.
    pub total_out_lamports: u64,

    /// Total lamports withdrawn as protocol fees.
    pub total_fees_withdrawn: u64,

    pub version: u8,

    pub _reserved: [u8; 32],
}

impl AccountLayout for Treasury {
    const NAME: &'static str = "Treasury";
    const DISCRIMINATOR: [u8; 8] = [238, 239, 123, 238, 89, 1, 168, 253];
    const SPACE: usize = 32 // authority
        + 1 // tier
        + 1 // bump
        + 8 // total_in_lamports
        + 8 // total_out_lamports
        + 8 // total_fees_withdrawn
        + 1 // version
        + 32; // reserved
}

impl Treasury {
    /// Lamports accounted as still held: inflow minus payouts and fees.
    pub fn accounted_balance(&self) -> i128 {
        self.total_in_lamports as i128
            - self.total_out_lamports as i128
            - self.total_fees_withdrawn as i128
    }
}
