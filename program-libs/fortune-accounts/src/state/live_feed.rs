use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{constants::NUMBER_SLOTS, discriminator::AccountLayout};

/// Per-tier aggregate of the current game.
///
/// Rewritten by the program on every bet, so clients subscribe to it and
/// replace their copy wholesale on each notification.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct LiveFeed {
    /// The current Solana epoch being tracked for this tier.
    pub epoch: u64,

    /// First epoch of the current epoch-chain. Stable game id across rollovers.
    pub first_epoch_in_chain: u64,

    /// Total lamports wagered across the current epoch-chain.
    pub total_lamports: u64,

    /// Lamports carried into the current epoch.
    pub carried_over_lamports: u64,

    /// Total bet count across the current epoch-chain.
    pub total_bets: u32,

    /// Bet count carried into the current epoch.
    pub carried_over_bets: u32,

    /// Slots-before-epoch-end cutoff enforced for betting.
    pub bet_cutoff_slots: u64,

    pub tier: u8,

    pub treasury: Pubkey,

    /// Number of times this game carried forward due to rollover.
    pub epochs_carried_over: u8,

    pub bump: u8,

    /// Lamports wagered per number index.
    pub lamports_per_number: [u64; NUMBER_SLOTS],

    /// Bet count per number index.
    pub bets_per_number: [u32; NUMBER_SLOTS],

    /// Rollover target number for the current game (0 disables).
    pub secondary_rollover_number: u8,

    pub current_fee_bps: u16,

    pub _reserved: [u8; 61],
}

impl AccountLayout for LiveFeed {
    const NAME: &'static str = "LiveFeed";
    const DISCRIMINATOR: [u8; 8] = [188, 3, 96, 15, 250, 6, 139, 132];
    const SPACE: usize = 8 // epoch
        + 8 // first_epoch_in_chain
        + 8 // total_lamports
        + 8 // carried_over_lamports
        + 4 // total_bets
        + 4 // carried_over_bets
        + 8 // bet_cutoff_slots
        + 1 // tier
        + 32 // treasury
        + 1 // epochs_carried_over
        + 1 // bump
        + (8 * NUMBER_SLOTS) // lamports_per_number
        + (4 * NUMBER_SLOTS) // bets_per_number
        + 1 // secondary_rollover_number
        + 2 // current_fee_bps
        + 61; // reserved
}

impl LiveFeed {
    /// An empty feed at the start of a fresh epoch-chain.
    pub fn new(tier: u8, epoch: u64, treasury: Pubkey, fee_bps: u16) -> Self {
        Self {
            epoch,
            first_epoch_in_chain: epoch,
            total_lamports: 0,
            carried_over_lamports: 0,
            total_bets: 0,
            carried_over_bets: 0,
            bet_cutoff_slots: 0,
            tier,
            treasury,
            epochs_carried_over: 0,
            bump: 0,
            lamports_per_number: [0u64; NUMBER_SLOTS],
            bets_per_number: [0u32; NUMBER_SLOTS],
            secondary_rollover_number: 0,
            current_fee_bps: fee_bps,
            _reserved: [0u8; 61],
        }
    }

    /// Both snapshots describe the same game on the same tier.
    pub fn same_game(&self, other: &LiveFeed) -> bool {
        self.tier == other.tier && self.first_epoch_in_chain == other.first_epoch_in_chain
    }

    pub fn is_carried_over(&self) -> bool {
        self.epochs_carried_over > 0
    }

    /// Lamports wagered in the current epoch, excluding carried-over funds.
    pub fn fresh_lamports(&self) -> u64 {
        self.total_lamports.saturating_sub(self.carried_over_lamports)
    }

    /// Share of the pot on `number` in basis points. `None` for an empty pot or
    /// an index outside the distribution arrays.
    pub fn share_bps(&self, number: usize) -> Option<u64> {
        let on_number = *self.lamports_per_number.get(number)?;
        if self.total_lamports == 0 {
            return None;
        }
        let bps = (on_number as u128 * crate::constants::FEE_BPS_DENOM as u128)
            / self.total_lamports as u128;
        Some(bps as u64)
    }
}
