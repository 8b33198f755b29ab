use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{constants::TIER_COUNT, discriminator::AccountLayout};

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct TierSettings {
    pub tier_id: u8,
    pub active: u8,

    pub min_bet_lamports: u64,
    pub max_bet_lamports: u64,

    /// Shaping factor used by the payout math.
    pub curve_factor: f32,

    /// Ticket distribution rate in basis points of losers (0 disables).
    pub ticket_reward_bps: u16,

    /// Max number of recipients eligible for tickets per resolved game.
    pub ticket_reward_max: u16,

    pub tickets_per_recipient: u8,

    pub _reserved: [u8; 10],
}

impl TierSettings {
    pub const SIZE: usize = 1 // tier_id
        + 1 // active
        + 8 // min_bet_lamports
        + 8 // max_bet_lamports
        + 4 // curve_factor
        + 2 // ticket_reward_bps
        + 2 // ticket_reward_max
        + 1 // tickets_per_recipient
        + 10; // _reserved

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active != 0
    }

    #[inline]
    pub fn is_valid_bet(&self, lamports: u64) -> bool {
        lamports >= self.min_bet_lamports && lamports <= self.max_bet_lamports
    }
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            tier_id: 0,
            active: 0,
            min_bet_lamports: 0,
            max_bet_lamports: 0,
            curve_factor: 0.0,
            ticket_reward_bps: 0,
            ticket_reward_max: 0,
            tickets_per_recipient: 0,
            _reserved: [0u8; 10],
        }
    }
}

/// Global program configuration, stored at the `"config"` address.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub authority: Pubkey,
    pub fee_bps: u16,
    pub paused: u8,
    pub bet_cutoff_slots: u64,
    pub treasury: Pubkey,
    pub tiers: [TierSettings; TIER_COUNT],
    pub bump: u8,
    pub version: u8,
    pub _reserved: [u8; 32],
}

impl AccountLayout for GameConfig {
    const NAME: &'static str = "Config";
    const DISCRIMINATOR: [u8; 8] = [155, 12, 170, 224, 30, 250, 204, 130];
    const SPACE: usize = 32 // authority
        + 2 // fee_bps
        + 1 // paused
        + 8 // bet_cutoff_slots
        + 32 // treasury
        + (TierSettings::SIZE * TIER_COUNT) // tiers
        + 1 // bump
        + 1 // version
        + 32; // reserved
}

impl GameConfig {
    pub fn is_paused(&self) -> bool {
        self.paused != 0
    }

    /// Settings for `tier_id`, looked up by id rather than array position.
    pub fn tier(&self, tier_id: u8) -> Option<&TierSettings> {
        self.tiers.iter().find(|t| t.tier_id == tier_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_settings_size() {
        let bytes = borsh::to_vec(&TierSettings::default()).unwrap();
        assert_eq!(bytes.len(), TierSettings::SIZE);
    }

    #[test]
    fn test_config_size_and_lookup() {
        let mut tiers = [TierSettings::default(); TIER_COUNT];
        for (i, tier) in tiers.iter_mut().enumerate() {
            tier.tier_id = i as u8 + 1;
            tier.active = 1;
            tier.min_bet_lamports = 10_000_000;
            tier.max_bet_lamports = 1_000_000_000;
        }
        let config = GameConfig {
            authority: Pubkey::default(),
            fee_bps: 300,
            paused: 0,
            bet_cutoff_slots: 150,
            treasury: Pubkey::default(),
            tiers,
            bump: 255,
            version: 1,
            _reserved: [0u8; 32],
        };
        let bytes = borsh::to_vec(&config).unwrap();
        assert_eq!(bytes.len(), GameConfig::SPACE);

        let tier = config.tier(4).unwrap();
        assert!(tier.is_active());
        assert!(tier.is_valid_bet(10_000_000));
        assert!(!tier.is_valid_bet(9_999_999));
        assert!(config.tier(6).is_none());
    }
}
