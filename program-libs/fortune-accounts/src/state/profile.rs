use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{constants::RECENT_BETS_CAP, discriminator::AccountLayout};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfile {
    pub player: Pubkey,
    pub xp: u128,
    pub total_bets: u32,
    pub total_wagered_lamports: u64,
    pub total_won_lamports: u64,
    pub tickets: u32,
    /// Number of populated entries at the front of `recent_bets`.
    pub recent_bets_len: u8,
    pub recent_bets: [Pubkey; RECENT_BETS_CAP],
    pub bump: u8,
    pub version: u8,
    pub _reserved: [u8; 32],
}

impl AccountLayout for PlayerProfile {
    const NAME: &'static str = "PlayerProfile";
    const DISCRIMINATOR: [u8; 8] = [82, 226, 99, 87, 164, 130, 181, 80];
    const SPACE: usize = 32 // player
        + 16 // xp
        + 4 // total_bets
        + 8 // total_wagered_lamports
        + 8 // total_won_lamports
        + 4 // tickets
        + 1 // recent_bets_len
        + (32 * RECENT_BETS_CAP) // recent_bets
        + 1 // bump
        + 1 // version
        + 32; // reserved
}

impl PlayerProfile {
    pub fn new(player: Pubkey) -> Self {
        Self {
            player,
            xp: 0,
            total_bets: 0,
            total_wagered_lamports: 0,
            total_won_lamports: 0,
            tickets: 0,
            recent_bets_len: 0,
            recent_bets: [Pubkey::default(); RECENT_BETS_CAP],
            bump: 0,
            version: 0,
            _reserved: [0u8; 32],
        }
    }

    /// The populated part of the recent bets ring. A corrupt length is clamped
    /// to the capacity.
    pub fn recent_bets(&self) -> &[Pubkey] {
        let len = (self.recent_bets_len as usize).min(RECENT_BETS_CAP);
        &self.recent_bets[..len]
    }

    /// Net result in lamports; negative when the player lost more than won.
    pub fn net_lamports(&self) -> i128 {
        self.total_won_lamports as i128 - self.total_wagered_lamports as i128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_size() {
        let bytes = borsh::to_vec(&PlayerProfile::new(Pubkey::default())).unwrap();
        assert_eq!(bytes.len(), PlayerProfile::SPACE);
    }

    #[test]
    fn test_recent_bets_clamped() {
        let mut profile = PlayerProfile::new(Pubkey::default());
        profile.recent_bets[0] = Pubkey::new_from_array([1u8; 32]);
        profile.recent_bets_len = 1;
        assert_eq!(profile.recent_bets().len(), 1);

        profile.recent_bets_len = u8::MAX;
        assert_eq!(profile.recent_bets().len(), RECENT_BETS_CAP);
    }
}
