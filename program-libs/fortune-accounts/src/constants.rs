pub const RESOLVED_GAME_VERSION: u8 = 2;

pub const FEE_BPS_DENOM: u64 = 10_000;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Number of slots in the per-number distribution arrays.
pub const NUMBER_SLOTS: usize = 10;

/// Tiers are numbered from 1.
pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;
pub const TIER_COUNT: usize = 5;

/// How many recent bet pubkeys a profile keeps.
pub const RECENT_BETS_CAP: usize = 40;

pub mod seeds {
    pub const CONFIG: &[u8] = b"config";
    pub const LIVE_FEED: &[u8] = b"live_feed";
    pub const TREASURY: &[u8] = b"treasury";
    pub const BET: &[u8] = b"bet";
    pub const PREDICTION: &[u8] = b"prediction";
    pub const PROFILE: &[u8] = b"profile";
    pub const RESOLVED_GAME: &[u8] = b"resolved_game";
}

pub fn is_valid_tier(tier: u8) -> bool {
    (MIN_TIER..=MAX_TIER).contains(&tier)
}
