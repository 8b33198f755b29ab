use std::fmt;

use solana_pubkey::{Pubkey, PubkeyError, MAX_SEEDS, MAX_SEED_LEN};

use crate::{constants::seeds, error::PdaError};

/// One component of a program address seed list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seed<'a> {
    Tag(&'a [u8]),
    Key(Pubkey),
    /// Little-endian, 8 bytes.
    U64(u64),
    U8(u8),
}

impl Seed<'_> {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Seed::Tag(tag) => tag.to_vec(),
            Seed::Key(key) => key.to_bytes().to_vec(),
            Seed::U64(value) => value.to_le_bytes().to_vec(),
            Seed::U8(value) => vec![*value],
        }
    }
}

impl fmt::Display for Seed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Tag(tag) => write!(f, "\"{}\"", String::from_utf8_lossy(tag)),
            Seed::Key(key) => write!(f, "{}", key),
            Seed::U64(value) => write!(f, "{}u64", value),
            Seed::U8(value) => write!(f, "{}u8", value),
        }
    }
}

fn describe(seeds: &[Seed<'_>]) -> String {
    let parts: Vec<String> = seeds.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Finds the highest bump in `255..=0` whose address falls off the ed25519
/// curve.
pub fn derive_address(
    seeds: &[Seed<'_>],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), PdaError> {
    // One slot is reserved for the bump.
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::InvalidSeeds(format!(
            "{} seeds exceed the limit of {}",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    let owned: Vec<Vec<u8>> = seeds.iter().map(Seed::to_bytes).collect();
    if let Some(seed) = owned.iter().find(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(PdaError::InvalidSeeds(format!(
            "seed of {} bytes exceeds {} bytes",
            seed.len(),
            MAX_SEED_LEN
        )));
    }
    let base: Vec<&[u8]> = owned.iter().map(Vec::as_slice).collect();

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut candidate = base.clone();
        candidate.push(&bump_seed);
        match Pubkey::create_program_address(&candidate, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(e) => return Err(PdaError::InvalidSeeds(e.to_string())),
        }
    }
    Err(PdaError::NoValidAddress {
        seeds: describe(seeds),
    })
}

/// Derives every address the game program owns.
///
/// Nothing is cached, callers re-derive on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramAddresses {
    pub program_id: Pubkey,
}

impl ProgramAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn config(&self) -> Result<(Pubkey, u8), PdaError> {
        derive_address(&[Seed::Tag(seeds::CONFIG)], &self.program_id)
    }

    pub fn live_feed(&self, tier: u8) -> Result<(Pubkey, u8), PdaError> {
        derive_address(
            &[Seed::Tag(seeds::LIVE_FEED), Seed::U8(tier)],
            &self.program_id,
        )
    }

    pub fn treasury(&self) -> Result<(Pubkey, u8), PdaError> {
        derive_address(&[Seed::Tag(seeds::TREASURY)], &self.program_id)
    }

    pub fn profile(&self, player: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
        derive_address(
            &[Seed::Tag(seeds::PROFILE), Seed::Key(*player)],
            &self.program_id,
        )
    }

    pub fn bet(
        &self,
        player: &Pubkey,
        game_epoch: u64,
        tier: u8,
    ) -> Result<(Pubkey, u8), PdaError> {
        self.player_round(seeds::BET, player, game_epoch, tier)
    }

    pub fn prediction(
        &self,
        player: &Pubkey,
        game_epoch: u64,
        tier: u8,
    ) -> Result<(Pubkey, u8), PdaError> {
        self.player_round(seeds::PREDICTION, player, game_epoch, tier)
    }

    pub fn resolved_game(&self, game_epoch: u64, tier: u8) -> Result<(Pubkey, u8), PdaError> {
        derive_address(
            &[
                Seed::Tag(seeds::RESOLVED_GAME),
                Seed::U64(game_epoch),
                Seed::U8(tier),
            ],
            &self.program_id,
        )
    }

    fn player_round(
        &self,
        tag: &[u8],
        player: &Pubkey,
        game_epoch: u64,
        tier: u8,
    ) -> Result<(Pubkey, u8), PdaError> {
        derive_address(
            &[
                Seed::Tag(tag),
                Seed::Key(*player),
                Seed::U64(game_epoch),
                Seed::U8(tier),
            ],
            &self.program_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_id() -> Pubkey {
        Pubkey::new_from_array([9u8; 32])
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let addresses = ProgramAddresses::new(program_id());
        let player = Pubkey::new_from_array([1u8; 32]);
        assert_eq!(
            addresses.prediction(&player, 812, 2).unwrap(),
            addresses.prediction(&player, 812, 2).unwrap()
        );
        assert_ne!(
            addresses.prediction(&player, 812, 2).unwrap().0,
            addresses.prediction(&player, 812, 3).unwrap().0
        );
        assert_ne!(
            addresses.prediction(&player, 812, 2).unwrap().0,
            addresses.bet(&player, 812, 2).unwrap().0
        );
    }

    #[test]
    fn test_matches_find_program_address() {
        let addresses = ProgramAddresses::new(program_id());
        let player = Pubkey::new_from_array([4u8; 32]);
        let epoch = 777u64;

        let expected = Pubkey::find_program_address(
            &[
                b"prediction",
                player.as_ref(),
                &epoch.to_le_bytes(),
                &[3u8],
            ],
            &program_id(),
        );
        assert_eq!(addresses.prediction(&player, epoch, 3).unwrap(), expected);

        let expected = Pubkey::find_program_address(&[b"live_feed", &[1u8]], &program_id());
        assert_eq!(addresses.live_feed(1).unwrap(), expected);

        let expected = Pubkey::find_program_address(&[b"config"], &program_id());
        assert_eq!(addresses.config().unwrap(), expected);

        let expected = Pubkey::find_program_address(
            &[b"resolved_game", &epoch.to_le_bytes(), &[5u8]],
            &program_id(),
        );
        assert_eq!(addresses.resolved_game(epoch, 5).unwrap(), expected);
    }

    #[test]
    fn test_oversized_seed() {
        let long = [0u8; 33];
        assert!(matches!(
            derive_address(&[Seed::Tag(&long)], &program_id()),
            Err(PdaError::InvalidSeeds(_))
        ));
    }

    #[test]
    fn test_seed_display() {
        let seeds = [Seed::Tag(b"live_feed"), Seed::U8(2), Seed::U64(10)];
        assert_eq!(describe(&seeds), "[\"live_feed\", 2u8, 10u64]");
    }
}
