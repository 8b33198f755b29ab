//! Layout tests over raw account bytes.
//! Verifies discriminators, sizes and that prediction records only decode with
//! a valid packed choice.

use fortune_accounts::{
    constants::NUMBER_SLOTS, decode_account, decode_any, encode_account, encode_choice,
    AccountKind, AccountLayout, BetType, DecodeError, DecodedAccount, GameConfig, LiveFeed,
    NumberUniverse, PlayerProfile, Prediction, PredictionRecord, ResolvedGame, SelectionError,
    Treasury,
};
use sha2::{Digest, Sha256};
use solana_pubkey::Pubkey;

fn anchor_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{}", name).as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

#[test]
fn test_discriminators_match_account_names() {
    assert_eq!(LiveFeed::DISCRIMINATOR, anchor_discriminator("LiveFeed"));
    assert_eq!(Prediction::DISCRIMINATOR, anchor_discriminator("Prediction"));
    assert_eq!(
        PlayerProfile::DISCRIMINATOR,
        anchor_discriminator("PlayerProfile")
    );
    assert_eq!(GameConfig::DISCRIMINATOR, anchor_discriminator("Config"));
    assert_eq!(
        ResolvedGame::DISCRIMINATOR,
        anchor_discriminator("ResolvedGame")
    );
    assert_eq!(Treasury::DISCRIMINATOR, anchor_discriminator("Treasury"));
}

#[test]
fn test_account_sizes() {
    assert_eq!(LiveFeed::SPACE, 267);
    assert_eq!(Prediction::SPACE, 88);
    assert_eq!(PlayerProfile::SPACE, 1387);
    assert_eq!(GameConfig::SPACE, 294);
    assert_eq!(ResolvedGame::SPACE, 207);
    assert_eq!(Treasury::SPACE, 91);
    for kind in AccountKind::ALL {
        assert_eq!(kind.account_len(), kind_space(kind) + 8, "{}", kind.name());
    }
}

fn kind_space(kind: AccountKind) -> usize {
    match kind {
        AccountKind::Config => GameConfig::SPACE,
        AccountKind::LiveFeed => LiveFeed::SPACE,
        AccountKind::Treasury => Treasury::SPACE,
        AccountKind::PlayerProfile => PlayerProfile::SPACE,
        AccountKind::Prediction => Prediction::SPACE,
        AccountKind::ResolvedGame => ResolvedGame::SPACE,
    }
}

fn prediction(choice: u32) -> Prediction {
    Prediction {
        player: Pubkey::new_from_array([2; 32]),
        game_epoch: 812,
        tier: 2,
        epoch: 813,
        choice,
        lamports: 250_000_000,
        placed_slot: 351_000_123,
        claimed: 0,
        bump: 254,
        version: 1,
        _reserved: [0u8; 16],
    }
}

#[test]
fn test_prediction_record_from_account() {
    let universe = NumberUniverse::LIVE_FEED;
    let choice = encode_choice(BetType::Double, &[8, 2], &universe).unwrap();
    let data = encode_account(&prediction(choice)).unwrap();
    let address = Pubkey::new_from_array([3; 32]);

    let record = PredictionRecord::from_account(address, &data, &universe).unwrap();
    assert_eq!(record.address, address);
    assert_eq!(record.lamports(), 250_000_000);
    assert_eq!(record.selection.bet_type(), BetType::Double);
    assert_eq!(record.selection.numbers(), &[2, 8]);
}

#[test]
fn test_prediction_record_rejects_bad_choice() {
    let universe = NumberUniverse::LIVE_FEED;
    let address = Pubkey::new_from_array([4; 32]);

    // Single on number 12 is packable but outside the live feed universe.
    let data = encode_account(&prediction(0xc0)).unwrap();
    assert_eq!(
        PredictionRecord::from_account(address, &data, &universe),
        Err(DecodeError::InvalidChoice(SelectionError::OutOfUniverse(12)))
    );

    let data = encode_account(&prediction(0x7)).unwrap();
    assert_eq!(
        PredictionRecord::from_account(address, &data, &universe),
        Err(DecodeError::InvalidChoice(SelectionError::UnknownBetType(7)))
    );
}

#[test]
fn test_truncated_accounts_never_decode() {
    let data = encode_account(&prediction(0x10)).unwrap();
    for len in 0..data.len() {
        assert!(decode_account::<Prediction>(&data[..len]).is_err());
        assert!(decode_any(&data[..len]).is_err());
    }
    assert!(matches!(
        decode_any(&data),
        Ok(DecodedAccount::Prediction(_))
    ));
}

#[test]
fn test_decode_profile_and_resolved_game() {
    let mut profile = PlayerProfile::new(Pubkey::new_from_array([5; 32]));
    profile.xp = u128::MAX / 3;
    profile.recent_bets_len = 2;
    profile.recent_bets[0] = Pubkey::new_from_array([6; 32]);
    profile.recent_bets[1] = Pubkey::new_from_array([7; 32]);
    let data = encode_account(&profile).unwrap();
    assert_eq!(data.len(), PlayerProfile::LEN);
    let decoded = decode_account::<PlayerProfile>(&data).unwrap();
    assert_eq!(decoded.xp, u128::MAX / 3);
    assert_eq!(decoded.recent_bets().len(), 2);

    let mut lamports_per_number = [0u64; NUMBER_SLOTS];
    lamports_per_number[4] = 1_000;
    let game = ResolvedGame {
        game_epoch: 800,
        last_epoch: 802,
        tier: 1,
        version: 2,
        winning_number: 4,
        secondary_rollover_number: 0,
        total_pot_lamports: 5_000,
        total_bets: 9,
        winning_bets: 2,
        net_prize_lamports: 4_850,
        fee_bps: 300,
        resolved_slot: 99,
        lamports_per_number,
        bets_per_number: [1u32; NUMBER_SLOTS],
        bump: 253,
        _reserved: [0u8; 32],
    };
    let data = encode_account(&game).unwrap();
    match decode_any(&data).unwrap() {
        DecodedAccount::ResolvedGame(decoded) => {
            assert_eq!(decoded, game);
            assert_eq!(decoded.lamports_on_winner(), 1_000);
            assert!(!decoded.rolled_over());
        }
        other => panic!("unexpected account {:?}", other.kind()),
    }
}
