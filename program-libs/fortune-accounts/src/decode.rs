use crate::{
    discriminator::{check_discriminator, read_discriminator, AccountLayout, DISCRIMINATOR_LEN},
    error::DecodeError,
    state::{GameConfig, LiveFeed, PlayerProfile, Prediction, ResolvedGame, Treasury},
};

/// Decodes a raw program account into `T`.
///
/// Checks size and discriminator before reading any field, so a failed decode
/// never yields a partially filled record. Trailing bytes past `T::LEN` are
/// ignored.
pub fn decode_account<T: AccountLayout>(data: &[u8]) -> Result<T, DecodeError> {
    check_discriminator::<T>(data)?;
    let mut body = &data[DISCRIMINATOR_LEN..T::LEN];
    T::deserialize(&mut body).map_err(|e| DecodeError::Malformed {
        account: T::NAME,
        reason: e.to_string(),
    })
}

/// Serializes `account` with its discriminator, as the program stores it.
pub fn encode_account<T: AccountLayout>(account: &T) -> borsh::io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(T::LEN);
    data.extend_from_slice(&T::DISCRIMINATOR);
    account.serialize(&mut data)?;
    Ok(data)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Config,
    LiveFeed,
    Treasury,
    PlayerProfile,
    Prediction,
    ResolvedGame,
}

impl AccountKind {
    pub const ALL: [AccountKind; 6] = [
        AccountKind::Config,
        AccountKind::LiveFeed,
        AccountKind::Treasury,
        AccountKind::PlayerProfile,
        AccountKind::Prediction,
        AccountKind::ResolvedGame,
    ];

    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            AccountKind::Config => GameConfig::DISCRIMINATOR,
            AccountKind::LiveFeed => LiveFeed::DISCRIMINATOR,
            AccountKind::Treasury => Treasury::DISCRIMINATOR,
            AccountKind::PlayerProfile => PlayerProfile::DISCRIMINATOR,
            AccountKind::Prediction => Prediction::DISCRIMINATOR,
            AccountKind::ResolvedGame => ResolvedGame::DISCRIMINATOR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccountKind::Config => GameConfig::NAME,
            AccountKind::LiveFeed => LiveFeed::NAME,
            AccountKind::Treasury => Treasury::NAME,
            AccountKind::PlayerProfile => PlayerProfile::NAME,
            AccountKind::Prediction => Prediction::NAME,
            AccountKind::ResolvedGame => ResolvedGame::NAME,
        }
    }

    /// Full account length, discriminator included.
    pub fn account_len(&self) -> usize {
        match self {
            AccountKind::Config => GameConfig::LEN,
            AccountKind::LiveFeed => LiveFeed::LEN,
            AccountKind::Treasury => Treasury::LEN,
            AccountKind::PlayerProfile => PlayerProfile::LEN,
            AccountKind::Prediction => Prediction::LEN,
            AccountKind::ResolvedGame => ResolvedGame::LEN,
        }
    }

    pub fn from_discriminator(discriminator: &[u8; 8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.discriminator() == *discriminator)
    }
}

/// Any account owned by the game program.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedAccount {
    Config(GameConfig),
    LiveFeed(LiveFeed),
    Treasury(Treasury),
    PlayerProfile(Box<PlayerProfile>),
    Prediction(Prediction),
    ResolvedGame(ResolvedGame),
}

impl DecodedAccount {
    pub fn kind(&self) -> AccountKind {
        match self {
            DecodedAccount::Config(_) => AccountKind::Config,
            DecodedAccount::LiveFeed(_) => AccountKind::LiveFeed,
            DecodedAccount::Treasury(_) => AccountKind::Treasury,
            DecodedAccount::PlayerProfile(_) => AccountKind::PlayerProfile,
            DecodedAccount::Prediction(_) => AccountKind::Prediction,
            DecodedAccount::ResolvedGame(_) => AccountKind::ResolvedGame,
        }
    }
}

/// Identifies the layout by discriminator and decodes with it.
pub fn decode_any(data: &[u8]) -> Result<DecodedAccount, DecodeError> {
    let discriminator = read_discriminator(data).ok_or(DecodeError::AccountTooSmall {
        account: "account",
        expected: DISCRIMINATOR_LEN,
        actual: data.len(),
    })?;
    let kind = AccountKind::from_discriminator(&discriminator)
        .ok_or(DecodeError::UnknownDiscriminator(discriminator))?;

    let decoded = match kind {
        AccountKind::Config => DecodedAccount::Config(decode_account(data)?),
        AccountKind::LiveFeed => DecodedAccount::LiveFeed(decode_account(data)?),
        AccountKind::Treasury => DecodedAccount::Treasury(decode_account(data)?),
        AccountKind::PlayerProfile => {
            DecodedAccount::PlayerProfile(Box::new(decode_account(data)?))
        }
        AccountKind::Prediction => DecodedAccount::Prediction(decode_account(data)?),
        AccountKind::ResolvedGame => DecodedAccount::ResolvedGame(decode_account(data)?),
    };
    Ok(decoded)
}
