pub mod config;
pub mod live_feed;
pub mod prediction;
pub mod profile;
pub mod resolved_game;
pub mod treasury;

pub use config::{GameConfig, TierSettings};
pub use live_feed::LiveFeed;
pub use prediction::{
    Prediction, PredictionRecord, PREDICTION_GAME_EPOCH_OFFSET, PREDICTION_TIER_OFFSET,
};
pub use profile::PlayerProfile;
pub use resolved_game::ResolvedGame;
pub use treasury::Treasury;
