use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use fortune_client::{ClientConfig, Commitment, RetryConfig};
use solana_pubkey::Pubkey;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Also write hourly rolling log files to this directory.
    #[arg(long, global = true, env = "FORTUNE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream diff events for one tier's live feed.
    Feed(FeedArgs),
    /// Stream the predictions placed in one game.
    Predictions(PredictionsArgs),
    /// Decode the program account at an address.
    Inspect(InspectArgs),
    /// Print the derived program addresses.
    Addresses(AddressesArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct ConnectionArgs {
    #[arg(long, env = "FORTUNE_RPC_URL", default_value = "http://127.0.0.1:8899")]
    pub rpc_url: String,

    #[arg(long, env = "FORTUNE_WS_URL", default_value = "ws://127.0.0.1:8900")]
    pub ws_url: String,

    #[arg(long, env = "FORTUNE_PROGRAM_ID")]
    pub program_id: Pubkey,

    #[arg(long, env = "FORTUNE_COMMITMENT", default_value = "confirmed")]
    pub commitment: Commitment,

    #[arg(long, env = "FORTUNE_REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    #[arg(long, env = "FORTUNE_MAX_RETRIES", default_value = "5")]
    pub max_retries: u32,

    #[arg(long, env = "FORTUNE_RETRY_DELAY_MS", default_value = "500")]
    pub retry_delay_ms: u64,

    /// Print one JSON object per line instead of text.
    #[arg(long, env = "FORTUNE_JSON")]
    pub json: bool,
}

impl ConnectionArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.program_id)
            .with_urls(self.rpc_url.clone(), self.ws_url.clone())
            .with_commitment(self.commitment)
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_retry(RetryConfig {
                max_retries: self.max_retries,
                retry_delay_ms: self.retry_delay_ms,
                ..RetryConfig::default()
            })
    }
}

#[derive(Parser, Clone, Debug)]
pub struct FeedArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, env = "FORTUNE_TIER")]
    pub tier: u8,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long, env = "FORTUNE_DURATION_SECONDS")]
    pub duration_seconds: Option<u64>,
}

#[derive(Parser, Clone, Debug)]
pub struct PredictionsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, env = "FORTUNE_TIER")]
    pub tier: u8,

    /// Game to watch. Defaults to the game currently on the tier's live feed.
    #[arg(long, env = "FORTUNE_GAME_EPOCH")]
    pub game_epoch: Option<u64>,

    /// List the predictions already placed before streaming new ones.
    #[arg(long)]
    pub scan: bool,

    #[arg(long, env = "FORTUNE_DURATION_SECONDS")]
    pub duration_seconds: Option<u64>,
}

#[derive(Parser, Clone, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    pub address: Pubkey,
}

#[derive(Parser, Clone, Debug)]
pub struct AddressesArgs {
    #[arg(long, env = "FORTUNE_PROGRAM_ID")]
    pub program_id: Pubkey,

    #[arg(long)]
    pub player: Option<Pubkey>,

    #[arg(long)]
    pub game_epoch: Option<u64>,

    #[arg(long)]
    pub tier: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM_ID: &str = "11111111111111111111111111111112";

    #[test]
    fn test_parse_feed() {
        let cli = Cli::try_parse_from([
            "fortune-watcher",
            "feed",
            "--program-id",
            PROGRAM_ID,
            "--tier",
            "3",
            "--commitment",
            "finalized",
        ])
        .unwrap();
        let Commands::Feed(args) = cli.command else {
            panic!("expected feed command");
        };
        assert_eq!(args.tier, 3);
        assert_eq!(args.duration_seconds, None);

        let config = args.connection.client_config();
        assert_eq!(config.commitment, Commitment::Finalized);
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_rejects_bad_program_id() {
        assert!(Cli::try_parse_from([
            "fortune-watcher",
            "inspect",
            "--program-id",
            "not-a-key",
            PROGRAM_ID,
        ])
        .is_err());
    }

    #[test]
    fn test_parse_addresses() {
        let cli = Cli::try_parse_from([
            "fortune-watcher",
            "addresses",
            "--program-id",
            PROGRAM_ID,
            "--game-epoch",
            "812",
            "--tier",
            "2",
        ])
        .unwrap();
        let Commands::Addresses(args) = cli.command else {
            panic!("expected addresses command");
        };
        assert_eq!(args.game_epoch, Some(812));
        assert_eq!(args.tier, Some(2));
        assert_eq!(args.player, None);
        assert_eq!(cli.log_dir, None);
    }

    #[test]
    fn test_parse_log_dir_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fortune-watcher",
            "addresses",
            "--program-id",
            PROGRAM_ID,
            "--log-dir",
            "/var/log/fortune",
        ])
        .unwrap();
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/fortune")));
    }
}
