use anyhow::Result;
use clap::Parser;
use fortune_watcher::{
    cli::{Cli, Commands},
    commands,
    telemetry::setup_telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_telemetry(cli.log_dir.as_deref());
    match &cli.command {
        Commands::Feed(args) => commands::run_feed(args).await,
        Commands::Predictions(args) => commands::run_predictions(args).await,
        Commands::Inspect(args) => commands::run_inspect(args).await,
        Commands::Addresses(args) => commands::run_addresses(args),
    }
}
