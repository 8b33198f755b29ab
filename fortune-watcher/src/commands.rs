use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use fortune_accounts::{
    constants::{is_valid_tier, MAX_TIER, MIN_TIER},
    ProgramAddresses,
};
use fortune_client::{FortuneClient, PredictionScope};
use serde_json::json;
use solana_pubkey::Pubkey;
use tracing::{info, warn};

use crate::{
    cli::{AddressesArgs, FeedArgs, InspectArgs, PredictionsArgs},
    output::{describe_account, format_prediction, FeedPrinter, PredictionPrinter},
};

async fn wait_for_shutdown(duration_seconds: Option<u64>) -> Result<()> {
    match duration_seconds {
        Some(seconds) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?,
    }
    Ok(())
}

pub async fn run_feed(args: &FeedArgs) -> Result<()> {
    let client = FortuneClient::from_config(&args.connection.client_config());
    let printer = Arc::new(FeedPrinter {
        json: args.connection.json,
    });
    let mut sync = client.live_feed_synchronizer(printer);
    sync.subscribe(args.tier)
        .await
        .with_context(|| format!("failed to subscribe to the tier {} live feed", args.tier))?;
    if let Err(e) = sync.refresh().await {
        warn!("Initial live feed fetch failed, waiting for the first push: {}", e);
    }

    wait_for_shutdown(args.duration_seconds).await?;
    sync.unsubscribe();
    info!("Processed {} live feed frames", sync.frames());
    Ok(())
}

pub async fn run_predictions(args: &PredictionsArgs) -> Result<()> {
    let client = FortuneClient::from_config(&args.connection.client_config());
    let game_epoch = match args.game_epoch {
        Some(game_epoch) => game_epoch,
        None => {
            let feed = client
                .live_feed(args.tier)
                .await
                .context("failed to read the live feed for the current game")?;
            info!(
                "Tier {} is on epoch {} of game {}",
                args.tier, feed.epoch, feed.first_epoch_in_chain
            );
            feed.first_epoch_in_chain
        }
    };
    let scope = PredictionScope::new(game_epoch, args.tier);
    let printer = Arc::new(PredictionPrinter {
        json: args.connection.json,
    });

    let mut watcher = client.prediction_watcher(scope, printer.clone());
    watcher.subscribe().await.context("failed to subscribe to predictions")?;

    if args.scan {
        let records = client
            .scan_predictions(&scope)
            .await
            .context("failed to scan predictions")?;
        for record in &records {
            println!("{}", format_prediction(record, None, printer.json));
        }
        info!("Found {} existing predictions", records.len());
    }

    wait_for_shutdown(args.duration_seconds).await?;
    watcher.unsubscribe();
    let stats = watcher.stats();
    info!(
        "Prediction stream: {} accepted, {} rejected, {} malformed",
        stats.accepted, stats.rejected, stats.malformed
    );
    Ok(())
}

pub async fn run_inspect(args: &InspectArgs) -> Result<()> {
    let client = FortuneClient::from_config(&args.connection.client_config());
    let account = client
        .account(&args.address)
        .await
        .with_context(|| format!("failed to read account {}", args.address))?;
    let summary = describe_account(&account);
    if args.connection.json {
        println!(
            "{}",
            json!({
                "address": args.address.to_string(),
                "summary": summary,
                "account": format!("{:?}", account),
            })
        );
    } else {
        for line in summary {
            println!("{}", line);
        }
        println!("{:#?}", account);
    }
    Ok(())
}

/// Labelled addresses for `args`. Player and game addresses are included
/// when the arguments that seed them are given.
pub fn address_lines(args: &AddressesArgs) -> Result<Vec<(String, Pubkey)>> {
    let addresses = ProgramAddresses::new(args.program_id);
    let tiers: Vec<u8> = match args.tier {
        Some(tier) if !is_valid_tier(tier) => {
            bail!("tier {} is outside {}..={}", tier, MIN_TIER, MAX_TIER)
        }
        Some(tier) => vec![tier],
        None => (MIN_TIER..=MAX_TIER).collect(),
    };

    let mut lines = vec![
        ("config".to_string(), addresses.config()?.0),
        ("treasury".to_string(), addresses.treasury()?.0),
    ];
    for tier in &tiers {
        lines.push((format!("live_feed[{}]", tier), addresses.live_feed(*tier)?.0));
    }
    if let Some(player) = &args.player {
        lines.push(("profile".to_string(), addresses.profile(player)?.0));
    }
    if let Some(game_epoch) = args.game_epoch {
        for tier in &tiers {
            lines.push((
                format!("resolved_game[{}/{}]", game_epoch, tier),
                addresses.resolved_game(game_epoch, *tier)?.0,
            ));
            if let Some(player) = &args.player {
                lines.push((
                    format!("bet[{}/{}]", game_epoch, tier),
                    addresses.bet(player, game_epoch, *tier)?.0,
                ));
                lines.push((
                    format!("prediction[{}/{}]", game_epoch, tier),
                    addresses.prediction(player, game_epoch, *tier)?.0,
                ));
            }
        }
    }
    Ok(lines)
}

pub fn run_addresses(args: &AddressesArgs) -> Result<()> {
    for (label, address) in address_lines(args)? {
        println!("{:<24} {}", label, address);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(player: Option<Pubkey>, game_epoch: Option<u64>, tier: Option<u8>) -> AddressesArgs {
        AddressesArgs {
            program_id: Pubkey::new_from_array([42u8; 32]),
            player,
            game_epoch,
            tier,
        }
    }

    #[test]
    fn test_address_lines_defaults() {
        let lines = address_lines(&args(None, None, None)).unwrap();
        let labels: Vec<&str> = lines.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "config",
                "treasury",
                "live_feed[1]",
                "live_feed[2]",
                "live_feed[3]",
                "live_feed[4]",
                "live_feed[5]",
            ]
        );
        let addresses = ProgramAddresses::new(Pubkey::new_from_array([42u8; 32]));
        assert_eq!(lines[4].1, addresses.live_feed(3).unwrap().0);
    }

    #[test]
    fn test_address_lines_for_player_game() {
        let player = Pubkey::new_from_array([1u8; 32]);
        let lines = address_lines(&args(Some(player), Some(812), Some(2))).unwrap();
        let addresses = ProgramAddresses::new(Pubkey::new_from_array([42u8; 32]));
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[3], ("profile".to_string(), addresses.profile(&player).unwrap().0));
        assert_eq!(
            lines[6],
            (
                "prediction[812/2]".to_string(),
                addresses.prediction(&player, 812, 2).unwrap().0
            )
        );
    }

    #[test]
    fn test_address_lines_rejects_bad_tier() {
        assert!(address_lines(&args(None, None, Some(0))).is_err());
    }
}
