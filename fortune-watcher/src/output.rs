//! Line formatting for command output. One line per update, either text or
//! a JSON object.

use fortune_accounts::{
    constants::NUMBER_SLOTS, lamports_to_sol, DecodedAccount, LiveFeed, PredictionRecord,
};
use fortune_client::{ClientError, DiffEvent, LiveFeedHandler, LiveFeedUpdate, PredictionHandler};
use serde_json::json;
use tracing::{error, warn};

/// Non-zero pot shares as `number:percent` pairs.
pub fn format_shares(feed: &LiveFeed) -> String {
    (0..NUMBER_SLOTS)
        .filter_map(|number| {
            let bps = feed.share_bps(number)?;
            (bps > 0).then(|| format!("{}:{:.2}%", number, bps as f64 / 100.0))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_event(event: &DiffEvent, snapshot: &LiveFeed) -> Option<String> {
    match event {
        DiffEvent::EpochChanged {
            prev_epoch,
            next_epoch,
            prev_first_epoch,
            next_first_epoch,
        } => Some(if prev_first_epoch == next_first_epoch {
            format!("epoch {} -> {} (carried over)", prev_epoch, next_epoch)
        } else {
            format!(
                "epoch {} -> {}, new game {}",
                prev_epoch, next_epoch, next_first_epoch
            )
        }),
        DiffEvent::PotUpdated { delta } => Some(format!(
            "pot {:+} lamports, now {:.4} SOL",
            delta,
            lamports_to_sol(snapshot.total_lamports)
        )),
        DiffEvent::BetsUpdated { delta } => {
            Some(format!("bets {:+}, now {}", delta, snapshot.total_bets))
        }
        DiffEvent::DistributionUpdated {
            lamports_indices,
            bets_indices,
        } => {
            let mut numbers = lamports_indices.clone();
            numbers.extend(bets_indices);
            numbers.sort_unstable();
            numbers.dedup();
            Some(format!(
                "numbers {:?} changed, shares {}",
                numbers,
                format_shares(snapshot)
            ))
        }
        DiffEvent::AnyUpdate => None,
    }
}

pub fn format_update(update: &LiveFeedUpdate, as_json: bool) -> String {
    let feed = &update.snapshot;
    if as_json {
        return json!({
            "tier": update.tier,
            "slot": update.slot,
            "epoch": feed.epoch,
            "first_epoch_in_chain": feed.first_epoch_in_chain,
            "total_lamports": feed.total_lamports,
            "total_bets": feed.total_bets,
            "events": update.events,
        })
        .to_string();
    }

    let prefix = format!("[tier {} slot {}]", update.tier, update.slot);
    if update.is_seed() {
        return format!(
            "{} epoch {} game {}: pot {:.4} SOL, {} bets, shares {}",
            prefix,
            feed.epoch,
            feed.first_epoch_in_chain,
            lamports_to_sol(feed.total_lamports),
            feed.total_bets,
            format_shares(feed)
        );
    }
    let changes: Vec<String> = update
        .events
        .iter()
        .filter_map(|event| describe_event(event, feed))
        .collect();
    if changes.is_empty() {
        format!("{} no tracked changes", prefix)
    } else {
        format!("{} {}", prefix, changes.join("; "))
    }
}

/// `slot` is `None` for records read by a scan rather than pushed.
pub fn format_prediction(record: &PredictionRecord, slot: Option<u64>, as_json: bool) -> String {
    let prediction = &record.prediction;
    if as_json {
        return json!({
            "address": record.address.to_string(),
            "player": prediction.player.to_string(),
            "game_epoch": prediction.game_epoch,
            "tier": prediction.tier,
            "bet_type": format!("{:?}", record.selection.bet_type()),
            "numbers": record.selection.numbers(),
            "lamports": prediction.lamports,
            "slot": slot,
        })
        .to_string();
    }
    let slot = slot.map_or_else(|| "scan".to_string(), |slot| slot.to_string());
    format!(
        "[game {} tier {} slot {}] {} {:?} {:?} {:.4} SOL ({})",
        prediction.game_epoch,
        prediction.tier,
        slot,
        prediction.player,
        record.selection.bet_type(),
        record.selection.numbers(),
        lamports_to_sol(prediction.lamports),
        record.address
    )
}

/// Summary lines for `inspect`; the full field dump follows them.
pub fn describe_account(account: &DecodedAccount) -> Vec<String> {
    let mut lines = vec![format!("kind: {}", account.kind().name())];
    match account {
        DecodedAccount::Config(config) => {
            lines.push(format!("paused: {}", config.is_paused()));
            lines.push(format!("fee: {} bps", config.fee_bps));
            for tier in config.tiers.iter().filter(|tier| tier.is_active()) {
                lines.push(format!(
                    "tier {}: {:.4}..{:.4} SOL",
                    tier.tier_id,
                    lamports_to_sol(tier.min_bet_lamports),
                    lamports_to_sol(tier.max_bet_lamports)
                ));
            }
        }
        DecodedAccount::LiveFeed(feed) => {
            lines.push(format!(
                "tier {} epoch {} game {}",
                feed.tier, feed.epoch, feed.first_epoch_in_chain
            ));
            lines.push(format!(
                "pot: {:.4} SOL ({:.4} fresh), {} bets",
                lamports_to_sol(feed.total_lamports),
                lamports_to_sol(feed.fresh_lamports()),
                feed.total_bets
            ));
            lines.push(format!("shares: {}", format_shares(feed)));
        }
        DecodedAccount::Treasury(treasury) => {
            lines.push(format!(
                "accounted balance: {} lamports",
                treasury.accounted_balance()
            ));
        }
        DecodedAccount::PlayerProfile(profile) => {
            lines.push(format!("player: {}", profile.player));
            lines.push(format!(
                "bets: {}, net: {} lamports, recent: {}",
                profile.total_bets,
                profile.net_lamports(),
                profile.recent_bets().len()
            ));
        }
        DecodedAccount::Prediction(prediction) => {
            lines.push(format!(
                "player {} game {} tier {}, choice {:#x}",
                prediction.player, prediction.game_epoch, prediction.tier, prediction.choice
            ));
        }
        DecodedAccount::ResolvedGame(game) => {
            if game.rolled_over() {
                lines.push(format!(
                    "game {} tier {} rolled over on {}",
                    game.game_epoch, game.tier, game.winning_number
                ));
            } else {
                lines.push(format!(
                    "game {} tier {} won by {}: {} winning bets, prize {:.4} SOL",
                    game.game_epoch,
                    game.tier,
                    game.winning_number,
                    game.winning_bets,
                    lamports_to_sol(game.net_prize_lamports)
                ));
            }
        }
    }
    lines
}

pub struct FeedPrinter {
    pub json: bool,
}

impl LiveFeedHandler for FeedPrinter {
    fn on_update(&self, update: &LiveFeedUpdate) {
        println!("{}", format_update(update, self.json));
    }

    fn on_error(&self, tier: u8, error: &ClientError) {
        error!("Live feed tier {}: {}", tier, error);
    }
}

pub struct PredictionPrinter {
    pub json: bool,
}

impl PredictionHandler for PredictionPrinter {
    fn on_prediction(&self, record: &PredictionRecord, slot: u64) {
        println!("{}", format_prediction(record, Some(slot), self.json));
    }

    fn on_error(&self, error: &ClientError) {
        warn!("Prediction stream: {}", error);
    }
}
