use fortune_accounts::LiveFeed;
use serde::Serialize;

use crate::errors::{ClientError, Result};

/// A semantic change between two consecutive live feed snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiffEvent {
    EpochChanged {
        prev_epoch: u64,
        next_epoch: u64,
        prev_first_epoch: u64,
        next_first_epoch: u64,
    },
    PotUpdated {
        delta: i128,
    },
    BetsUpdated {
        delta: i64,
    },
    /// Indices whose value changed in `lamports_per_number` and in
    /// `bets_per_number`.
    DistributionUpdated {
        lamports_indices: Vec<usize>,
        bets_indices: Vec<usize>,
    },
    /// Emitted once per diff, always last.
    AnyUpdate,
}

impl DiffEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DiffEvent::EpochChanged { .. } => "epoch_changed",
            DiffEvent::PotUpdated { .. } => "pot_updated",
            DiffEvent::BetsUpdated { .. } => "bets_updated",
            DiffEvent::DistributionUpdated { .. } => "distribution_updated",
            DiffEvent::AnyUpdate => "any_update",
        }
    }
}

/// Indices where `prev` and `next` differ. The shorter slice reads as zero
/// past its end.
pub fn changed_indices<T>(prev: &[T], next: &[T]) -> Vec<usize>
where
    T: Copy + Default + PartialEq,
{
    let len = prev.len().max(next.len());
    (0..len)
        .filter(|&i| {
            prev.get(i).copied().unwrap_or_default() != next.get(i).copied().unwrap_or_default()
        })
        .collect()
}

/// Compares two snapshots of the same tier.
///
/// Events come in a fixed order: epoch, pot, bets, distribution, then a
/// single [`DiffEvent::AnyUpdate`].
pub fn diff(prev: &LiveFeed, next: &LiveFeed) -> Result<Vec<DiffEvent>> {
    if prev.tier != next.tier {
        return Err(ClientError::TierMismatch {
            prev: prev.tier,
            next: next.tier,
        });
    }

    let mut events = Vec::with_capacity(5);

    if prev.epoch != next.epoch || prev.first_epoch_in_chain != next.first_epoch_in_chain {
        events.push(DiffEvent::EpochChanged {
            prev_epoch: prev.epoch,
            next_epoch: next.epoch,
            prev_first_epoch: prev.first_epoch_in_chain,
            next_first_epoch: next.first_epoch_in_chain,
        });
    }

    let pot_delta = next.total_lamports as i128 - prev.total_lamports as i128;
    if pot_delta != 0 {
        events.push(DiffEvent::PotUpdated { delta: pot_delta });
    }

    let bets_delta = next.total_bets as i64 - prev.total_bets as i64;
    if bets_delta != 0 {
        events.push(DiffEvent::BetsUpdated { delta: bets_delta });
    }

    let lamports_indices = changed_indices(&prev.lamports_per_number, &next.lamports_per_number);
    let bets_indices = changed_indices(&prev.bets_per_number, &next.bets_per_number);
    if !lamports_indices.is_empty() || !bets_indices.is_empty() {
        events.push(DiffEvent::DistributionUpdated {
            lamports_indices,
            bets_indices,
        });
    }

    events.push(DiffEvent::AnyUpdate);
    Ok(events)
}
