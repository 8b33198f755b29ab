use std::time::Duration;

use fortune_accounts::{DecodeError, PdaError, SelectionError};
use solana_pubkey::Pubkey;
use thiserror::Error;

/// Failures of the chain transport itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Invalid account data for {address}: {reason}")]
    InvalidData { address: Pubkey, reason: String },

    /// The push stream ended without being unsubscribed.
    #[error("Subscription stream closed")]
    Closed,
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Rpc(_) | TransportError::Subscription(_) | TransportError::Closed
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Address derivation error: {0}")]
    Pda(#[from] PdaError),

    #[error("Invalid selection: {0}")]
    Selection(#[from] SelectionError),

    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("Invalid tier {0}")]
    InvalidTier(u8),

    #[error("Cannot diff a tier {prev} snapshot against a tier {next} snapshot")]
    TierMismatch { prev: u8, next: u8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Transport failures and timeouts are worth another attempt. Everything
    /// else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_retryable(),
            ClientError::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
