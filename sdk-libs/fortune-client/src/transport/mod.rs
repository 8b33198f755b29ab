//! The chain capabilities the client needs, behind one trait.
//!
//! [`solana::SolanaTransport`] talks to a real RPC node and websocket.
//! [`memory::MemoryTransport`] serves accounts from a local map and delivers
//! pushes synchronously.

use std::fmt;

use async_trait::async_trait;
use solana_pubkey::Pubkey;

use crate::{config::Commitment, errors::TransportError};

pub mod memory;
pub mod solana;

/// Raw account bytes plus the envelope they arrived in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBlob {
    pub data: Vec<u8>,
    pub lamports: u64,
    pub owner: Pubkey,
    pub slot: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedAccountBlob {
    pub address: Pubkey,
    pub account: AccountBlob,
}

/// Server-side equality filter for program account queries and streams.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        AccountFilter::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
            AccountFilter::Memcmp { offset, bytes } => offset
                .checked_add(bytes.len())
                .and_then(|end| data.get(*offset..end))
                .is_some_and(|slice| slice == bytes.as_slice()),
        }
    }

    pub fn matches_all(filters: &[AccountFilter], data: &[u8]) -> bool {
        filters.iter().all(|filter| filter.matches(data))
    }
}

/// A push notification, or the reason the stream failed.
pub type AccountUpdate = Result<AccountBlob, TransportError>;
pub type ProgramAccountUpdate = Result<KeyedAccountBlob, TransportError>;

/// Invoked on whatever thread delivers the push. Must return promptly.
pub type AccountListener = Box<dyn FnMut(AccountUpdate) + Send>;
pub type ProgramAccountListener = Box<dyn FnMut(ProgramAccountUpdate) + Send>;

/// Handle to a live push subscription.
///
/// `unsubscribe` may be called any number of times. Dropping the handle
/// unsubscribes.
pub struct Subscription {
    label: String,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

#[async_trait]
pub trait ChainTransport: Send + Sync + 'static {
    async fn get_account_info(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<AccountBlob>, TransportError>;

    /// One entry per requested address, in request order.
    async fn get_multiple_accounts_info(
        &self,
        addresses: &[Pubkey],
        commitment: Commitment,
    ) -> Result<Vec<Option<AccountBlob>>, TransportError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        commitment: Commitment,
    ) -> Result<Vec<KeyedAccountBlob>, TransportError>;

    async fn on_account_change(
        &self,
        address: &Pubkey,
        commitment: Commitment,
        listener: AccountListener,
    ) -> Result<Subscription, TransportError>;

    async fn on_program_account_change(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        commitment: Commitment,
        listener: ProgramAccountListener,
    ) -> Result<Subscription, TransportError>;
}
