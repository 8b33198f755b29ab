use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use solana_pubkey::Pubkey;
use tracing::debug;

use super::{
    AccountBlob, AccountFilter, AccountListener, ChainTransport, KeyedAccountBlob,
    ProgramAccountListener, Subscription,
};
use crate::{config::Commitment, errors::TransportError};

type SharedAccountListener = Arc<Mutex<AccountListener>>;
type SharedProgramListener = Arc<Mutex<ProgramAccountListener>>;

struct ProgramWatch {
    program_id: Pubkey,
    filters: Vec<AccountFilter>,
    listener: SharedProgramListener,
}

#[derive(Default)]
struct Registry {
    accounts: HashMap<Pubkey, AccountBlob>,
    account_listeners: HashMap<u64, (Pubkey, SharedAccountListener)>,
    program_listeners: HashMap<u64, ProgramWatch>,
    next_id: u64,
    slot: u64,
    failing_requests: u32,
}

/// Transport over an in-process account map.
///
/// Writes through [`MemoryTransport::set_account`] are pushed to matching
/// listeners before the call returns, on the caller's thread. Clones share
/// the same map.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    registry: Arc<Mutex<Registry>>,
    fetch_delay: Option<Duration>,
    ignore_stream_filters: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver<U>(listener: &Mutex<Box<dyn FnMut(U) + Send>>, update: U) {
    let mut listener = lock(listener);
    (*listener)(update);
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every fetch, to exercise request timeouts.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Pushes every write of a program's accounts to its program
    /// subscribers, like a node that does not apply subscription filters.
    /// Program scans still honor filters.
    pub fn with_unfiltered_streams(mut self) -> Self {
        self.ignore_stream_filters = true;
        self
    }

    /// Fails the next `count` fetches with a retryable RPC error.
    pub fn fail_next_requests(&self, count: u32) {
        lock(&self.registry).failing_requests = count;
    }

    pub fn slot(&self) -> u64 {
        lock(&self.registry).slot
    }

    pub fn active_subscriptions(&self) -> usize {
        let registry = lock(&self.registry);
        registry.account_listeners.len() + registry.program_listeners.len()
    }

    pub fn account(&self, address: &Pubkey) -> Option<AccountBlob> {
        lock(&self.registry).accounts.get(address).cloned()
    }

    /// Stores the account at the next slot and notifies its listeners.
    /// Returns the slot the write landed in.
    pub fn set_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>, lamports: u64) -> u64 {
        let (blob, account_listeners, program_listeners) = {
            let mut registry = lock(&self.registry);
            registry.slot += 1;
            let blob = AccountBlob {
                data,
                lamports,
                owner,
                slot: registry.slot,
            };
            registry.accounts.insert(address, blob.clone());
            let account_listeners: Vec<SharedAccountListener> = registry
                .account_listeners
                .values()
                .filter(|(watched, _)| *watched == address)
                .map(|(_, listener)| listener.clone())
                .collect();
            let program_listeners: Vec<SharedProgramListener> = registry
                .program_listeners
                .values()
                .filter(|watch| {
                    watch.program_id == owner
                        && (self.ignore_stream_filters
                            || AccountFilter::matches_all(&watch.filters, &blob.data))
                })
                .map(|watch| watch.listener.clone())
                .collect();
            (blob, account_listeners, program_listeners)
        };

        // Listeners run without the registry lock so they may read back.
        for listener in account_listeners {
            deliver(&listener, Ok(blob.clone()));
        }
        for listener in program_listeners {
            deliver(
                &listener,
                Ok(KeyedAccountBlob {
                    address,
                    account: blob.clone(),
                }),
            );
        }
        blob.slot
    }

    /// Delivers `error` to every listener on `address`, as a failing stream
    /// would.
    pub fn push_error(&self, address: &Pubkey, error: TransportError) {
        let listeners: Vec<SharedAccountListener> = lock(&self.registry)
            .account_listeners
            .values()
            .filter(|(watched, _)| watched == address)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            deliver(&listener, Err(error.clone()));
        }
    }

    pub fn remove_account(&self, address: &Pubkey) -> Option<AccountBlob> {
        lock(&self.registry).accounts.remove(address)
    }

    async fn before_fetch(&self) -> Result<(), TransportError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let mut registry = lock(&self.registry);
        if registry.failing_requests > 0 {
            registry.failing_requests -= 1;
            return Err(TransportError::Rpc("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainTransport for MemoryTransport {
    async fn get_account_info(
        &self,
        address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<Option<AccountBlob>, TransportError> {
        self.before_fetch().await?;
        Ok(self.account(address))
    }

    async fn get_multiple_accounts_info(
        &self,
        addresses: &[Pubkey],
        _commitment: Commitment,
    ) -> Result<Vec<Option<AccountBlob>>, TransportError> {
        self.before_fetch().await?;
        let registry = lock(&self.registry);
        Ok(addresses
            .iter()
            .map(|address| registry.accounts.get(address).cloned())
            .collect())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        _commitment: Commitment,
    ) -> Result<Vec<KeyedAccountBlob>, TransportError> {
        self.before_fetch().await?;
        let registry = lock(&self.registry);
        Ok(registry
            .accounts
            .iter()
            .filter(|(_, account)| {
                account.owner == *program_id && AccountFilter::matches_all(filters, &account.data)
            })
            .map(|(address, account)| KeyedAccountBlob {
                address: *address,
                account: account.clone(),
            })
            .collect())
    }

    async fn on_account_change(
        &self,
        address: &Pubkey,
        _commitment: Commitment,
        listener: AccountListener,
    ) -> Result<Subscription, TransportError> {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .account_listeners
                .insert(id, (*address, Arc::new(Mutex::new(listener))));
            id
        };
        debug!("Memory subscription {} on account {}", id, address);
        let registry = self.registry.clone();
        Ok(Subscription::new(format!("account {}", address), move || {
            lock(&registry).account_listeners.remove(&id);
        }))
    }

    async fn on_program_account_change(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        _commitment: Commitment,
        listener: ProgramAccountListener,
    ) -> Result<Subscription, TransportError> {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.program_listeners.insert(
                id,
                ProgramWatch {
                    program_id: *program_id,
                    filters: filters.to_vec(),
                    listener: Arc::new(Mutex::new(listener)),
                },
            );
            id
        };
        debug!("Memory subscription {} on program {}", id, program_id);
        let registry = self.registry.clone();
        Ok(Subscription::new(format!("program {}", program_id), move || {
            lock(&registry).program_listeners.remove(&id);
        }))
    }
}
