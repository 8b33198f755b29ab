use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use fortune_accounts::LiveFeed;
use tracing::debug;

use crate::{
    diff::DiffEvent,
    errors::ClientError,
    live_feed::{LiveFeedHandler, LiveFeedUpdate},
};

/// What the presentation layer renders from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedState {
    pub snapshot: Option<LiveFeed>,
    pub slot: Option<u64>,
    /// Set when the latest frame failed. The snapshot is left as it was.
    pub error: Option<String>,
    pub updates: u64,
    pub last_events: Vec<DiffEvent>,
}

impl FeedState {
    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}

pub type ListenerId = u64;
type StoreListener = Arc<dyn Fn(&FeedState) + Send + Sync>;

/// Owned live feed state with an explicit listener list.
#[derive(Default)]
pub struct FeedStore {
    state: Mutex<FeedState>,
    listeners: Mutex<Vec<(ListenerId, StoreListener)>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FeedState {
        lock(&self.state).clone()
    }

    pub fn add_listener(&self, listener: impl Fn(&FeedState) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Replaces the snapshot and clears any error flag.
    pub fn update(&self, update: &LiveFeedUpdate) {
        let state = {
            let mut state = lock(&self.state);
            state.snapshot = Some(update.snapshot.clone());
            state.slot = Some(update.slot);
            state.error = None;
            state.updates += 1;
            state.last_events = update.events.clone();
            state.clone()
        };
        self.notify(&state);
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let state = {
            let mut state = lock(&self.state);
            state.error = Some(error.into());
            state.clone()
        };
        self.notify(&state);
    }

    /// Forgets the snapshot, for a tier switch.
    pub fn reset(&self) {
        let state = {
            let mut state = lock(&self.state);
            *state = FeedState::default();
            state.clone()
        };
        self.notify(&state);
    }

    fn notify(&self, state: &FeedState) {
        let listeners: Vec<StoreListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        debug!("Notifying {} feed store listeners", listeners.len());
        for listener in listeners {
            listener(state);
        }
    }
}

impl LiveFeedHandler for FeedStore {
    fn on_update(&self, update: &LiveFeedUpdate) {
        self.update(update);
    }

    fn on_error(&self, _tier: u8, error: &ClientError) {
        self.set_error(error.to_string());
    }
}
