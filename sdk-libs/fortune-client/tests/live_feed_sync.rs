use std::{sync::Arc, time::Duration};

use fortune_client::{
    fortune_accounts::DecodeError, ClientError, DiffEvent, FeedStore, FortuneClient,
    MemoryTransport, RetryConfig, SyncPhase, TransportError,
};

use crate::test_utils::{
    addresses, feed, program_id, publish_feed, test_config, RecordingFeedHandler,
};

mod test_utils;

fn client(transport: &MemoryTransport) -> FortuneClient<MemoryTransport> {
    FortuneClient::new(Arc::new(transport.clone()), &test_config())
}

#[tokio::test]
async fn test_seed_then_diff() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    assert_eq!(sync.phase(), SyncPhase::Idle);

    let address = sync.subscribe(1).await.unwrap();
    assert_eq!(address, addresses().live_feed(1).unwrap().0);
    assert_eq!(
        sync.phase(),
        SyncPhase::Subscribed { tier: 1, address }
    );

    let mut prev = feed(1, 5);
    prev.total_lamports = 1_000;
    prev.total_bets = 2;
    prev.lamports_per_number[1] = 400;
    prev.bets_per_number[1] = 1;
    let seed_slot = publish_feed(&transport, &prev);

    let mut next = prev.clone();
    next.total_lamports = 1_500;
    next.total_bets = 3;
    next.lamports_per_number[1] = 900;
    next.bets_per_number[1] = 2;
    publish_feed(&transport, &next);

    let updates = handler.updates();
    assert_eq!(updates.len(), 2);
    assert!(updates[0].is_seed());
    assert_eq!(updates[0].slot, seed_slot);
    assert_eq!(updates[0].snapshot, prev);
    assert_eq!(
        updates[1].events,
        vec![
            DiffEvent::PotUpdated { delta: 500 },
            DiffEvent::BetsUpdated { delta: 1 },
            DiffEvent::DistributionUpdated {
                lamports_indices: vec![1],
                bets_indices: vec![1],
            },
            DiffEvent::AnyUpdate,
        ]
    );
    assert_eq!(sync.baseline(), Some(next));
    assert_eq!(sync.frames(), 2);
    assert!(handler.errors().is_empty());
}

#[tokio::test]
async fn test_epoch_change_frame() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    sync.subscribe(2).await.unwrap();

    publish_feed(&transport, &feed(2, 5));
    let mut next = feed(2, 5);
    next.epoch = 6;
    publish_feed(&transport, &next);

    let updates = handler.updates();
    assert_eq!(
        updates[1].events,
        vec![
            DiffEvent::EpochChanged {
                prev_epoch: 5,
                next_epoch: 6,
                prev_first_epoch: 5,
                next_first_epoch: 5,
            },
            DiffEvent::AnyUpdate,
        ]
    );
}

#[tokio::test]
async fn test_decode_failure_keeps_subscription_and_baseline() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    let address = sync.subscribe(1).await.unwrap();

    let first = feed(1, 5);
    publish_feed(&transport, &first);

    // Truncated frame.
    transport.set_account(address, program_id(), vec![0u8; 20], 1);
    let errors = handler.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        ClientError::Decode(DecodeError::AccountTooSmall { actual: 20, .. })
    ));
    assert_eq!(sync.baseline(), Some(first.clone()));
    assert!(matches!(sync.phase(), SyncPhase::Subscribed { .. }));

    let mut next = first.clone();
    next.total_bets = 1;
    publish_feed(&transport, &next);
    let updates = handler.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[1].events,
        vec![DiffEvent::BetsUpdated { delta: 1 }, DiffEvent::AnyUpdate]
    );
}

#[tokio::test]
async fn test_transport_error_is_reported() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    let address = sync.subscribe(1).await.unwrap();

    transport.push_error(&address, TransportError::Closed);
    assert_eq!(
        handler.errors(),
        vec![ClientError::Transport(TransportError::Closed)]
    );
    assert!(handler.updates().is_empty());
}

#[tokio::test]
async fn test_foreign_tier_frame_is_dropped() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    let address = sync.subscribe(1).await.unwrap();

    let wrong = feed(3, 5);
    transport.set_account(
        address,
        program_id(),
        fortune_client::fortune_accounts::encode_account(&wrong).unwrap(),
        1,
    );
    assert_eq!(
        handler.errors(),
        vec![ClientError::TierMismatch { prev: 1, next: 3 }]
    );
    assert!(handler.updates().is_empty());
    assert_eq!(sync.baseline(), None);
}

#[tokio::test]
async fn test_resubscribe_resets_baseline() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());

    sync.subscribe(1).await.unwrap();
    publish_feed(&transport, &feed(1, 5));
    assert!(sync.baseline().is_some());

    sync.subscribe(2).await.unwrap();
    assert_eq!(sync.baseline(), None);
    assert_eq!(transport.active_subscriptions(), 1);

    // The old tier no longer reaches the handler.
    publish_feed(&transport, &feed(1, 6));
    assert_eq!(handler.updates().len(), 1);

    publish_feed(&transport, &feed(2, 9));
    let updates = handler.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].tier, 2);
    assert!(updates[1].is_seed());
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());

    sync.unsubscribe();
    assert_eq!(sync.phase(), SyncPhase::Idle);

    sync.subscribe(4).await.unwrap();
    sync.unsubscribe();
    sync.unsubscribe();
    assert_eq!(sync.phase(), SyncPhase::Unsubscribed);
    assert_eq!(transport.active_subscriptions(), 0);

    publish_feed(&transport, &feed(4, 1));
    assert!(handler.updates().is_empty());
}

#[tokio::test]
async fn test_drop_unsubscribes() {
    let transport = MemoryTransport::new();
    let handler = RecordingFeedHandler::new();
    {
        let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
        sync.subscribe(1).await.unwrap();
        assert_eq!(transport.active_subscriptions(), 1);
    }
    assert_eq!(transport.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_invalid_tier() {
    let transport = MemoryTransport::new();
    let mut sync = client(&transport).live_feed_synchronizer(RecordingFeedHandler::new());
    assert_eq!(sync.subscribe(0).await, Err(ClientError::InvalidTier(0)));
    assert_eq!(sync.subscribe(6).await, Err(ClientError::InvalidTier(6)));
    assert_eq!(sync.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_refresh_seeds_baseline() {
    let transport = MemoryTransport::new();
    publish_feed(&transport, &feed(3, 40));

    let handler = RecordingFeedHandler::new();
    let mut sync = client(&transport).live_feed_synchronizer(handler.clone());
    assert_eq!(sync.refresh().await, Ok(None));

    sync.subscribe(3).await.unwrap();
    assert_eq!(sync.refresh().await, Ok(Some(feed(3, 40))));
    assert!(handler.updates()[0].is_seed());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_times_out() {
    let transport = MemoryTransport::new().with_fetch_delay(Duration::from_secs(3600));
    publish_feed(&transport, &feed(2, 40));
    let config = test_config()
        .with_request_timeout(Duration::from_secs(2))
        .with_retry(RetryConfig::none());
    let client = FortuneClient::new(Arc::new(transport.clone()), &config);

    let handler = RecordingFeedHandler::new();
    let mut sync = client.live_feed_synchronizer(handler.clone());
    let address = sync.subscribe(2).await.unwrap();

    assert_eq!(
        sync.refresh().await,
        Err(ClientError::Timeout {
            operation: "refresh_live_feed",
            after: Duration::from_secs(2),
        })
    );
    assert!(handler.updates().is_empty());
    assert_eq!(sync.baseline(), None);
    assert_eq!(sync.phase(), SyncPhase::Subscribed { tier: 2, address });
}

#[tokio::test]
async fn test_feed_store_tracks_stale_state() {
    let transport = MemoryTransport::new();
    let store = Arc::new(FeedStore::new());
    let mut sync = client(&transport).live_feed_synchronizer(store.clone());
    let address = sync.subscribe(1).await.unwrap();

    let mut first = feed(1, 5);
    first.total_lamports = 10;
    publish_feed(&transport, &first);
    transport.set_account(address, program_id(), vec![1, 2, 3], 1);

    let state = store.state();
    assert!(state.is_stale());
    assert_eq!(state.snapshot, Some(first));
    assert_eq!(state.updates, 1);

    let mut second = feed(1, 5);
    second.total_lamports = 25;
    publish_feed(&transport, &second);
    let state = store.state();
    assert!(!state.is_stale());
    assert_eq!(state.updates, 2);
    assert_eq!(state.last_events[0], DiffEvent::PotUpdated { delta: 15 });
}
