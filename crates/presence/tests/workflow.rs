// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios exercising the presence registry and leadership
//! tracker together, against the in-memory reference store.

use std::sync::Arc;
use std::time::Duration;

use presence::clock::Clock;
use presence::leadership::manager::mock::MockManager;
use presence::leadership::Tracker;
use presence::presence::{Change, Pinger, Watcher};
use presence::store::memory::MemoryStore;
use presence::store::PresenceStore;

fn memory_store() -> Arc<dyn PresenceStore> {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn basic_workflow() {
    let store = memory_store();
    let clock = Clock::fake(0);
    let watcher = Watcher::start(clock.clone(), store.clone());

    let (tx_a, mut rx_a) = tokio::sync::mpsc::channel::<Change>(1);
    let (tx_b, mut rx_b) = tokio::sync::mpsc::channel::<Change>(1);
    watcher.add("a", tx_a).await;
    watcher.add("b", tx_b).await;

    assert_eq!(rx_a.recv().await.unwrap(), Change { key: "a".into(), alive: false });
    assert_eq!(rx_b.recv().await.unwrap(), Change { key: "b".into(), alive: false });

    let mut a = Pinger::new("a", clock.clone(), store.clone());
    a.start().await.unwrap();
    watcher.force_refresh().await;
    assert_eq!(rx_a.recv().await.unwrap(), Change { key: "a".into(), alive: true });

    let mut b = Pinger::new("b", clock.clone(), store.clone());
    b.start().await.unwrap();
    watcher.force_refresh().await;
    assert_eq!(rx_b.recv().await.unwrap(), Change { key: "b".into(), alive: true });

    a.kill().await.unwrap();
    b.kill().await.unwrap();
    watcher.force_refresh().await;

    assert_eq!(rx_a.recv().await.unwrap(), Change { key: "a".into(), alive: false });
    assert_eq!(rx_b.recv().await.unwrap(), Change { key: "b".into(), alive: false });

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn resubscribe_gets_current_state_without_intermediate_event() {
    let store = memory_store();
    let clock = Clock::fake(0);
    let watcher = Watcher::start(clock.clone(), store.clone());

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Change>(1);
    watcher.add("a", tx.clone()).await;
    rx.recv().await.unwrap();

    let mut pinger = Pinger::new("a", clock.clone(), store.clone());
    pinger.start().await.unwrap();
    watcher.force_refresh().await;
    assert_eq!(rx.recv().await.unwrap(), Change { key: "a".into(), alive: true });

    watcher.remove("a", tx).await;
    pinger.kill().await.unwrap();
    pinger.start().await.unwrap();
    watcher.force_refresh().await;

    let (tx2, mut rx2) = tokio::sync::mpsc::channel::<Change>(1);
    watcher.add("a", tx2).await;
    assert_eq!(rx2.recv().await.unwrap(), Change { key: "a".into(), alive: true });
    assert!(rx2.try_recv().is_err());

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn scale_to_a_thousand_pingers() {
    let store = memory_store();
    let clock = Clock::fake(0);
    let watcher = Watcher::start(clock.clone(), store.clone());

    let mut pingers = Vec::with_capacity(1000);
    for i in 0..1000 {
        let key = i.to_string();
        let mut pinger = Pinger::new(key, clock.clone(), store.clone());
        pinger.start().await.unwrap();
        if i % 2 != 0 {
            pinger.kill().await.unwrap();
        }
        pingers.push(pinger);
    }

    watcher.force_refresh().await;

    for i in 0..1000 {
        let key = i.to_string();
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Change>(1);
        watcher.add(&key, tx).await;
        let change = rx.recv().await.unwrap();
        assert_eq!(change.alive, i % 2 == 0, "key {key}");
    }

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn slot_expiry_window_is_two_slots() {
    let store = memory_store();
    let clock = Clock::fake(0);
    let watcher = Watcher::start(clock.clone(), store.clone());

    let mut pinger = Pinger::new("a", clock.clone(), store.clone());
    pinger.start().await.unwrap();
    watcher.force_refresh().await;
    assert!(watcher.alive("a").await);

    clock.advance_fake_slot(1);
    watcher.force_refresh().await;
    assert!(watcher.alive("a").await, "previous-slot window still covers the last ping");

    clock.advance_fake_slot(1);
    watcher.force_refresh().await;
    assert!(!watcher.alive("a").await);

    pinger.kill().await.unwrap();
    let before = watcher.alive_keys().await;
    watcher.force_refresh().await;
    let after = watcher.alive_keys().await;
    assert_eq!(before, after, "kill after expiry produces no further event");

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_refresh_observes_a_ping_without_force_refresh() {
    let store = memory_store();
    let clock = Clock::with_period(1);
    let watcher = Watcher::start(clock.clone(), store.clone());

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Change>(1);
    watcher.add("a", tx).await;
    assert_eq!(rx.recv().await.unwrap(), Change { key: "a".into(), alive: false });

    let mut pinger = Pinger::new("a", clock.clone(), store.clone());
    pinger.start().await.unwrap();
    pinger.stop().await.unwrap();

    let change = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("periodic refresh should deliver within a couple of periods")
        .unwrap();
    assert_eq!(change, Change { key: "a".into(), alive: true });

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn leadership_happy_path() {
    let manager = Arc::new(MockManager::granting());
    let duration = Duration::from_millis(30);
    let tracker = Tracker::new("unit/0", "myservice", duration, manager);

    assert!(tracker.claim_leader().wait().await);
    tokio::time::sleep(duration).await;
    assert!(tracker.claim_leader().wait().await, "renewal keeps the lease alive past duration");

    tracker.kill();
    tracker.wait().await.unwrap();
}

#[tokio::test]
async fn leadership_denied_then_granted() {
    let manager = Arc::new(MockManager::denying());
    let duration = Duration::from_millis(20);
    let tracker = Tracker::new("unit/0", "myservice", duration, manager.clone());

    assert!(!tracker.claim_leader().wait().await);

    manager.release().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(tracker.claim_leader().wait().await);

    tracker.kill();
    tracker.wait().await.unwrap();
}
