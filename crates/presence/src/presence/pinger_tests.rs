// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use crate::store::memory::MemoryStore;

#[tokio::test]
async fn start_writes_beacon_and_immediate_ping() {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::fake(5);
    let mut pinger = Pinger::new("unit/0", clock.clone(), store.clone());

    pinger.start().await.unwrap();
    assert!(pinger.is_running());

    let slot = store.load_ping_slot(5).await.unwrap().expect("current slot pinged");
    assert_eq!(slot.alive.len(), 1);
    assert_eq!(slot.alive.values().next(), Some(&true));

    pinger.stop().await.unwrap();
}

#[tokio::test]
async fn start_twice_is_already_running() {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::fake(0);
    let mut pinger = Pinger::new("unit/0", clock, store);

    pinger.start().await.unwrap();
    assert_eq!(pinger.start().await, Err(PresenceError::AlreadyRunning));
    pinger.stop().await.unwrap();
}

#[tokio::test]
async fn stop_twice_is_already_stopped() {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::fake(0);
    let mut pinger = Pinger::new("unit/0", clock, store);

    pinger.start().await.unwrap();
    pinger.stop().await.unwrap();
    assert_eq!(pinger.stop().await, Err(PresenceError::AlreadyStopped));
}

#[tokio::test]
async fn kill_writes_superseding_dead_beacon() {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::fake(0);
    let mut pinger = Pinger::new("unit/0", clock, store.clone());

    pinger.start().await.unwrap();
    pinger.kill().await.unwrap();
    assert!(!pinger.is_running());

    // Two beacons exist: the live one at sequence 1, the dead one at a
    // strictly higher sequence.
    let live = store.load_beacon(1).await.unwrap().expect("live beacon");
    assert!(live.alive);
    let dead = store.load_beacon(2).await.unwrap().expect("dead beacon");
    assert!(!dead.alive);
    assert!(dead.sequence > live.sequence);

    // The tombstone sequence is also pinged in the current slot, so a
    // watcher discovers it (and its superseding alive=false beacon) on
    // the very next refresh rather than waiting for sequence 1's own
    // ping to age out of the window.
    let slot = store.load_ping_slot(0).await.unwrap().expect("slot exists");
    assert_eq!(slot.alive.get(&dead.sequence), Some(&true));
}

#[tokio::test]
async fn kill_without_prior_stop_still_supersedes() {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::fake(0);
    let mut pinger = Pinger::new("unit/0", clock, store.clone());

    pinger.start().await.unwrap();
    assert!(pinger.is_running());
    pinger.kill().await.unwrap();
    assert!(!pinger.is_running());
}
