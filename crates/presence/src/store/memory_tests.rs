// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::{PRESENCE_PINGS_COLLECTION, PRESENCE_SEQS_COLLECTION};

#[tokio::test]
async fn sequence_allocation_is_monotonic_per_collection() {
    let store = MemoryStore::new();
    let a = store.next_sequence(PRESENCE_SEQS_COLLECTION).await.unwrap();
    let b = store.next_sequence(PRESENCE_SEQS_COLLECTION).await.unwrap();
    let c = store.next_sequence(PRESENCE_PINGS_COLLECTION).await.unwrap();
    assert_eq!(a, 1);
    assert_eq!(b, 2);
    assert_eq!(c, 1, "separate collections allocate independently");
}

#[tokio::test]
async fn beacon_round_trips() {
    let store = MemoryStore::new();
    let beacon = Beacon::new(5, "unit/0", true);
    store.upsert_beacon(beacon.clone()).await.unwrap();
    assert_eq!(store.load_beacon(5).await.unwrap(), Some(beacon));
    assert_eq!(store.load_beacon(6).await.unwrap(), None);
}

#[tokio::test]
async fn ping_slot_accumulates_across_upserts() {
    let store = MemoryStore::new();
    store.upsert_ping(10, 1).await.unwrap();
    store.upsert_ping(10, 2).await.unwrap();
    let slot = store.load_ping_slot(10).await.unwrap().expect("slot exists");
    assert_eq!(slot.alive.get(&1), Some(&true));
    assert_eq!(slot.alive.get(&2), Some(&true));
    assert_eq!(store.load_ping_slot(11).await.unwrap(), None);
}
