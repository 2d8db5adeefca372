// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`PresenceStore`], used by every test and by the demo binary.
//! Not a reference for a production deployment — it has no persistence
//! and no cross-process visibility — but it implements the trait's
//! contract exactly, which is all the rest of the crate depends on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::PresenceStore;
use crate::error::Result;
use crate::presence::beacon::{Beacon, PingSlot};

#[derive(Debug, Default)]
struct Tables {
    beacons: HashMap<i64, Beacon>,
    pings: HashMap<i64, PingSlot>,
    sequences: HashMap<String, i64>,
}

/// A `Mutex`-guarded set of tables standing in for a networked store. The
/// lock is held only across the synchronous map operation inside each
/// trait method, never across an `.await` boundary.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn upsert_beacon(&self, beacon: Beacon) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.beacons.insert(beacon.sequence, beacon);
        Ok(())
    }

    async fn load_beacon(&self, sequence: i64) -> Result<Option<Beacon>> {
        let tables = self.tables.lock().await;
        Ok(tables.beacons.get(&sequence).cloned())
    }

    async fn upsert_ping(&self, slot: i64, sequence: i64) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let entry = tables.pings.entry(slot).or_insert_with(|| PingSlot::new(slot));
        entry.alive.insert(sequence, true);
        Ok(())
    }

    async fn load_ping_slot(&self, slot: i64) -> Result<Option<PingSlot>> {
        let tables = self.tables.lock().await;
        Ok(tables.pings.get(&slot).cloned())
    }

    async fn next_sequence(&self, collection: &str) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        let counter = tables.sequences.entry(collection.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
