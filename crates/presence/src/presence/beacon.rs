// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level records exchanged with the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifies one pinger's presence claim for one key. `sequence` is
/// allocated once, at `Pinger::start`, and is never reused — a new
/// `Pinger` for the same key gets a new, strictly higher sequence, which
/// is how stale pingers lose a tie-break against their replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    pub sequence: i64,
    pub key: String,
    pub alive: bool,
}

impl Beacon {
    pub fn new(sequence: i64, key: impl Into<String>, alive: bool) -> Self {
        Self { sequence, key: key.into(), alive }
    }
}

/// One slot's worth of ping activity: which sequences pinged during this
/// slot, and whether each considers itself alive. A `false` entry records
/// an explicit `Kill` within the slot; a missing sequence means "did not
/// ping this slot" rather than "not alive".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingSlot {
    pub slot: i64,
    pub alive: BTreeMap<i64, bool>,
}

impl PingSlot {
    pub fn new(slot: i64) -> Self {
        Self { slot, alive: BTreeMap::new() }
    }
}
