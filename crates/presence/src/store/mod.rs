// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent backing store, abstracted behind a trait.
//!
//! The real store (MongoDB in the reference implementation, or whatever a
//! downstream deployment chooses) is explicitly out of scope for this
//! crate — see spec.md section 1. [`PresenceStore`] is the seam; this
//! module's `memory` submodule is the reference implementation used by
//! every test and by the demo binary.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::presence::beacon::{Beacon, PingSlot};

/// Canonical collection name for beacon records.
pub const PRESENCE_COLLECTION: &str = "presence";
/// Canonical collection name for per-slot ping documents.
pub const PRESENCE_PINGS_COLLECTION: &str = "presence.pings";
/// Canonical collection name for sequence-allocator counters.
pub const PRESENCE_SEQS_COLLECTION: &str = "presence.seqs";

/// Abstract persistent collection supporting atomic upserts, filtered
/// reads, and monotonic sequence allocation.
///
/// Implementations must be safe for concurrent use from multiple tasks —
/// the store is the one piece of state legitimately shared outside the
/// single-owner actors (spec.md section 5).
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Insert or replace the beacon record for `sequence`. Beacons are
    /// never coalesced or deduplicated across keys (spec.md section 9).
    async fn upsert_beacon(&self, beacon: Beacon) -> Result<()>;

    /// Look up a beacon by sequence number.
    async fn load_beacon(&self, sequence: i64) -> Result<Option<Beacon>>;

    /// Set-field upsert: mark `sequence` alive within `slot`'s document.
    /// Idempotent within a slot; multiple pingers coalesce without
    /// conflict (spec.md section 3).
    async fn upsert_ping(&self, slot: i64, sequence: i64) -> Result<()>;

    /// Read a slot's ping document, if any pings have landed there yet.
    async fn load_ping_slot(&self, slot: i64) -> Result<Option<PingSlot>>;

    /// Atomically allocate the next sequence number for `collection`.
    /// Strictly monotonically increasing across all callers; gaps are
    /// allowed.
    async fn next_sequence(&self, collection: &str) -> Result<i64>;
}
