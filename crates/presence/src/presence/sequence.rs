// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin convenience wrapper for allocating presence sequence numbers.
//!
//! The allocator itself is just [`PresenceStore::next_sequence`] scoped to
//! the presence sequence collection; this module exists so callers don't
//! thread the collection name constant through the rest of the crate.

use std::sync::Arc;

use crate::error::Result;
use crate::store::{PresenceStore, PRESENCE_SEQS_COLLECTION};

/// Allocates strictly increasing sequence numbers for beacons, backed by
/// a [`PresenceStore`].
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn PresenceStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self { store }
    }

    /// Allocate the next sequence number. Each call returns a value
    /// strictly greater than every prior call across every allocator
    /// sharing the same store.
    pub async fn next(&self) -> Result<i64> {
        self.store.next_sequence(PRESENCE_SEQS_COLLECTION).await
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
