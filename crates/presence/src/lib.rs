// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed presence and leadership coordination core.
//!
//! Two subsystems share one design philosophy: a single coordination
//! loop owns mutable state, external callers communicate by message
//! passing over bounded channels, and correctness comes from lease/slot
//! windowing rather than tight clock synchronization.
//!
//! - [`presence`]: a distributed liveness registry — [`presence::Pinger`]
//!   claims liveness for a key, [`presence::Watcher`] observes the
//!   registry and notifies subscribers of alive/dead transitions.
//! - [`leadership`]: a per-unit leadership lease tracker —
//!   [`leadership::Tracker`] claims and renews a lease against a
//!   [`leadership::LeadershipManager`] collaborator and resolves local
//!   claim tickets.

pub mod clock;
pub mod config;
pub mod error;
pub mod leadership;
pub mod presence;
pub mod store;

pub use clock::Clock;
pub use config::PresenceConfig;
pub use error::{PresenceError, Result};

use std::sync::Arc;

use crate::presence::{Change, Pinger, Watcher};
use crate::store::memory::MemoryStore;
use crate::store::PresenceStore;

/// Demo entry point wired up for `presence-demo`: starts a watcher and a
/// single self-pinger against an in-memory store, logs every liveness
/// transition it observes, and runs until interrupted.
///
/// This is not part of the library's public contract — real deployments
/// construct their own `PresenceStore` and compose `Pinger`/`Watcher`/
/// `Tracker` directly.
pub async fn run(config: PresenceConfig) -> anyhow::Result<()> {
    let store: Arc<dyn PresenceStore> = Arc::new(MemoryStore::new());
    let clock = Clock::with_period(config.period_secs.max(1));

    let watcher = Watcher::start(clock.clone(), Arc::clone(&store));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Change>(8);
    watcher.add("self", tx).await;

    let watch_task = tokio::spawn(async move {
        while let Some(change) = rx.recv().await {
            tracing::info!(key = %change.key, alive = change.alive, "liveness change");
        }
    });

    let mut pinger = Pinger::new("self", clock, Arc::clone(&store));
    pinger.start().await?;
    tracing::info!("presence demo running, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    pinger.kill().await?;
    watcher.stop().await?;
    watch_task.abort();
    Ok(())
}
