// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The watcher observes the presence collection and fans alive/dead
//! transitions out to per-key subscribers. All mutable state lives in
//! the watcher's own task; callers only ever talk to it over a command
//! channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::Result;
use crate::store::PresenceStore;

/// A liveness transition delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub key: String,
    pub alive: bool,
}

enum WatcherCommand {
    Add(String, mpsc::Sender<Change>),
    Remove(String, mpsc::Sender<Change>),
    Alive(String, oneshot::Sender<bool>),
    ForceRefresh(oneshot::Sender<()>),
    AliveKeys(oneshot::Sender<Vec<String>>),
    Stop(oneshot::Sender<Result<()>>),
}

/// Handle to a running watcher task.
pub struct Watcher {
    commands: mpsc::Sender<WatcherCommand>,
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<Result<()>>>,
}

impl Watcher {
    /// Spawn the watcher's background task. The task performs an initial
    /// refresh before entering its select loop, so `Alive`/`Add` queries
    /// issued immediately after `start` reflect current storage state.
    pub fn start(clock: Clock, store: Arc<dyn PresenceStore>) -> Self {
        let (commands, rx) = mpsc::channel(256);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(clock, store, rx, cancel.clone()));
        Self { commands, cancel, handle: Some(handle) }
    }

    /// Register `sender` for Changes on `key`. If the key's status is
    /// already known (or not, in which case it defaults to `false`), an
    /// initial Change is dispatched immediately, non-blocking.
    pub async fn add(&self, key: impl Into<String>, sender: mpsc::Sender<Change>) {
        let _ = self.commands.send(WatcherCommand::Add(key.into(), sender)).await;
    }

    /// Deregister `sender` from `key`. No-op if not registered.
    pub async fn remove(&self, key: impl Into<String>, sender: mpsc::Sender<Change>) {
        let _ = self.commands.send(WatcherCommand::Remove(key.into(), sender)).await;
    }

    /// Synchronous (from the caller's perspective) query of last known
    /// status. Reflects the last completed refresh, not in-flight writes
    /// — `ForceRefresh` is the only barrier.
    pub async fn alive(&self, key: impl Into<String>) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(WatcherCommand::Alive(key.into(), reply_tx)).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Run a refresh cycle and wait for it to complete. All state changes
    /// implied by storage state at call time are observable in
    /// subscribers (for those who drain) by the time this returns.
    pub async fn force_refresh(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(WatcherCommand::ForceRefresh(reply_tx)).await.is_ok() {
            let _ = reply_rx.await;
        }
    }

    /// Debug/introspection helper: every key currently considered alive.
    pub async fn alive_keys(&self) -> Vec<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(WatcherCommand::AliveKeys(reply_tx)).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Close all subscriber channels, terminate the background loop, and
    /// return the worker's final error (if any).
    pub async fn stop(mut self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.commands.send(WatcherCommand::Stop(reply_tx)).await.is_ok();
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        if sent {
            if let Ok(result) = reply_rx.await {
                return result;
            }
        }
        Ok(())
    }
}

struct WatcherState {
    store: Arc<dyn PresenceStore>,
    clock: Clock,
    key_of_sequence: HashMap<i64, String>,
    beacon_alive: HashMap<i64, bool>,
    key_status: HashMap<String, bool>,
    subscribers: HashMap<String, Vec<mpsc::Sender<Change>>>,
}

impl WatcherState {
    fn new(clock: Clock, store: Arc<dyn PresenceStore>) -> Self {
        Self {
            store,
            clock,
            key_of_sequence: HashMap::new(),
            beacon_alive: HashMap::new(),
            key_status: HashMap::new(),
            subscribers: HashMap::new(),
        }
    }

    fn add(&mut self, key: String, sender: mpsc::Sender<Change>) {
        let status = self.key_status.get(&key).copied().unwrap_or(false);
        let _ = sender.try_send(Change { key: key.clone(), alive: status });
        self.subscribers.entry(key).or_default().push(sender);
    }

    fn remove(&mut self, key: &str, sender: &mpsc::Sender<Change>) {
        if let Some(list) = self.subscribers.get_mut(key) {
            list.retain(|existing| !existing.same_channel(sender));
        }
    }

    fn alive(&self, key: &str) -> bool {
        self.key_status.get(key).copied().unwrap_or(false)
    }

    fn alive_keys(&self) -> Vec<String> {
        self.key_status.iter().filter(|(_, alive)| **alive).map(|(key, _)| key.clone()).collect()
    }

    fn dispatch(&self, change: &Change) {
        if let Some(list) = self.subscribers.get(&change.key) {
            for sender in list {
                // Non-blocking: a full or closed channel simply drops the
                // event rather than stalling the refresh cycle.
                let _ = sender.try_send(change.clone());
            }
        }
    }

    /// Read current + previous slot ping documents, recompute each known
    /// key's alive status via the highest-sequence-wins tie-break, and
    /// dispatch Changes for every key whose status flipped.
    ///
    /// A sequence only enters this computation by appearing in a ping
    /// document — including a `Kill` tombstone, which `Pinger::kill`
    /// records a ping for specifically so a superseding `alive = false`
    /// beacon becomes visible here on the very next refresh, rather than
    /// waiting for the pre-Kill sequence's own ping to age out of the
    /// window on its own.
    async fn refresh(&mut self) -> Result<()> {
        let current = self.clock.current_slot();
        let previous = current - 1;

        let mut alive_sequences: HashSet<i64> = HashSet::new();
        for slot in [current, previous] {
            if let Some(doc) = self.store.load_ping_slot(slot).await? {
                alive_sequences.extend(doc.alive.into_iter().filter(|(_, alive)| *alive).map(|(seq, _)| seq));
            }
        }

        for &sequence in &alive_sequences {
            if !self.key_of_sequence.contains_key(&sequence) {
                if let Some(beacon) = self.store.load_beacon(sequence).await? {
                    self.beacon_alive.insert(sequence, beacon.alive);
                    self.key_of_sequence.insert(sequence, beacon.key);
                }
            }
        }

        let mut highest_per_key: HashMap<&str, i64> = HashMap::new();
        for &sequence in &alive_sequences {
            if let Some(key) = self.key_of_sequence.get(&sequence) {
                highest_per_key
                    .entry(key.as_str())
                    .and_modify(|highest| *highest = (*highest).max(sequence))
                    .or_insert(sequence);
            }
        }

        let mut new_status: HashMap<String, bool> = HashMap::new();
        for (key, sequence) in &highest_per_key {
            let alive = self.beacon_alive.get(sequence).copied().unwrap_or(false);
            new_status.insert((*key).to_string(), alive);
        }

        let tracked_keys: HashSet<String> =
            self.key_status.keys().cloned().chain(new_status.keys().cloned()).collect();

        let mut changed = Vec::new();
        for key in tracked_keys {
            let old = self.key_status.get(&key).copied().unwrap_or(false);
            let new = new_status.get(&key).copied().unwrap_or(false);
            if old != new {
                changed.push(Change { key: key.clone(), alive: new });
            }
            self.key_status.insert(key, new);
        }

        for change in &changed {
            self.dispatch(change);
        }
        Ok(())
    }
}

async fn run_loop(
    clock: Clock,
    store: Arc<dyn PresenceStore>,
    mut commands: mpsc::Receiver<WatcherCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let period = clock.current_period();
    let mut state = WatcherState::new(clock, store);
    state.refresh().await?;

    let mut timer = tokio::time::interval(period.max(std::time::Duration::from_millis(1)));
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    timer.reset();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Ok(()),
            _ = timer.tick() => {
                if let Err(err) = state.refresh().await {
                    tracing::warn!(err = %err, "periodic watcher refresh failed");
                }
            }
            command = commands.recv() => {
                match command {
                    Some(WatcherCommand::Add(key, sender)) => state.add(key, sender),
                    Some(WatcherCommand::Remove(key, sender)) => state.remove(&key, &sender),
                    Some(WatcherCommand::Alive(key, reply)) => {
                        let _ = reply.send(state.alive(&key));
                    }
                    Some(WatcherCommand::ForceRefresh(reply)) => {
                        if let Err(err) = state.refresh().await {
                            tracing::warn!(err = %err, "forced watcher refresh failed");
                        }
                        let _ = reply.send(());
                    }
                    Some(WatcherCommand::AliveKeys(reply)) => {
                        let _ = reply.send(state.alive_keys());
                    }
                    Some(WatcherCommand::Stop(reply)) => {
                        state.subscribers.clear();
                        let _ = reply.send(Ok(()));
                        return Ok(());
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
