// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A pinger owns one key's presence claim: it allocates a sequence,
//! records a beacon, and periodically refreshes the current slot's ping
//! document until stopped or killed.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::{PresenceError, Result};
use crate::presence::beacon::Beacon;
use crate::presence::sequence::SequenceAllocator;
use crate::store::PresenceStore;

enum Command {
    Stop(oneshot::Sender<Result<()>>),
    Kill(oneshot::Sender<Result<()>>),
}

/// Handle to a running (or not-yet-started) pinger. Cloning the handle
/// does not clone the worker — all clones address the same task.
pub struct Pinger {
    key: String,
    store: Arc<dyn PresenceStore>,
    clock: Clock,
    sequences: SequenceAllocator,
    running: Option<Running>,
}

struct Running {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl Pinger {
    pub fn new(key: impl Into<String>, clock: Clock, store: Arc<dyn PresenceStore>) -> Self {
        let sequences = SequenceAllocator::new(store.clone());
        Self { key: key.into(), store, clock, sequences, running: None }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Allocate a fresh sequence, write the beacon, ping the current slot
    /// immediately, then spawn the `period/2` ping loop.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(PresenceError::AlreadyRunning);
        }

        let sequence = self.sequences.next().await?;
        self.store.upsert_beacon(Beacon::new(sequence, self.key.clone(), true)).await?;
        self.store.upsert_ping(self.clock.current_slot(), sequence).await?;

        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.key.clone(),
            sequence,
            self.clock.clone(),
            self.store.clone(),
            rx,
            cancel.clone(),
        ));

        self.running = Some(Running { commands: tx, cancel, handle });
        Ok(())
    }

    /// Halt the ping loop. The beacon and past pings remain untouched.
    pub async fn stop(&mut self) -> Result<()> {
        let Running { commands, cancel, handle } =
            self.running.take().ok_or(PresenceError::AlreadyStopped)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let send_ok = commands.send(Command::Stop(reply_tx)).await.is_ok();
        cancel.cancel();
        let _ = handle.await;

        if send_ok {
            if let Ok(result) = reply_rx.await {
                return result;
            }
        }
        Ok(())
    }

    /// Allocate a new, higher sequence and write a superseding beacon with
    /// `alive = false`. Legal after `start`, whether or not `stop` has
    /// already been called.
    ///
    /// The tombstone sequence is also recorded into the current slot's
    /// ping document, exactly as `start` records its own first ping. A
    /// watcher only ever learns about a sequence by seeing it in a ping
    /// document (spec.md section 4.4 step 2) — without this, a tombstone
    /// that nothing ever pings would stay invisible, and the key would
    /// keep reporting alive (via the still-pinged pre-Kill sequence) until
    /// that older sequence aged out of the two-slot window on its own,
    /// rather than transitioning dead on the very next refresh.
    pub async fn kill(&mut self) -> Result<()> {
        if let Some(running) = self.running.take() {
            let (reply_tx, _reply_rx) = oneshot::channel();
            let _ = running.commands.send(Command::Kill(reply_tx)).await;
            running.cancel.cancel();
            let _ = running.handle.await;
        }

        let sequence = self.sequences.next().await?;
        self.store.upsert_beacon(Beacon::new(sequence, self.key.clone(), false)).await?;
        self.store.upsert_ping(self.clock.current_slot(), sequence).await?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

async fn run_loop(
    key: String,
    sequence: i64,
    clock: Clock,
    store: Arc<dyn PresenceStore>,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) -> Result<()> {
    let ping_period = clock.current_period() / 2;
    let mut timer = tokio::time::interval(ping_period.max(std::time::Duration::from_millis(1)));
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!(key = %key, sequence, "pinger cancelled");
                return Ok(());
            }
            command = commands.recv() => {
                match command {
                    Some(Command::Stop(reply)) => {
                        let _ = reply.send(Ok(()));
                        return Ok(());
                    }
                    Some(Command::Kill(reply)) => {
                        let _ = reply.send(Ok(()));
                        return Ok(());
                    }
                    None => return Ok(()),
                }
            }
            _ = timer.tick() => {
                if let Err(err) = ping_once(&store, clock.current_slot(), sequence).await {
                    tracing::warn!(key = %key, sequence, err = %err, "ping failed, retrying once");
                    if let Err(err) = ping_once(&store, clock.current_slot(), sequence).await {
                        tracing::error!(key = %key, sequence, err = %err, "ping retry failed, pinger dying");
                        return Err(err);
                    }
                }
            }
        }
    }
}

async fn ping_once(store: &Arc<dyn PresenceStore>, slot: i64, sequence: i64) -> Result<()> {
    store.upsert_ping(slot, sequence).await
}

#[cfg(test)]
#[path = "pinger_tests.rs"]
mod tests;
