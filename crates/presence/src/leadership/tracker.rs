// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The leadership tracker: a single-owner worker that maintains
//! leader/minion state for one unit/service pair and resolves claim
//! tickets from local clients against that state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PresenceError, Result};
use crate::leadership::manager::LeadershipManager;

enum TrackerMsg {
    ClaimTicket(oneshot::Sender<bool>),
    Release(u64),
    Renew(u64),
}

/// A one-shot reply to a leadership claim, resolved the moment the
/// tracker's worker dequeues it.
pub struct Ticket {
    rx: oneshot::Receiver<bool>,
}

impl Ticket {
    /// `true` means the tracker was leader at the moment this ticket was
    /// dequeued; `false` (including a closed channel, e.g. after `Kill`)
    /// means it was not.
    pub async fn wait(self) -> bool {
        self.rx.await.unwrap_or(false)
    }
}

/// Handle to a running tracker worker.
pub struct Tracker {
    service_name: String,
    messages: mpsc::Sender<TrackerMsg>,
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<Result<()>>>,
}

impl Tracker {
    /// Spawn the tracker's worker. `duration` is the guarantee offered to
    /// clients; the tracker internally requests a lease of `2 * duration`
    /// and renews `duration` before expiry (spec's lease-doubling rule —
    /// do not collapse these constants).
    pub fn new(
        unit_name: impl Into<String>,
        service_name: impl Into<String>,
        duration: Duration,
        manager: Arc<dyn LeadershipManager>,
    ) -> Self {
        let service_name = service_name.into();
        let unit_name = unit_name.into();
        let (messages_tx, messages_rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_loop(
            unit_name,
            service_name.clone(),
            duration,
            manager,
            messages_tx.clone(),
            messages_rx,
            cancel.clone(),
        ));

        Self { service_name, messages: messages_tx, cancel, handle: Some(handle) }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Submit a claim ticket. Never blocks: if the worker's queue is full
    /// or the worker has already died, the ticket resolves to `false`.
    pub fn claim_leader(&self) -> Ticket {
        let (tx, rx) = oneshot::channel();
        if self.messages.try_send(TrackerMsg::ClaimTicket(tx)).is_err() {
            tracing::debug!(service = %self.service_name, "claim submitted to a dead or saturated tracker");
        }
        Ticket { rx }
    }

    /// Signal the worker to terminate. Preemptive over pending tickets
    /// and the select loop; idempotent.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker to terminate, returning its final error (if
    /// any). A normal `Kill` surfaces as `Ok(())`.
    pub async fn wait(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(Err(PresenceError::WorkerDying)),
            None => Ok(()),
        }
    }
}

struct State {
    unit: String,
    service: String,
    lease_duration: Duration,
    overlap: Duration,
    manager: Arc<dyn LeadershipManager>,
    internal: mpsc::Sender<TrackerMsg>,
    is_minion: bool,
    until_time: Option<Instant>,
    renew_at: Option<Instant>,
    generation: u64,
}

impl State {
    /// `ClaimLeadership`, then transition to leader (arming renewal) or
    /// minion (arming a release wait), or propagate any other error.
    async fn refresh(&mut self) -> Result<()> {
        self.generation += 1;
        let generation = self.generation;

        match self.manager.claim_leadership(&self.service, &self.unit, self.lease_duration).await
        {
            Ok(()) => {
                self.is_minion = false;
                let until = Instant::now() + self.lease_duration;
                let renew_at = until - self.overlap;
                self.until_time = Some(until);
                self.renew_at = Some(renew_at);

                tracing::info!(service = %self.service, unit = %self.unit, "claimed leadership");

                let internal = self.internal.clone();
                tokio::spawn(async move {
                    tokio::time::sleep_until(renew_at).await;
                    let _ = internal.send(TrackerMsg::Renew(generation)).await;
                });
                Ok(())
            }
            Err(PresenceError::ClaimDenied) => {
                self.is_minion = true;
                self.until_time = None;
                self.renew_at = None;
                tracing::debug!(service = %self.service, unit = %self.unit, "leadership denied");

                let internal = self.internal.clone();
                let manager = self.manager.clone();
                let service = self.service.clone();
                tokio::spawn(async move {
                    let _ = manager.block_until_released(&service).await;
                    let _ = internal.send(TrackerMsg::Release(generation)).await;
                });
                Ok(())
            }
            Err(err) => {
                tracing::error!(service = %self.service, unit = %self.unit, err = %err, "leadership claim failed, tracker dying");
                Err(err)
            }
        }
    }

    async fn resolve_claim(&mut self, reply: oneshot::Sender<bool>) -> Result<()> {
        if self.is_minion {
            let _ = reply.send(false);
            return Ok(());
        }

        // Refresh against the renewal deadline (`until - overlap`), not
        // full lease expiry (`until`) — by the time `until` has passed the
        // lease is already gone, not merely due for proactive renewal.
        // This is the same instant the separately-spawned renewal timer
        // sleeps until; checking it here closes the window between that
        // deadline and the timer task's `Renew` message actually landing.
        if let Some(renew_at) = self.renew_at {
            if Instant::now() >= renew_at {
                self.refresh().await?;
            }
        }

        let _ = reply.send(!self.is_minion);
        Ok(())
    }
}

async fn run_loop(
    unit: String,
    service: String,
    duration: Duration,
    manager: Arc<dyn LeadershipManager>,
    internal: mpsc::Sender<TrackerMsg>,
    mut messages: mpsc::Receiver<TrackerMsg>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut state = State {
        unit,
        service,
        lease_duration: duration * 2,
        overlap: duration,
        manager,
        internal,
        is_minion: false,
        until_time: None,
        renew_at: None,
        generation: 0,
    };

    state.refresh().await?;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!(service = %state.service, "tracker killed");
                return Ok(());
            }
            msg = messages.recv() => {
                match msg {
                    Some(TrackerMsg::ClaimTicket(reply)) => state.resolve_claim(reply).await?,
                    Some(TrackerMsg::Release(generation)) => {
                        if generation == state.generation && state.is_minion {
                            state.refresh().await?;
                        }
                    }
                    Some(TrackerMsg::Renew(generation)) => {
                        if generation == state.generation && !state.is_minion {
                            state.refresh().await?;
                        }
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
