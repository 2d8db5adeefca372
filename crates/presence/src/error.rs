// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Error kinds shared by the presence registry and the leadership tracker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresenceError {
    /// The backing store rejected or failed to complete a request.
    /// Pingers retry once; watchers surface it at `Stop`; trackers die.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A leadership claim was rejected because another unit holds the lease.
    /// Expected, not fatal — drives the tracker's minion branch.
    #[error("leadership claim denied")]
    ClaimDenied,

    /// `Pinger::start` called on a pinger that is already running.
    #[error("pinger already running")]
    AlreadyRunning,

    /// `Pinger::stop` called on a pinger that is already stopped.
    #[error("pinger already stopped")]
    AlreadyStopped,

    /// The owning worker is shutting down; the request cannot be served.
    #[error("worker is dying")]
    WorkerDying,
}

pub type Result<T> = std::result::Result<T, PresenceError>;
