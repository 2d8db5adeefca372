// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The leadership manager is the tracker's collaborator — the thing that
//! actually grants and releases leases. It is out of this crate's scope
//! (spec.md section 1); only the contract and a scriptable test double
//! live here.

use async_trait::async_trait;

use crate::error::Result;

/// Abstract lease claim/release surface consumed by the tracker.
/// Implementations must be safe for concurrent use — the tracker assumes
/// calls may take arbitrary time and may be issued from multiple
/// trackers sharing the same manager.
#[async_trait]
pub trait LeadershipManager: Send + Sync {
    /// Claim leadership of `service` on behalf of `unit` for `duration`.
    /// Returns `Ok(())` on success, `Err(PresenceError::ClaimDenied)` if
    /// another unit currently holds the lease, or a transient error.
    async fn claim_leadership(
        &self,
        service: &str,
        unit: &str,
        duration: std::time::Duration,
    ) -> Result<()>;

    /// Blocks until `service` has no holder. Used by a minion to learn
    /// when it should retry its claim.
    async fn block_until_released(&self, service: &str) -> Result<()>;
}

#[cfg(any(test, feature = "testing"))]
pub mod mock {
    use std::sync::Arc;

    use tokio::sync::{Mutex, Notify};

    use super::*;

    /// A scriptable fake manager: `grant` controls whether the next claim
    /// succeeds, and `release()` wakes any tracker blocked in
    /// `block_until_released`.
    #[derive(Clone)]
    pub struct MockManager {
        inner: Arc<Inner>,
    }

    struct Inner {
        grant: Mutex<bool>,
        released: Notify,
    }

    impl MockManager {
        /// A manager that grants every claim.
        pub fn granting() -> Self {
            Self::new(true)
        }

        /// A manager that denies every claim until `release()` is called.
        pub fn denying() -> Self {
            Self::new(false)
        }

        fn new(grant: bool) -> Self {
            Self { inner: Arc::new(Inner { grant: Mutex::new(grant), released: Notify::new() }) }
        }

        /// Flip the manager to granting mode and wake any tracker waiting
        /// in `block_until_released`.
        pub async fn release(&self) {
            *self.inner.grant.lock().await = true;
            self.inner.released.notify_waiters();
        }

        /// Flip the manager to denying mode.
        pub async fn deny(&self) {
            *self.inner.grant.lock().await = false;
        }
    }

    #[async_trait]
    impl LeadershipManager for MockManager {
        async fn claim_leadership(
            &self,
            _service: &str,
            _unit: &str,
            _duration: std::time::Duration,
        ) -> Result<()> {
            if *self.inner.grant.lock().await {
                Ok(())
            } else {
                Err(crate::error::PresenceError::ClaimDenied)
            }
        }

        async fn block_until_released(&self, _service: &str) -> Result<()> {
            // Enable-then-check: the `Notified` future must exist before
            // the flag is checked, so a `release()` racing in between is
            // never missed — checking first and registering interest
            // second leaves a window where `notify_waiters()` fires
            // before anyone is listening for it.
            loop {
                let notified = self.inner.released.notified();
                if *self.inner.grant.lock().await {
                    return Ok(());
                }
                notified.await;
            }
        }
    }
}
