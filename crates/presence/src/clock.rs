// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quantizes wall time into monotonic slot indices.
//!
//! The reference Go implementation exposes `FakeTimeSlot`/`RealTimeSlot` as
//! package-level functions that mutate global state. Mutable process-wide
//! globals don't mix well with parallel `cargo test` execution, so this
//! crate hands out an explicit, cloneable [`Clock`] handle instead: tests
//! build their own fake clock rather than poking a shared one. Semantics are
//! unchanged — only the scoping of the override.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_PERIOD_SECS: i64 = 30;

#[derive(Debug)]
struct Inner {
    /// Period width in seconds. Real clocks never change this after
    /// construction; fake clocks may via [`Clock::set_period`].
    period_secs: AtomicI64,
    /// `None` (sentinel `i64::MIN`) means "derive from wall time".
    fake_slot: AtomicI64,
}

const NO_FAKE_SLOT: i64 = i64::MIN;

/// A cheap, `Clone + Send + Sync` handle onto the process's notion of time
/// slots. Real and fake clocks share the same type so production code and
/// test code can be written identically.
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Arc<Inner>,
}

impl Clock {
    /// The process-wide default: period 30s, slot derived from wall time.
    pub fn real() -> Self {
        Self::with_period(DEFAULT_PERIOD_SECS)
    }

    /// A clock with a fixed period but wall-time-derived slots. Useful for
    /// tests that want real slot advancement on a short period (e.g. the
    /// auto-refresh timing scenario in spec.md section 8).
    pub fn with_period(period_secs: i64) -> Self {
        assert!(period_secs > 0, "period must be positive");
        Self {
            inner: Arc::new(Inner {
                period_secs: AtomicI64::new(period_secs),
                fake_slot: AtomicI64::new(NO_FAKE_SLOT),
            }),
        }
    }

    /// A clock frozen at a given slot, for deterministic tests. Mirrors the
    /// Go original's `FakeTimeSlot(n)`.
    pub fn fake(slot: i64) -> Self {
        let clock = Self::with_period(DEFAULT_PERIOD_SECS);
        clock.set_fake_slot(Some(slot));
        clock
    }

    /// Freeze this clock's returned slot at `slot`. Idempotent.
    pub fn set_fake_slot(&self, slot: Option<i64>) {
        self.inner.fake_slot.store(slot.unwrap_or(NO_FAKE_SLOT), Ordering::SeqCst);
    }

    /// Override the period. Idempotent; safe to call from test teardown.
    pub fn set_period(&self, period_secs: i64) {
        assert!(period_secs > 0, "period must be positive");
        self.inner.period_secs.store(period_secs, Ordering::SeqCst);
    }

    /// Advance a fake clock by one period's worth of slots. No-op on a real
    /// clock (there is nothing to advance).
    pub fn advance_fake_slot(&self, by: i64) {
        let current = self.inner.fake_slot.load(Ordering::SeqCst);
        if current != NO_FAKE_SLOT {
            self.inner.fake_slot.store(current + by, Ordering::SeqCst);
        }
    }

    /// The current period width.
    pub fn current_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inner.period_secs.load(Ordering::SeqCst) as u64)
    }

    /// The current slot index: `floor(unix_seconds / period_seconds)`,
    /// unless a fake slot is in effect.
    pub fn current_slot(&self) -> i64 {
        let fake = self.inner.fake_slot.load(Ordering::SeqCst);
        if fake != NO_FAKE_SLOT {
            return fake;
        }
        let period = self.inner.period_secs.load(Ordering::SeqCst).max(1);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        now / period
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::real()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
