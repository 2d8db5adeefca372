// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Process-wide configuration for the presence registry and leadership
/// tracker. The backing store endpoint is opaque here — the store itself
/// is out of scope for this crate; whatever binary wires up a concrete
/// `PresenceStore` is responsible for interpreting it.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "presence-demo", version, about)]
pub struct PresenceConfig {
    /// Ping period in seconds. Also the slot width.
    #[arg(long, default_value_t = 30, env = "PRESENCE_PERIOD_SECS")]
    pub period_secs: i64,

    /// Leadership lease duration in seconds, guaranteed to clients that
    /// successfully resolve a claim ticket. The tracker internally
    /// requests twice this as its lease from the manager.
    #[arg(long, default_value_t = 30, env = "PRESENCE_LEASE_DURATION_SECS")]
    pub lease_duration_secs: u64,

    /// Opaque backing-store endpoint (e.g. a connection string). Not
    /// parsed or validated here — the store is out of scope.
    #[arg(long, env = "PRESENCE_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,
}

impl PresenceConfig {
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.period_secs.max(1) as u64)
    }

    pub fn lease_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lease_duration_secs.max(1))
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { period_secs: 30, lease_duration_secs: 30, storage_endpoint: None }
    }
}
