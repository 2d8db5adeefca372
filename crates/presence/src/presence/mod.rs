// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The presence registry: pingers claim liveness, the watcher observes it.

pub mod beacon;
pub mod pinger;
pub mod sequence;
pub mod watcher;

pub use beacon::{Beacon, PingSlot};
pub use pinger::Pinger;
pub use sequence::SequenceAllocator;
pub use watcher::{Change, Watcher};
