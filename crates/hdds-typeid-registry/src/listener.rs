// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Propagation listener
//!
//! Mirrors every binding accepted by the distributed store into this node's
//! local store, so the node can resolve it later without the cache.
//!
//! # Operation
//!
//! 1. Receive a batch of insert events from the change feed
//! 2. Skip events carrying a previous value (the feed is insert-only)
//! 3. Write `{type_id}.{ext}` for each remaining event; a record already
//!    holding a different name is kept and counted as a conflict
//!
//! Local write failures are logged and swallowed: the distributed store is
//! still authoritative, the node only loses offline resolution for that ID.

use crate::local_store::{LocalStore, WriteOutcome};
use crate::store::{EntryEvent, EntryListener};
use std::sync::atomic::{AtomicU64, Ordering};

/// Listener statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    /// Total events received
    pub events_received: u64,
    /// Bindings written to disk
    pub bindings_written: u64,
    /// Events whose binding was already on disk
    pub bindings_unchanged: u64,
    /// Events rejected for carrying a previous value
    pub events_rejected: u64,
    /// Events whose ID is already on disk under a different name
    pub bindings_conflicting: u64,
    /// Local write failures
    pub write_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events_received: AtomicU64,
    bindings_written: AtomicU64,
    bindings_unchanged: AtomicU64,
    events_rejected: AtomicU64,
    bindings_conflicting: AtomicU64,
    write_errors: AtomicU64,
}

/// Change-feed subscriber persisting bindings locally.
#[derive(Debug)]
pub struct PropagationListener {
    local: LocalStore,
    counters: Counters,
}

impl PropagationListener {
    /// Create a listener writing into `local`.
    pub fn new(local: LocalStore) -> Self {
        Self {
            local,
            counters: Counters::default(),
        }
    }

    /// Snapshot of listener statistics.
    pub fn stats(&self) -> ListenerStats {
        let c = &self.counters;
        ListenerStats {
            events_received: c.events_received.load(Ordering::Relaxed),
            bindings_written: c.bindings_written.load(Ordering::Relaxed),
            bindings_unchanged: c.bindings_unchanged.load(Ordering::Relaxed),
            events_rejected: c.events_rejected.load(Ordering::Relaxed),
            bindings_conflicting: c.bindings_conflicting.load(Ordering::Relaxed),
            write_errors: c.write_errors.load(Ordering::Relaxed),
        }
    }

    fn handle(&self, event: &EntryEvent) {
        self.counters.events_received.fetch_add(1, Ordering::Relaxed);

        if let Some(old) = event.old_name.as_deref().filter(|old| !old.is_empty()) {
            self.counters.events_rejected.fetch_add(1, Ordering::Relaxed);
            log::error!(
                "Received non-empty old value for type ID cache, skipping [id={}, name={}, old={}]",
                event.type_id,
                event.name,
                old
            );
            return;
        }

        match self.local.write(event.type_id, &event.name) {
            Ok(WriteOutcome::Written) => {
                self.counters.bindings_written.fetch_add(1, Ordering::Relaxed);
            }
            Ok(WriteOutcome::Unchanged) => {
                self.counters.bindings_unchanged.fetch_add(1, Ordering::Relaxed);
            }
            Ok(WriteOutcome::Conflict { .. }) => {
                self.counters.bindings_conflicting.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Failed to write type name to file [id={}, name={}, file={}]: {}",
                    event.type_id,
                    event.name,
                    self.local.path_for(event.type_id).display(),
                    e
                );
            }
        }
    }
}

impl EntryListener for PropagationListener {
    fn on_inserted(&self, events: &[EntryEvent]) {
        for event in events {
            self.handle(event);
        }
    }
}
