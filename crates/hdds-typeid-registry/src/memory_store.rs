// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process cluster store.
//!
//! One `MemoryClusterStore` shared by several [`TypeRegistry`](crate::TypeRegistry)
//! instances behaves like a cluster cache seen from several nodes: puts are
//! linearizable per key and every insert is fanned out to all subscribers.
//! Used by tests, the `demo` command and embedders without a real cache.

use crate::error::StoreError;
use crate::store::{DistributedStore, EntryEvent, EntryListener};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// `DashMap`-backed [`DistributedStore`] with synchronous change delivery.
#[derive(Default)]
pub struct MemoryClusterStore {
    entries: DashMap<u32, String>,
    listeners: RwLock<Vec<Arc<dyn EntryListener>>>,
    /// Remaining puts to reject with a transient error
    failing_puts: AtomicU32,
}

impl MemoryClusterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` puts with [`StoreError::PartialUpdate`].
    pub fn fail_next_puts(&self, count: u32) {
        self.failing_puts.store(count, Ordering::SeqCst);
    }

    /// Drop every binding without emitting events (cluster-wide cache reset).
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of bindings held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no binding is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an arbitrary batch to every listener, bypassing the map.
    pub fn inject_events(&self, events: &[EntryEvent]) {
        self.dispatch(events);
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn dispatch(&self, events: &[EntryEvent]) {
        // Snapshot so listeners may call back into the store.
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        for listener in listeners {
            listener.on_inserted(events);
        }
    }
}

impl DistributedStore for MemoryClusterStore {
    fn try_put_if_absent(&self, type_id: u32, name: &str) -> Result<Option<String>, StoreError> {
        if self.take_injected_failure() {
            return Err(StoreError::PartialUpdate(format!(
                "injected failure for type ID {}",
                type_id
            )));
        }

        // Shard lock is released before listeners run.
        let inserted = match self.entries.entry(type_id) {
            Entry::Occupied(existing) => return Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(name.to_string());
                EntryEvent::inserted(type_id, name)
            }
        };

        self.dispatch(std::slice::from_ref(&inserted));
        Ok(None)
    }

    fn get(&self, type_id: u32) -> Option<String> {
        self.entries.get(&type_id).map(|name| name.value().clone())
    }

    fn subscribe(&self, listener: Arc<dyn EntryListener>) {
        self.listeners.write().push(listener);
    }
}
