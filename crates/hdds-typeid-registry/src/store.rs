// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Distributed store abstraction
//!
//! The registry does not own replication. It only needs a cluster-wide
//! key/value cache with three properties:
//!
//! - atomic, per-key linearizable put-if-absent
//! - point reads
//! - an insert-only change feed delivered on every node
//!
//! # Integration
//!
//! ```ignore
//! impl DistributedStore for ClusterCache {
//!     fn try_put_if_absent(&self, type_id: u32, name: &str)
//!         -> Result<Option<String>, StoreError> { /* ... */ }
//!     // ...
//! }
//! ```

use crate::error::StoreError;
use std::sync::Arc;

/// Change notification for one newly inserted binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEvent {
    /// Type ID (cache key)
    pub type_id: u32,
    /// Newly bound type name
    pub name: String,
    /// Previous value; always `None` for an insert-only feed
    pub old_name: Option<String>,
}

impl EntryEvent {
    /// Build an insert event.
    pub fn inserted(type_id: u32, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
            old_name: None,
        }
    }
}

/// Receiver of change-feed batches.
pub trait EntryListener: Send + Sync {
    /// Called with every batch of inserted entries.
    fn on_inserted(&self, events: &[EntryEvent]);
}

/// Cluster-wide cache holding `type_id -> name` bindings.
pub trait DistributedStore: Send + Sync {
    /// Bind `type_id -> name` only if `type_id` is unbound.
    ///
    /// - `Ok(None)`: inserted
    /// - `Ok(Some(existing))`: already bound (possibly to the same name)
    /// - `Err(_)`: transient failure, nothing is known about the key
    fn try_put_if_absent(&self, type_id: u32, name: &str) -> Result<Option<String>, StoreError>;

    /// Current binding for `type_id`, if any.
    fn get(&self, type_id: u32) -> Option<String>;

    /// Attach a listener to the insert-only change feed.
    fn subscribe(&self, listener: Arc<dyn EntryListener>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_event_has_no_old_value() {
        let event = EntryEvent::inserted(42, "com.acme.Order");
        assert_eq!(event.type_id, 42);
        assert_eq!(event.name, "com.acme.Order");
        assert!(event.old_name.is_none());
    }
}
