// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Type ID Registry
//!
//! Cluster-wide mapping from compact integer type IDs to fully-qualified
//! type names. Serialized samples carry the ID; every node resolves it back
//! to the name.
//!
//! # Features
//!
//! - **At-most-once binding** -- an ID is never rebound to another name;
//!   a conflicting `register` is a `Collision` error
//! - **Local durability** -- every accepted binding is mirrored to
//!   `{work_dir}/{id}.classname` on each node
//! - **Bootstrap gate** -- `resolve` waits for the distributed store instead
//!   of failing during startup
//! - **Self-healing reads** -- a binding known only on disk is pushed back
//!   into the distributed store
//!
//! # Architecture
//!
//! ```text
//! TypeRegistry
//! +-- BootstrapGate        (publishes the store handle once)
//! +-- DistributedStore     (put-if-absent, get, insert feed)
//! +-- PropagationListener  (insert feed -> LocalStore)
//! +-- LocalStore           (one file per type ID)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hdds_typeid_registry::{MemoryClusterStore, RegistryConfig, TypeRegistry};
//! use std::sync::Arc;
//!
//! let config = RegistryConfig::builder().work_dir("work/marshaller").build();
//! let registry = TypeRegistry::new(config)?;
//! registry.start(Arc::new(MemoryClusterStore::new()));
//!
//! registry.register(42, "com.acme.Order")?;
//! assert_eq!(registry.resolve(42)?, "com.acme.Order");
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod listener;
pub mod local_store;
pub mod memory_store;
pub mod registry;
pub mod store;

pub use config::{ConfigError, RegistryConfig, RegistryConfigBuilder};
pub use error::{RegistryError, StoreError};
pub use gate::BootstrapGate;
pub use listener::{ListenerStats, PropagationListener};
pub use local_store::{LocalStore, StoreScan, WriteOutcome};
pub use memory_store::MemoryClusterStore;
pub use registry::{RegistryStats, TypeRegistry};
pub use store::{DistributedStore, EntryEvent, EntryListener};
