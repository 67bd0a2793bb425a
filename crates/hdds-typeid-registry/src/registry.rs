// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type ID registry core.
//!
//! Binds compact type IDs to fully-qualified type names, cluster-wide.
//!
//! # Architecture
//!
//! ```text
//! register(id, name) --> DistributedStore::try_put_if_absent
//!                               |
//!                               v  insert event (every node)
//!                        PropagationListener --> LocalStore ({id}.classname)
//!
//! resolve(id) --> BootstrapGate --> DistributedStore::get
//!                                        | miss
//!                                        v
//!                                   LocalStore::read --> register (re-seed)
//! ```
//!
//! # Lifecycle
//!
//! ```ignore
//! let registry = TypeRegistry::new(RegistryConfig::default())?;
//!
//! // Cache started: attach listener before anything can be inserted
//! registry.on_store_started(&store);
//! // Cache preloaded: publish handle, release blocked resolvers
//! registry.on_store_ready(Arc::new(store));
//! ```

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::gate::BootstrapGate;
use crate::listener::{ListenerStats, PropagationListener};
use crate::local_store::LocalStore;
use crate::store::{DistributedStore, EntryListener};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Registry statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Successful `register` calls (including idempotent re-registrations)
    pub registrations: u64,
    /// `register` calls rejected for a transient store failure
    pub transient_failures: u64,
    /// Warnings logged for runs of consecutive transient failures
    pub failure_warnings: u64,
    /// Collisions detected
    pub collisions: u64,
    /// `resolve` calls answered from the local store
    pub local_fallbacks: u64,
    /// Local bindings successfully pushed back into the distributed store
    pub reseeds: u64,
    /// Current run of consecutive transient failures
    pub consecutive_failures: u32,
    /// Propagation listener counters
    pub listener: ListenerStats,
}

#[derive(Debug, Default)]
struct Counters {
    registrations: AtomicU64,
    transient_failures: AtomicU64,
    failure_warnings: AtomicU64,
    collisions: AtomicU64,
    local_fallbacks: AtomicU64,
    reseeds: AtomicU64,
}

/// Node-local entry point of the cluster-wide type ID registry.
///
/// # Type Parameters
///
/// - `S` -- Distributed store (e.g. `MemoryClusterStore`)
pub struct TypeRegistry<S: DistributedStore> {
    gate: BootstrapGate<S>,
    local: LocalStore,
    listener: Arc<PropagationListener>,
    failure_warn_threshold: u32,
    /// Consecutive transient failures.
    ///
    /// Only plain loads and stores, never read-modify-write: concurrent
    /// writers may lose increments, which only shifts the warning cadence.
    failed_count: AtomicU32,
    counters: Counters,
}

impl<S: DistributedStore> TypeRegistry<S> {
    /// Create a registry and open its local store.
    ///
    /// The registry starts closed: `resolve` blocks until
    /// [`on_store_ready`](Self::on_store_ready) runs.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        config.validate()?;

        let local = LocalStore::open(&config)?;
        log::debug!("Type registry local store at {}", local.directory().display());

        Ok(Self {
            gate: BootstrapGate::new(),
            listener: Arc::new(PropagationListener::new(local.clone())),
            local,
            failure_warn_threshold: config.failure_warn_threshold,
            failed_count: AtomicU32::new(0),
            counters: Counters::default(),
        })
    }

    /// Attach the propagation listener to the store's change feed.
    ///
    /// Call once the store is started, before [`on_store_ready`](Self::on_store_ready).
    pub fn on_store_started(&self, store: &S) {
        let listener: Arc<dyn EntryListener> = self.listener.clone();
        store.subscribe(listener);
    }

    /// Publish the store handle and release blocked resolvers.
    ///
    /// Returns `false` if a handle was already installed.
    pub fn on_store_ready(&self, store: Arc<S>) -> bool {
        let installed = self.gate.install(store);
        if installed {
            log::info!("Type registry ready");
        }
        installed
    }

    /// Both lifecycle steps at once.
    pub fn start(&self, store: Arc<S>) -> bool {
        self.on_store_started(&store);
        self.on_store_ready(store)
    }

    /// Returns true once the store handle is installed.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Local store backing this registry.
    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    /// Bind `type_id -> name` cluster-wide.
    ///
    /// - `Ok(true)`: bound (or already bound to the same name)
    /// - `Ok(false)`: store not installed yet or transient failure; retry later
    /// - `Err(Collision)`: `type_id` is bound to another name
    pub fn register(&self, type_id: u32, name: &str) -> Result<bool, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::InvalidBinding {
                type_id,
                reason: "empty type name",
            });
        }

        let Some(store) = self.gate.get() else {
            return Ok(false);
        };

        match store.try_put_if_absent(type_id, name) {
            Ok(Some(existing)) if existing != name => {
                self.counters.collisions.fetch_add(1, Ordering::Relaxed);
                Err(RegistryError::Collision {
                    type_id,
                    existing,
                    attempted: name.to_string(),
                })
            }
            Ok(_) => {
                self.failed_count.store(0, Ordering::Relaxed);
                self.counters.registrations.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) => {
                self.counters.transient_failures.fetch_add(1, Ordering::Relaxed);

                let failed = self.failed_count.load(Ordering::Relaxed).saturating_add(1);
                if failed > self.failure_warn_threshold {
                    self.counters.failure_warnings.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "Failed to register type name more than {} times in a row (may affect performance): {}",
                        self.failure_warn_threshold,
                        e
                    );
                    self.failed_count.store(0, Ordering::Relaxed);
                } else {
                    log::debug!("Transient failure registering type ID {}: {}", type_id, e);
                    self.failed_count.store(failed, Ordering::Relaxed);
                }

                Ok(false)
            }
        }
    }

    /// Resolve the name bound to `type_id`.
    ///
    /// Blocks until the store handle is installed.
    pub fn resolve(&self, type_id: u32) -> Result<String, RegistryError> {
        let store = self.gate.await_ready();
        self.resolve_with(&store, type_id)
    }

    /// Like [`resolve`](Self::resolve), but gives up with `NotReady` if the
    /// store handle is not installed within `timeout`.
    pub fn resolve_timeout(&self, type_id: u32, timeout: Duration) -> Result<String, RegistryError> {
        let store = self
            .gate
            .await_ready_timeout(timeout)
            .ok_or(RegistryError::NotReady(timeout))?;
        self.resolve_with(&store, type_id)
    }

    /// Snapshot of registry statistics.
    pub fn stats(&self) -> RegistryStats {
        let c = &self.counters;
        RegistryStats {
            registrations: c.registrations.load(Ordering::Relaxed),
            transient_failures: c.transient_failures.load(Ordering::Relaxed),
            failure_warnings: c.failure_warnings.load(Ordering::Relaxed),
            collisions: c.collisions.load(Ordering::Relaxed),
            local_fallbacks: c.local_fallbacks.load(Ordering::Relaxed),
            reseeds: c.reseeds.load(Ordering::Relaxed),
            consecutive_failures: self.failed_count.load(Ordering::Relaxed),
            listener: self.listener.stats(),
        }
    }

    fn resolve_with(&self, store: &S, type_id: u32) -> Result<String, RegistryError> {
        if let Some(name) = store.get(type_id) {
            return Ok(name);
        }

        let name = match self.local.read(type_id) {
            Ok(Some(name)) => name,
            Ok(None) => return Err(RegistryError::NotFound(type_id)),
            Err(e) => {
                log::warn!(
                    "Failed to read type name from file [id={}, file={}]: {}",
                    type_id,
                    self.local.path_for(type_id).display(),
                    e
                );
                return Err(RegistryError::NotFound(type_id));
            }
        };

        self.counters.local_fallbacks.fetch_add(1, Ordering::Relaxed);

        // Must go back through the store so other nodes' listeners see it.
        if self.register(type_id, &name)? {
            self.counters.reseeds.fetch_add(1, Ordering::Relaxed);
            log::debug!("Re-seeded type ID {} from local store", type_id);
        } else {
            log::debug!("Re-seed of type ID {} deferred", type_id);
        }

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryClusterStore;
    use std::fs;

    fn registry(dir: &tempfile::TempDir) -> TypeRegistry<MemoryClusterStore> {
        let config = RegistryConfig::builder()
            .work_dir(dir.path())
            .sync_writes(false)
            .build();
        TypeRegistry::new(config).unwrap()
    }

    fn started(dir: &tempfile::TempDir) -> (TypeRegistry<MemoryClusterStore>, Arc<MemoryClusterStore>) {
        let reg = registry(dir);
        let store = Arc::new(MemoryClusterStore::new());
        assert!(reg.start(Arc::clone(&store)));
        (reg, store)
    }

    #[test]
    fn test_register_before_ready_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);

        assert!(!reg.is_ready());
        assert!(!reg.register(1, "a.A").unwrap());
        assert_eq!(reg.stats().transient_failures, 0);
    }

    #[test]
    fn test_register_then_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, store) = started(&dir);

        assert!(reg.register(42, "com.acme.Order").unwrap());
        assert_eq!(reg.resolve(42).unwrap(), "com.acme.Order");
        assert_eq!(store.get(42).as_deref(), Some("com.acme.Order"));
        assert_eq!(
            fs::read_to_string(dir.path().join("42.classname")).unwrap(),
            "com.acme.Order"
        );
    }

    #[test]
    fn test_same_name_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, _store) = started(&dir);

        assert!(reg.register(5, "x.Y").unwrap());
        assert!(reg.register(5, "x.Y").unwrap());
        assert_eq!(reg.stats().registrations, 2);
        assert_eq!(reg.stats().listener.bindings_written, 1);
    }

    #[test]
    fn test_collision_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, store) = started(&dir);

        assert!(reg.register(5, "x.Y").unwrap());
        let err = reg.register(5, "x.Z").unwrap_err();
        match err {
            RegistryError::Collision {
                type_id,
                existing,
                attempted,
            } => {
                assert_eq!(type_id, 5);
                assert_eq!(existing, "x.Y");
                assert_eq!(attempted, "x.Z");
            }
            other => panic!("expected collision, got {other:?}"),
        }
        assert_eq!(store.get(5).as_deref(), Some("x.Y"));
        assert_eq!(reg.stats().collisions, 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, store) = started(&dir);

        assert!(matches!(
            reg.register(3, ""),
            Err(RegistryError::InvalidBinding { type_id: 3, .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, _store) = started(&dir);

        assert!(matches!(reg.resolve(404), Err(RegistryError::NotFound(404))));
    }

    #[test]
    fn test_resolve_reseeds_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("7.classname"), "x.Y").unwrap();
        let (reg, store) = started(&dir);

        assert_eq!(reg.resolve(7).unwrap(), "x.Y");
        assert_eq!(store.get(7).as_deref(), Some("x.Y"));

        let stats = reg.stats();
        assert_eq!(stats.local_fallbacks, 1);
        assert_eq!(stats.reseeds, 1);
    }

    #[test]
    fn test_resolve_returns_local_name_on_transient_reseed_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("7.classname"), "x.Y").unwrap();
        let (reg, store) = started(&dir);

        store.fail_next_puts(1);
        assert_eq!(reg.resolve(7).unwrap(), "x.Y");
        assert_eq!(store.get(7), None);
        assert_eq!(reg.stats().reseeds, 0);
        assert_eq!(reg.stats().transient_failures, 1);
    }

    #[test]
    fn test_empty_local_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("8.classname"), "").unwrap();
        let (reg, _store) = started(&dir);

        assert!(matches!(reg.resolve(8), Err(RegistryError::NotFound(8))));
    }

    #[test]
    fn test_failure_counter_resets_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, store) = started(&dir);

        store.fail_next_puts(4);
        for _ in 0..4 {
            assert!(!reg.register(1, "a.A").unwrap());
        }
        assert_eq!(reg.stats().consecutive_failures, 4);

        assert!(reg.register(1, "a.A").unwrap());
        assert_eq!(reg.stats().consecutive_failures, 0);
        assert_eq!(reg.stats().failure_warnings, 0);
    }

    #[test]
    fn test_one_warning_per_run_of_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, store) = started(&dir);

        store.fail_next_puts(25);

        for _ in 0..10 {
            assert!(!reg.register(1, "a.A").unwrap());
        }
        assert_eq!(reg.stats().failure_warnings, 0);
        assert_eq!(reg.stats().consecutive_failures, 10);

        // 11th failure warns and resets.
        assert!(!reg.register(1, "a.A").unwrap());
        assert_eq!(reg.stats().failure_warnings, 1);
        assert_eq!(reg.stats().consecutive_failures, 0);

        // 12th through 21st stay quiet.
        for _ in 0..10 {
            assert!(!reg.register(1, "a.A").unwrap());
        }
        assert_eq!(reg.stats().failure_warnings, 1);

        // 22nd warns again.
        assert!(!reg.register(1, "a.A").unwrap());
        assert_eq!(reg.stats().failure_warnings, 2);
        assert_eq!(reg.stats().transient_failures, 22);
    }

    #[test]
    fn test_custom_warn_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::builder()
            .work_dir(dir.path())
            .failure_warn_threshold(2)
            .build();
        let reg = TypeRegistry::new(config).unwrap();
        let store = Arc::new(MemoryClusterStore::new());
        reg.start(Arc::clone(&store));

        store.fail_next_puts(3);
        for _ in 0..3 {
            assert!(!reg.register(1, "a.A").unwrap());
        }
        assert_eq!(reg.stats().failure_warnings, 1);
    }

    #[test]
    fn test_resolve_timeout_before_ready() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);

        assert!(matches!(
            reg.resolve_timeout(1, Duration::from_millis(10)),
            Err(RegistryError::NotReady(_))
        ));
    }

    #[test]
    fn test_resolve_with_max_timeout_waits_for_install() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Arc::new(registry(&dir));
        fs::write(dir.path().join("1.classname"), "a.A").unwrap();

        let reader = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || reg.resolve_timeout(1, Duration::MAX))
        };
        std::thread::sleep(Duration::from_millis(20));
        assert!(!reader.is_finished());

        assert!(reg.on_store_ready(Arc::new(MemoryClusterStore::new())));
        assert_eq!(reader.join().unwrap().unwrap(), "a.A");
    }

    #[test]
    fn test_second_install_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (reg, _store) = started(&dir);

        assert!(!reg.on_store_ready(Arc::new(MemoryClusterStore::new())));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::builder()
            .work_dir(dir.path())
            .failure_warn_threshold(0)
            .build();

        assert!(matches!(
            TypeRegistry::<MemoryClusterStore>::new(config),
            Err(RegistryError::Config(_))
        ));
    }
}
