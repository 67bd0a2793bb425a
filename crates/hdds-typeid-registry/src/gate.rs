// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot bootstrap gate for the distributed store handle.
//!
//! Readers may run before the distributed store is wired up on this node.
//! Instead of failing they park on the gate until the lifecycle owner
//! installs the handle.
//!
//! # Architecture
//! - `ArcSwapOption` for the published handle (lock-free reads once open)
//! - `Mutex<bool>` + `Condvar` for the one-shot "opened" signal
//!
//! Once installed, every `get()`/`await_ready()` is a single atomic load.

use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Publish-once, read-many handle with blocking wait.
///
/// # Example
/// ```ignore
/// let gate = Arc::new(BootstrapGate::new());
///
/// // Reader thread, may start before the store is ready
/// let store = gate.await_ready();
///
/// // Startup thread, exactly once
/// gate.install(Arc::new(store));
/// ```
#[derive(Debug)]
pub struct BootstrapGate<T> {
    /// Published handle, `None` until installed
    handle: ArcSwapOption<T>,
    /// Set under lock together with `handle` so waiters cannot miss it
    opened: Mutex<bool>,
    condvar: Condvar,
}

impl<T> BootstrapGate<T> {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self {
            handle: ArcSwapOption::empty(),
            opened: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Publish the handle and release every waiter.
    ///
    /// Must be called exactly once. A second call is ignored (the first
    /// handle stays published) and returns `false`.
    pub fn install(&self, handle: Arc<T>) -> bool {
        let mut opened = self.opened.lock();
        if *opened {
            log::warn!("Bootstrap gate already open, ignoring second install");
            return false;
        }

        self.handle.store(Some(handle));
        *opened = true;
        self.condvar.notify_all();
        true
    }

    /// Non-blocking peek at the handle.
    #[inline]
    pub fn get(&self) -> Option<Arc<T>> {
        self.handle.load_full()
    }

    /// Returns true once the handle has been installed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.handle.load().is_some()
    }

    /// Block until the handle is installed, then return it.
    pub fn await_ready(&self) -> Arc<T> {
        if let Some(handle) = self.get() {
            return handle;
        }

        let mut opened = self.opened.lock();
        loop {
            if let Some(handle) = self.get() {
                return handle;
            }
            self.condvar.wait(&mut opened);
        }
    }

    /// Block until the handle is installed or `timeout` expires.
    ///
    /// Returns `None` on timeout. A timeout too large to form a deadline
    /// (e.g. `Duration::MAX`) waits without bound.
    pub fn await_ready_timeout(&self, timeout: Duration) -> Option<Arc<T>> {
        if let Some(handle) = self.get() {
            return Some(handle);
        }

        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.await_ready());
        };
        let mut opened = self.opened.lock();
        loop {
            if let Some(handle) = self.get() {
                return Some(handle);
            }
            if self.condvar.wait_until(&mut opened, deadline).timed_out() {
                return self.get();
            }
        }
    }
}

impl<T> Default for BootstrapGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
