// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the type ID registry.

use thiserror::Error;

/// Errors surfaced by [`TypeRegistry`](crate::TypeRegistry).
///
/// Transient store failures are *not* errors at this level: `register`
/// reports them as `Ok(false)` so the caller can retry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The ID is already bound to a different name somewhere in the cluster.
    ///
    /// Points at a type ID allocation bug upstream. Never retried.
    #[error("type ID collision detected [id={type_id}, name1={attempted}, name2={existing}]")]
    Collision {
        type_id: u32,
        existing: String,
        attempted: String,
    },

    /// The ID is unknown to both the distributed store and the local store.
    #[error("type ID not found: {0}")]
    NotFound(u32),

    /// The binding cannot be registered as given.
    #[error("invalid binding for type ID {type_id}: {reason}")]
    InvalidBinding { type_id: u32, reason: &'static str },

    /// The distributed store was not installed within the caller's deadline.
    #[error("type registry not ready after {0:?}")]
    NotReady(std::time::Duration),

    /// Invalid registry configuration.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Local store setup failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Returns true for collisions.
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }
}

/// Transient failures reported by a [`DistributedStore`](crate::DistributedStore).
///
/// All variants are retry-safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The write reached only part of the owning nodes (e.g. mid-rebalance).
    #[error("partial update: {0}")]
    PartialUpdate(String),

    /// The conditional write lost a race under contention.
    #[error("try-put failed: {0}")]
    TryPutFailed(String),

    /// The store cannot serve the request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
