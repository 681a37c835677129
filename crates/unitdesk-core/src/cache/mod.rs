//! In-memory caching for backend collections.
//!
//! This module provides the building blocks the data service puts between
//! consumers and the REST backend:
//!
//! - `ResourceCache`: read-through cache for one resource collection with a
//!   fixed time-to-live, coalescing of concurrent reads and invalidation
//!   after writes
//! - `RequestCoalescer`: keyed de-duplication of identical requests that are
//!   in progress at the same time (no result retention)
//!
//! Nothing here is persisted; every cache lives as long as its owner.

pub mod coalesce;
pub mod resource;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use coalesce::RequestCoalescer;
pub use resource::{CacheState, ResourceCache, DEFAULT_TTL};

/// Lock a state mutex, recovering the guard if a previous holder panicked.
/// The guarded state is always left consistent between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
