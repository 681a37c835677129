//! unitdesk core - data access for the personnel, unit, position and
//! vehicle management console.
//!
//! The REST backend owns all persistent state. This crate provides the
//! layer consumers read it through:
//!
//! - `cache`: per-collection read-through caches with request coalescing
//! - `api`: HTTP client and resource descriptions
//! - `models`: backend entities
//! - `service`: `DataService`, which wires one cache per collection to a
//!   backend and invalidates caches after writes
//! - `config`: persisted console settings

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod service;

pub use api::{ApiClient, ApiConfig, ApiError, Resource, ResourceKind};
pub use cache::{CacheState, RequestCoalescer, ResourceCache};
pub use config::Config;
pub use service::{Backend, CacheStatus, DataService, SharedError};
