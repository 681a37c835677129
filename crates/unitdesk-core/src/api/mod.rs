//! REST API client module for the console backend.
//!
//! This module provides the `ApiClient` for listing and mutating the
//! backend's resource collections, the `Resource` descriptions of those
//! collections, and the `ApiError` type for HTTP-level failures.
//!
//! Requests carry an optional JWT bearer token. Rate-limited requests are
//! retried here; nothing above this layer retries.

pub mod client;
pub mod error;
pub mod resource;

pub use client::{ApiClient, ApiConfig};
pub use error::ApiError;
pub use resource::{
    Departments, Employees, EntryExitRequests, Positions, Resource, ResourceKind, Vehicles,
};
