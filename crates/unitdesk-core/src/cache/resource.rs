use std::fmt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::lock;

/// Default time-to-live for a cached collection.
/// Five minutes keeps list pages snappy while edits by other operators
/// still show up without a manual refresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type Fetcher<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Outcome<T, E> = Result<Arc<T>, Arc<E>>;
type InFlight<T, E> = Shared<BoxFuture<'static, Outcome<T, E>>>;

/// Observable state of a `ResourceCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No usable value and no fetch running
    Empty,
    /// A fetch is in flight
    Fetching,
    /// A value is stored and within its TTL
    Fresh,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Empty => write!(f, "empty"),
            CacheState::Fetching => write!(f, "fetching"),
            CacheState::Fresh => write!(f, "fresh"),
        }
    }
}

struct CacheEntry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

struct Slots<T, E> {
    entry: Option<CacheEntry<T>>,
    in_flight: Option<InFlight<T, E>>,
}

struct Inner<T, E> {
    name: String,
    ttl: Duration,
    fetcher: Fetcher<T, E>,
    slots: Mutex<Slots<T, E>>,
}

impl<T, E> Inner<T, E> {
    fn is_fresh(&self, entry: &CacheEntry<T>) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }
}

/// Read-through cache for a single backend collection.
///
/// `get` returns the stored value while it is younger than the TTL. Once the
/// value is missing or expired, the first caller starts a fetch and every
/// caller arriving before it settles awaits that same fetch, so the fetcher
/// runs at most once at a time. A successful fetch replaces the stored value;
/// a failed one leaves the cache empty and hands the fetcher's error to every
/// waiting caller.
///
/// Expiry is checked lazily on `get`; there is no background eviction.
/// Values only enter the cache through the fetcher.
///
/// Clones are cheap and share the same state.
pub struct ResourceCache<T, E = anyhow::Error> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for ResourceCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> ResourceCache<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create an empty cache for the collection named `name`.
    ///
    /// `fetcher` is called with no arguments whenever a fresh copy is needed;
    /// filtering, paging and authentication are its own business.
    pub fn new<F, Fut>(name: impl Into<String>, ttl: Duration, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetcher: Fetcher<T, E> = Arc::new(move || fetcher().boxed());
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                ttl,
                fetcher,
                slots: Mutex::new(Slots {
                    entry: None,
                    in_flight: None,
                }),
            }),
        }
    }

    /// Return the current collection, fetching it if needed.
    ///
    /// Every caller joined onto a fetch receives the same `Arc`, whether it
    /// holds the value or the fetcher's error.
    ///
    /// A panicking fetcher is the exception: the caller polling the fetch
    /// when it panics gets the original panic, and the other joined callers
    /// panic with `Shared`'s "inner future panicked during poll" instead.
    /// Either way the cache is left empty and the next `get` fetches again.
    pub async fn get(&self) -> Result<Arc<T>, Arc<E>> {
        let pending = {
            let mut slots = lock(&self.inner.slots);

            if let Some(entry) = slots.entry.as_ref() {
                if self.inner.is_fresh(entry) {
                    debug!(resource = %self.inner.name, "Cache hit");
                    return Ok(Arc::clone(&entry.value));
                }
                debug!(resource = %self.inner.name, "Cached value expired");
                slots.entry = None;
            }

            match slots.in_flight.clone() {
                Some(in_flight) => {
                    debug!(resource = %self.inner.name, "Joining in-flight fetch");
                    in_flight
                }
                None => {
                    let in_flight = self.start_fetch();
                    slots.in_flight = Some(in_flight.clone());
                    in_flight
                }
            }
        };

        pending.await
    }

    /// Build the shared fetch future. The fetcher itself is only called when
    /// the future is first polled, outside the state lock.
    fn start_fetch(&self) -> InFlight<T, E> {
        debug!(resource = %self.inner.name, "Starting fetch");

        let fetcher = Arc::clone(&self.inner.fetcher);
        let inner = Arc::downgrade(&self.inner);

        async move {
            let result = AssertUnwindSafe(async move { fetcher().await })
                .catch_unwind()
                .await;

            match result {
                Ok(result) => {
                    let outcome = result.map(Arc::new).map_err(Arc::new);
                    settle(&inner, &outcome);
                    outcome
                }
                Err(panic) => {
                    clear_in_flight(&inner);
                    resume_unwind(panic)
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl<T, E> ResourceCache<T, E> {
    /// Name given at construction, used in logs and status output
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Drop the stored value so the next `get` goes to the backend.
    ///
    /// A fetch already in flight is left alone and stores its result when it
    /// completes.
    pub fn invalidate(&self) {
        let mut slots = lock(&self.inner.slots);
        if slots.entry.take().is_some() {
            debug!(resource = %self.inner.name, "Cache invalidated");
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn state(&self) -> CacheState {
        let slots = lock(&self.inner.slots);
        if slots.in_flight.is_some() {
            CacheState::Fetching
        } else {
            match slots.entry.as_ref() {
                Some(entry) if self.inner.is_fresh(entry) => CacheState::Fresh,
                _ => CacheState::Empty,
            }
        }
    }

    /// Time since the stored value was fetched, if there is one
    pub fn age(&self) -> Option<Duration> {
        lock(&self.inner.slots)
            .entry
            .as_ref()
            .map(|entry| entry.fetched_at.elapsed())
    }

    /// Human-readable age of the stored value ("never" when empty)
    pub fn age_display(&self) -> String {
        match self.age() {
            Some(age) => format_age(age),
            None => "never".to_string(),
        }
    }
}

/// Record a finished fetch: clear the in-flight slot and, on success, store
/// the value with the current time.
fn settle<T, E>(inner: &Weak<Inner<T, E>>, outcome: &Outcome<T, E>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let mut slots = lock(&inner.slots);
    slots.in_flight = None;

    match outcome {
        Ok(value) => {
            debug!(resource = %inner.name, "Fetch succeeded, cache refreshed");
            slots.entry = Some(CacheEntry {
                value: Arc::clone(value),
                fetched_at: Instant::now(),
            });
        }
        Err(_) => {
            warn!(resource = %inner.name, "Fetch failed, cache left empty");
        }
    }
}

fn clear_in_flight<T, E>(inner: &Weak<Inner<T, E>>) {
    if let Some(inner) = inner.upgrade() {
        warn!(resource = %inner.name, "Fetcher panicked");
        lock(&inner.slots).in_flight = None;
    }
}

fn format_age(age: Duration) -> String {
    let minutes = age.as_secs() / 60;
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
