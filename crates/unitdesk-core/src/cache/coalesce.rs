use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::lock;

type Pending<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, Arc<E>>>>;
type Registry<K, V, E> = Mutex<HashMap<K, Pending<V, E>>>;

/// De-duplicates identical requests that are in progress at the same time.
///
/// While a request for a key is running, further `run` calls with an equal
/// key await it instead of starting their own. The key is forgotten as soon
/// as the request settles, so nothing is retained afterwards.
pub struct RequestCoalescer<K, V, E> {
    pending: Arc<Registry<K, V, E>>,
}

impl<K, V, E> Clone for RequestCoalescer<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<K, V, E> Default for RequestCoalescer<K, V, E> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V, E> RequestCoalescer<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the request built by `make` under `key`, or join the one already
    /// running for that key. `make` is only called when no request is running.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Result<Arc<V>, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let pending = {
            let mut registry = lock(&self.pending);
            match registry.get(&key).cloned() {
                Some(pending) => {
                    debug!(key = ?key, "Joining in-flight request");
                    pending
                }
                None => {
                    let pending = Self::start(Arc::downgrade(&self.pending), key.clone(), make());
                    registry.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Number of distinct requests currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    fn start<Fut>(registry: Weak<Registry<K, V, E>>, key: K, request: Fut) -> Pending<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        async move {
            let result = AssertUnwindSafe(request).catch_unwind().await;

            if let Some(registry) = registry.upgrade() {
                lock(&registry).remove(&key);
            }

            match result {
                Ok(result) => result.map(Arc::new).map_err(Arc::new),
                Err(panic) => resume_unwind(panic),
            }
        }
        .boxed()
        .shared()
    }
}
