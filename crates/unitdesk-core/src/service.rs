//! Data service: the single entry point consumers read and write through.
//!
//! `DataService` owns one `ResourceCache` per backend collection. Reads go
//! through the caches; writes go straight to the backend and, once they
//! succeed, invalidate the written collection plus every collection that
//! embeds data from it.
//!
//! The service is constructed explicitly around a `Backend`, so consumers
//! hold it by reference and tests can hand it a stub backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::resource::{
    Departments, Employees, EntryExitRequests, Positions, Resource, ResourceKind, Vehicles,
};
use crate::api::ApiClient;
use crate::cache::{CacheState, ResourceCache};
use crate::config::Config;
use crate::models::{Department, Employee, EntryExitRequest, Position, Vehicle};

/// Error handed out by cached reads. Every caller that joined the same
/// failed fetch receives the same error.
pub type SharedError = Arc<anyhow::Error>;

/// Remote store for the console's collections.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn list<R: Resource>(&self) -> Result<Vec<R::Item>>;

    async fn create<R: Resource>(&self, payload: &R::Payload) -> Result<R::Item>;

    async fn update<R: Resource>(&self, id: &str, payload: &R::Payload) -> Result<R::Item>;

    async fn delete<R: Resource>(&self, id: &str) -> Result<()>;
}

/// Snapshot of one cache for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub kind: ResourceKind,
    pub state: CacheState,
    pub age: String,
}

impl CacheStatus {
    fn of<T, E>(kind: ResourceKind, cache: &ResourceCache<T, E>) -> Self {
        Self {
            kind,
            state: cache.state(),
            age: cache.age_display(),
        }
    }
}

pub struct DataService<B> {
    backend: Arc<B>,
    departments: ResourceCache<Vec<Department>>,
    positions: ResourceCache<Vec<Position>>,
    employees: ResourceCache<Vec<Employee>>,
    vehicles: ResourceCache<Vec<Vehicle>>,
    entry_exit_requests: ResourceCache<Vec<EntryExitRequest>>,
}

/// Build the cache for collection `R`, fetching through `backend`.
fn collection_cache<B: Backend, R: Resource>(
    backend: &Arc<B>,
    ttl: Duration,
) -> ResourceCache<Vec<R::Item>> {
    let backend = Arc::clone(backend);
    ResourceCache::new(R::KIND.path(), ttl, move || {
        let backend = Arc::clone(&backend);
        async move { backend.list::<R>().await }
    })
}

impl DataService<ApiClient> {
    /// Service backed by the REST API described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ApiClient::new(&config.api_config())?;
        info!(api_url = %client.base_url(), ttl_secs = config.cache_ttl_secs, "Data service configured");
        Ok(Self::new(Arc::new(client), config.cache_ttl()))
    }
}

impl<B: Backend> DataService<B> {
    pub fn new(backend: Arc<B>, ttl: Duration) -> Self {
        Self {
            departments: collection_cache::<B, Departments>(&backend, ttl),
            positions: collection_cache::<B, Positions>(&backend, ttl),
            employees: collection_cache::<B, Employees>(&backend, ttl),
            vehicles: collection_cache::<B, Vehicles>(&backend, ttl),
            entry_exit_requests: collection_cache::<B, EntryExitRequests>(&backend, ttl),
            backend,
        }
    }

    // ===== Reads =====

    pub async fn departments(&self) -> Result<Arc<Vec<Department>>, SharedError> {
        self.departments.get().await
    }

    pub async fn positions(&self) -> Result<Arc<Vec<Position>>, SharedError> {
        self.positions.get().await
    }

    pub async fn employees(&self) -> Result<Arc<Vec<Employee>>, SharedError> {
        self.employees.get().await
    }

    pub async fn vehicles(&self) -> Result<Arc<Vec<Vehicle>>, SharedError> {
        self.vehicles.get().await
    }

    pub async fn entry_exit_requests(&self) -> Result<Arc<Vec<EntryExitRequest>>, SharedError> {
        self.entry_exit_requests.get().await
    }

    /// Employees matching `query` by name, service number, department or
    /// email. An empty query returns everyone.
    pub async fn search_employees(&self, query: &str) -> Result<Vec<Employee>, SharedError> {
        let employees = self.employees().await?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(employees.to_vec());
        }
        Ok(employees
            .iter()
            .filter(|employee| employee.matches(query))
            .cloned()
            .collect())
    }

    /// Direct children of `parent_id` (root positions for `None`), in
    /// display order.
    pub async fn child_positions(&self, parent_id: Option<&str>) -> Result<Vec<Position>, SharedError> {
        let positions = self.positions().await?;
        let mut children: Vec<Position> = positions
            .iter()
            .filter(|position| match parent_id {
                Some(parent) => position.is_child_of(parent),
                None => position.is_root(),
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(children)
    }

    // ===== Writes =====

    pub async fn create<R: Resource>(&self, payload: &R::Payload) -> Result<R::Item> {
        let item = self.backend.create::<R>(payload).await?;
        self.invalidate_after_write(R::KIND);
        Ok(item)
    }

    pub async fn update<R: Resource>(&self, id: &str, payload: &R::Payload) -> Result<R::Item> {
        let item = self.backend.update::<R>(id, payload).await?;
        self.invalidate_after_write(R::KIND);
        Ok(item)
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
        self.backend.delete::<R>(id).await?;
        self.invalidate_after_write(R::KIND);
        Ok(())
    }

    fn invalidate_after_write(&self, kind: ResourceKind) {
        debug!(resource = %kind, dependents = ?kind.dependents(), "Write succeeded, invalidating");
        self.invalidate(kind);
        for dependent in kind.dependents() {
            self.invalidate(*dependent);
        }
    }

    // ===== Cache control =====

    /// Force the next read of `kind` to go to the backend
    pub fn invalidate(&self, kind: ResourceKind) {
        match kind {
            ResourceKind::Departments => self.departments.invalidate(),
            ResourceKind::Positions => self.positions.invalidate(),
            ResourceKind::Employees => self.employees.invalidate(),
            ResourceKind::Vehicles => self.vehicles.invalidate(),
            ResourceKind::EntryExitRequests => self.entry_exit_requests.invalidate(),
        }
    }

    pub fn invalidate_all(&self) {
        for kind in ResourceKind::ALL {
            self.invalidate(kind);
        }
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        ResourceKind::ALL
            .into_iter()
            .map(|kind| match kind {
                ResourceKind::Departments => CacheStatus::of(kind, &self.departments),
                ResourceKind::Positions => CacheStatus::of(kind, &self.positions),
                ResourceKind::Employees => CacheStatus::of(kind, &self.employees),
                ResourceKind::Vehicles => CacheStatus::of(kind, &self.vehicles),
                ResourceKind::EntryExitRequests => CacheStatus::of(kind, &self.entry_exit_requests),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use crate::models::{NewDepartment, NewEmployee};

    /// In-memory backend that stores rows as JSON, counts list calls per
    /// collection and can be told to fail.
    #[derive(Default)]
    struct StubBackend {
        rows: Mutex<HashMap<ResourceKind, Vec<Value>>>,
        list_calls: Mutex<HashMap<ResourceKind, usize>>,
        next_id: AtomicUsize,
        fail_lists: AtomicBool,
        list_delay: Option<Duration>,
    }

    impl StubBackend {
        fn with_rows(rows: Vec<(ResourceKind, Value)>) -> Self {
            let stub = Self::default();
            {
                let mut stored = stub.rows.lock().unwrap();
                for (kind, rows) in rows {
                    let Value::Array(rows) = rows else {
                        panic!("rows must be a JSON array");
                    };
                    stored.insert(kind, rows);
                }
            }
            stub
        }

        fn list_calls(&self, kind: ResourceKind) -> usize {
            self.list_calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn list<R: Resource>(&self) -> Result<Vec<R::Item>> {
            *self.list_calls.lock().unwrap().entry(R::KIND).or_default() += 1;
            if let Some(delay) = self.list_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_lists.load(Ordering::SeqCst) {
                anyhow::bail!("HTTP 503: {} unavailable", R::KIND);
            }
            let rows = self.rows.lock().unwrap().get(&R::KIND).cloned().unwrap_or_default();
            Ok(serde_json::from_value(Value::Array(rows))?)
        }

        async fn create<R: Resource>(&self, payload: &R::Payload) -> Result<R::Item> {
            let mut row = serde_json::to_value(payload)?;
            let id = format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            row["id"] = json!(id);
            let item = serde_json::from_value(row.clone())?;
            self.rows.lock().unwrap().entry(R::KIND).or_default().push(row);
            Ok(item)
        }

        async fn update<R: Resource>(&self, id: &str, payload: &R::Payload) -> Result<R::Item> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&R::KIND)
                .and_then(|rows| rows.iter_mut().find(|row| row["id"] == id))
                .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", id))?;
            let Value::Object(changes) = serde_json::to_value(payload)? else {
                anyhow::bail!("payload must be an object");
            };
            for (field, value) in changes {
                row[field.as_str()] = value;
            }
            Ok(serde_json::from_value(row.clone())?)
        }

        async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let rows = rows.entry(R::KIND).or_default();
            let before = rows.len();
            rows.retain(|row| row["id"] != id);
            if rows.len() == before {
                anyhow::bail!("Resource not found: {}", id);
            }
            Ok(())
        }
    }

    fn seeded_backend() -> StubBackend {
        StubBackend::with_rows(vec![
            (
                ResourceKind::Departments,
                json!([
                    {"id": "d1", "name": "Headquarters"},
                    {"id": "d2", "name": "Logistics", "parentId": "d1", "employeeCount": 2}
                ]),
            ),
            (
                ResourceKind::Positions,
                json!([
                    {"id": "p1", "name": "Commander", "displayOrder": 1},
                    {"id": "p3", "name": "Deputy", "parentId": "p1", "displayOrder": 2},
                    {"id": "p2", "name": "Chief of staff", "parentId": "p1", "displayOrder": 1},
                    {"id": "p4", "name": "Adjutant", "parentId": "p1", "displayOrder": 1}
                ]),
            ),
            (
                ResourceKind::Employees,
                json!([
                    {"id": "e1", "employeeId": "SQ-001", "name": "Nguyen Van An", "department": "Logistics", "email": "an@example.org"},
                    {"id": "e2", "employeeId": "QN-002", "name": "Tran Thi Binh", "department": "Headquarters"}
                ]),
            ),
            (
                ResourceKind::Vehicles,
                json!([
                    {"id": "v1", "employeeId": "e1", "employeeName": "Nguyen Van An", "licensePlate": "30A-12345", "vehicleType": "car"}
                ]),
            ),
            (ResourceKind::EntryExitRequests, json!([])),
        ])
    }

    fn service(backend: StubBackend) -> (DataService<StubBackend>, Arc<StubBackend>) {
        let backend = Arc::new(backend);
        (DataService::new(Arc::clone(&backend), Duration::from_secs(300)), backend)
    }

    #[tokio::test]
    async fn test_reads_are_served_from_cache() {
        let (service, backend) = service(seeded_backend());

        let first = service.departments().await.unwrap();
        let second = service.departments().await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.list_calls(ResourceKind::Departments), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_share_one_backend_call() {
        let (service, backend) = service(StubBackend {
            list_delay: Some(Duration::from_millis(50)),
            ..seeded_backend()
        });

        let (a, b, c) = tokio::join!(service.positions(), service.positions(), service.positions());

        assert_eq!(backend.list_calls(ResourceKind::Positions), 1);
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn test_create_invalidates_collection_and_dependents() {
        let (service, backend) = service(seeded_backend());
        service.employees().await.unwrap();
        service.vehicles().await.unwrap();
        service.departments().await.unwrap();
        service.positions().await.unwrap();

        let created = service
            .create::<Employees>(&NewEmployee {
                employee_id: "SQ-003".to_string(),
                name: "Le Van Cuong".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Le Van Cuong");

        let employees = service.employees().await.unwrap();
        assert_eq!(employees.len(), 3);
        service.vehicles().await.unwrap();
        service.departments().await.unwrap();
        service.positions().await.unwrap();

        assert_eq!(backend.list_calls(ResourceKind::Employees), 2);
        assert_eq!(backend.list_calls(ResourceKind::Vehicles), 2);
        assert_eq!(backend.list_calls(ResourceKind::Departments), 2);
        assert_eq!(backend.list_calls(ResourceKind::Positions), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_invalidate() {
        let (service, backend) = service(seeded_backend());
        service.departments().await.unwrap();

        let renamed = service
            .update::<Departments>(
                "d2",
                &NewDepartment {
                    name: "Supply".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Supply");
        assert!(service.departments().await.unwrap().iter().any(|d| d.name == "Supply"));

        service.delete::<Departments>("d2").await.unwrap();
        assert_eq!(service.departments().await.unwrap().len(), 1);
        assert_eq!(backend.list_calls(ResourceKind::Departments), 3);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (service, backend) = service(seeded_backend());
        let before = service.vehicles().await.unwrap();

        let err = service.delete::<Vehicles>("missing").await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        let after = service.vehicles().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(backend.list_calls(ResourceKind::Vehicles), 1);
    }

    #[tokio::test]
    async fn test_failed_read_propagates_and_is_retried() {
        let (service, backend) = service(seeded_backend());
        backend.fail_lists.store(true, Ordering::SeqCst);

        let err = service.employees().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
        assert_eq!(
            service.cache_status()[2],
            CacheStatus {
                kind: ResourceKind::Employees,
                state: CacheState::Empty,
                age: "never".to_string(),
            }
        );

        backend.fail_lists.store(false, Ordering::SeqCst);
        assert_eq!(service.employees().await.unwrap().len(), 2);
        assert_eq!(backend.list_calls(ResourceKind::Employees), 2);
    }

    #[tokio::test]
    async fn test_invalidating_one_collection_leaves_others() {
        let (service, backend) = service(seeded_backend());
        service.departments().await.unwrap();
        service.positions().await.unwrap();

        service.invalidate(ResourceKind::Departments);
        service.invalidate(ResourceKind::Departments);
        service.departments().await.unwrap();
        service.positions().await.unwrap();

        assert_eq!(backend.list_calls(ResourceKind::Departments), 2);
        assert_eq!(backend.list_calls(ResourceKind::Positions), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let (service, backend) = service(seeded_backend());
        service.departments().await.unwrap();
        service.entry_exit_requests().await.unwrap();

        service.invalidate_all();
        assert!(service
            .cache_status()
            .iter()
            .all(|status| status.state == CacheState::Empty));

        service.entry_exit_requests().await.unwrap();
        assert_eq!(backend.list_calls(ResourceKind::EntryExitRequests), 2);
    }

    #[tokio::test]
    async fn test_search_employees() {
        let (service, backend) = service(seeded_backend());

        let hits = service.search_employees("logistics").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "e1");

        assert_eq!(service.search_employees("qn-").await.unwrap()[0].id, "e2");
        assert_eq!(service.search_employees("  ").await.unwrap().len(), 2);
        assert!(service.search_employees("nobody").await.unwrap().is_empty());
        assert_eq!(backend.list_calls(ResourceKind::Employees), 1);
    }

    #[tokio::test]
    async fn test_child_positions_in_display_order() {
        let (service, _backend) = service(seeded_backend());

        let roots = service.child_positions(None).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, "p1");

        let names: Vec<String> = service
            .child_positions(Some("p1"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Adjutant", "Chief of staff", "Deputy"]);
    }

    #[tokio::test]
    async fn test_cache_status_reports_fresh_collections() {
        let (service, _backend) = service(seeded_backend());
        service.vehicles().await.unwrap();

        let status = service.cache_status();
        assert_eq!(status.len(), ResourceKind::ALL.len());
        let vehicles = status
            .iter()
            .find(|s| s.kind == ResourceKind::Vehicles)
            .unwrap();
        assert_eq!(vehicles.state, CacheState::Fresh);
        assert_eq!(vehicles.age, "just now");
    }
}
