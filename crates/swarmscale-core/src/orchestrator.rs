//! The orchestrator seam.
//!
//! The control loop only needs three capabilities from whatever owns the
//! worker fleet: look a service up by name, read its replica count, and
//! request a new replica count. [`InMemoryOrchestrator`] implements them
//! over a local table for dry runs and tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};

/// A resolved reference to a worker service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    /// Orchestrator-assigned identifier.
    pub id: String,
    pub name: String,
}

/// Capabilities the actuator needs from the orchestrator.
///
/// The replica count is owned by the orchestrator; callers must not cache
/// it across decision cycles.
pub trait Orchestrator: Send + Sync {
    /// Resolve the service whose name matches exactly.
    fn find_service(
        &self,
        name: &str,
    ) -> impl Future<Output = OrchestratorResult<ServiceHandle>> + Send;

    /// Read the desired replica count the orchestrator currently holds.
    fn replica_count(
        &self,
        service: &ServiceHandle,
    ) -> impl Future<Output = OrchestratorResult<u32>> + Send;

    /// Ask the orchestrator to converge on `replicas`. Fire-and-forget.
    fn set_replica_count(
        &self,
        service: &ServiceHandle,
        replicas: u32,
    ) -> impl Future<Output = OrchestratorResult<()>> + Send;
}

#[derive(Default)]
struct Table {
    /// name → (id, replicas)
    services: HashMap<String, (String, u32)>,
    /// Errors returned, in order, by the next calls (any method).
    injected: VecDeque<OrchestratorError>,
    /// Errors returned only by the next `set_replica_count` calls.
    injected_scale: VecDeque<OrchestratorError>,
    /// Every accepted `set_replica_count` target, in order.
    scale_requests: Vec<u32>,
    next_id: u64,
}

impl Table {
    fn insert(&mut self, name: &str, replicas: u32) {
        self.next_id += 1;
        let id = format!("svc-{}", self.next_id);
        self.services.insert(name.to_string(), (id, replicas));
    }

    fn by_id_mut(&mut self, id: &str) -> Option<&mut u32> {
        self.services
            .values_mut()
            .find(|(svc_id, _)| svc_id == id)
            .map(|(_, replicas)| replicas)
    }
}

/// Orchestrator backed by an in-process table.
///
/// Cloning shares the table, so a test can keep a handle and inspect the
/// scale requests the actuator issued.
#[derive(Clone, Default)]
pub struct InMemoryOrchestrator {
    table: Arc<Mutex<Table>>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an orchestrator that already runs `name` at `replicas`.
    pub fn with_service(name: &str, replicas: u32) -> Self {
        let mut table = Table::default();
        table.insert(name, replicas);
        Self {
            table: Arc::new(Mutex::new(table)),
        }
    }

    /// Create (or re-create with a fresh id) a service.
    pub async fn insert_service(&self, name: &str, replicas: u32) {
        self.table.lock().await.insert(name, replicas);
    }

    pub async fn remove_service(&self, name: &str) -> bool {
        self.table.lock().await.services.remove(name).is_some()
    }

    /// Change the replica count behind the autoscaler's back.
    pub async fn set_external(&self, name: &str, replicas: u32) {
        if let Some((_, current)) = self.table.lock().await.services.get_mut(name) {
            *current = replicas;
        }
    }

    /// Make the next call fail with `err`. Calls queue up.
    pub async fn fail_next(&self, err: OrchestratorError) {
        self.table.lock().await.injected.push_back(err);
    }

    /// Make the next `set_replica_count` fail with `err`, leaving reads intact.
    pub async fn fail_next_scale(&self, err: OrchestratorError) {
        self.table.lock().await.injected_scale.push_back(err);
    }

    pub async fn replicas(&self, name: &str) -> Option<u32> {
        self.table.lock().await.services.get(name).map(|(_, r)| *r)
    }

    pub async fn scale_requests(&self) -> Vec<u32> {
        self.table.lock().await.scale_requests.clone()
    }
}

impl Orchestrator for InMemoryOrchestrator {
    async fn find_service(&self, name: &str) -> OrchestratorResult<ServiceHandle> {
        let mut table = self.table.lock().await;
        if let Some(err) = table.injected.pop_front() {
            return Err(err);
        }
        table
            .services
            .get(name)
            .map(|(id, _)| ServiceHandle {
                id: id.clone(),
                name: name.to_string(),
            })
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }

    async fn replica_count(&self, service: &ServiceHandle) -> OrchestratorResult<u32> {
        let mut table = self.table.lock().await;
        if let Some(err) = table.injected.pop_front() {
            return Err(err);
        }
        table
            .by_id_mut(&service.id)
            .map(|r| *r)
            .ok_or_else(|| OrchestratorError::NotFound(service.name.clone()))
    }

    async fn set_replica_count(
        &self,
        service: &ServiceHandle,
        replicas: u32,
    ) -> OrchestratorResult<()> {
        let mut table = self.table.lock().await;
        if let Some(err) = table.injected.pop_front() {
            return Err(err);
        }
        if let Some(err) = table.injected_scale.pop_front() {
            return Err(err);
        }
        let current = table
            .by_id_mut(&service.id)
            .ok_or_else(|| OrchestratorError::NotFound(service.name.clone()))?;
        *current = replicas;
        table.scale_requests.push(replicas);
        debug!(service = %service.name, replicas, "in-memory replica count updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_read_and_scale() {
        let orch = InMemoryOrchestrator::with_service("web", 2);

        let svc = orch.find_service("web").await.unwrap();
        assert_eq!(svc.name, "web");
        assert_eq!(orch.replica_count(&svc).await.unwrap(), 2);

        orch.set_replica_count(&svc, 4).await.unwrap();
        assert_eq!(orch.replica_count(&svc).await.unwrap(), 4);
        assert_eq!(orch.scale_requests().await, vec![4]);
    }

    #[tokio::test]
    async fn missing_service_is_not_found() {
        let orch = InMemoryOrchestrator::new();
        let err = orch.find_service("web").await.unwrap_err();
        assert_eq!(err, OrchestratorError::NotFound("web".to_string()));
    }

    #[tokio::test]
    async fn stale_handle_after_recreate() {
        let orch = InMemoryOrchestrator::with_service("web", 2);
        let old = orch.find_service("web").await.unwrap();

        orch.remove_service("web").await;
        orch.insert_service("web", 1).await;

        assert!(matches!(
            orch.replica_count(&old).await,
            Err(OrchestratorError::NotFound(_))
        ));
        let fresh = orch.find_service("web").await.unwrap();
        assert_ne!(fresh.id, old.id);
        assert_eq!(orch.replica_count(&fresh).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn injected_errors_are_consumed_in_order() {
        let orch = InMemoryOrchestrator::with_service("web", 2);
        orch.fail_next(OrchestratorError::Unavailable("down".into())).await;
        orch.fail_next(OrchestratorError::PermissionDenied("nope".into())).await;

        assert!(matches!(
            orch.find_service("web").await,
            Err(OrchestratorError::Unavailable(_))
        ));
        assert!(matches!(
            orch.find_service("web").await,
            Err(OrchestratorError::PermissionDenied(_))
        ));
        assert!(orch.find_service("web").await.is_ok());
    }

    #[tokio::test]
    async fn scale_failure_leaves_reads_working() {
        let orch = InMemoryOrchestrator::with_service("web", 2);
        orch.fail_next_scale(OrchestratorError::Unavailable("timeout".into())).await;

        let svc = orch.find_service("web").await.unwrap();
        assert_eq!(orch.replica_count(&svc).await.unwrap(), 2);
        assert!(orch.set_replica_count(&svc, 3).await.is_err());
        assert_eq!(orch.replicas("web").await, Some(2));
        assert!(orch.scale_requests().await.is_empty());
    }

    #[tokio::test]
    async fn external_changes_are_visible() {
        let orch = InMemoryOrchestrator::with_service("web", 2);
        orch.set_external("web", 7).await;
        let svc = orch.find_service("web").await.unwrap();
        assert_eq!(orch.replica_count(&svc).await.unwrap(), 7);
        assert!(orch.scale_requests().await.is_empty());
    }
}
