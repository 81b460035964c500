//! Shared wiring for in-memory integration tests.

use std::sync::Arc;

use citool::task::{
    adapters::memory::{
        InMemoryArtifactStore, InMemoryTaskRepository, InMemoryWorkerGateway,
        InMemoryWorkspaceStore,
    },
    domain::OwnerId,
    services::{LifecycleSettings, Requester, TaskGateways, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;
use uuid::Uuid;

/// Task service type used by integration tests.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Task service plus handles to its recording collaborators.
pub struct TaskStack {
    pub service: TestTaskService,
    pub worker: Arc<InMemoryWorkerGateway>,
    pub workspace: Arc<InMemoryWorkspaceStore>,
    pub artifacts: Arc<InMemoryArtifactStore>,
}

/// Provides a task service wired to in-memory adapters.
#[fixture]
pub fn task_stack() -> TaskStack {
    let worker = Arc::new(InMemoryWorkerGateway::new());
    let workspace = Arc::new(InMemoryWorkspaceStore::new());
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    let service = TaskLifecycleService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(DefaultClock),
        TaskGateways {
            worker: worker.clone(),
            workspace: workspace.clone(),
            artifacts: artifacts.clone(),
        },
        LifecycleSettings::default(),
    );
    TaskStack {
        service,
        worker,
        workspace,
        artifacts,
    }
}

/// Provides an ordinary user.
#[fixture]
pub fn member() -> Requester {
    Requester::user(OwnerId::from_uuid(Uuid::from_u128(0x100)))
}

/// Provides a superuser.
#[fixture]
pub fn operator() -> Requester {
    Requester::superuser(OwnerId::from_uuid(Uuid::from_u128(0x900)))
}
