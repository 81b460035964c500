//! Service harness shared by task service tests.

use std::sync::Arc;

use crate::task::{
    adapters::memory::{
        InMemoryArtifactStore, InMemoryTaskRepository, InMemoryWorkerGateway,
        InMemoryWorkspaceStore,
    },
    domain::{OwnerId, ResultDocument, TaskId},
    ports::{ResultRequest, WorkspaceResult, WorkspaceStore},
    services::{
        CreateTaskRequest, LifecycleSettings, Requester, TaskDetails, TaskGateways,
        TaskLifecycleService,
    },
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::fixture;
use uuid::Uuid;

pub type TestService = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Service wired to recording in-memory collaborators.
pub struct Harness {
    pub service: TestService,
    pub repository: Arc<InMemoryTaskRepository>,
    pub worker: Arc<InMemoryWorkerGateway>,
    pub workspace: Arc<InMemoryWorkspaceStore>,
    pub artifacts: Arc<InMemoryArtifactStore>,
}

#[fixture]
pub fn harness() -> Harness {
    let workspace = Arc::new(InMemoryWorkspaceStore::new());
    wire(workspace.clone(), workspace)
}

/// Harness whose report reads yield to the scheduler before answering, so
/// concurrent callbacks interleave around them.
#[fixture]
pub fn yielding_harness() -> Harness {
    let workspace = Arc::new(InMemoryWorkspaceStore::new());
    wire(
        Arc::new(YieldingWorkspace {
            inner: workspace.clone(),
        }),
        workspace,
    )
}

fn wire(gateway: Arc<dyn WorkspaceStore>, workspace: Arc<InMemoryWorkspaceStore>) -> Harness {
    let repository = Arc::new(InMemoryTaskRepository::new());
    let worker = Arc::new(InMemoryWorkerGateway::new());
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    let service = TaskLifecycleService::new(
        Arc::clone(&repository),
        Arc::new(DefaultClock),
        TaskGateways {
            worker: worker.clone(),
            workspace: gateway,
            artifacts: artifacts.clone(),
        },
        LifecycleSettings::default(),
    );
    Harness {
        service,
        repository,
        worker,
        workspace,
        artifacts,
    }
}

struct YieldingWorkspace {
    inner: Arc<InMemoryWorkspaceStore>,
}

#[async_trait]
impl WorkspaceStore for YieldingWorkspace {
    async fn fetch_result(&self, request: &ResultRequest) -> WorkspaceResult<Option<ResultDocument>> {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        self.inner.fetch_result(request).await
    }

    async fn remove_workspace(&self, task_id: TaskId) -> WorkspaceResult<()> {
        self.inner.remove_workspace(task_id).await
    }
}

#[fixture]
pub fn alice() -> Requester {
    Requester::user(OwnerId::from_uuid(Uuid::from_u128(1)))
}

#[fixture]
pub fn bob() -> Requester {
    Requester::user(OwnerId::from_uuid(Uuid::from_u128(2)))
}

#[fixture]
pub fn admin() -> Requester {
    Requester::superuser(OwnerId::from_uuid(Uuid::from_u128(99)))
}

pub fn scanning_request(languages: &str) -> CreateTaskRequest {
    CreateTaskRequest::scanning("https://gitlab.com/acme/api.git", "main", languages)
        .with_credentials("ci-bot", "s3cret")
}

pub fn autotest_request(browsers: &str) -> CreateTaskRequest {
    CreateTaskRequest::autotest("https://gitlab.com/acme/web.git", "develop", browsers)
        .with_credentials("ci-bot", "s3cret")
}

pub fn cloc_request() -> CreateTaskRequest {
    CreateTaskRequest::cloc("https://gitlab.com/acme/api.git", "main")
        .with_credentials("ci-bot", "s3cret")
}

pub async fn create(harness: &Harness, requester: Requester, request: CreateTaskRequest) -> TaskDetails {
    harness
        .service
        .create_task(requester, request)
        .await
        .expect("task creation should succeed")
}
