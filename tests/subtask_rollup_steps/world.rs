//! Shared world state for subtask rollup BDD scenarios.

use std::sync::Arc;

use citool::task::{
    adapters::memory::{
        InMemoryArtifactStore, InMemoryTaskRepository, InMemoryWorkerGateway,
        InMemoryWorkspaceStore,
    },
    domain::OwnerId,
    services::{
        LifecycleSettings, Requester, SubTaskCompletion, TaskDetails, TaskGateways,
        TaskLifecycleError, TaskLifecycleService,
    },
};
use mockable::DefaultClock;
use rstest::fixture;
use uuid::Uuid;

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Scenario world for rollup behaviour tests.
pub struct RollupWorld {
    pub service: TestTaskService,
    pub worker: Arc<InMemoryWorkerGateway>,
    pub workspace: Arc<InMemoryWorkspaceStore>,
    pub requester: Requester,
    pub details: Option<TaskDetails>,
    pub last_report: Option<Result<SubTaskCompletion, TaskLifecycleError>>,
}

impl RollupWorld {
    /// Creates a world with no task yet.
    #[must_use]
    pub fn new() -> Self {
        let worker = Arc::new(InMemoryWorkerGateway::new());
        let workspace = Arc::new(InMemoryWorkspaceStore::new());
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(DefaultClock),
            TaskGateways {
                worker: worker.clone(),
                workspace: workspace.clone(),
                artifacts: Arc::new(InMemoryArtifactStore::new()),
            },
            LifecycleSettings::default(),
        );

        Self {
            service,
            worker,
            workspace,
            requester: Requester::user(OwnerId::from_uuid(Uuid::from_u128(42))),
            details: None,
            last_report: None,
        }
    }

    /// Returns the task created by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been created yet.
    pub fn details(&self) -> Result<&TaskDetails, eyre::Report> {
        self.details
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))
    }
}

impl Default for RollupWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RollupWorld {
    RollupWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
