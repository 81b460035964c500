//! Completion claims and concurrent rollups against a real database.

use crate::postgres::helpers::{cloc_task, prepare, scanning_task, subtask, test_runtime};
use citool::task::{
    adapters::postgres::PostgresTaskRepository,
    domain::{Language, RollupOutcome, SubTask, SubTaskId, TaskStatus, Variant},
    ports::{TaskRepository, TaskRepositoryError},
};
use chrono::Utc;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;

const POOL_SIZE: u32 = 4;

fn spawn_report(
    repo: &PostgresTaskRepository,
    mut child: SubTask,
    status: TaskStatus,
) -> tokio::task::JoinHandle<RollupOutcome> {
    let repo = repo.clone();
    tokio::spawn(async move {
        child.update_status(status, &DefaultClock);
        repo.update_subtask(&child).await.expect("subtask update");
        repo.roll_up(child.task_id(), Utc::now())
            .await
            .expect("rollup")
    })
}

fn spawn_claim(
    repo: &PostgresTaskRepository,
    id: SubTaskId,
) -> tokio::task::JoinHandle<Option<TaskStatus>> {
    let repo = repo.clone();
    tokio::spawn(async move {
        repo.claim_subtask_completion(id, Utc::now())
            .await
            .expect("claim")
    })
}

#[rstest]
fn concurrent_subtask_claims_succeed_once(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_subtask_claim", POOL_SIZE);
    let task = scanning_task(None);
    let child = subtask(&task, Variant::Language(Language::Python));

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store task");
    rt.block_on(repo.store_subtask(&child)).expect("store subtask");
    let claims = rt.block_on(async {
        let handles: Vec<_> = (0..POOL_SIZE).map(|_| spawn_claim(&repo, child.id())).collect();
        let mut claims = Vec::new();
        for handle in handles {
            claims.push(handle.await.expect("claim should not panic"));
        }
        claims
    });

    assert_eq!(
        claims.iter().filter(|claim| claim.is_some()).count(),
        1,
        "exactly one claim wins: {claims:?}"
    );
    assert!(claims.contains(&Some(TaskStatus::Pending)));
    let stored = rt
        .block_on(repo.find_subtask(child.id()))
        .expect("find")
        .expect("subtask should exist");
    assert_eq!(stored.status(), TaskStatus::Completed);
}

#[rstest]
fn task_claim_reports_the_previous_status(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_task_claim", 1);
    let mut task = cloc_task(None);
    task.set_status(TaskStatus::Running, &DefaultClock);

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store task");

    let first = rt
        .block_on(repo.claim_task_completion(task.id(), Utc::now()))
        .expect("first claim");
    let second = rt
        .block_on(repo.claim_task_completion(task.id(), Utc::now()))
        .expect("second claim");

    assert_eq!(first, Some(TaskStatus::Running));
    assert_eq!(second, None);
    let missing = scanning_task(None);
    assert!(matches!(
        rt.block_on(repo.claim_task_completion(missing.id(), Utc::now())),
        Err(TaskRepositoryError::NotFound(id)) if id == missing.id()
    ));
    assert!(matches!(
        rt.block_on(repo.claim_subtask_completion(SubTaskId::new(), Utc::now())),
        Err(TaskRepositoryError::SubTaskNotFound(_))
    ));
}

#[rstest]
fn concurrent_error_and_completion_roll_up_to_error(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_rollup_race", POOL_SIZE);
    let rt = test_runtime();

    for _ in 0..8 {
        let task = scanning_task(None);
        let php = subtask(&task, Variant::Language(Language::Php));
        let secret = subtask(&task, Variant::SecretScan);
        rt.block_on(repo.store_task(&task)).expect("store task");
        rt.block_on(repo.store_subtask(&php)).expect("store subtask");
        rt.block_on(repo.store_subtask(&secret)).expect("store subtask");

        let outcomes = rt.block_on(async {
            let completed = spawn_report(&repo, php, TaskStatus::Completed);
            let failed = spawn_report(&repo, secret, TaskStatus::Error);
            [
                completed.await.expect("completion should not panic"),
                failed.await.expect("error report should not panic"),
            ]
        });

        assert!(outcomes.iter().all(|outcome| !outcome.completed_now()));
        let stored = rt
            .block_on(repo.find_task(task.id()))
            .expect("find")
            .expect("task should exist");
        assert_eq!(stored.status(), TaskStatus::Error);
    }
}

#[rstest]
fn concurrent_completions_report_completion_once(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_rollup_once", POOL_SIZE);
    let task = scanning_task(None);
    let children: Vec<SubTask> = [
        Variant::Language(Language::Python),
        Variant::Language(Language::Java),
        Variant::SecretScan,
    ]
    .into_iter()
    .map(|variant| subtask(&task, variant))
    .collect();

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store task");
    for child in &children {
        rt.block_on(repo.store_subtask(child)).expect("store subtask");
    }
    let outcomes = rt.block_on(async {
        let handles: Vec<_> = children
            .into_iter()
            .map(|child| spawn_report(&repo, child, TaskStatus::Completed))
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.expect("report should not panic"));
        }
        outcomes
    });

    assert_eq!(
        outcomes.iter().filter(|outcome| outcome.completed_now()).count(),
        1
    );
    let stored = rt
        .block_on(repo.find_task(task.id()))
        .expect("find")
        .expect("task should exist");
    assert_eq!(stored.status(), TaskStatus::Completed);
}
