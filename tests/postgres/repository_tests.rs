//! Storage, lookup and deletion tests for `PostgresTaskRepository`.

use crate::postgres::helpers::{
    cloc_task, prepare, scanning_task, subtask, test_runtime, vulnerability,
};
use citool::task::{
    domain::{
        ArtifactLocator, Browser, FindingId, Language, OwnerId, ScanModule, SubTaskId, TaskId,
        TaskStatus, Variant,
    },
    ports::{TaskFilter, TaskRepository, TaskRepositoryError},
};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;
use uuid::Uuid;

#[rstest]
fn stored_task_is_found_with_its_attributes(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_store_task", 1);
    let owner = OwnerId::from_uuid(Uuid::new_v4());
    let task = scanning_task(Some(owner));

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store should succeed");
    let found = rt
        .block_on(repo.find_task(task.id()))
        .expect("find should succeed")
        .expect("task should exist");

    assert_eq!(found.id(), task.id());
    assert_eq!(found.profile(), task.profile());
    assert_eq!(found.source(), task.source());
    assert_eq!(found.branch(), Some("main"));
    assert_eq!(found.owner(), Some(owner));
    assert_eq!(found.status(), TaskStatus::Pending);
    assert_eq!(
        found.created_at().timestamp_micros(),
        task.created_at().timestamp_micros()
    );
}

#[rstest]
fn duplicate_task_is_rejected(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_duplicate_task", 1);
    let task = scanning_task(None);

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("first store");
    let result = rt.block_on(repo.store_task(&task));

    assert!(matches!(result, Err(TaskRepositoryError::DuplicateTask(id)) if id == task.id()));
}

#[rstest]
fn missing_records_map_to_not_found(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_missing", 1);
    let orphan_task = scanning_task(None);
    let orphan = subtask(&orphan_task, Variant::SecretScan);

    let rt = test_runtime();
    assert!(
        rt.block_on(repo.find_task(TaskId::new()))
            .expect("query ok")
            .is_none()
    );
    assert!(matches!(
        rt.block_on(repo.store_subtask(&orphan)),
        Err(TaskRepositoryError::NotFound(id)) if id == orphan_task.id()
    ));
    assert!(matches!(
        rt.block_on(repo.update_task(&orphan_task)),
        Err(TaskRepositoryError::NotFound(_))
    ));
    assert!(matches!(
        rt.block_on(repo.update_subtask(&orphan)),
        Err(TaskRepositoryError::SubTaskNotFound(_))
    ));
    assert!(matches!(
        rt.block_on(repo.store_findings(&[vulnerability(&orphan, "orphan")])),
        Err(TaskRepositoryError::NotFound(id)) if id == orphan_task.id()
    ));
    let missing_finding = FindingId::new();
    assert!(matches!(
        rt.block_on(repo.update_finding_note(missing_finding, "n/a")),
        Err(TaskRepositoryError::FindingNotFound(id)) if id == missing_finding
    ));
}

#[rstest]
fn task_updates_persist_status_and_artifact(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_update_task", 1);
    let mut task = cloc_task(None);

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store");
    task.set_status(TaskStatus::Completed, &DefaultClock);
    task.record_artifact(
        ArtifactLocator::new(format!("cloc/{}/cloc_detail.csv", task.id())),
        &DefaultClock,
    )
    .expect("first artifact");
    rt.block_on(repo.update_task(&task)).expect("update");

    let found = rt
        .block_on(repo.find_task(task.id()))
        .expect("find")
        .expect("task should exist");
    assert_eq!(found.status(), TaskStatus::Completed);
    assert_eq!(found.artifact(), task.artifact());
}

#[rstest]
fn listing_filters_by_module_and_owner_newest_first(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_list_tasks", 1);
    let alice = OwnerId::from_uuid(Uuid::new_v4());
    let bob = OwnerId::from_uuid(Uuid::new_v4());
    let tasks = [
        scanning_task(Some(alice)),
        cloc_task(Some(alice)),
        scanning_task(Some(bob)),
        scanning_task(Some(alice)),
    ];

    let rt = test_runtime();
    for task in &tasks {
        rt.block_on(repo.store_task(task)).expect("store");
    }
    let listed = rt
        .block_on(repo.list_tasks(TaskFilter {
            module: Some(ScanModule::Scanning),
            owner: Some(alice),
        }))
        .expect("list");

    assert_eq!(listed.len(), 2);
    assert!(
        listed
            .iter()
            .all(|task| task.module() == ScanModule::Scanning && task.owner() == Some(alice))
    );
    assert!(
        listed
            .windows(2)
            .all(|pair| matches!(pair, [newer, older] if newer.created_at() >= older.created_at()))
    );
    let everything = rt
        .block_on(repo.list_tasks(TaskFilter::default()))
        .expect("list");
    assert_eq!(everything.len(), tasks.len());
}

#[rstest]
fn subtasks_and_findings_keep_insertion_order(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_order", 1);
    let task = scanning_task(None);
    let variants = [
        Variant::Language(Language::Python),
        Variant::Language(Language::Php),
        Variant::SecretScan,
    ];
    let subtasks: Vec<_> = variants.iter().map(|variant| subtask(&task, *variant)).collect();

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store task");
    for child in &subtasks {
        rt.block_on(repo.store_subtask(child)).expect("store subtask");
    }
    let first = subtasks.first().expect("three subtasks");
    let last = subtasks.last().expect("three subtasks");
    let findings = [
        vulnerability(last, "Hard-coded token"),
        vulnerability(first, "SQL injection"),
        vulnerability(first, "Open redirect"),
    ];
    rt.block_on(repo.store_findings(&findings)).expect("store findings");

    let listed: Vec<SubTaskId> = rt
        .block_on(repo.list_subtasks(task.id()))
        .expect("list subtasks")
        .iter()
        .map(|child| child.id())
        .collect();
    let expected: Vec<SubTaskId> = subtasks.iter().map(|child| child.id()).collect();
    assert_eq!(listed, expected);

    let stored: Vec<FindingId> = rt
        .block_on(repo.list_findings(task.id()))
        .expect("list findings")
        .iter()
        .map(|finding| finding.id())
        .collect();
    let inserted: Vec<FindingId> = findings.iter().map(|finding| finding.id()).collect();
    assert_eq!(stored, inserted);
}

#[rstest]
fn finding_note_is_replaced(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_note", 1);
    let task = scanning_task(None);
    let child = subtask(&task, Variant::SecretScan);
    let finding = vulnerability(&child, "Hard-coded token");

    let rt = test_runtime();
    rt.block_on(repo.store_task(&task)).expect("store task");
    rt.block_on(repo.store_subtask(&child)).expect("store subtask");
    rt.block_on(repo.store_findings(std::slice::from_ref(&finding)))
        .expect("store finding");

    let updated = rt
        .block_on(repo.update_finding_note(finding.id(), "false positive"))
        .expect("note update");
    assert_eq!(updated.note(), "false positive");
    let listed = rt.block_on(repo.list_findings(task.id())).expect("list");
    assert_eq!(
        listed.first().map(|stored| stored.note().to_owned()),
        Some("false positive".to_owned())
    );
}

#[rstest]
fn deleting_a_task_removes_subtasks_and_findings(shared_test_cluster: &'static TestCluster) {
    let (_guard, repo) = prepare(shared_test_cluster, "test_cascade", 1);
    let task = scanning_task(None);
    let survivor = cloc_task(None);
    let other_task = scanning_task(None);
    let child = subtask(&task, Variant::Language(Language::Java));
    let other_child = subtask(&other_task, Variant::Browser(Browser::Chrome));

    let rt = test_runtime();
    for stored in [&task, &survivor, &other_task] {
        rt.block_on(repo.store_task(stored)).expect("store task");
    }
    rt.block_on(repo.store_subtask(&child)).expect("store subtask");
    rt.block_on(repo.store_subtask(&other_child)).expect("store subtask");
    rt.block_on(repo.store_findings(&[vulnerability(&child, "XXE"), vulnerability(&other_child, "XSS")]))
        .expect("store findings");

    let removed = rt
        .block_on(repo.delete_task(task.id()))
        .expect("delete")
        .expect("task existed");
    assert_eq!(removed.id(), task.id());

    assert!(rt.block_on(repo.find_task(task.id())).expect("find").is_none());
    assert!(rt.block_on(repo.find_subtask(child.id())).expect("find").is_none());
    assert!(rt.block_on(repo.list_findings(task.id())).expect("list").is_empty());
    assert!(rt.block_on(repo.delete_task(task.id())).expect("delete").is_none());

    assert!(rt.block_on(repo.find_task(survivor.id())).expect("find").is_some());
    assert!(rt.block_on(repo.find_subtask(other_child.id())).expect("find").is_some());
    assert_eq!(
        rt.block_on(repo.list_findings(other_task.id())).expect("list").len(),
        1
    );
}
