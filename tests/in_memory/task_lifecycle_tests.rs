//! End-to-end task flows through the lifecycle service.

use super::helpers::{TaskStack, member, operator, task_stack};
use citool::task::{
    domain::{
        FindingBody, ReportFormat, ReportKind, ResultDocument, ScanModule, SubTaskId, TaskStatus,
        Variant,
    },
    ports::NextStep,
    services::{CreateTaskRequest, Requester, StatusReport, TaskLifecycleError},
};
use rstest::rstest;
use serde_json::json;

fn sast_report() -> ResultDocument {
    ResultDocument {
        format: ReportFormat::Sast,
        body: json!({
            "vulnerabilities": [
                {"message": "Hard-coded password", "severity": "Critical",
                 "location": {"file": "settings.py", "start_line": 3}},
                {"message": "Weak hash", "severity": "High",
                 "location": {"file": "auth.py", "start_line": 19}},
                {"message": "Debug enabled", "severity": "Low",
                 "location": {"file": "settings.py", "start_line": 1}}
            ]
        }),
    }
}

async fn complete(stack: &TaskStack, subtask_id: SubTaskId) -> Result<(), eyre::Report> {
    stack
        .service
        .report_subtask_status(subtask_id, StatusReport::new(TaskStatus::Completed))
        .await
        .map_err(|err| eyre::eyre!("completion report failed: {err}"))?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn scanning_task_runs_from_dispatch_to_dashboard(
    task_stack: TaskStack,
    member: Requester,
) -> Result<(), eyre::Report> {
    let details = task_stack
        .service
        .create_task(
            member,
            CreateTaskRequest::scanning("https://gitlab.com/acme/api.git", "main", "python")
                .with_credentials("ci-bot", "s3cret"),
        )
        .await?;
    let task_id = details.task.id();
    eyre::ensure!(details.subtasks.len() == 2, "expected python and secret subtasks");
    task_stack
        .workspace
        .seed_report(task_id, ReportKind::Sast, sast_report());

    for subtask in &details.subtasks {
        complete(&task_stack, subtask.id()).await?;
    }

    let stored = task_stack.service.get_task(task_id).await?;
    eyre::ensure!(stored.task.status() == TaskStatus::Completed, "task should complete");
    eyre::ensure!(stored.findings.len() == 3, "expected three findings");
    let python = details
        .subtasks
        .iter()
        .find(|subtask| subtask.variant() != Variant::SecretScan)
        .ok_or_else(|| eyre::eyre!("missing python subtask"))?;
    eyre::ensure!(
        stored
            .findings
            .iter()
            .all(|finding| finding.owner().subtask_id() == Some(python.id())),
        "findings should belong to the python subtask"
    );
    eyre::ensure!(
        stored
            .findings
            .iter()
            .all(|finding| matches!(finding.body(), FindingBody::Vulnerability(_))),
        "static findings should be vulnerabilities"
    );
    eyre::ensure!(task_stack.workspace.removed() == vec![task_id], "workspace removed once");
    eyre::ensure!(
        task_stack.worker.notifications()
            == vec![NextStep::CheckAndClone, NextStep::CheckAndScan, NextStep::CheckAndScan],
        "unexpected nudges: {:?}",
        task_stack.worker.notifications()
    );

    let overview = task_stack.service.overview(member).await?;
    eyre::ensure!(overview.sast.count == 1, "one scanning task");
    eyre::ensure!(overview.sast.critical == 1, "one critical finding");
    eyre::ensure!(overview.sast.high_risk == 1, "one high finding");
    eyre::ensure!(overview.repository.sast_repo == 1, "one scanned repository");

    let runs = task_stack.service.recent_runs(member).await?;
    eyre::ensure!(
        runs.iter().map(|run| (run.id, run.status)).collect::<Vec<_>>()
            == vec![(task_id, TaskStatus::Completed)],
        "recent runs should list the completed scan"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cloc_task_completes_at_task_level(
    task_stack: TaskStack,
    member: Requester,
) -> Result<(), eyre::Report> {
    let details = task_stack
        .service
        .create_task(
            member,
            CreateTaskRequest::cloc("https://gitlab.com/acme/api.git", "main")
                .with_credentials("ci-bot", "s3cret"),
        )
        .await?;
    let task_id = details.task.id();
    task_stack.workspace.seed_report(
        task_id,
        ReportKind::Cloc,
        ResultDocument {
            format: ReportFormat::ClocSummary,
            body: json!({
                "header": {"cloc_version": "1.96"},
                "Rust": {"nFiles": 12, "blank": 40, "comment": 25, "code": 900},
                "SUM": {"nFiles": 12, "blank": 40, "comment": 25, "code": 900}
            }),
        },
    );

    let task = task_stack
        .service
        .report_task_status(task_id, StatusReport::new(TaskStatus::Completed))
        .await?;

    eyre::ensure!(task.status() == TaskStatus::Completed, "cloc task should complete");
    eyre::ensure!(task.artifact().is_some(), "detail file should be recorded");
    let stored = task_stack.service.get_task(task_id).await?;
    eyre::ensure!(
        stored
            .findings
            .iter()
            .any(|finding| matches!(finding.body(), FindingBody::LineCount(count) if count.language.as_deref() == Some("Rust"))),
        "expected a Rust line count"
    );
    let link = task_stack.service.artifact_link(task_id).await?;
    eyre::ensure!(link.starts_with("memory://cloc/"), "unexpected link {link}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_tasks_are_gone_for_everyone(
    task_stack: TaskStack,
    member: Requester,
    operator: Requester,
) -> Result<(), eyre::Report> {
    let details = task_stack
        .service
        .create_task(
            member,
            CreateTaskRequest::autotest("https://gitlab.com/acme/web.git", "main", "firefox")
                .with_credentials("ci-bot", "s3cret"),
        )
        .await?;
    let task_id = details.task.id();
    eyre::ensure!(
        task_stack.service.list_tasks(operator, ScanModule::Autotest).await?.len() == 1,
        "superusers see every task"
    );

    task_stack.service.delete_task(task_id).await?;

    eyre::ensure!(
        matches!(
            task_stack.service.get_task(task_id).await,
            Err(TaskLifecycleError::NotFound(_))
        ),
        "deleted task should not load"
    );
    eyre::ensure!(
        task_stack.service.list_tasks(operator, ScanModule::Autotest).await?.is_empty(),
        "deleted task should not be listed"
    );
    Ok(())
}
