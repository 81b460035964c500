//! Schedules provisioned in memory and the scans their triggers start.

use std::sync::Arc;

use super::helpers::{TaskStack, member, task_stack};
use citool::config::CitoolConfig;
use citool::schedule::{
    adapters::memory::{InMemoryScheduleGateway, InMemoryScheduleRepository},
    services::{CreateScheduleRequest, ScheduleService, scheduled_task_request},
};
use citool::task::{domain::TaskStatus, services::Requester};
use mockable::DefaultClock;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fired_trigger_dispatches_a_scan_with_the_stored_secret(
    task_stack: TaskStack,
    member: Requester,
) -> Result<(), eyre::Report> {
    let config = CitoolConfig::from_toml_str("[secrets]\nprefix = \"/citool/schedules/\"")?;
    let gateway = Arc::new(InMemoryScheduleGateway::new());
    let schedules = ScheduleService::new(
        Arc::new(InMemoryScheduleRepository::new()),
        Arc::new(DefaultClock),
        gateway.clone(),
        config.secrets.prefix,
    );
    let schedule = schedules
        .create_schedule(
            member,
            CreateScheduleRequest::new("https://github.com/acme/api.git", "main", "golang", "06:15")
                .with_credentials("ci-bot", "hunter2")
                .with_git_engine("github")
                .with_day_of_week("MON,TUE,WED,THU,FRI"),
        )
        .await?;

    let trigger = gateway
        .trigger(schedule.id())
        .ok_or_else(|| eyre::eyre!("trigger should be registered"))?;
    eyre::ensure!(
        trigger.expression == "cron(15 06 ? * MON,TUE,WED,THU,FRI *)",
        "unexpected expression {}",
        trigger.expression
    );
    let secret_name = format!("/citool/schedules/{}", schedule.id());
    let password = gateway
        .secret(&secret_name)
        .ok_or_else(|| eyre::eyre!("secret {secret_name} should be stored"))?;

    let (requester, request) = scheduled_task_request(&trigger.payload, &password);
    let details = task_stack.service.create_task(requester, request).await?;

    eyre::ensure!(details.task.status() == TaskStatus::Pending, "scan should be pending");
    eyre::ensure!(details.task.owner() == Some(member.user), "scan runs as the owner");
    let payload = task_stack
        .worker
        .enqueued()
        .pop()
        .ok_or_else(|| eyre::eyre!("scan should be enqueued"))?;
    eyre::ensure!(payload.git_password.as_deref() == Some("hunter2"), "secret reaches the worker");
    eyre::ensure!(payload.languages.as_deref() == Some("golang,secret"), "secret scan is added");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_schedule_releases_its_trigger(member: Requester) -> Result<(), eyre::Report> {
    let gateway = Arc::new(InMemoryScheduleGateway::new());
    let schedules = ScheduleService::new(
        Arc::new(InMemoryScheduleRepository::new()),
        Arc::new(DefaultClock),
        gateway.clone(),
        CitoolConfig::default().secrets.prefix,
    );
    let schedule = schedules
        .create_schedule(
            member,
            CreateScheduleRequest::new("https://gitlab.com/acme/api.git", "main", "python", "00:00")
                .with_credentials("ci-bot", "s3cret")
                .with_date("2099-12-31"),
        )
        .await?;

    schedules.delete_schedule(schedule.id()).await?;

    eyre::ensure!(gateway.trigger(schedule.id()).is_none(), "trigger should be removed");
    eyre::ensure!(
        schedules.list_schedules(member).await?.is_empty(),
        "schedule should be removed"
    );
    Ok(())
}
