//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{FindingRow, NewFindingRow, NewSubTaskRow, NewTaskRow, SubTaskRow, TaskRow},
    schema::{findings, subtasks, tasks},
};
use crate::task::{
    domain::{
        ArtifactLocator, Finding, FindingBody, FindingId, FindingOwner, LogStreamRef, OwnerId,
        PersistedFindingData, PersistedSubTaskData, PersistedTaskData, RollupDecision,
        RollupOutcome, SourceLocator, SubTask, SubTaskId, Task, TaskId, TaskProfile, TaskStatus,
        Variant, decide_rollup,
    },
    ports::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_task_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn store_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()> {
        let task_id = subtask.task_id();
        let new_row = to_subtask_row(subtask)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(subtasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        TaskRepositoryError::NotFound(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let changes = to_task_row(task)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                .set(&changes)
                .execute(connection)?;
            if updated == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_tasks(&self, filter: TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let mut query = tasks::table
                .select(TaskRow::as_select())
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .into_boxed();
            if let Some(module) = filter.module {
                query = query.filter(tasks::module.eq(module.as_str()));
            }
            if let Some(owner) = filter.owner {
                query = query.filter(tasks::owner_id.eq(owner.into_inner()));
            }
            query
                .load::<TaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn delete_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let row = tasks::table
                    .filter(tasks::id.eq(id.into_inner()))
                    .select(TaskRow::as_select())
                    .for_update()
                    .first::<TaskRow>(tx)
                    .optional()?;
                let Some(task_row) = row else {
                    return Ok(None);
                };
                diesel::delete(findings::table.filter(findings::task_id.eq(id.into_inner())))
                    .execute(tx)?;
                diesel::delete(subtasks::table.filter(subtasks::task_id.eq(id.into_inner())))
                    .execute(tx)?;
                diesel::delete(tasks::table.filter(tasks::id.eq(id.into_inner()))).execute(tx)?;
                row_to_task(task_row).map(Some)
            })
        })
        .await
    }

    async fn find_subtask(&self, id: SubTaskId) -> TaskRepositoryResult<Option<SubTask>> {
        self.run_blocking(move |connection| {
            let row = subtasks::table
                .filter(subtasks::id.eq(id.into_inner()))
                .select(SubTaskRow::as_select())
                .first::<SubTaskRow>(connection)
                .optional()?;
            row.map(row_to_subtask).transpose()
        })
        .await
    }

    async fn update_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()> {
        let subtask_id = subtask.id();
        let changes = to_subtask_row(subtask)?;

        self.run_blocking(move |connection| {
            let updated =
                diesel::update(subtasks::table.filter(subtasks::id.eq(subtask_id.into_inner())))
                    .set(&changes)
                    .execute(connection)?;
            if updated == 0 {
                return Err(TaskRepositoryError::SubTaskNotFound(subtask_id));
            }
            Ok(())
        })
        .await
    }

    async fn claim_subtask_completion(
        &self,
        id: SubTaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let persisted_status = subtasks::table
                    .filter(subtasks::id.eq(id.into_inner()))
                    .select(subtasks::status)
                    .for_update()
                    .first::<String>(tx)
                    .optional()?
                    .ok_or(TaskRepositoryError::SubTaskNotFound(id))?;
                let previous = parse_status(&persisted_status)?;
                if previous == TaskStatus::Completed {
                    return Ok(None);
                }
                diesel::update(subtasks::table.filter(subtasks::id.eq(id.into_inner())))
                    .set((
                        subtasks::status.eq(TaskStatus::Completed.as_str()),
                        subtasks::updated_at.eq(now),
                    ))
                    .execute(tx)?;
                Ok(Some(previous))
            })
        })
        .await
    }

    async fn claim_task_completion(
        &self,
        id: TaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let persisted_status = tasks::table
                    .filter(tasks::id.eq(id.into_inner()))
                    .select(tasks::status)
                    .for_update()
                    .first::<String>(tx)
                    .optional()?
                    .ok_or(TaskRepositoryError::NotFound(id))?;
                let previous = parse_status(&persisted_status)?;
                if previous == TaskStatus::Completed {
                    return Ok(None);
                }
                diesel::update(tasks::table.filter(tasks::id.eq(id.into_inner())))
                    .set((
                        tasks::status.eq(TaskStatus::Completed.as_str()),
                        tasks::updated_at.eq(now),
                    ))
                    .execute(tx)?;
                Ok(Some(previous))
            })
        })
        .await
    }

    async fn list_subtasks(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<SubTask>> {
        self.run_blocking(move |connection| {
            subtasks::table
                .filter(subtasks::task_id.eq(task_id.into_inner()))
                .order(subtasks::seq.asc())
                .select(SubTaskRow::as_select())
                .load::<SubTaskRow>(connection)?
                .into_iter()
                .map(row_to_subtask)
                .collect()
        })
        .await
    }

    async fn store_findings(&self, batch: &[Finding]) -> TaskRepositoryResult<()> {
        let rows = batch
            .iter()
            .map(to_finding_row)
            .collect::<TaskRepositoryResult<Vec<_>>>()?;
        if rows.is_empty() {
            return Ok(());
        }

        self.run_blocking(move |connection| {
            diesel::insert_into(findings::table)
                .values(&rows)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        rows.first().map_or_else(
                            || TaskRepositoryError::persistence(err),
                            |row| TaskRepositoryError::NotFound(TaskId::from_uuid(row.task_id)),
                        )
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn list_findings(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Finding>> {
        self.run_blocking(move |connection| {
            findings::table
                .filter(findings::task_id.eq(task_id.into_inner()))
                .order(findings::seq.asc())
                .select(FindingRow::as_select())
                .load::<FindingRow>(connection)?
                .into_iter()
                .map(row_to_finding)
                .collect()
        })
        .await
    }

    async fn update_finding_note(
        &self,
        id: FindingId,
        note: &str,
    ) -> TaskRepositoryResult<Finding> {
        let new_note = note.to_owned();
        self.run_blocking(move |connection| {
            let row = diesel::update(findings::table.filter(findings::id.eq(id.into_inner())))
                .set(findings::note.eq(new_note))
                .returning(FindingRow::as_returning())
                .get_result::<FindingRow>(connection)
                .optional()?
                .ok_or(TaskRepositoryError::FindingNotFound(id))?;
            row_to_finding(row)
        })
        .await
    }

    async fn roll_up(
        &self,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<RollupOutcome> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let persisted_status = tasks::table
                    .filter(tasks::id.eq(task_id.into_inner()))
                    .select(tasks::status)
                    .for_update()
                    .first::<String>(tx)
                    .optional()?
                    .ok_or(TaskRepositoryError::NotFound(task_id))?;
                let previous = parse_status(&persisted_status)?;

                let statuses = subtasks::table
                    .filter(subtasks::task_id.eq(task_id.into_inner()))
                    .select(subtasks::status)
                    .load::<String>(tx)?
                    .iter()
                    .map(String::as_str)
                    .map(parse_status)
                    .collect::<TaskRepositoryResult<Vec<_>>>()?;
                let decision = decide_rollup(statuses);

                if let RollupDecision::Set(status) = decision {
                    diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                        .set((tasks::status.eq(status.as_str()), tasks::updated_at.eq(now)))
                        .execute(tx)?;
                }
                Ok(RollupOutcome {
                    task_id,
                    previous,
                    decision,
                })
            })
        })
        .await
    }
}

fn parse_status(value: &str) -> TaskRepositoryResult<TaskStatus> {
    TaskStatus::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn to_task_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    let profile = serde_json::to_value(task.profile()).map_err(TaskRepositoryError::persistence)?;

    Ok(NewTaskRow {
        id: task.id().into_inner(),
        module: task.module().as_str().to_owned(),
        profile,
        source: task.source().as_str().to_owned(),
        branch: task.branch().map(str::to_owned),
        status: task.status().as_str().to_owned(),
        owner_id: task.owner().map(OwnerId::into_inner),
        artifact: task.artifact().map(|locator| locator.as_str().to_owned()),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        profile: persisted_profile,
        source: persisted_source,
        branch,
        status: persisted_status,
        owner_id,
        artifact,
        created_at,
        updated_at,
        ..
    } = row;

    let profile = serde_json::from_value::<TaskProfile>(persisted_profile)
        .map_err(TaskRepositoryError::persistence)?;
    let source = SourceLocator::new(persisted_source).map_err(TaskRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(id),
        profile,
        source,
        branch,
        status: parse_status(&persisted_status)?,
        owner: owner_id.map(OwnerId::from_uuid),
        artifact: artifact.map(ArtifactLocator::new),
        created_at,
        updated_at,
    }))
}

fn to_subtask_row(subtask: &SubTask) -> TaskRepositoryResult<NewSubTaskRow> {
    let variant =
        serde_json::to_value(subtask.variant()).map_err(TaskRepositoryError::persistence)?;
    let log_stream = subtask.log_stream();

    Ok(NewSubTaskRow {
        id: subtask.id().into_inner(),
        task_id: subtask.task_id().into_inner(),
        variant,
        status: subtask.status().as_str().to_owned(),
        log_group: log_stream.map(|stream| stream.group.clone()),
        log_stream: log_stream.map(|stream| stream.stream.clone()),
        created_at: subtask.created_at(),
        updated_at: subtask.updated_at(),
    })
}

fn row_to_subtask(row: SubTaskRow) -> TaskRepositoryResult<SubTask> {
    let variant =
        serde_json::from_value::<Variant>(row.variant).map_err(TaskRepositoryError::persistence)?;
    let log_stream = row
        .log_group
        .zip(row.log_stream)
        .map(|(group, stream)| LogStreamRef::new(group, stream));

    Ok(SubTask::from_persisted(PersistedSubTaskData {
        id: SubTaskId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        variant,
        status: parse_status(&row.status)?,
        log_stream,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn to_finding_row(finding: &Finding) -> TaskRepositoryResult<NewFindingRow> {
    let body = serde_json::to_value(finding.body()).map_err(TaskRepositoryError::persistence)?;
    let owner = finding.owner();

    Ok(NewFindingRow {
        id: finding.id().into_inner(),
        task_id: owner.task_id().into_inner(),
        subtask_id: owner.subtask_id().map(SubTaskId::into_inner),
        body,
        note: finding.note().to_owned(),
        created_at: finding.created_at(),
    })
}

fn row_to_finding(row: FindingRow) -> TaskRepositoryResult<Finding> {
    let body =
        serde_json::from_value::<FindingBody>(row.body).map_err(TaskRepositoryError::persistence)?;
    let task_id = TaskId::from_uuid(row.task_id);
    let owner = match row.subtask_id {
        Some(subtask) => FindingOwner::SubTask {
            task_id,
            subtask_id: SubTaskId::from_uuid(subtask),
        },
        None => FindingOwner::Task { task_id },
    };

    Ok(Finding::from_persisted(PersistedFindingData {
        id: FindingId::from_uuid(row.id),
        owner,
        body,
        note: row.note,
        created_at: row.created_at,
    }))
}
