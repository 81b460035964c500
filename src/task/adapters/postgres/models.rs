//! Diesel row models for task persistence.

use super::schema::{findings, subtasks, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Module tag.
    pub module: String,
    /// Module attributes.
    pub profile: Value,
    /// Source locator.
    pub source: String,
    /// Branch or ref.
    pub branch: Option<String>,
    /// Status.
    pub status: String,
    /// Owning user.
    pub owner_id: Option<uuid::Uuid>,
    /// Artifact object key.
    pub artifact: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for task records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Module tag.
    pub module: String,
    /// Module attributes.
    pub profile: Value,
    /// Source locator.
    pub source: String,
    /// Branch or ref.
    pub branch: Option<String>,
    /// Status.
    pub status: String,
    /// Owning user.
    pub owner_id: Option<uuid::Uuid>,
    /// Artifact object key.
    pub artifact: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for subtask records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subtasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubTaskRow {
    /// Subtask identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Variant discriminator.
    pub variant: Value,
    /// Status.
    pub status: String,
    /// Worker log group.
    pub log_group: Option<String>,
    /// Worker log stream.
    pub log_stream: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for subtask records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = subtasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewSubTaskRow {
    /// Subtask identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Variant discriminator.
    pub variant: Value,
    /// Status.
    pub status: String,
    /// Worker log group.
    pub log_group: Option<String>,
    /// Worker log stream.
    pub log_stream: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for finding records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = findings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FindingRow {
    /// Finding identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Owning subtask.
    pub subtask_id: Option<uuid::Uuid>,
    /// Structured content.
    pub body: Value,
    /// User note.
    pub note: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for finding records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = findings)]
pub struct NewFindingRow {
    /// Finding identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Owning subtask.
    pub subtask_id: Option<uuid::Uuid>,
    /// Structured content.
    pub body: Value,
    /// User note.
    pub note: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
