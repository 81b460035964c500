//! Shared database setup and record builders for `PostgreSQL` tests.

use citool::task::{
    adapters::postgres::{PostgresTaskRepository, TaskPgPool},
    domain::{
        ClocComparison, Finding, FindingBody, FindingOwner, GitEngine, OwnerId, ScanRunType,
        SourceLocator, SubTask, Task, TaskDraft, TaskProfile, Variant, Vulnerability,
    },
};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema shipped with the crate.
const CREATE_TASKS_SQL: &str = include_str!("../../migrations/2024-06-01-000000_create_tasks/up.sql");

/// Template database name for pre-migrated schema.
const TEMPLATE_DB: &str = "citool_test_template";

/// Creates a tokio runtime for async operations in tests.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            execute_sql_statements(&mut conn, CREATE_TASKS_SQL)?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Runs each `;`-separated statement of `sql`; `diesel::sql_query` accepts
/// one statement per call.
fn execute_sql_statements(conn: &mut PgConnection, sql: &str) -> eyre::Result<()> {
    for statement in sql.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() || trimmed.lines().all(|line| line.trim().starts_with("--")) {
            continue;
        }
        diesel::sql_query(trimmed)
            .execute(conn)
            .map_err(|e| eyre::eyre!("SQL error: {e}\nStatement: {trimmed}"))?;
    }
    Ok(())
}

/// Creates `db_name` from the template and returns a repository over a pool
/// of `pool_size` connections.
pub fn setup_repository(
    cluster: &TestCluster,
    db_name: &str,
    pool_size: u32,
) -> Result<PostgresTaskRepository, BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool: TaskPgPool = Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(PostgresTaskRepository::new(pool))
}

/// Prepares a fresh database named after `prefix` and returns the repository
/// with the guard that drops the database.
pub fn prepare<'a>(
    cluster: &'a TestCluster,
    prefix: &str,
    pool_size: u32,
) -> (CleanupGuard<'a>, PostgresTaskRepository) {
    ensure_template(cluster).expect("template setup");
    let db_name = format!("{prefix}_{}", uuid::Uuid::new_v4().simple());
    let guard = CleanupGuard::new(cluster, db_name.clone());
    let repo = setup_repository(cluster, &db_name, pool_size).expect("repository setup");
    (guard, repo)
}

/// Guard that ensures test database cleanup runs even if test panics.
pub struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Scanning task on a Bitbucket repository.
pub fn scanning_task(owner: Option<OwnerId>) -> Task {
    Task::new(
        TaskDraft {
            profile: TaskProfile::Scanning {
                git_engine: GitEngine::Bitbucket,
                run_type: ScanRunType::Sast,
                exclude_path: Some("vendor".to_owned()),
            },
            source: SourceLocator::new("https://bitbucket.org/acme/api.git")
                .expect("valid locator"),
            branch: Some("main".to_owned()),
            owner,
        },
        &DefaultClock,
    )
}

/// Line-count task without a revision comparison.
pub fn cloc_task(owner: Option<OwnerId>) -> Task {
    Task::new(
        TaskDraft {
            profile: TaskProfile::Cloc {
                include_lang: "*".to_owned(),
                exclude_dir: "target".to_owned(),
                comparison: ClocComparison::default(),
            },
            source: SourceLocator::new("https://gitlab.com/acme/api.git").expect("valid locator"),
            branch: Some("main".to_owned()),
            owner,
        },
        &DefaultClock,
    )
}

/// New subtask of `task` for `variant`.
pub fn subtask(task: &Task, variant: Variant) -> SubTask {
    SubTask::new(task.id(), variant, &DefaultClock)
}

/// Vulnerability finding owned by `subtask`.
pub fn vulnerability(subtask: &SubTask, message: &str) -> Finding {
    Finding::new(
        FindingOwner::SubTask {
            task_id: subtask.task_id(),
            subtask_id: subtask.id(),
        },
        FindingBody::Vulnerability(Vulnerability {
            message: Some(message.to_owned()),
            severity: Some("High".to_owned()),
            ..Vulnerability::default()
        }),
        &DefaultClock,
    )
}
