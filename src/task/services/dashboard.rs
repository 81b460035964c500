//! Cross-module dashboard summaries.

use super::lifecycle::{Requester, TaskLifecycleResult, TaskLifecycleService};
use crate::task::{
    domain::{
        Finding, OwnerId, SEVERITY_CRITICAL, SEVERITY_HIGH, ScanModule, Task, TaskId, TaskProfile,
        TaskStatus,
    },
    ports::{TaskFilter, TaskRepository},
};
use mockable::Clock;
use std::collections::BTreeSet;

/// Maximum number of rows in the recent-runs feed.
pub const RECENT_RUN_LIMIT: usize = 10;

const RECENT_RUN_MODULES: [ScanModule; 3] = [ScanModule::Scanning, ScanModule::Dast, ScanModule::Cloc];
const CREATED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the recent-runs feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentRun {
    /// Task identifier.
    pub id: TaskId,
    /// `SAST`, `DAST` or `CLOC`.
    pub scan_type: &'static str,
    /// Git URL or target URL.
    pub url: String,
    /// Scanned branch, `-` when the module has none.
    pub branch: String,
    /// Creation time formatted as `YYYY-MM-DD HH:MM:SS`.
    pub created_time: String,
    /// Current status.
    pub status: TaskStatus,
    /// Owning user.
    pub owner: Option<OwnerId>,
}

impl RecentRun {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id(),
            scan_type: scan_type(task.module()),
            url: task.source().to_string(),
            branch: task.branch().unwrap_or("-").to_owned(),
            created_time: task.created_at().format(CREATED_TIME_FORMAT).to_string(),
            status: task.status(),
            owner: task.owner(),
        }
    }
}

const fn scan_type(module: ScanModule) -> &'static str {
    match module {
        ScanModule::Scanning => "SAST",
        ScanModule::Dast => "DAST",
        ScanModule::Cloc => "CLOC",
        ScanModule::Autotest => "SELENIUM",
    }
}

/// Distinct repositories across scanning and cloc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryCounts {
    /// Distinct repositories in either module.
    pub count: usize,
    /// Distinct repositories with a scanning task.
    pub sast_repo: usize,
    /// Distinct repositories with a cloc task.
    pub cloc_repo: usize,
}

/// Task and severity counts of a security module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    /// Number of tasks.
    pub count: usize,
    /// Findings with `Critical` severity.
    pub critical: usize,
    /// Findings with `High` severity.
    pub high_risk: usize,
}

/// Cloc task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClocCounts {
    /// Number of tasks.
    pub count: usize,
    /// Tasks comparing two branches or two commits.
    pub compared: usize,
    /// Plain counts.
    pub other: usize,
}

/// Aggregate counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    /// Repository counters.
    pub repository: RepositoryCounts,
    /// Static analysis counters.
    pub sast: SeverityCounts,
    /// Dynamic scan counters.
    pub dast: SeverityCounts,
    /// Code-line count counters.
    pub cloc: ClocCounts,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Returns the newest scanning, dast and cloc runs visible to `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when a lookup fails.
    pub async fn recent_runs(&self, viewer: Requester) -> TaskLifecycleResult<Vec<RecentRun>> {
        let mut runs: Vec<Task> = Vec::new();
        for module in RECENT_RUN_MODULES {
            let tasks = self.visible_tasks(viewer, module).await?;
            runs.extend(tasks.into_iter().take(RECENT_RUN_LIMIT));
        }
        runs.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(runs
            .iter()
            .take(RECENT_RUN_LIMIT)
            .map(RecentRun::from_task)
            .collect())
    }

    /// Computes the dashboard counters for the tasks visible to `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::Repository`] when a lookup fails.
    pub async fn overview(&self, viewer: Requester) -> TaskLifecycleResult<Overview> {
        let sast_tasks = self.visible_tasks(viewer, ScanModule::Scanning).await?;
        let dast_tasks = self.visible_tasks(viewer, ScanModule::Dast).await?;
        let cloc_tasks = self.visible_tasks(viewer, ScanModule::Cloc).await?;

        let sast_repos: BTreeSet<&str> = sast_tasks.iter().map(|task| task.source().as_str()).collect();
        let cloc_repos: BTreeSet<&str> = cloc_tasks.iter().map(|task| task.source().as_str()).collect();
        let repository = RepositoryCounts {
            count: sast_repos.union(&cloc_repos).count(),
            sast_repo: sast_repos.len(),
            cloc_repo: cloc_repos.len(),
        };

        let compared = cloc_tasks
            .iter()
            .filter(|task| {
                matches!(task.profile(), TaskProfile::Cloc { comparison, .. } if comparison.is_comparison())
            })
            .count();

        Ok(Overview {
            repository,
            sast: self.severity_counts(&sast_tasks, true).await?,
            dast: self.severity_counts(&dast_tasks, false).await?,
            cloc: ClocCounts {
                count: cloc_tasks.len(),
                compared,
                other: cloc_tasks.len().saturating_sub(compared),
            },
        })
    }

    async fn visible_tasks(
        &self,
        viewer: Requester,
        module: ScanModule,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let filter = TaskFilter {
            module: Some(module),
            owner: viewer.owner_scope(),
        };
        Ok(self.repository.list_tasks(filter).await?)
    }

    async fn severity_counts(
        &self,
        tasks: &[Task],
        subtask_findings: bool,
    ) -> TaskLifecycleResult<SeverityCounts> {
        let mut counts = SeverityCounts {
            count: tasks.len(),
            ..SeverityCounts::default()
        };
        for task in tasks {
            let findings = self.repository.list_findings(task.id()).await?;
            let relevant = findings
                .iter()
                .filter(|finding| finding.owner().subtask_id().is_some() == subtask_findings);
            for finding in relevant {
                tally(&mut counts, finding);
            }
        }
        Ok(counts)
    }
}

fn tally(counts: &mut SeverityCounts, finding: &Finding) {
    match finding.severity() {
        Some(SEVERITY_CRITICAL) => counts.critical += 1,
        Some(SEVERITY_HIGH) => counts.high_risk += 1,
        _ => {}
    }
}
