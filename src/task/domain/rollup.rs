//! Status rollup from subtasks to their parent task.

use super::{TaskId, TaskStatus};

/// What a rollup does to the parent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupDecision {
    /// Leave the task untouched: no subtasks, or some are still pending.
    Hold,
    /// Write this status to the task.
    Set(TaskStatus),
}

/// Computes the parent status from its subtasks' statuses.
///
/// Precedence, first match wins: any `ERROR`, any `RUNNING`, any `PENDING`
/// (hold), otherwise `COMPLETED`. An empty set holds.
///
/// # Examples
///
/// ```
/// use citool::task::domain::{RollupDecision, TaskStatus, decide_rollup};
///
/// let decision = decide_rollup([TaskStatus::Completed, TaskStatus::Error]);
/// assert_eq!(decision, RollupDecision::Set(TaskStatus::Error));
/// assert_eq!(decide_rollup([]), RollupDecision::Hold);
/// ```
#[must_use]
pub fn decide_rollup(statuses: impl IntoIterator<Item = TaskStatus>) -> RollupDecision {
    let mut seen_any = false;
    let mut running = false;
    let mut pending = false;
    for status in statuses {
        seen_any = true;
        match status {
            TaskStatus::Error => return RollupDecision::Set(TaskStatus::Error),
            TaskStatus::Running => running = true,
            TaskStatus::Pending => pending = true,
            TaskStatus::Completed => {}
        }
    }

    if running {
        RollupDecision::Set(TaskStatus::Running)
    } else if pending || !seen_any {
        RollupDecision::Hold
    } else {
        RollupDecision::Set(TaskStatus::Completed)
    }
}

/// Result of applying a rollup to a stored task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupOutcome {
    /// Task the rollup ran for.
    pub task_id: TaskId,
    /// Status before the rollup.
    pub previous: TaskStatus,
    /// Decision taken.
    pub decision: RollupDecision,
}

impl RollupOutcome {
    /// Status after the rollup.
    #[must_use]
    pub const fn current(&self) -> TaskStatus {
        match self.decision {
            RollupDecision::Hold => self.previous,
            RollupDecision::Set(status) => status,
        }
    }

    /// Returns `true` when this rollup moved the task into `COMPLETED`.
    ///
    /// Cleanup keyed on this flag runs once per task even when completion
    /// callbacks are delivered more than once.
    #[must_use]
    pub fn completed_now(&self) -> bool {
        self.previous != TaskStatus::Completed
            && self.decision == RollupDecision::Set(TaskStatus::Completed)
    }
}
