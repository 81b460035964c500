//! Dispatch message handed to external workers.

use super::{
    ClocComparison, GitCredentials, SourceLocator, SubTask, Task, TaskDomainError, TaskProfile,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Placeholder workers expect for absent cloc comparison fields.
pub const ABSENT_FIELD: &str = "None";

/// Message submitted to the worker queue (or invoked directly for dast).
///
/// Field names follow the worker contract, so keys are flattened and
/// lower-cased.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// Task identifier.
    #[serde(rename = "recordid")]
    pub record_id: String,
    /// Module type tag (`SAST`, `SELENIUM`, `CLOC`, `DAST`).
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Comma-joined subtask identifiers, in creation order.
    #[serde(rename = "taskids", skip_serializing_if = "Option::is_none")]
    pub subtask_ids: Option<String>,
    /// Git URL.
    #[serde(rename = "giturl", skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    /// Git user.
    #[serde(rename = "gituser", skip_serializing_if = "Option::is_none")]
    pub git_user: Option<String>,
    /// Git password.
    #[serde(rename = "gitpassword", skip_serializing_if = "Option::is_none")]
    pub git_password: Option<String>,
    /// Repository name derived from the git URL.
    #[serde(rename = "repository", skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Branch or ref to check out.
    #[serde(rename = "gitbranch", skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Comma-joined scanning variants, secret scan included.
    #[serde(rename = "language", skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    /// Comma-joined autotest browsers.
    #[serde(rename = "browsers", skip_serializing_if = "Option::is_none")]
    pub browsers: Option<String>,
    /// Exclude paths for static analysis.
    #[serde(rename = "excludepath", skip_serializing_if = "Option::is_none")]
    pub exclude_path: Option<String>,
    /// Languages counted by cloc.
    #[serde(rename = "includelang", skip_serializing_if = "Option::is_none")]
    pub include_lang: Option<String>,
    /// Directories excluded by cloc.
    #[serde(rename = "excludedir", skip_serializing_if = "Option::is_none")]
    pub exclude_dir: Option<String>,
    /// First cloc comparison commit.
    #[serde(rename = "commitid1", skip_serializing_if = "Option::is_none")]
    pub commit_id1: Option<String>,
    /// Second cloc comparison commit.
    #[serde(rename = "commitid2", skip_serializing_if = "Option::is_none")]
    pub commit_id2: Option<String>,
    /// First cloc comparison branch.
    #[serde(rename = "comparedbranch1", skip_serializing_if = "Option::is_none")]
    pub compared_branch1: Option<String>,
    /// Second cloc comparison branch.
    #[serde(rename = "comparedbranch2", skip_serializing_if = "Option::is_none")]
    pub compared_branch2: Option<String>,
    /// Dast target URL.
    #[serde(rename = "targeturl", skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// Dast full-scan flag.
    #[serde(rename = "fullscan", skip_serializing_if = "Option::is_none")]
    pub full_scan: Option<bool>,
    /// Dast start path.
    #[serde(rename = "dastpath", skip_serializing_if = "Option::is_none")]
    pub dast_path: Option<String>,
    /// Dast scan definition file.
    #[serde(rename = "filename", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Header token forwarded to the dast target.
    #[serde(rename = "header_token", skip_serializing_if = "Option::is_none")]
    pub header_token: Option<String>,
}

/// Extra inputs needed to build a payload that are not stored on the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchInputs<'a> {
    /// Git credentials (git modules only).
    pub credentials: Option<&'a GitCredentials>,
    /// Exclude paths always appended for static analysis.
    pub default_exclude_paths: &'a str,
    /// Header token for dast targets.
    pub header_token: Option<&'a str>,
}

impl DispatchPayload {
    /// Builds the worker payload for `task` and its `subtasks`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidSourceLocator`] when a git module's
    /// URL yields no repository name, and [`TaskDomainError::MissingField`]
    /// when git credentials or the branch are absent.
    pub fn build(
        task: &Task,
        subtasks: &[SubTask],
        inputs: DispatchInputs<'_>,
    ) -> Result<Self, TaskDomainError> {
        let mut payload = Self {
            record_id: task.id().to_string(),
            type_tag: task.module().type_tag().to_owned(),
            ..Self::default()
        };

        match task.profile() {
            TaskProfile::Dast {
                full_scan,
                dast_path,
                filename,
            } => {
                payload.target_url = Some(task.source().as_str().to_owned());
                payload.full_scan = Some(*full_scan);
                payload.dast_path.clone_from(dast_path);
                payload.filename = Some(filename.clone().unwrap_or_default());
                payload.header_token = inputs.header_token.map(str::to_owned);
                return Ok(payload);
            }
            TaskProfile::Scanning { exclude_path, .. } => {
                payload.languages = Some(join_variants(subtasks));
                payload.exclude_path = Some(merge_exclude_paths(
                    exclude_path.as_deref(),
                    inputs.default_exclude_paths,
                ));
            }
            TaskProfile::Autotest => payload.browsers = Some(join_variants(subtasks)),
            TaskProfile::Cloc {
                include_lang,
                exclude_dir,
                comparison,
            } => {
                payload.include_lang = Some(include_lang.clone());
                payload.exclude_dir = Some(exclude_dir.clone());
                payload.apply_comparison(comparison);
            }
        }

        payload.apply_git(task.source(), task.branch(), inputs.credentials)?;
        if task.module().fans_out() {
            payload.subtask_ids = Some(
                subtasks
                    .iter()
                    .map(|subtask| subtask.id().to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        Ok(payload)
    }

    /// Deduplication id for FIFO delivery: SHA-256 of the canonical JSON.
    #[must_use]
    pub fn deduplication_id(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }

    fn apply_git(
        &mut self,
        source: &SourceLocator,
        branch: Option<&str>,
        credentials: Option<&GitCredentials>,
    ) -> Result<(), TaskDomainError> {
        let creds = credentials.ok_or(TaskDomainError::MissingField("git_pass"))?;
        let git_branch = branch.ok_or(TaskDomainError::MissingField("branch"))?;
        self.git_url = Some(source.as_str().to_owned());
        self.repository = Some(source.repository_name()?.to_owned());
        self.git_user = Some(creds.user().to_owned());
        self.git_password = Some(creds.expose_password().to_owned());
        self.git_branch = Some(git_branch.to_owned());
        Ok(())
    }

    fn apply_comparison(&mut self, comparison: &ClocComparison) {
        let or_absent =
            |value: &Option<String>| value.clone().unwrap_or_else(|| ABSENT_FIELD.to_owned());
        self.commit_id1 = Some(or_absent(&comparison.commit_id1));
        self.commit_id2 = Some(or_absent(&comparison.commit_id2));
        self.compared_branch1 = Some(or_absent(&comparison.compared_branch1));
        self.compared_branch2 = Some(or_absent(&comparison.compared_branch2));
    }
}

impl fmt::Debug for DispatchPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPayload")
            .field("record_id", &self.record_id)
            .field("type_tag", &self.type_tag)
            .field("subtask_ids", &self.subtask_ids)
            .field("git_url", &self.git_url)
            .field("git_branch", &self.git_branch)
            .finish_non_exhaustive()
    }
}

fn join_variants(subtasks: &[SubTask]) -> String {
    subtasks
        .iter()
        .map(|subtask| subtask.variant().as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Appends the default exclude list to a user-supplied one.
///
/// # Examples
///
/// ```
/// use citool::task::domain::merge_exclude_paths;
///
/// assert_eq!(merge_exclude_paths(None, "spec, tmp"), "spec, tmp");
/// assert_eq!(merge_exclude_paths(Some("vendor"), "spec, tmp"), "vendor,spec, tmp");
/// ```
#[must_use]
pub fn merge_exclude_paths(user: Option<&str>, defaults: &str) -> String {
    match user.filter(|value| !value.is_empty()) {
        Some(value) => format!("{value},{defaults}"),
        None => defaults.to_owned(),
    }
}

