//! Source-control engines and deep links to findings.

use super::{SourceLocator, TaskDomainError};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::fmt;

const BLOB_TEMPLATE: &str = "{{ repo }}/blob/{{ branch }}/{{ file }}#L{{ line }}";
const BITBUCKET_TEMPLATE: &str = "{{ repo }}/src/{{ branch }}/{{ file }}#lines-{{ line }}";

/// Source-control engine hosting a scanned repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitEngine {
    /// github.com or GitHub Enterprise.
    Github,
    /// GitLab, the deployment default.
    #[default]
    Gitlab,
    /// Bitbucket.
    Bitbucket,
}

impl GitEngine {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }

    const fn link_template(self) -> &'static str {
        match self {
            Self::Github | Self::Gitlab => BLOB_TEMPLATE,
            Self::Bitbucket => BITBUCKET_TEMPLATE,
        }
    }

    /// Renders a deep link to `file` at `line` on `branch`.
    ///
    /// Returns `None` when the template cannot be rendered.
    ///
    /// # Examples
    ///
    /// ```
    /// use citool::task::domain::{GitEngine, SourceLocator};
    ///
    /// let repo = SourceLocator::new("https://bitbucket.org/acme/api.git").unwrap();
    /// let link = GitEngine::Bitbucket.deep_link(&repo, "main", "src/app.py", "12");
    /// assert_eq!(link.as_deref(), Some("https://bitbucket.org/acme/api/src/main/src/app.py#lines-12"));
    /// ```
    #[must_use]
    pub fn deep_link(
        self,
        source: &SourceLocator,
        branch: &str,
        file: &str,
        line: &str,
    ) -> Option<String> {
        let environment = Environment::new();
        environment
            .render_str(
                self.link_template(),
                context! {
                    repo => source.web_root(),
                    branch => branch,
                    file => file,
                    line => line,
                },
            )
            .map_err(|err| {
                tracing::warn!(engine = self.as_str(), error = %err, "deep link rendering failed");
            })
            .ok()
    }
}

impl fmt::Display for GitEngine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for GitEngine {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "github" => Ok(Self::Github),
            "gitlab" => Ok(Self::Gitlab),
            "bitbucket" => Ok(Self::Bitbucket),
            _ => Err(TaskDomainError::InvalidGitEngine(value.to_owned())),
        }
    }
}
