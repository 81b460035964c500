//! External process launcher.

use crate::load_test::domain::LaunchCommand;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for command runner operations.
pub type CommandRunnerResult<T> = Result<T, CommandRunnerError>;

/// Captured outcome of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Returns standard error followed by standard output.
    #[must_use]
    pub fn combined(&self) -> Vec<u8> {
        let mut combined = Vec::with_capacity(self.stderr.len() + self.stdout.len());
        combined.extend_from_slice(&self.stderr);
        combined.extend_from_slice(&self.stdout);
        combined
    }
}

/// Runs a command to completion, capturing its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`CommandRunnerError::Launch`] when the process cannot be
    /// started. A non-zero exit is reported through [`CommandOutput`].
    async fn run(&self, command: &LaunchCommand) -> CommandRunnerResult<CommandOutput>;
}

/// Errors returned by command runners.
#[derive(Debug, Clone, Error)]
pub enum CommandRunnerError {
    /// The process could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying failure.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl CommandRunnerError {
    /// Wraps a launch failure for `program`.
    pub fn launch(program: &str, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Launch {
            program: program.to_owned(),
            source: Arc::new(err),
        }
    }
}
