//! Command runner backed by `tokio::process`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::load_test::{
    domain::LaunchCommand,
    ports::{CommandOutput, CommandRunner, CommandRunnerError, CommandRunnerResult},
};

/// Launches commands as child processes, capturing stdout and stderr.
///
/// Arguments are passed directly to the program; no shell is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, command: &LaunchCommand) -> CommandRunnerResult<CommandOutput> {
        tracing::info!(command = %command.command_line(), "launching load-test tool");
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| CommandRunnerError::launch(&command.program, err))?;
        tracing::info!(
            program = %command.program,
            status = %output.status,
            "load-test tool exited"
        );
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
