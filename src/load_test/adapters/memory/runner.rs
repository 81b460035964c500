//! Command runner returning scripted outcomes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::load_test::{
    domain::LaunchCommand,
    ports::{CommandOutput, CommandRunner, CommandRunnerError, CommandRunnerResult},
};

/// Outcome the scripted runner produces for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// The process exits with status zero.
    Succeed,
    /// The process exits non-zero with the given output.
    Fail {
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The process cannot be started.
    LaunchError(String),
}

/// Runner that records commands and replays queued outcomes.
///
/// Commands without a queued outcome succeed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommandRunner {
    outcomes: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    commands: Arc<Mutex<Vec<LaunchCommand>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedCommandRunner {
    /// Creates a runner where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next unscripted command.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Returns the commands run so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<LaunchCommand> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Returns the highest number of commands observed running at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, command: &LaunchCommand) -> CommandRunnerResult<CommandOutput> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front())
            .unwrap_or(ScriptedOutcome::Succeed);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            ScriptedOutcome::Succeed => Ok(CommandOutput {
                success: true,
                ..CommandOutput::default()
            }),
            ScriptedOutcome::Fail { stdout, stderr } => Ok(CommandOutput {
                success: false,
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            }),
            ScriptedOutcome::LaunchError(message) => Err(CommandRunnerError::launch(
                &command.program,
                std::io::Error::other(message),
            )),
        }
    }
}
