//! Single background worker draining the load-test queue.

use crate::load_test::{
    domain::{LoadTest, LoadTestId},
    ports::LoadTestRepository,
};
use mockable::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::LoadTestExecutor;

/// Sending half of the load-test queue.
///
/// Enqueueing never waits for execution. The worker stops once every
/// queue handle is dropped and the backlog is drained.
#[derive(Debug, Clone)]
pub struct LoadTestQueue {
    sender: mpsc::UnboundedSender<LoadTest>,
}

impl LoadTestQueue {
    /// Queues a run.
    ///
    /// # Errors
    ///
    /// Returns the run id when the worker is no longer receiving.
    pub fn enqueue(&self, run: LoadTest) -> Result<(), LoadTestId> {
        self.sender.send(run).map_err(|err| err.0.id())
    }
}

/// Spawns the worker; runs execute one at a time in submission order.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_load_test_worker<R, C>(
    executor: LoadTestExecutor<R, C>,
) -> (LoadTestQueue, JoinHandle<()>)
where
    R: LoadTestRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_worker(receiver, executor));
    (LoadTestQueue { sender }, handle)
}

async fn run_worker<R, C>(
    mut receiver: mpsc::UnboundedReceiver<LoadTest>,
    executor: LoadTestExecutor<R, C>,
) where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    while let Some(run) = receiver.recv().await {
        executor.execute(run).await;
    }
    tracing::debug!("load-test worker stopped");
}
