//! In-memory adapter implementations for tests and local runs.
//!
//! Besides implementing the ports, the gateway, workspace and artifact
//! adapters record the calls they receive so tests can assert on side
//! effects.

mod artifact;
mod gateway;
mod task;
mod workspace;

pub use artifact::InMemoryArtifactStore;
pub use gateway::InMemoryWorkerGateway;
pub use task::InMemoryTaskRepository;
pub use workspace::InMemoryWorkspaceStore;
