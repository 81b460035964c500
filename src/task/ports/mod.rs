//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services:
//! the task store, the worker platform, the shared workspace and durable
//! report storage.

mod artifact;
mod gateway;
mod repository;
mod workspace;

pub use artifact::{
    ArtifactCategory, ArtifactStore, ArtifactStoreError, ArtifactStoreResult, ArtifactUpload,
};
pub use gateway::{EnqueueReceipt, GatewayError, GatewayResult, LogLine, NextStep, WorkerGateway};
pub use repository::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult};
pub use workspace::{ResultRequest, WorkspaceError, WorkspaceResult, WorkspaceStore};
