// ABOUTME: Log retrieval trait for container engines.
// ABOUTME: Bounded tail of a container's combined stdout/stderr.

use super::sealed::Sealed;
use crate::types::ContainerId;
use async_trait::async_trait;

/// Log retrieval operations.
#[async_trait]
pub trait LogOps: Sealed + Send + Sync {
    /// Return the last `tail` lines of a container's combined output.
    async fn tail_logs(&self, id: &ContainerId, tail: u32) -> Result<String, LogError>;
}

/// Errors from log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
