// ABOUTME: Runtime metadata trait for container engines.
// ABOUTME: Connectivity checks and engine identification.

use super::sealed::Sealed;
use async_trait::async_trait;

/// Metadata about the connected container engine.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    pub name: String,
    pub version: String,
}

/// Runtime information operations.
#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Check connectivity to the engine.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;

    /// Get engine name and version.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;
}

/// Errors from runtime information operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("runtime unreachable: {0}")]
    Unreachable(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
