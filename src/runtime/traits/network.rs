// ABOUTME: Network operations trait for container engines.
// ABOUTME: Ensures the shared proxy network exists before containers join it.

use super::sealed::Sealed;
use async_trait::async_trait;

/// Network operations.
#[async_trait]
pub trait NetworkOps: Sealed + Send + Sync {
    /// Check if a network exists.
    async fn network_exists(&self, name: &str) -> Result<bool, NetworkError>;

    /// Create a bridge network. Succeeds if it already exists.
    async fn create_network(&self, name: &str) -> Result<(), NetworkError>;
}

/// Errors from network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
