// ABOUTME: Exec operations trait for running commands inside containers.
// ABOUTME: Used for certificate issuance in the acme helper and proxy reloads.

use super::sealed::Sealed;
use super::shared_types::{ExecConfig, ExecResult};
use crate::types::ContainerId;
use async_trait::async_trait;

/// Exec operations against running containers.
#[async_trait]
pub trait ExecOps: Sealed + Send + Sync {
    /// Run a command inside a running container and wait for it to finish,
    /// collecting stdout and stderr.
    async fn exec(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError>;
}

/// Errors from exec operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
