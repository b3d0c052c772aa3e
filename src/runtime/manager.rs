// ABOUTME: Container manager wrapping the runtime capability traits.
// ABOUTME: Enforces the lifecycle idempotency rules the engine relies on.

use super::traits::{
    ContainerConfig, ContainerError, ContainerOps, ContainerState, ExecConfig, ExecError, ExecOps,
    ExecResult, LogError, LogOps, NetworkError, NetworkOps,
};
use crate::types::ContainerId;
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wraps a runtime with the lifecycle semantics deployments depend on.
///
/// Record stores carry container identities that may be stale or empty
/// (app never deployed, container removed out of band). The manager absorbs
/// those cases so callers see uniform behavior:
/// - start/stop/restart of an empty identity is a successful no-op
/// - stop-and-remove of a vanished container is a successful no-op
/// - starting a vanished container surfaces `NotFound` for the caller to map
/// - log retrieval for an empty identity yields empty text
pub struct ContainerManager<'a, R> {
    runtime: &'a R,
}

impl<'a, R> ContainerManager<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }
}

impl<R> ContainerManager<'_, R>
where
    R: ContainerOps,
{
    /// Create and start an application container.
    ///
    /// If the container starts but the engine refuses to run it, the created
    /// container is removed so no half-started container is left behind.
    pub async fn run(&self, config: &ContainerConfig) -> Result<ContainerId, ContainerError> {
        let id = self.runtime.create_container(config).await?;

        if let Err(e) = self.runtime.start_container(&id).await {
            // Best effort: the start error is what the caller needs to see.
            let _ = self.runtime.remove_container(&id, true).await;
            return Err(e);
        }

        // A container can exit immediately after a successful start call.
        let info = self.runtime.inspect_container(&id).await?;
        if info.state != ContainerState::Running {
            let _ = self.runtime.remove_container(&id, true).await;
            return Err(ContainerError::NotRunning(id.to_string()));
        }

        Ok(id)
    }

    /// Start a container. No-op success for an empty identity; a vanished
    /// container is reported as `NotFound` so the caller can tell the user
    /// the container must be redeployed.
    pub async fn start(&self, id: &ContainerId) -> Result<(), ContainerError> {
        if id.is_empty() {
            return Ok(());
        }
        match self.runtime.start_container(id).await {
            Ok(()) => Ok(()),
            Err(ContainerError::AlreadyRunning(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Stop a container. No-op success for an empty identity, a vanished
    /// container, or one that is already stopped.
    pub async fn stop(&self, id: &ContainerId) -> Result<(), ContainerError> {
        if id.is_empty() {
            return Ok(());
        }
        match self.runtime.stop_container(id, STOP_TIMEOUT).await {
            Ok(()) => Ok(()),
            Err(ContainerError::NotFound(_)) | Err(ContainerError::NotRunning(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Restart a container. No-op success for an empty identity.
    pub async fn restart(&self, id: &ContainerId) -> Result<(), ContainerError> {
        if id.is_empty() {
            return Ok(());
        }
        match self.runtime.restart_container(id, STOP_TIMEOUT).await {
            Ok(()) => Ok(()),
            Err(ContainerError::NotFound(_)) => Err(ContainerError::NotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Stop and remove a container. A container that already vanished counts
    /// as success; redeploys and destroys must not fail on stale identities.
    pub async fn stop_and_remove(&self, id: &ContainerId) -> Result<(), ContainerError> {
        if id.is_empty() {
            return Ok(());
        }

        match self.runtime.stop_container(id, STOP_TIMEOUT).await {
            Ok(()) => {}
            Err(ContainerError::NotFound(_)) => return Ok(()),
            Err(ContainerError::NotRunning(_)) => {}
            Err(e) => return Err(e),
        }

        match self.runtime.remove_container(id, true).await {
            Ok(()) => Ok(()),
            Err(ContainerError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<R> ContainerManager<'_, R>
where
    R: LogOps,
{
    /// Tail a container's combined output. Empty identity yields empty text.
    pub async fn tail_logs(&self, id: &ContainerId, tail: u32) -> Result<String, LogError> {
        if id.is_empty() {
            return Ok(String::new());
        }
        self.runtime.tail_logs(id, tail).await
    }
}

impl<R> ContainerManager<'_, R>
where
    R: NetworkOps,
{
    /// Make sure the shared proxy network exists before a container joins it.
    pub async fn ensure_network(&self, name: &str) -> Result<(), NetworkError> {
        if self.runtime.network_exists(name).await? {
            return Ok(());
        }
        self.runtime.create_network(name).await
    }
}

impl<R> ContainerManager<'_, R>
where
    R: ExecOps,
{
    /// Run a command inside a helper container by name.
    pub async fn exec_in(
        &self,
        container_name: &str,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        let id = ContainerId::new(container_name.to_string());
        self.runtime.exec(&id, config).await
    }
}
