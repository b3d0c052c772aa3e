// ABOUTME: Record store trait the pipeline runs against.
// ABOUTME: Covers CRUD for the entities plus atomic identity reservation.

use super::{Application, AttemptStatus, DeploymentAttempt, DomainRecord};
use crate::types::{AppId, DeploymentId, OwnerId, Subdomain};
use async_trait::async_trait;
use std::collections::HashMap;

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("deployment attempt {0} already reached a terminal status")]
    TerminalAttempt(DeploymentId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// CRUD over the pipeline's entities, queryable by owner and foreign key.
///
/// Ownership checks happen before the pipeline is invoked; the store itself
/// does not authorize. Subdomain and port reservation are atomic
/// reserve-if-absent operations so allocation is never a read-then-insert
/// sequence in the caller.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Applications

    async fn create_app(&self, app: Application) -> Result<(), StoreError>;

    async fn get_app(&self, id: &AppId) -> Result<Application, StoreError>;

    async fn find_app_by_subdomain(
        &self,
        subdomain: &Subdomain,
    ) -> Result<Option<Application>, StoreError>;

    async fn update_app(&self, app: Application) -> Result<(), StoreError>;

    async fn list_apps(&self, owner: Option<&OwnerId>) -> Result<Vec<Application>, StoreError>;

    /// Remove the application and everything keyed to it (attempts, env
    /// vars, domains) and release its reserved subdomain and port.
    async fn delete_app(&self, id: &AppId) -> Result<(), StoreError>;

    // Deployment attempts

    async fn create_attempt(&self, attempt: DeploymentAttempt) -> Result<(), StoreError>;

    async fn get_attempt(&self, id: &DeploymentId) -> Result<DeploymentAttempt, StoreError>;

    async fn list_attempts(&self, app_id: &AppId) -> Result<Vec<DeploymentAttempt>, StoreError>;

    /// Append a line to the attempt transcript. The transcript is append-only
    /// and frozen once the attempt is terminal.
    async fn append_attempt_log(&self, id: &DeploymentId, line: &str) -> Result<(), StoreError>;

    /// Transition the attempt status. Terminal statuses set `finished_at`;
    /// mutating an already-terminal attempt is rejected.
    async fn set_attempt_status(
        &self,
        id: &DeploymentId,
        status: AttemptStatus,
    ) -> Result<(), StoreError>;

    async fn record_commit(
        &self,
        id: &DeploymentId,
        hash: &str,
        message: &str,
    ) -> Result<(), StoreError>;

    // Environment variables

    async fn set_env_var(&self, app_id: &AppId, key: &str, value: &str)
    -> Result<(), StoreError>;

    async fn env_for_app(&self, app_id: &AppId) -> Result<HashMap<String, String>, StoreError>;

    // Domains

    async fn upsert_domain(&self, record: DomainRecord) -> Result<(), StoreError>;

    async fn verified_domain_for_app(
        &self,
        app_id: &AppId,
    ) -> Result<Option<DomainRecord>, StoreError>;

    // Atomic identity reservation

    /// Reserve the subdomain if no application holds it. Returns false when
    /// already taken.
    async fn reserve_subdomain(&self, subdomain: &Subdomain) -> Result<bool, StoreError>;

    /// Reserve a host port if free. Returns false when already taken.
    async fn reserve_port(&self, port: u16) -> Result<bool, StoreError>;
}
