// ABOUTME: Record entities for applications, deployment attempts, env vars, and domains.
// ABOUTME: The store trait and in-memory implementation live in store.rs / memory.rs.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{RecordStore, StoreError};

use crate::types::{AppId, ContainerId, DeploymentId, OwnerId, Subdomain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an application's source becomes a container image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMethod {
    /// Use a Dockerfile when present, otherwise detect a framework template.
    Auto,
    /// Require an explicit Dockerfile in the repository.
    Dockerfile,
    /// Use a named framework template (e.g. `nextjs`).
    Framework(String),
}

impl BuildMethod {
    pub fn parse(input: &str) -> Self {
        match input {
            "auto" => BuildMethod::Auto,
            "dockerfile" => BuildMethod::Dockerfile,
            other => BuildMethod::Framework(other.to_string()),
        }
    }
}

impl fmt::Display for BuildMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMethod::Auto => write!(f, "auto"),
            BuildMethod::Dockerfile => write!(f, "dockerfile"),
            BuildMethod::Framework(name) => write!(f, "{name}"),
        }
    }
}

/// Current lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Created,
    Building,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppStatus::Created => "created",
            AppStatus::Building => "building",
            AppStatus::Running => "running",
            AppStatus::Stopped => "stopped",
            AppStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A deployable unit: one source repository bound to one network identity.
///
/// Invariants: the subdomain is unique among applications in the store, and
/// an application references at most one container at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: AppId,
    pub owner: OwnerId,
    pub repo_url: String,
    pub branch: String,
    pub build_method: BuildMethod,
    pub subdomain: Subdomain,
    pub custom_domain: Option<String>,
    pub static_port: Option<u16>,
    pub status: AppStatus,
    pub container_id: Option<ContainerId>,
    pub created_at: DateTime<Utc>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

/// Status of one deployment attempt. `Success` and `Failed` are terminal:
/// the store rejects any further mutation of the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Success | AttemptStatus::Failed)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Success => "success",
            AttemptStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One execution of the deployment pipeline for an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentAttempt {
    pub id: DeploymentId,
    pub app_id: AppId,
    pub status: AttemptStatus,
    /// Append-only transcript; the single source of truth for what happened.
    pub log: String,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub initiator: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeploymentAttempt {
    pub fn new(app_id: AppId, initiator: String) -> Self {
        Self {
            id: DeploymentId::generate(),
            app_id,
            status: AttemptStatus::Pending,
            log: String::new(),
            commit_hash: None,
            commit_message: None,
            initiator,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Verification state of a custom domain, established out of band
/// (DNS challenge) before the certificate provisioner will touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainVerification {
    Unverified,
    Verified,
}

/// A custom domain bound to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub app_id: AppId,
    pub verification: DomainVerification,
}
