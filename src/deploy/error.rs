// ABOUTME: Error taxonomy for deployment attempts.
// ABOUTME: Every failure carries a kind and remediation text for the transcript.

use crate::alloc::AllocError;
use crate::build::{ImageBuildError, MethodError};
use crate::records::StoreError;
use crate::runtime::ContainerError;
use crate::source::SourceError;
use crate::tls::{CertError, InstallError, IssueError};
use std::fmt;

/// Classification of a deployment failure, recorded in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    InvalidSource,
    FetchFailed,
    MissingDockerfile,
    BuildFailed,
    NoPortsAvailable,
    ContainerMissing,
    ContainerOperationFailed,
    CertificateFilesNotFound,
    CertificateIssuanceFailed,
    Unexpected,
}

impl fmt::Display for DeployErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployErrorKind::InvalidSource => "InvalidSource",
            DeployErrorKind::FetchFailed => "FetchFailed",
            DeployErrorKind::MissingDockerfile => "MissingDockerfile",
            DeployErrorKind::BuildFailed => "BuildFailed",
            DeployErrorKind::NoPortsAvailable => "NoPortsAvailable",
            DeployErrorKind::ContainerMissing => "ContainerMissing",
            DeployErrorKind::ContainerOperationFailed => "ContainerOperationFailed",
            DeployErrorKind::CertificateFilesNotFound => "CertificateFilesNotFound",
            DeployErrorKind::CertificateIssuanceFailed => "CertificateIssuanceFailed",
            DeployErrorKind::Unexpected => "Unexpected",
        };
        write!(f, "{s}")
    }
}

/// A classified deployment failure.
#[derive(Debug)]
pub struct DeployError {
    pub kind: DeployErrorKind,
    message: String,
    remediation: Option<String>,
}

impl DeployError {
    pub fn new(kind: DeployErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(DeployErrorKind::Unexpected, message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Remediation text for the transcript, when the failure has a known fix.
    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DeployError {}

impl From<SourceError> for DeployError {
    fn from(err: SourceError) -> Self {
        match &err {
            SourceError::InvalidSource(_) => {
                DeployError::new(DeployErrorKind::InvalidSource, err.to_string())
                    .with_remediation("Use a full repository URL or an owner/repo shorthand")
            }
            SourceError::FetchFailed(_) => {
                DeployError::new(DeployErrorKind::FetchFailed, err.to_string()).with_remediation(
                    "Check that the repository is reachable and the branch exists",
                )
            }
        }
    }
}

impl From<MethodError> for DeployError {
    fn from(err: MethodError) -> Self {
        let remediation = err.remediation();
        let kind = match &err {
            MethodError::MissingDockerfile | MethodError::UnknownTemplate(_) => {
                DeployErrorKind::MissingDockerfile
            }
            MethodError::Io(_) => DeployErrorKind::Unexpected,
        };
        let mut e = DeployError::new(kind, err.to_string());
        if let Some(r) = remediation {
            e = e.with_remediation(r);
        }
        e
    }
}

impl From<ImageBuildError> for DeployError {
    fn from(err: ImageBuildError) -> Self {
        DeployError::new(DeployErrorKind::BuildFailed, err.to_string())
            .with_remediation("Inspect the build output above; the engine error text is preserved")
    }
}

impl From<AllocError> for DeployError {
    fn from(err: AllocError) -> Self {
        match &err {
            AllocError::NoPortsAvailable => {
                DeployError::new(DeployErrorKind::NoPortsAvailable, err.to_string())
                    .with_remediation("Widen the static port range or remove unused applications")
            }
            _ => DeployError::unexpected(err.to_string()),
        }
    }
}

impl From<ContainerError> for DeployError {
    fn from(err: ContainerError) -> Self {
        match &err {
            ContainerError::NotFound(_) => {
                DeployError::new(DeployErrorKind::ContainerMissing, err.to_string())
                    .with_remediation("The container no longer exists; redeploy the application")
            }
            _ => DeployError::new(DeployErrorKind::ContainerOperationFailed, err.to_string()),
        }
    }
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        DeployError::unexpected(err.to_string())
    }
}

impl From<CertError> for DeployError {
    fn from(err: CertError) -> Self {
        let kind = match &err {
            CertError::Issuance(IssueError::Failed { .. })
            | CertError::Issuance(IssueError::TimedOut { .. }) => {
                DeployErrorKind::CertificateIssuanceFailed
            }
            CertError::Install(InstallError::FilesNotFound(_)) => {
                DeployErrorKind::CertificateFilesNotFound
            }
            CertError::Install(InstallError::Io(_)) => DeployErrorKind::CertificateFilesNotFound,
        };
        DeployError::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dockerfile_carries_remediation() {
        let err: DeployError = MethodError::MissingDockerfile.into();
        assert_eq!(err.kind, DeployErrorKind::MissingDockerfile);
        assert!(err.remediation().unwrap().contains("add a Dockerfile"));
    }

    #[test]
    fn container_not_found_maps_to_container_missing() {
        let err: DeployError = ContainerError::NotFound("abc".to_string()).into();
        assert_eq!(err.kind, DeployErrorKind::ContainerMissing);
    }

    #[test]
    fn other_container_errors_map_to_operation_failed() {
        let err: DeployError = ContainerError::Runtime("boom".to_string()).into();
        assert_eq!(err.kind, DeployErrorKind::ContainerOperationFailed);
    }
}
