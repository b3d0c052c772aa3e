// ABOUTME: TLS certificate provisioning for custom domains.
// ABOUTME: acme.sh in a helper container, file installation, proxy reload.

pub mod acme;
pub mod install;
pub mod provisioner;

pub use acme::{IssueCertificate, IssueError};
pub use install::{CertPair, InstallError};
pub use provisioner::{CertError, CertOutcome, ProvisionerSettings, ensure_certificate};
