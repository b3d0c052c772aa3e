// ABOUTME: Certificate provisioner state machine for custom domains.
// ABOUTME: Wildcard short-circuit, issue via acme helper, install, proxy reload.

use super::acme::{IssueCertificate, IssueError, issue};
use super::install::{InstallError, find_issued, install, is_installed};
use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerManager, ExecConfig, ExecOps};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// What the provisioner did for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertOutcome {
    /// The wildcard for the base domain already covers it.
    CoveredByWildcard,
    /// The proxy-visible pair was already in place.
    AlreadyInstalled,
    /// The CA-side record existed; files were reinstalled for the proxy.
    Reinstalled,
    /// A fresh certificate was issued and installed.
    Issued,
}

/// Errors from certificate provisioning. Callers treat these as warnings;
/// a deployment still succeeds over plain subdomain routing.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error(transparent)]
    Issuance(#[from] IssueError),

    #[error(transparent)]
    Install(#[from] InstallError),
}

impl CertError {
    /// Remediation guidance written into the transcript.
    pub fn remediation(&self, command: &IssueCertificate) -> String {
        match self {
            CertError::Issuance(_) => format!(
                "Check the DNS provider credentials, then retry manually inside the \
                 acme helper container: {}",
                command.rendered()
            ),
            CertError::Install(_) => format!(
                "Issuance may have placed files under an unexpected name. Inspect the \
                 acme home directory, or re-issue with: {}",
                command.rendered()
            ),
        }
    }
}

/// Everything the provisioner needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
    pub base_domain: String,
    pub wildcard_certificate: bool,
    pub dns_provider: String,
    pub credentials: HashMap<String, String>,
    pub helper_container: String,
    /// acme.sh home inside the helper, also mounted on the host.
    pub acme_home: PathBuf,
    pub staging: bool,
    pub timeout: Duration,
    pub cert_dir: PathBuf,
    pub proxy_container: String,
    pub reload_command: Vec<String>,
}

impl ProvisionerSettings {
    /// Whether the wildcard certificate already covers a domain: the base
    /// domain itself or exactly one label beneath it.
    pub fn covered_by_wildcard(&self, domain: &str) -> bool {
        if !self.wildcard_certificate {
            return false;
        }
        if domain == self.base_domain {
            return true;
        }
        let suffix = format!(".{}", self.base_domain);
        match domain.strip_suffix(&suffix) {
            Some(label) => !label.is_empty() && !label.contains('.'),
            None => false,
        }
    }

    /// The issuance invocation for a domain, also used for remediation text.
    pub fn issue_command(&self, domain: &str) -> IssueCertificate {
        IssueCertificate {
            domain: domain.to_string(),
            dns_provider: self.dns_provider.clone(),
            home_dir: self.acme_home.to_string_lossy().to_string(),
            staging: self.staging,
        }
    }
}

/// Ensure a valid certificate is installed for `domain` and the proxy has
/// been told to pick it up.
///
/// Proxy reload failure is recorded as a warning, not an error: the
/// certificate is on disk and the next reload will pick it up.
pub async fn ensure_certificate<R>(
    manager: &ContainerManager<'_, R>,
    settings: &ProvisionerSettings,
    domain: &str,
    diagnostics: &mut Diagnostics,
) -> Result<CertOutcome, CertError>
where
    R: ExecOps,
{
    if settings.covered_by_wildcard(domain) {
        return Ok(CertOutcome::CoveredByWildcard);
    }

    if is_installed(&settings.cert_dir, domain) {
        return Ok(CertOutcome::AlreadyInstalled);
    }

    // CA-side record may exist from an earlier deploy even when the
    // proxy-visible files vanished. Reinstall without re-issuing.
    if let Ok(pair) = find_issued(&settings.acme_home, domain) {
        install(&pair, &settings.cert_dir, domain)?;
        reload_proxy(manager, settings, diagnostics).await;
        return Ok(CertOutcome::Reinstalled);
    }

    let command = settings.issue_command(domain);
    issue(
        manager,
        &settings.helper_container,
        &command,
        &settings.credentials,
        settings.timeout,
    )
    .await?;

    let pair = find_issued(&settings.acme_home, domain)?;
    install(&pair, &settings.cert_dir, domain)?;
    reload_proxy(manager, settings, diagnostics).await;

    Ok(CertOutcome::Issued)
}

async fn reload_proxy<R>(
    manager: &ContainerManager<'_, R>,
    settings: &ProvisionerSettings,
    diagnostics: &mut Diagnostics,
) where
    R: ExecOps,
{
    let exec = ExecConfig {
        cmd: settings.reload_command.clone(),
        env: Vec::new(),
        working_dir: None,
        attach_stdout: true,
        attach_stderr: true,
    };

    match manager.exec_in(&settings.proxy_container, &exec).await {
        Ok(result) if result.success() => {}
        Ok(result) => {
            diagnostics.warn(Warning::proxy_reload(format!(
                "proxy reload exited with {}: {}",
                result.exit_code,
                result.stderr_lossy().trim()
            )));
        }
        Err(e) => {
            diagnostics.warn(Warning::proxy_reload(format!("proxy reload failed: {}", e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(wildcard: bool) -> ProvisionerSettings {
        ProvisionerSettings {
            base_domain: "apps.example.org".to_string(),
            wildcard_certificate: wildcard,
            dns_provider: "dns_cf".to_string(),
            credentials: HashMap::new(),
            helper_container: "berth-acme".to_string(),
            acme_home: PathBuf::from("/acme.sh"),
            staging: false,
            timeout: Duration::from_secs(300),
            cert_dir: PathBuf::from("/etc/nginx/certs"),
            proxy_container: "berth-proxy".to_string(),
            reload_command: vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()],
        }
    }

    #[test]
    fn wildcard_covers_one_label_below_base() {
        let s = settings(true);
        assert!(s.covered_by_wildcard("apps.example.org"));
        assert!(s.covered_by_wildcard("blog.apps.example.org"));
        assert!(!s.covered_by_wildcard("a.b.apps.example.org"));
        assert!(!s.covered_by_wildcard("shop.example.net"));
    }

    #[test]
    fn no_wildcard_means_nothing_is_covered() {
        let s = settings(false);
        assert!(!s.covered_by_wildcard("blog.apps.example.org"));
    }
}
