// ABOUTME: Typed command builder for acme.sh invocations in the helper container.
// ABOUTME: Argument lists only, never interpolated shell strings.

use crate::runtime::{ContainerManager, ExecConfig, ExecOps};
use std::collections::HashMap;
use std::time::Duration;

const ISSUE_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// An `acme.sh --issue` invocation with a DNS challenge.
#[derive(Debug, Clone)]
pub struct IssueCertificate {
    pub domain: String,
    pub dns_provider: String,
    pub home_dir: String,
    pub staging: bool,
}

impl IssueCertificate {
    /// The argument list passed to the helper container.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "acme.sh".to_string(),
            "--issue".to_string(),
            "--dns".to_string(),
            self.dns_provider.clone(),
            "-d".to_string(),
            self.domain.clone(),
            "--home".to_string(),
            self.home_dir.clone(),
            "--server".to_string(),
        ];
        args.push(if self.staging {
            "letsencrypt_test".to_string()
        } else {
            "letsencrypt".to_string()
        });
        args
    }

    /// Human-readable rendering for the transcript's remediation guidance.
    pub fn rendered(&self) -> String {
        self.args().join(" ")
    }
}

/// Errors from certificate issuance.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("certificate issuance failed for {domain}: {detail}")]
    Failed { domain: String, detail: String },

    #[error("certificate issuance timed out for {domain} after {seconds}s")]
    TimedOut { domain: String, seconds: u64 },
}

/// Run issuance inside the acme helper container.
///
/// Provider credentials travel as exec environment variables. Each invocation
/// is wrapped in a timeout; failures are retried with a doubling delay before
/// the last error is surfaced.
pub async fn issue<R>(
    manager: &ContainerManager<'_, R>,
    helper_container: &str,
    command: &IssueCertificate,
    credentials: &HashMap<String, String>,
    timeout: Duration,
) -> Result<(), IssueError>
where
    R: ExecOps,
{
    let exec = ExecConfig {
        cmd: command.args(),
        env: credentials
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect(),
        working_dir: None,
        attach_stdout: true,
        attach_stderr: true,
    };

    let mut backoff = INITIAL_BACKOFF;
    let mut last_detail = String::new();

    for attempt in 1..=ISSUE_ATTEMPTS {
        let outcome = tokio::time::timeout(timeout, manager.exec_in(helper_container, &exec)).await;

        match outcome {
            Err(_) => {
                return Err(IssueError::TimedOut {
                    domain: command.domain.clone(),
                    seconds: timeout.as_secs(),
                });
            }
            Ok(Ok(result)) if result.success() => return Ok(()),
            Ok(Ok(result)) => {
                // acme.sh exit code 2 means "skipped, cert still valid"
                if result.exit_code == 2 {
                    return Ok(());
                }
                let stderr = result.stderr_lossy();
                last_detail = if stderr.trim().is_empty() {
                    result.stdout_lossy()
                } else {
                    stderr
                };
                last_detail = last_detail.trim().to_string();
            }
            Ok(Err(e)) => {
                last_detail = e.to_string();
            }
        }

        tracing::warn!(
            domain = %command.domain,
            attempt,
            detail = %last_detail,
            "certificate issuance attempt failed"
        );

        if attempt < ISSUE_ATTEMPTS {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(IssueError::Failed {
        domain: command.domain.clone(),
        detail: last_detail,
    })
}
