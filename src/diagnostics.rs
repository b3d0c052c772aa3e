// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Collects warnings that shouldn't fail an attempt but belong in its transcript.

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Old-container cleanup failed during redeploy.
    pub fn container_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerCleanup,
            message: message.into(),
        }
    }

    /// Certificate issuance or installation failed.
    pub fn certificate(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Certificate,
            message: message.into(),
        }
    }

    /// Reverse proxy reload signal failed.
    pub fn proxy_reload(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ProxyReload,
            message: message.into(),
        }
    }

    /// Attempt work directory could not be removed.
    pub fn workdir_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::WorkdirCleanup,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to stop/remove the previous container (redeploy continues).
    ContainerCleanup,
    /// Certificate work failed (application still routable via subdomain).
    Certificate,
    /// Proxy reload failed (new certificate not picked up yet).
    ProxyReload,
    /// Failed to remove the attempt-scoped source checkout.
    WorkdirCleanup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::container_cleanup("old container would not stop"));
        diag.warn(Warning::certificate("issuance timed out"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.warnings()[0].kind, WarningKind::ContainerCleanup);
        assert_eq!(diag.warnings()[1].kind, WarningKind::Certificate);
    }
}
