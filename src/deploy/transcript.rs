// ABOUTME: Append-only transcript writer for a deployment attempt.
// ABOUTME: Every pipeline stage narrates into the store through this.

use crate::records::RecordStore;
use crate::types::DeploymentId;

/// Writes stage-by-stage lines into an attempt's transcript.
///
/// Transcript writes are never allowed to fail a deployment; a store error
/// here is logged and swallowed.
pub struct Transcript<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    attempt_id: DeploymentId,
}

impl<'a, S: RecordStore + ?Sized> Transcript<'a, S> {
    pub fn new(store: &'a S, attempt_id: DeploymentId) -> Self {
        Self { store, attempt_id }
    }

    pub fn attempt_id(&self) -> &DeploymentId {
        &self.attempt_id
    }

    /// Append one line.
    pub async fn line(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        tracing::info!(attempt = %self.attempt_id, "{}", text);
        if let Err(e) = self.store.append_attempt_log(&self.attempt_id, text).await {
            tracing::warn!(attempt = %self.attempt_id, error = %e, "transcript write failed");
        }
    }

    /// Append a block of prefixed lines, used to relay build output.
    pub async fn block(&self, prefix: &str, lines: &[String]) {
        for line in lines {
            self.line(format!("{}{}", prefix, line)).await;
        }
    }
}
