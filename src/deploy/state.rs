// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state carries the data produced by the stage that reached it.

use crate::build::ResolvedMethod;
use crate::source::CommitInfo;
use crate::tls::CertOutcome;
use crate::types::{ContainerId, ImageTag};

/// Initial state: the attempt is accepted and marked in progress.
/// Available action: `fetch_source()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Accepted;

/// Source fetched: checkout on disk, commit resolved.
/// Available action: `resolve_method()`
#[derive(Debug, Clone)]
pub struct SourceFetched {
    pub commit: CommitInfo,
}

/// Method resolved: a canonical Dockerfile exists at the checkout root.
/// Available action: `build_image()`
#[derive(Debug, Clone)]
pub struct MethodResolved {
    pub commit: CommitInfo,
    pub method: ResolvedMethod,
}

/// Image built and tagged.
/// Available action: `release()`
#[derive(Debug, Clone)]
pub struct ImageBuilt {
    pub commit: CommitInfo,
    pub tag: ImageTag,
}

/// Released: new container running, record updated.
/// Available action: `route()`
#[derive(Debug, Clone)]
pub struct Released {
    pub commit: CommitInfo,
    pub container: ContainerId,
}

/// Routed: certificate work done (or skipped), public URL known.
#[derive(Debug, Clone)]
pub struct Routed {
    pub container: ContainerId,
    pub url: String,
    pub certificate: Option<CertOutcome>,
}
