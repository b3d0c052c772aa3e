// ABOUTME: Image operations trait for container engines.
// ABOUTME: Build from a tar context, existence checks, and removal.

use super::sealed::Sealed;
use crate::types::ImageTag;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// Output of a completed image build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Engine-assigned image id, when the engine reported one.
    pub image_id: Option<String>,
    /// Collected build output lines, most recent last, bounded by the caller's
    /// requested window.
    pub lines: Vec<String>,
}

/// Image operations.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Build an image from a gzipped tar build context, tagging it.
    ///
    /// Build args are passed through to the engine. Output is collected into
    /// a bounded window of recent lines rather than returned raw.
    async fn build_image(
        &self,
        context: Bytes,
        tag: &ImageTag,
        build_args: &HashMap<String, String>,
        output_window: usize,
    ) -> Result<BuildOutput, ImageError>;

    /// Check if an image exists locally.
    async fn image_exists(&self, tag: &ImageTag) -> Result<bool, ImageError>;

    /// Remove an image.
    async fn remove_image(&self, tag: &ImageTag, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("image not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
