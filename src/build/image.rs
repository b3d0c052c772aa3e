// ABOUTME: Image builder: packages the work directory and drives the engine build.
// ABOUTME: Gzipped tar context, build args, bounded output window, bounded retry.

use crate::runtime::{BuildOutput, ImageError, ImageOps};
use crate::types::ImageTag;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const BUILD_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Errors from image building.
#[derive(Debug, thiserror::Error)]
pub enum ImageBuildError {
    #[error("failed to package build context: {0}")]
    Context(#[from] std::io::Error),

    #[error("image build failed: {0}")]
    BuildFailed(String),
}

/// Package a working directory into a gzipped tar build context.
pub fn build_context(workdir: &Path) -> Result<Bytes, ImageBuildError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.append_dir_all(".", workdir)?;
    let encoder = tar.into_inner()?;
    let compressed = encoder.finish()?;
    Ok(Bytes::from(compressed))
}

/// Build and tag an image from the working directory.
///
/// Engine-level build errors are final. Transport errors (the engine stream
/// failing to establish) are retried with a doubling delay before giving up.
pub async fn build<R>(
    runtime: &R,
    workdir: &Path,
    tag: &ImageTag,
    build_args: &HashMap<String, String>,
    output_window: usize,
) -> Result<BuildOutput, ImageBuildError>
where
    R: ImageOps,
{
    let context = build_context(workdir)?;

    let mut backoff = INITIAL_BACKOFF;
    let mut last_transport_error = String::new();

    for attempt in 1..=BUILD_ATTEMPTS {
        match runtime
            .build_image(context.clone(), tag, build_args, output_window)
            .await
        {
            Ok(output) => return Ok(output),
            Err(ImageError::BuildFailed(msg)) => return Err(ImageBuildError::BuildFailed(msg)),
            Err(ImageError::NotFound(msg)) => return Err(ImageBuildError::BuildFailed(msg)),
            Err(ImageError::Runtime(msg)) => {
                tracing::warn!(attempt, error = %msg, "image build transport failure");
                last_transport_error = msg;
                if attempt < BUILD_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    Err(ImageBuildError::BuildFailed(format!(
        "engine unreachable after {} attempts: {}",
        BUILD_ATTEMPTS, last_transport_error
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn context_contains_all_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "console.log(1)\n").unwrap();

        let context = build_context(dir.path()).unwrap();

        let mut decoder = GzDecoder::new(&context[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw).unwrap();

        let mut archive = tar::Archive::new(&raw[..]);
        let paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();

        assert!(paths.iter().any(|p| p.ends_with("Dockerfile")));
        assert!(paths.iter().any(|p| p.ends_with("src/index.js")));
    }

    #[test]
    fn context_for_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(
            build_context(&missing),
            Err(ImageBuildError::Context(_))
        ));
    }
}
