// ABOUTME: Shared helpers for connecting to the local container runtime.
// ABOUTME: Eliminates duplication across deploy, status, logs, and lifecycle commands.

use berth::config::Config;
use berth::error::{Error, Result};
use berth::output::Output;
use berth::runtime::{
    BollardRuntime, ContainerFilters, ContainerOps, ContainerSummary, RuntimeError,
    RuntimeErrorKind, RuntimeInfo, detect_local,
};

/// Connect to the container runtime on this host.
///
/// This handles the common pattern of:
/// 1. Detecting the runtime type and socket path
/// 2. Outputting progress messages
/// 3. Establishing and verifying the connection
pub async fn connect_to_runtime(config: &Config, output: &Output) -> Result<BollardRuntime> {
    let info = detect_local(config.runtime.socket.as_deref()).map_err(connect_error)?;

    output.progress(&format!(
        "  → Found {} at {}",
        info.runtime_type, info.socket_path
    ));

    let runtime = BollardRuntime::connect(&info).map_err(connect_error)?;
    runtime.ping().await.map_err(connect_error)?;
    Ok(runtime)
}

fn connect_error(source: impl Into<RuntimeError>) -> Error {
    let err = source.into();
    match err.kind() {
        RuntimeErrorKind::NoRuntimeFound => Error::Runtime(format!(
            "{err}; install Docker or Podman and start its daemon"
        )),
        _ => Error::Runtime(err.to_string()),
    }
}

/// Find the managed container for an application subdomain, running or not.
pub async fn find_app_container(
    runtime: &BollardRuntime,
    subdomain: &str,
) -> Result<Option<ContainerSummary>> {
    let filters = ContainerFilters::for_subdomain(subdomain, true);

    let containers = runtime
        .list_containers(&filters)
        .await
        .map_err(|e| Error::Runtime(format!("failed to list containers: {e}")))?;

    Ok(containers.into_iter().next())
}

/// Like `find_app_container`, but a missing container is an error.
pub async fn require_app_container(
    runtime: &BollardRuntime,
    subdomain: &str,
) -> Result<ContainerSummary> {
    find_app_container(runtime, subdomain)
        .await?
        .ok_or_else(|| Error::UnknownApp(subdomain.to_string()))
}
