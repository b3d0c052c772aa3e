// ABOUTME: Status command implementation.
// ABOUTME: Lists managed application containers and their states.

use super::runtime_connection::connect_to_runtime;
use berth::config::Config;
use berth::error::{Error, Result};
use berth::output::Output;
use berth::runtime::{ContainerFilters, ContainerOps, RuntimeInfo};

/// Show every container berth manages on this host, running or not.
pub async fn status(config: Config, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;

    let meta = runtime
        .info()
        .await
        .map_err(|e| Error::Runtime(e.to_string()))?;
    output.progress(&format!("  → {} {}", meta.name, meta.version));

    let filters = ContainerFilters::managed(true);

    let containers = runtime
        .list_containers(&filters)
        .await
        .map_err(|e| Error::Runtime(format!("failed to list containers: {e}")))?;

    if containers.is_empty() {
        println!("No deployed applications");
        return Ok(());
    }

    println!("{:<28} {:<10} {}", "NAME", "STATE", "IMAGE");
    for container in containers {
        let name = container.name.trim_start_matches('/');
        println!("{:<28} {:<10} {}", name, container.state, container.image);
    }

    Ok(())
}
