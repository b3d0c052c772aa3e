// ABOUTME: Logs command implementation.
// ABOUTME: Prints a bounded window of an application container's output.

use super::runtime_connection::{connect_to_runtime, require_app_container};
use berth::config::Config;
use berth::error::{Error, Result};
use berth::output::Output;
use berth::runtime::ContainerManager;

/// Print the last `tail` lines of an application's container output.
pub async fn logs(config: Config, subdomain: &str, tail: u32, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;
    let container = require_app_container(&runtime, subdomain).await?;

    let manager = ContainerManager::new(&runtime);
    let text = manager
        .tail_logs(&container.id, tail)
        .await
        .map_err(|e| Error::Runtime(e.to_string()))?;

    print!("{text}");
    Ok(())
}
