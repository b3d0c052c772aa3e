// ABOUTME: Start, stop, restart, and destroy command implementations.
// ABOUTME: Resolves the application's container by label and drives the manager.

use super::runtime_connection::{connect_to_runtime, require_app_container};
use berth::config::Config;
use berth::error::{Error, Result};
use berth::output::Output;
use berth::runtime::{ContainerError, ContainerManager, ImageOps};
use berth::types::ImageTag;

pub async fn start(config: Config, subdomain: &str, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;
    let container = require_app_container(&runtime, subdomain).await?;

    let manager = ContainerManager::new(&runtime);
    match manager.start(&container.id).await {
        Ok(()) => {
            output.success(&format!("Started {subdomain}"));
            Ok(())
        }
        Err(ContainerError::NotFound(_)) => Err(Error::Deploy(
            "container is missing; redeploy the application".to_string(),
        )),
        Err(e) => Err(Error::Runtime(e.to_string())),
    }
}

pub async fn stop(config: Config, subdomain: &str, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;
    let container = require_app_container(&runtime, subdomain).await?;

    let manager = ContainerManager::new(&runtime);
    manager
        .stop(&container.id)
        .await
        .map_err(|e| Error::Runtime(e.to_string()))?;

    output.success(&format!("Stopped {subdomain}"));
    Ok(())
}

pub async fn restart(config: Config, subdomain: &str, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;
    let container = require_app_container(&runtime, subdomain).await?;

    let manager = ContainerManager::new(&runtime);
    match manager.restart(&container.id).await {
        Ok(()) => {
            output.success(&format!("Restarted {subdomain}"));
            Ok(())
        }
        Err(ContainerError::NotFound(_)) => Err(Error::Deploy(
            "container is missing; redeploy the application".to_string(),
        )),
        Err(e) => Err(Error::Runtime(e.to_string())),
    }
}

/// Stop and remove the application's container, then clean up its image.
pub async fn destroy(config: Config, subdomain: &str, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(&config, &output).await?;
    let container = require_app_container(&runtime, subdomain).await?;

    let manager = ContainerManager::new(&runtime);
    manager
        .stop_and_remove(&container.id)
        .await
        .map_err(|e| Error::Runtime(e.to_string()))?;

    // Only images berth built itself are cleaned up; a failure here leaves
    // a dangling image, not a broken state, so it degrades to a warning.
    if let Ok(tag) = ImageTag::parse(&container.image) {
        if tag.name().starts_with("berth/") {
            match runtime.image_exists(&tag).await {
                Ok(true) => {
                    if let Err(e) = runtime.remove_image(&tag, false).await {
                        output.warning(&format!("could not remove image {tag}: {e}"));
                    }
                }
                Ok(false) => {}
                Err(e) => output.warning(&format!("could not inspect image {tag}: {e}")),
            }
        }
    }

    output.success(&format!("Destroyed {subdomain}"));
    Ok(())
}
