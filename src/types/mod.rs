// ABOUTME: Core value types shared across the engine.
// ABOUTME: Phantom-typed IDs and validated subdomain/image-tag newtypes.

mod id;
mod image_tag;
mod subdomain;

pub use id::{AppId, ContainerId, DeploymentId, Id, NetworkId, OwnerId};
pub use image_tag::{ImageTag, ParseImageTagError};
pub use subdomain::{Subdomain, SubdomainError};
