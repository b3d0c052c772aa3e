// ABOUTME: Capability traits the deployment engine consumes.
// ABOUTME: Sealed per-concern traits instead of one monolithic runtime trait.

mod container;
mod exec;
mod image;
mod logs;
mod network;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use exec::{ExecError, ExecOps};
pub use image::{BuildOutput, ImageError, ImageOps};
pub use logs::{LogError, LogOps};
pub use network::{NetworkError, NetworkOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError, RuntimeMetadata};
pub use shared_types::{
    ContainerConfig, ContainerInfo, ContainerState, ExecConfig, ExecResult, ResourceLimits,
    RestartPolicyConfig,
};
