// ABOUTME: Container runtime layer: detection, connection, capability traits.
// ABOUTME: Bollard client behind sealed traits so the engine stays testable.

mod bollard;
mod detection;
mod error;
mod manager;
pub mod traits;
mod types;

pub use bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use manager::ContainerManager;
pub use traits::{
    BuildOutput, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, ExecConfig, ExecError, ExecOps, ExecResult, ImageError,
    ImageOps, LogError, LogOps, NetworkError, NetworkOps, ResourceLimits, RestartPolicyConfig,
    RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
pub use types::{DetectedRuntime, RuntimeType};
