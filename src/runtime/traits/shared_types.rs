// ABOUTME: Shared configuration types consumed by the runtime traits.
// ABOUTME: Container creation config, resource limits, and restart policy.

use std::collections::HashMap;
use std::time::Duration;

/// Restart policy applied to a created container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RestartPolicyConfig {
    No,
    #[default]
    Always,
    UnlessStopped,
    OnFailure {
        max_retries: Option<u32>,
    },
}

/// Hard resource ceilings for an application container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    pub memory: i64,
    /// Memory + swap ceiling in bytes.
    pub memory_swap: i64,
    /// CPU ceiling in nano-CPUs (1 CPU = 1_000_000_000).
    pub nano_cpus: i64,
}

impl ResourceLimits {
    /// Fixed defaults every app container runs under: 512 MiB memory,
    /// 1 GiB memory+swap, 1 CPU.
    pub fn standard() -> Self {
        Self {
            memory: 512 * 1024 * 1024,
            memory_swap: 1024 * 1024 * 1024,
            nano_cpus: 1_000_000_000,
        }
    }
}

/// Everything needed to create an application container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub name: String,
    /// Image tag to run, as the engine knows it.
    pub image: String,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    /// Port the application listens on inside the container.
    pub container_port: u16,
    /// Specific host port to bind. None publishes an engine-assigned
    /// ephemeral port, unless the container joins a proxy network instead.
    pub host_port: Option<u16>,
    /// Shared proxy network to attach to. When set, no host port is
    /// published; the proxy routes by environment variable convention.
    pub network: Option<String>,
    pub restart_policy: RestartPolicyConfig,
    pub resources: ResourceLimits,
    pub stop_timeout: Option<Duration>,
}

/// Current state of a container as the engine reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Detailed information about a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: crate::types::ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Host port the container port is published on, if any.
    pub host_port: Option<u16>,
    pub labels: HashMap<String, String>,
}

/// Configuration for exec-ing a command inside a running container.
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: Option<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
}

/// Result of an exec'd command.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
