// ABOUTME: Configuration types and parsing for berth.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and defaults.

mod env_value;

pub use env_value::{EnvValue, resolve_env_map};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "berth.yml";
pub const CONFIG_FILENAME_ALT: &str = "berth.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".berth/config.yml";

/// Engine-wide configuration loaded from berth.yml.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base domain all default subdomains hang off (`myapp.<base_domain>`).
    pub base_domain: String,

    /// Whether a wildcard certificate for `*.base_domain` is already installed.
    /// When true, only custom domains need per-domain issuance.
    #[serde(default = "default_true")]
    pub wildcard_certificate: bool,

    /// Directory where per-attempt source checkouts are placed.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Static host-port allocation range. Absent means engine-assigned
    /// ephemeral ports (or proxy-network routing with no published ports).
    #[serde(default)]
    pub static_ports: Option<PortRangeConfig>,

    /// Certificate issuance settings. Absent disables custom-domain TLS.
    #[serde(default)]
    pub acme: Option<AcmeConfig>,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Shared proxy network containers are attached to. When set, app
    /// containers are routed via the proxy instead of publishing host ports.
    #[serde(default = "default_proxy_network")]
    pub network: String,

    /// Name of the reverse proxy container (reload target).
    #[serde(default = "default_proxy_container")]
    pub container: String,

    /// Command exec'd in the proxy container to reload its configuration.
    #[serde(default = "default_reload_command")]
    pub reload_command: Vec<String>,

    /// Directory the proxy watches for `<domain>.crt` / `<domain>.key` pairs.
    #[serde(default = "default_cert_dir")]
    pub cert_dir: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            network: default_proxy_network(),
            container: default_proxy_container(),
            reload_command: default_reload_command(),
            cert_dir: default_cert_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PortRangeConfig {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcmeConfig {
    /// Contact email registered with the CA.
    pub email: String,

    /// DNS provider hook name understood by the ACME client (e.g. `dns_cf`).
    pub dns_provider: String,

    /// Provider credentials, passed as environment to the ACME client.
    #[serde(default)]
    pub credentials: HashMap<String, EnvValue>,

    /// Name of the helper container the ACME client runs in.
    #[serde(default = "default_acme_container")]
    pub helper_container: String,

    /// ACME client home directory inside the helper container.
    #[serde(default = "default_acme_home")]
    pub home_dir: PathBuf,

    /// Use the CA's staging endpoint (for testing issuance without rate limits).
    #[serde(default)]
    pub staging: bool,

    #[serde(default = "default_acme_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Hard deadline for one deployment attempt.
    #[serde(default = "default_deadline", with = "humantime_serde")]
    pub deadline: Duration,

    /// Most-recent log lines returned by container log retrieval.
    #[serde(default = "default_log_tail")]
    pub log_tail: u32,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            deadline: default_deadline(),
            log_tail: default_log_tail(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSection {
    /// Explicit engine socket path. Auto-detected when unset.
    #[serde(default)]
    pub socket: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("/var/lib/berth/sources")
}

fn default_proxy_network() -> String {
    "berth".to_string()
}

fn default_proxy_container() -> String {
    "berth-proxy".to_string()
}

fn default_reload_command() -> Vec<String> {
    vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()]
}

fn default_cert_dir() -> PathBuf {
    PathBuf::from("/etc/nginx/certs")
}

fn default_acme_container() -> String {
    "berth-acme".to_string()
}

fn default_acme_home() -> PathBuf {
    PathBuf::from("/acme.sh")
}

fn default_acme_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_deadline() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_log_tail() -> u32 {
    200
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.base_domain.is_empty() {
            return Err(Error::InvalidConfig("base_domain cannot be empty".into()));
        }
        if let Some(range) = &self.static_ports
            && range.start > range.end
        {
            return Err(Error::InvalidConfig(format!(
                "static_ports range is empty ({}..{})",
                range.start, range.end
            )));
        }
        Ok(())
    }

    pub fn template() -> Self {
        Config {
            base_domain: "example.com".to_string(),
            wildcard_certificate: true,
            source_dir: default_source_dir(),
            proxy: ProxyConfig::default(),
            static_ports: None,
            acme: None,
            deploy: DeployConfig::default(),
            runtime: RuntimeSection::default(),
        }
    }
}

pub fn init_config(dir: &Path, base_domain: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let domain = base_domain.unwrap_or("example.com");
    let yaml = generate_template_yaml(domain);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(base_domain: &str) -> String {
    format!(
        r#"base_domain: {base_domain}
wildcard_certificate: true
proxy:
  network: berth
  container: berth-proxy
  cert_dir: /etc/nginx/certs
# acme:
#   email: ops@{base_domain}
#   dns_provider: dns_cf
#   credentials:
#     CF_Token:
#       env: CF_TOKEN
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_parses_with_defaults() {
        let config = Config::from_yaml("base_domain: example.com").unwrap();
        assert_eq!(config.base_domain, "example.com");
        assert!(config.wildcard_certificate);
        assert_eq!(config.proxy.network, "berth");
        assert_eq!(config.deploy.deadline, Duration::from_secs(1800));
        assert!(config.acme.is_none());
        assert!(config.static_ports.is_none());
    }

    #[test]
    fn validate_rejects_inverted_port_range() {
        let mut config = Config::template();
        config.static_ports = Some(PortRangeConfig {
            start: 2000,
            end: 1000,
        });
        assert!(config.validate().is_err());
    }
}
