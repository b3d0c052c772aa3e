// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, defaults, env var interpolation, and the init template.

use berth::config::*;
use berth::error::Error;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = "base_domain: apps.example.com\n";
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.base_domain, "apps.example.com");
        assert!(config.wildcard_certificate);
        assert_eq!(config.proxy.network, "berth");
        assert_eq!(config.proxy.container, "berth-proxy");
        assert_eq!(config.proxy.reload_command, vec!["nginx", "-s", "reload"]);
        assert!(config.static_ports.is_none());
        assert!(config.acme.is_none());
        assert_eq!(config.deploy.deadline, Duration::from_secs(30 * 60));
        assert_eq!(config.deploy.log_tail, 200);
        assert!(config.runtime.socket.is_none());
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
base_domain: apps.example.com
wildcard_certificate: false
source_dir: /srv/berth/sources

proxy:
  network: edge
  container: edge-proxy
  reload_command: ["caddy", "reload"]
  cert_dir: /srv/certs

static_ports:
  start: 9000
  end: 9100

acme:
  email: ops@example.com
  dns_provider: dns_cf
  credentials:
    CF_Token:
      env: CF_API_TOKEN
      default: ""
  staging: true
  timeout: 2m

deploy:
  deadline: 45m
  log_tail: 50

runtime:
  socket: /run/podman/podman.sock
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert!(!config.wildcard_certificate);
        assert_eq!(config.source_dir.to_str().unwrap(), "/srv/berth/sources");
        assert_eq!(config.proxy.network, "edge");
        assert_eq!(config.proxy.cert_dir.to_str().unwrap(), "/srv/certs");

        let range = config.static_ports.unwrap();
        assert_eq!((range.start, range.end), (9000, 9100));

        let acme = config.acme.as_ref().unwrap();
        assert_eq!(acme.email, "ops@example.com");
        assert_eq!(acme.dns_provider, "dns_cf");
        assert!(acme.staging);
        assert_eq!(acme.timeout, Duration::from_secs(120));
        assert_eq!(acme.helper_container, "berth-acme");

        assert_eq!(config.deploy.deadline, Duration::from_secs(45 * 60));
        assert_eq!(config.deploy.log_tail, 50);
        assert_eq!(config.runtime.socket.as_deref(), Some("/run/podman/podman.sock"));
    }

    #[test]
    fn base_domain_is_required() {
        assert!(Config::from_yaml("proxy:\n  network: edge\n").is_err());
    }
}

mod validation {
    use super::*;

    #[test]
    fn empty_base_domain_is_invalid() {
        let config = Config::from_yaml("base_domain: \"\"\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn inverted_port_range_is_invalid() {
        let yaml = "base_domain: apps.example.com\nstatic_ports:\n  start: 9100\n  end: 9000\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn sensible_config_validates() {
        let yaml = "base_domain: apps.example.com\nstatic_ports:\n  start: 9000\n  end: 9100\n";
        Config::from_yaml(yaml).unwrap().validate().unwrap();
    }
}

mod env_values {
    use super::*;

    #[test]
    fn credentials_resolve_from_process_environment() {
        let yaml = r#"
base_domain: apps.example.com
acme:
  email: ops@example.com
  dns_provider: dns_cf
  credentials:
    CF_Token:
      env: BERTH_TEST_CF_TOKEN
    CF_Account_ID: literal-account
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let credentials = &config.acme.as_ref().unwrap().credentials;

        temp_env::with_var("BERTH_TEST_CF_TOKEN", Some("secret"), || {
            let resolved = resolve_env_map(credentials).unwrap();
            assert_eq!(resolved["CF_Token"], "secret");
            assert_eq!(resolved["CF_Account_ID"], "literal-account");
        });
    }

    #[test]
    fn unset_credential_without_default_fails() {
        let yaml = r#"
base_domain: apps.example.com
acme:
  email: ops@example.com
  dns_provider: dns_cf
  credentials:
    CF_Token:
      env: BERTH_TEST_UNSET_TOKEN
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let credentials = &config.acme.as_ref().unwrap().credentials;

        temp_env::with_var_unset("BERTH_TEST_UNSET_TOKEN", || {
            assert!(matches!(
                resolve_env_map(credentials),
                Err(Error::MissingEnvVar(_))
            ));
        });
    }
}

mod template {
    use super::*;

    #[test]
    fn init_writes_a_parseable_template() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("apps.example.com"), false).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.base_domain, "apps.example.com");
        config.validate().unwrap();
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, false).unwrap();

        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), None, true).unwrap();
    }

    #[test]
    fn discover_finds_alternate_filenames() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("berth.yaml"), "base_domain: apps.example.com\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.base_domain, "apps.example.com");
    }

    #[test]
    fn discover_errors_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}
