// ABOUTME: Deploy command implementation.
// ABOUTME: Creates the application, triggers the pipeline, and relays the transcript.

use super::runtime_connection::connect_to_runtime;
use berth::config::Config;
use berth::engine::{Engine, SourceDeployRequest};
use berth::error::{Error, Result};
use berth::output::Output;
use berth::records::{AttemptStatus, BuildMethod, MemoryStore};
use berth::types::OwnerId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Arguments for the deploy command.
pub struct DeployArgs {
    pub repo: String,
    pub name: Option<String>,
    pub branch: String,
    pub method: String,
    pub env: Vec<String>,
    pub domain: Option<String>,
}

/// Deploy an application from a repository and wait for the attempt to finish.
pub async fn deploy(config: Config, args: DeployArgs, mut output: Output) -> Result<()> {
    config.validate()?;
    output.start_timer();

    let runtime = Arc::new(connect_to_runtime(&config, &output).await?);
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(runtime, store, config);

    let env = parse_env_pairs(&args.env)?;
    let name = args.name.clone().unwrap_or_else(|| repo_name(&args.repo));

    let request = SourceDeployRequest {
        owner: OwnerId::generate(),
        name,
        repo_url: args.repo,
        branch: args.branch,
        build_method: BuildMethod::parse(&args.method),
        env,
        custom_domain: args.domain,
    };

    let (app, attempt) = engine.deploy_from_source(request).await?;
    output.progress(&format!(
        "Deploying {} → https://{}",
        app.repo_url,
        app.subdomain.fqdn(&engine.config().base_domain)
    ));

    // Relay the transcript as it grows until the attempt reaches a terminal
    // status.
    let mut printed = 0;
    loop {
        let (log, status) = engine.logs(&app.id, &attempt.id).await?;
        if log.len() > printed {
            for line in log[printed..].lines() {
                output.progress(line);
            }
            printed = log.len();
        }

        match status {
            AttemptStatus::Success => {
                output.success(&format!(
                    "Deployed https://{}",
                    app.subdomain.fqdn(&engine.config().base_domain)
                ));
                return Ok(());
            }
            AttemptStatus::Failed => {
                output.error("deployment failed (see transcript above)");
                return Err(Error::Deploy("deployment failed".to_string()));
            }
            AttemptStatus::Pending | AttemptStatus::InProgress => {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}

/// Parse repeated `KEY=VALUE` flags into an environment map.
fn parse_env_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut env = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(Error::InvalidConfig(format!(
                "invalid --env '{pair}', expected KEY=VALUE"
            )));
        };
        if key.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "invalid --env '{pair}', key is empty"
            )));
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

/// Default application name: the final repository path segment.
fn repo_name(repo: &str) -> String {
    repo.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo)
        .trim_end_matches(".git")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_pairs_parse_and_reject() {
        let env = parse_env_pairs(&["A=1".to_string(), "B=two=parts".to_string()]).unwrap();
        assert_eq!(env["A"], "1");
        assert_eq!(env["B"], "two=parts");

        assert!(parse_env_pairs(&["NOEQUALS".to_string()]).is_err());
        assert!(parse_env_pairs(&["=value".to_string()]).is_err());
    }

    #[test]
    fn repo_name_strips_path_and_suffix() {
        assert_eq!(repo_name("https://github.com/acme/shop.git"), "shop");
        assert_eq!(repo_name("acme/shop"), "shop");
        assert_eq!(repo_name("git@github.com:acme/shop.git"), "shop");
    }
}
