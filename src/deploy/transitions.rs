// ABOUTME: State transition implementations for the deployment pipeline.
// ABOUTME: Each stage consumes the attempt and returns it in the next state.

use super::deployment::{Attempt, Pipeline};
use super::error::DeployError;
use super::state::{Accepted, ImageBuilt, MethodResolved, Released, Routed, SourceFetched};
use crate::build;
use crate::diagnostics::Warning;
use crate::records::{AppStatus, RecordStore};
use crate::runtime::{
    ContainerConfig, ContainerManager, ContainerOps, ExecOps, ImageOps, NetworkOps,
    ResourceLimits, RestartPolicyConfig,
};
use crate::source;
use crate::tls;
use crate::types::ImageTag;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;

const VIRTUAL_HOST: &str = "VIRTUAL_HOST";
const VIRTUAL_PORT: &str = "VIRTUAL_PORT";
const LETSENCRYPT_HOST: &str = "LETSENCRYPT_HOST";
const LETSENCRYPT_EMAIL: &str = "LETSENCRYPT_EMAIL";

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

impl Attempt<Accepted> {
    /// Clone the branch at depth 1 and record the resolved commit.
    pub async fn fetch_source<R, S>(
        self,
        ctx: &mut Pipeline<'_, R, S>,
    ) -> Result<Attempt<SourceFetched>, DeployError>
    where
        S: RecordStore + ?Sized,
    {
        ctx.transcript
            .line(format!(
                "Fetching {} (branch {})",
                self.app.repo_url, self.app.branch
            ))
            .await;

        let repo_url = self.app.repo_url.clone();
        let branch = self.app.branch.clone();
        let target = self.workdir.clone();

        // git2 is blocking; keep it off the async executor.
        let commit = tokio::task::spawn_blocking(move || source::fetch(&repo_url, &branch, &target))
            .await
            .map_err(|e| DeployError::unexpected(format!("fetch task failed: {e}")))??;

        ctx.store
            .record_commit(ctx.transcript.attempt_id(), &commit.hash, &commit.message)
            .await?;
        ctx.transcript
            .line(format!(
                "Resolved commit {} \"{}\" by {}",
                short_hash(&commit.hash),
                commit.message,
                commit.author
            ))
            .await;

        Ok(Attempt {
            app: self.app,
            workdir: self.workdir,
            state: SourceFetched { commit },
        })
    }
}

impl Attempt<SourceFetched> {
    /// Ensure a canonical Dockerfile exists at the checkout root.
    pub async fn resolve_method<R, S>(
        self,
        ctx: &mut Pipeline<'_, R, S>,
    ) -> Result<Attempt<MethodResolved>, DeployError>
    where
        S: RecordStore + ?Sized,
    {
        let method = build::resolve(&self.workdir, &self.app.build_method)?;
        ctx.transcript
            .line(format!("Build method: {}", method.describe()))
            .await;

        Ok(Attempt {
            app: self.app,
            workdir: self.workdir,
            state: MethodResolved {
                commit: self.state.commit,
                method,
            },
        })
    }
}

impl Attempt<MethodResolved> {
    /// Build and tag the image, relaying recent build output into the
    /// transcript. Environment variables double as build arguments.
    pub async fn build_image<R, S>(
        self,
        ctx: &mut Pipeline<'_, R, S>,
    ) -> Result<Attempt<ImageBuilt>, DeployError>
    where
        R: ImageOps,
        S: RecordStore + ?Sized,
    {
        let tag = ImageTag::for_build(self.app.subdomain.as_str(), &self.state.commit.hash);
        ctx.transcript
            .line(format!("Building image {}", tag))
            .await;

        let build_args = ctx.store.env_for_app(&self.app.id).await?;
        let window = ctx.config.deploy.log_tail as usize;

        let output =
            build::build(ctx.runtime, &self.workdir, &tag, &build_args, window).await?;

        ctx.transcript.block("  ", &output.lines).await;
        ctx.transcript
            .line(format!("Image built: {}", tag))
            .await;

        Ok(Attempt {
            app: self.app,
            workdir: self.workdir,
            state: ImageBuilt {
                commit: self.state.commit,
                tag,
            },
        })
    }
}

impl Attempt<ImageBuilt> {
    /// Replace the running container: best-effort removal of the old one,
    /// then create and start the new one and update the application record.
    pub async fn release<R, S>(
        mut self,
        ctx: &mut Pipeline<'_, R, S>,
    ) -> Result<Attempt<Released>, DeployError>
    where
        R: ContainerOps + NetworkOps,
        S: RecordStore + ?Sized,
    {
        let manager = ContainerManager::new(ctx.runtime);

        // Old container removal must not block the new release.
        if let Some(old) = self.app.container_id.take()
            && let Err(e) = manager.stop_and_remove(&old).await
        {
            let warning = Warning::container_cleanup(format!(
                "could not remove previous container {}: {}",
                old, e
            ));
            ctx.transcript
                .line(format!("warning: {}", warning.message))
                .await;
            ctx.diagnostics.warn(warning);
        }

        let fqdn = self.app.subdomain.fqdn(&ctx.config.base_domain);

        // Static port model publishes a host port; otherwise the container
        // joins the shared proxy network and nothing is published.
        let (host_port, network) = match &ctx.config.static_ports {
            Some(range) => {
                if self.app.static_port.is_none() {
                    let port =
                        crate::alloc::allocate_port(ctx.store, range.start, range.end).await?;
                    ctx.transcript
                        .line(format!("Allocated static port {}", port))
                        .await;
                    self.app.static_port = Some(port);
                }
                (self.app.static_port, None)
            }
            None => {
                manager.ensure_network(&ctx.config.proxy.network).await
                    .map_err(|e| DeployError::unexpected(format!(
                        "proxy network unavailable: {e}"
                    )))?;
                (None, Some(ctx.config.proxy.network.clone()))
            }
        };

        let env = self.routing_env(ctx, &fqdn).await?;

        let mut labels = HashMap::new();
        labels.insert("berth.app".to_string(), self.app.id.to_string());
        labels.insert("berth.managed".to_string(), "true".to_string());
        if let Some(domain) = &self.app.custom_domain {
            labels.insert("berth.custom-domain".to_string(), domain.clone());
        }

        let container_config = ContainerConfig {
            name: format!("berth-{}", self.app.subdomain.as_str()),
            image: self.state.tag.to_string(),
            env,
            labels,
            container_port: build::CONTAINER_PORT,
            host_port,
            network,
            restart_policy: RestartPolicyConfig::Always,
            resources: ResourceLimits::standard(),
            stop_timeout: Some(STOP_TIMEOUT),
        };

        let container = manager.run(&container_config).await?;
        ctx.transcript
            .line(format!("Container started: {}", container))
            .await;

        self.app.container_id = Some(container.clone());
        self.app.status = AppStatus::Running;
        self.app.last_deployed_at = Some(Utc::now());
        ctx.store.update_app(self.app.clone()).await?;

        Ok(Attempt {
            app: self.app,
            workdir: self.workdir,
            state: Released {
                commit: self.state.commit,
                container,
            },
        })
    }

    /// Application env plus the reserved proxy-routing variables, which are
    /// auto-populated (and persisted) when absent.
    async fn routing_env<R, S>(
        &self,
        ctx: &mut Pipeline<'_, R, S>,
        fqdn: &str,
    ) -> Result<HashMap<String, String>, DeployError>
    where
        S: RecordStore + ?Sized,
    {
        let mut env = ctx.store.env_for_app(&self.app.id).await?;

        let virtual_host = match &self.app.custom_domain {
            Some(domain) => format!("{},{}", fqdn, domain),
            None => fqdn.to_string(),
        };
        let letsencrypt_host = self.app.custom_domain.clone().unwrap_or_else(|| fqdn.to_string());
        let letsencrypt_email = ctx
            .config
            .acme
            .as_ref()
            .map(|acme| acme.email.clone())
            .unwrap_or_default();

        let reserved = [
            (VIRTUAL_HOST, virtual_host),
            (VIRTUAL_PORT, build::CONTAINER_PORT.to_string()),
            (LETSENCRYPT_HOST, letsencrypt_host),
            (LETSENCRYPT_EMAIL, letsencrypt_email),
        ];

        for (key, value) in reserved {
            if value.is_empty() || env.contains_key(key) {
                continue;
            }
            ctx.store.set_env_var(&self.app.id, key, &value).await?;
            env.insert(key.to_string(), value);
        }

        Ok(env)
    }
}

impl Attempt<Released> {
    /// Certificate work for a verified custom domain, then the public URL.
    ///
    /// Certificate failures are warnings: the application is already up and
    /// reachable via its default subdomain.
    pub async fn route<R, S>(
        self,
        ctx: &mut Pipeline<'_, R, S>,
    ) -> Result<Attempt<Routed>, DeployError>
    where
        R: ExecOps,
        S: RecordStore + ?Sized,
    {
        let manager = ContainerManager::new(ctx.runtime);
        let mut certificate = None;

        let verified_domain = ctx.store.verified_domain_for_app(&self.app.id).await?;

        if let Some(record) = verified_domain
            && let Some(settings) = &ctx.cert
        {
            ctx.transcript
                .line(format!("Provisioning certificate for {}", record.domain))
                .await;

            match tls::ensure_certificate(&manager, settings, &record.domain, &mut ctx.diagnostics)
                .await
            {
                Ok(outcome) => {
                    certificate = Some(outcome);
                    ctx.transcript
                        .line(format!("Certificate: {:?}", outcome))
                        .await;
                }
                Err(e) => {
                    let classified: DeployError = e.into();
                    let command = settings.issue_command(&record.domain);
                    let warning = Warning::certificate(format!(
                        "{} ({})",
                        classified.message(),
                        classified.kind
                    ));
                    ctx.transcript
                        .line(format!("warning: {}", warning.message))
                        .await;
                    ctx.transcript
                        .line(format!(
                            "  retry manually: {}",
                            command.rendered()
                        ))
                        .await;
                    ctx.diagnostics.warn(warning);
                }
            }
        }

        let url = match (&self.app.custom_domain, &certificate) {
            (Some(domain), Some(_)) => format!("https://{}", domain),
            _ => format!(
                "https://{}",
                self.app.subdomain.fqdn(&ctx.config.base_domain)
            ),
        };

        ctx.transcript.line(format!("Deployed: {}", url)).await;

        Ok(Attempt {
            app: self.app,
            workdir: self.workdir,
            state: Routed {
                container: self.state.container,
                url,
                certificate,
            },
        })
    }
}

impl Attempt<Routed> {
    pub fn url(&self) -> &str {
        &self.state.url
    }

    pub fn container(&self) -> &crate::types::ContainerId {
        &self.state.container
    }
}
