// ABOUTME: Deployment engine: the public trigger/status/log/lifecycle surface.
// ABOUTME: Spawns pipeline attempts onto the per-application job queue.

use crate::config::{Config, resolve_env_map};
use crate::deploy::{
    Attempt, DeployError, DeployErrorKind, JobQueue, Pipeline, Routed, Transcript,
};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::records::{
    AppStatus, Application, AttemptStatus, BuildMethod, DeploymentAttempt, RecordStore, StoreError,
};
use crate::runtime::{
    ContainerError, ContainerManager, ContainerOps, ExecOps, ImageOps, LogOps, NetworkOps,
};
use crate::source::normalize_repo_url;
use crate::tls::ProvisionerSettings;
use crate::types::{AppId, DeploymentId, OwnerId};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything an app container runtime must provide for deployments.
pub trait DeployRuntime:
    ContainerOps + ImageOps + NetworkOps + ExecOps + LogOps + Send + Sync
{
}

impl<T> DeployRuntime for T where
    T: ContainerOps + ImageOps + NetworkOps + ExecOps + LogOps + Send + Sync
{
}

/// Request for a first-time deploy that creates the application on the fly.
#[derive(Debug, Clone)]
pub struct SourceDeployRequest {
    pub owner: OwnerId,
    pub name: String,
    pub repo_url: String,
    pub branch: String,
    pub build_method: BuildMethod,
    pub env: HashMap<String, String>,
    pub custom_domain: Option<String>,
}

/// The deployment engine.
///
/// `deploy` is fire-and-forget: it records a pending attempt, spawns the
/// pipeline onto the per-application queue, and returns immediately. Status
/// and transcript are polled through `logs`.
pub struct Engine<R, S> {
    runtime: Arc<R>,
    store: Arc<S>,
    config: Arc<Config>,
    queue: Arc<JobQueue>,
}

impl<R, S> Clone for Engine<R, S> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<R, S> Engine<R, S>
where
    R: DeployRuntime + 'static,
    S: RecordStore + 'static,
{
    pub fn new(runtime: Arc<R>, store: Arc<S>, config: Config) -> Self {
        Self {
            runtime,
            store,
            config: Arc::new(config),
            queue: Arc::new(JobQueue::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Trigger a deployment for an existing application. Returns the pending
    /// attempt; the pipeline runs in the background.
    pub async fn deploy(&self, app_id: &AppId) -> Result<DeploymentAttempt> {
        let app = self.store.get_app(app_id).await.map_err(map_store)?;

        let attempt = DeploymentAttempt::new(app.id.clone(), initiator());
        self.store
            .create_attempt(attempt.clone())
            .await
            .map_err(map_store)?;

        self.spawn_attempt(app, attempt.id.clone());
        Ok(attempt)
    }

    /// First-time deploy: create the application record, seed its environment,
    /// then trigger the pipeline.
    pub async fn deploy_from_source(
        &self,
        request: SourceDeployRequest,
    ) -> Result<(Application, DeploymentAttempt)> {
        let repo_url = normalize_repo_url(&request.repo_url)
            .map_err(|e| Error::Deploy(e.to_string()))?;

        let subdomain = crate::alloc::allocate_subdomain(self.store.as_ref(), &request.name)
            .await
            .map_err(|e| Error::Deploy(e.to_string()))?;

        let app = Application {
            id: AppId::generate(),
            owner: request.owner,
            repo_url,
            branch: request.branch,
            build_method: request.build_method,
            subdomain,
            custom_domain: request.custom_domain,
            static_port: None,
            status: AppStatus::Created,
            container_id: None,
            created_at: Utc::now(),
            last_deployed_at: None,
        };
        self.store.create_app(app.clone()).await.map_err(map_store)?;

        for (key, value) in &request.env {
            self.store
                .set_env_var(&app.id, key, value)
                .await
                .map_err(map_store)?;
        }

        let attempt = self.deploy(&app.id).await?;
        Ok((app, attempt))
    }

    /// Transcript and status for one attempt of an application.
    pub async fn logs(
        &self,
        app_id: &AppId,
        deployment_id: &DeploymentId,
    ) -> Result<(String, AttemptStatus)> {
        let attempt = self.store.get_attempt(deployment_id).await.map_err(map_store)?;
        if &attempt.app_id != app_id {
            return Err(Error::UnknownApp(app_id.to_string()));
        }
        Ok((attempt.log, attempt.status))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Container log window for an application. Never deployed yields empty.
    pub async fn runtime_logs(&self, app_id: &AppId) -> Result<String> {
        let app = self.store.get_app(app_id).await.map_err(map_store)?;
        let manager = ContainerManager::new(self.runtime.as_ref());

        match &app.container_id {
            Some(container) => manager
                .tail_logs(container, self.config.deploy.log_tail)
                .await
                .map_err(|e| Error::Runtime(e.to_string())),
            None => Ok(String::new()),
        }
    }

    pub async fn start_app(&self, app_id: &AppId) -> Result<()> {
        let mut app = self.store.get_app(app_id).await.map_err(map_store)?;
        let manager = ContainerManager::new(self.runtime.as_ref());

        // An application that was never released has no container to start.
        let Some(container) = app.container_id.clone() else {
            return Err(Error::Deploy(
                "container is missing; redeploy the application".to_string(),
            ));
        };
        match manager.start(&container).await {
            Ok(()) => {}
            Err(ContainerError::NotFound(_)) => {
                return Err(Error::Deploy(
                    "container is missing; redeploy the application".to_string(),
                ));
            }
            Err(e) => return Err(Error::Runtime(e.to_string())),
        }

        app.status = AppStatus::Running;
        self.store.update_app(app).await.map_err(map_store)?;
        Ok(())
    }

    pub async fn stop_app(&self, app_id: &AppId) -> Result<()> {
        let mut app = self.store.get_app(app_id).await.map_err(map_store)?;
        let manager = ContainerManager::new(self.runtime.as_ref());

        let container = app.container_id.clone().unwrap_or_default();
        manager
            .stop(&container)
            .await
            .map_err(|e| Error::Runtime(e.to_string()))?;

        app.status = AppStatus::Stopped;
        self.store.update_app(app).await.map_err(map_store)?;
        Ok(())
    }

    pub async fn restart_app(&self, app_id: &AppId) -> Result<()> {
        let mut app = self.store.get_app(app_id).await.map_err(map_store)?;
        let manager = ContainerManager::new(self.runtime.as_ref());

        let container = app.container_id.clone().unwrap_or_default();
        match manager.restart(&container).await {
            Ok(()) => {}
            Err(ContainerError::NotFound(_)) => {
                return Err(Error::Deploy(
                    "container is missing; redeploy the application".to_string(),
                ));
            }
            Err(e) => return Err(Error::Runtime(e.to_string())),
        }

        app.status = AppStatus::Running;
        self.store.update_app(app).await.map_err(map_store)?;
        Ok(())
    }

    /// Stop and remove the container, then purge the application and
    /// everything keyed to it. Removal failure aborts the purge.
    pub async fn destroy_app(&self, app_id: &AppId) -> Result<()> {
        let app = self.store.get_app(app_id).await.map_err(map_store)?;
        let manager = ContainerManager::new(self.runtime.as_ref());

        let container = app.container_id.clone().unwrap_or_default();
        manager
            .stop_and_remove(&container)
            .await
            .map_err(|e| Error::Runtime(e.to_string()))?;

        self.store.delete_app(app_id).await.map_err(map_store)?;
        Ok(())
    }

    // =========================================================================
    // Pipeline execution
    // =========================================================================

    fn spawn_attempt(&self, app: Application, attempt_id: DeploymentId) {
        let engine = self.clone();
        tokio::spawn(async move {
            let app_id = app.id.clone();
            let deadline = engine.config.deploy.deadline;
            let queue = engine.queue.clone();

            let outcome = queue
                .run(&app_id, deadline, engine.run_attempt(app, attempt_id.clone()))
                .await;

            if let Err(deadline) = outcome {
                engine.record_failure(
                    &attempt_id,
                    &app_id,
                    &DeployError::unexpected(deadline.to_string()),
                    AppStatus::Failed,
                )
                .await;
            }
        });
    }

    /// One full pipeline run. Always leaves the attempt terminal.
    async fn run_attempt(&self, app: Application, attempt_id: DeploymentId) {
        let prior_status = app.status;

        if let Err(e) = self
            .store
            .set_attempt_status(&attempt_id, AttemptStatus::InProgress)
            .await
        {
            tracing::error!(attempt = %attempt_id, error = %e, "cannot begin attempt");
            return;
        }

        let mut building = app.clone();
        building.status = AppStatus::Building;
        if let Err(e) = self.store.update_app(building).await {
            tracing::warn!(app = %app.id, error = %e, "cannot mark application building");
        }

        let workdir = self.config.source_dir.join(attempt_id.to_string());
        let mut ctx = Pipeline {
            runtime: self.runtime.as_ref(),
            store: self.store.as_ref(),
            config: &self.config,
            cert: provisioner_settings(&self.config),
            transcript: Transcript::new(self.store.as_ref(), attempt_id.clone()),
            diagnostics: Diagnostics::default(),
        };

        let result = run_pipeline(&mut ctx, app.clone(), workdir.clone()).await;

        match result {
            Ok(routed) => {
                ctx.transcript
                    .line(format!("Deployment succeeded: {}", routed.url()))
                    .await;
                if let Err(e) = self
                    .store
                    .set_attempt_status(&attempt_id, AttemptStatus::Success)
                    .await
                {
                    tracing::error!(attempt = %attempt_id, error = %e, "cannot finish attempt");
                }
            }
            Err(err) => {
                ctx.transcript
                    .line(format!("error: {}", err))
                    .await;
                if let Some(remediation) = err.remediation() {
                    ctx.transcript.line(remediation).await;
                }

                // Container-stage failures leave the application as it was;
                // everything earlier marks it failed.
                let app_status = match err.kind {
                    DeployErrorKind::ContainerMissing
                    | DeployErrorKind::ContainerOperationFailed => prior_status,
                    _ => AppStatus::Failed,
                };
                self.record_failure(&attempt_id, &app.id, &err, app_status)
                    .await;
            }
        }

        // The checkout is attempt-scoped; removal failure is only a warning.
        if workdir.exists()
            && let Err(e) = std::fs::remove_dir_all(&workdir)
        {
            ctx.diagnostics.warn(Warning::workdir_cleanup(format!(
                "could not remove {}: {}",
                workdir.display(),
                e
            )));
        }
    }

    async fn record_failure(
        &self,
        attempt_id: &DeploymentId,
        app_id: &AppId,
        err: &DeployError,
        app_status: AppStatus,
    ) {
        tracing::error!(attempt = %attempt_id, kind = %err.kind, "deployment failed: {}", err.message());

        if let Err(e) = self
            .store
            .set_attempt_status(attempt_id, AttemptStatus::Failed)
            .await
        {
            // A second terminal write races only with the deadline path.
            tracing::debug!(attempt = %attempt_id, error = %e, "attempt already terminal");
        }

        match self.store.get_app(app_id).await {
            Ok(mut app) => {
                app.status = app_status;
                if let Err(e) = self.store.update_app(app).await {
                    tracing::warn!(app = %app_id, error = %e, "cannot record application status");
                }
            }
            Err(e) => tracing::warn!(app = %app_id, error = %e, "cannot load application"),
        }
    }
}

async fn run_pipeline<R, S>(
    ctx: &mut Pipeline<'_, R, S>,
    app: Application,
    workdir: PathBuf,
) -> std::result::Result<Attempt<Routed>, DeployError>
where
    R: DeployRuntime,
    S: RecordStore + ?Sized,
{
    Attempt::new(app, workdir)
        .fetch_source(ctx)
        .await?
        .resolve_method(ctx)
        .await?
        .build_image(ctx)
        .await?
        .release(ctx)
        .await?
        .route(ctx)
        .await
}

fn initiator() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

fn map_store(err: StoreError) -> Error {
    match err {
        StoreError::NotFound(what) => Error::UnknownApp(what),
        other => Error::Runtime(other.to_string()),
    }
}

fn provisioner_settings(config: &Config) -> Option<ProvisionerSettings> {
    let acme = config.acme.as_ref()?;
    let credentials = match resolve_env_map(&acme.credentials) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "certificate credentials unresolved; TLS work disabled");
            return None;
        }
    };

    Some(ProvisionerSettings {
        base_domain: config.base_domain.clone(),
        wildcard_certificate: config.wildcard_certificate,
        dns_provider: acme.dns_provider.clone(),
        credentials,
        helper_container: acme.helper_container.clone(),
        acme_home: acme.home_dir.clone(),
        staging: acme.staging,
        timeout: acme.timeout,
        cert_dir: config.proxy.cert_dir.clone(),
        proxy_container: config.proxy.container.clone(),
        reload_command: config.proxy.reload_command.clone(),
    })
}
