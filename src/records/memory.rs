// ABOUTME: In-memory record store backed by parking_lot::RwLock.
// ABOUTME: Reference implementation for the CLI and tests.

use super::store::{RecordStore, StoreError};
use super::{Application, AttemptStatus, DeploymentAttempt, DomainRecord};
use crate::types::{AppId, DeploymentId, OwnerId, Subdomain};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Inner {
    apps: HashMap<AppId, Application>,
    attempts: HashMap<DeploymentId, DeploymentAttempt>,
    env: HashMap<AppId, HashMap<String, String>>,
    domains: HashMap<String, DomainRecord>,
    subdomains: HashSet<Subdomain>,
    ports: HashSet<u16>,
}

/// In-memory record store. All operations take a single lock, which is what
/// makes the reserve-if-absent operations atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_app(&self, app: Application) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.apps.contains_key(&app.id) {
            return Err(StoreError::Conflict(format!(
                "application {} already exists",
                app.id
            )));
        }
        inner.subdomains.insert(app.subdomain.clone());
        if let Some(port) = app.static_port {
            inner.ports.insert(port);
        }
        inner.apps.insert(app.id.clone(), app);
        Ok(())
    }

    async fn get_app(&self, id: &AppId) -> Result<Application, StoreError> {
        self.inner
            .read()
            .apps
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("application {id}")))
    }

    async fn find_app_by_subdomain(
        &self,
        subdomain: &Subdomain,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .inner
            .read()
            .apps
            .values()
            .find(|app| &app.subdomain == subdomain)
            .cloned())
    }

    async fn update_app(&self, app: Application) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if !inner.apps.contains_key(&app.id) {
            return Err(StoreError::NotFound(format!("application {}", app.id)));
        }
        inner.apps.insert(app.id.clone(), app);
        Ok(())
    }

    async fn list_apps(&self, owner: Option<&OwnerId>) -> Result<Vec<Application>, StoreError> {
        let inner = self.inner.read();
        let mut apps: Vec<Application> = inner
            .apps
            .values()
            .filter(|app| owner.is_none_or(|o| &app.owner == o))
            .cloned()
            .collect();
        apps.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(apps)
    }

    async fn delete_app(&self, id: &AppId) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let app = inner
            .apps
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("application {id}")))?;
        inner.subdomains.remove(&app.subdomain);
        if let Some(port) = app.static_port {
            inner.ports.remove(&port);
        }
        inner.attempts.retain(|_, attempt| &attempt.app_id != id);
        inner.env.remove(id);
        inner.domains.retain(|_, record| &record.app_id != id);
        Ok(())
    }

    async fn create_attempt(&self, attempt: DeploymentAttempt) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.attempts.contains_key(&attempt.id) {
            return Err(StoreError::Conflict(format!(
                "attempt {} already exists",
                attempt.id
            )));
        }
        inner.attempts.insert(attempt.id.clone(), attempt);
        Ok(())
    }

    async fn get_attempt(&self, id: &DeploymentId) -> Result<DeploymentAttempt, StoreError> {
        self.inner
            .read()
            .attempts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("attempt {id}")))
    }

    async fn list_attempts(&self, app_id: &AppId) -> Result<Vec<DeploymentAttempt>, StoreError> {
        let inner = self.inner.read();
        let mut attempts: Vec<DeploymentAttempt> = inner
            .attempts
            .values()
            .filter(|attempt| &attempt.app_id == app_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(attempts)
    }

    async fn append_attempt_log(&self, id: &DeploymentId, line: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let attempt = inner
            .attempts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("attempt {id}")))?;
        if attempt.status.is_terminal() {
            return Err(StoreError::TerminalAttempt(id.clone()));
        }
        attempt.log.push_str(line);
        attempt.log.push('\n');
        Ok(())
    }

    async fn set_attempt_status(
        &self,
        id: &DeploymentId,
        status: AttemptStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let attempt = inner
            .attempts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("attempt {id}")))?;
        if attempt.status.is_terminal() {
            return Err(StoreError::TerminalAttempt(id.clone()));
        }
        attempt.status = status;
        if status.is_terminal() {
            attempt.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_commit(
        &self,
        id: &DeploymentId,
        hash: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let attempt = inner
            .attempts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("attempt {id}")))?;
        if attempt.status.is_terminal() {
            return Err(StoreError::TerminalAttempt(id.clone()));
        }
        attempt.commit_hash = Some(hash.to_string());
        attempt.commit_message = Some(message.to_string());
        Ok(())
    }

    async fn set_env_var(
        &self,
        app_id: &AppId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if !inner.apps.contains_key(app_id) {
            return Err(StoreError::NotFound(format!("application {app_id}")));
        }
        inner
            .env
            .entry(app_id.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn env_for_app(&self, app_id: &AppId) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.inner.read().env.get(app_id).cloned().unwrap_or_default())
    }

    async fn upsert_domain(&self, record: DomainRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.domains.insert(record.domain.clone(), record);
        Ok(())
    }

    async fn verified_domain_for_app(
        &self,
        app_id: &AppId,
    ) -> Result<Option<DomainRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .domains
            .values()
            .find(|record| {
                &record.app_id == app_id
                    && record.verification == super::DomainVerification::Verified
            })
            .cloned())
    }

    async fn reserve_subdomain(&self, subdomain: &Subdomain) -> Result<bool, StoreError> {
        Ok(self.inner.write().subdomains.insert(subdomain.clone()))
    }

    async fn reserve_port(&self, port: u16) -> Result<bool, StoreError> {
        Ok(self.inner.write().ports.insert(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AppStatus, BuildMethod, DomainVerification};

    fn sample_app(subdomain: &str) -> Application {
        Application {
            id: AppId::generate(),
            owner: OwnerId::new("owner-1".to_string()),
            repo_url: "https://github.com/acme/web.git".to_string(),
            branch: "main".to_string(),
            build_method: BuildMethod::Auto,
            subdomain: Subdomain::new(subdomain).unwrap(),
            custom_domain: None,
            static_port: None,
            status: AppStatus::Created,
            container_id: None,
            created_at: Utc::now(),
            last_deployed_at: None,
        }
    }

    #[tokio::test]
    async fn subdomain_reservation_is_exclusive() {
        let store = MemoryStore::new();
        let sub = Subdomain::new("myapp").unwrap();

        assert!(store.reserve_subdomain(&sub).await.unwrap());
        assert!(!store.reserve_subdomain(&sub).await.unwrap());
    }

    #[tokio::test]
    async fn creating_app_claims_its_subdomain() {
        let store = MemoryStore::new();
        let app = sample_app("claimed");
        store.create_app(app).await.unwrap();

        let sub = Subdomain::new("claimed").unwrap();
        assert!(!store.reserve_subdomain(&sub).await.unwrap());
    }

    #[tokio::test]
    async fn delete_app_releases_identity_and_children() {
        let store = MemoryStore::new();
        let mut app = sample_app("doomed");
        app.static_port = Some(10001);
        let app_id = app.id.clone();
        store.create_app(app).await.unwrap();

        let attempt = DeploymentAttempt::new(app_id.clone(), "test".to_string());
        let attempt_id = attempt.id.clone();
        store.create_attempt(attempt).await.unwrap();
        store
            .upsert_domain(DomainRecord {
                domain: "www.acme.io".to_string(),
                app_id: app_id.clone(),
                verification: DomainVerification::Verified,
            })
            .await
            .unwrap();

        store.delete_app(&app_id).await.unwrap();

        assert!(store.get_attempt(&attempt_id).await.is_err());
        assert!(
            store
                .reserve_subdomain(&Subdomain::new("doomed").unwrap())
                .await
                .unwrap()
        );
        assert!(store.reserve_port(10001).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_attempt_is_frozen() {
        let store = MemoryStore::new();
        let app = sample_app("frozen");
        let app_id = app.id.clone();
        store.create_app(app).await.unwrap();

        let attempt = DeploymentAttempt::new(app_id, "test".to_string());
        let id = attempt.id.clone();
        store.create_attempt(attempt).await.unwrap();

        store
            .append_attempt_log(&id, "fetching source")
            .await
            .unwrap();
        store
            .set_attempt_status(&id, AttemptStatus::Success)
            .await
            .unwrap();

        assert!(matches!(
            store.append_attempt_log(&id, "late line").await,
            Err(StoreError::TerminalAttempt(_))
        ));
        assert!(matches!(
            store.set_attempt_status(&id, AttemptStatus::Failed).await,
            Err(StoreError::TerminalAttempt(_))
        ));

        let stored = store.get_attempt(&id).await.unwrap();
        assert_eq!(stored.status, AttemptStatus::Success);
        assert!(stored.finished_at.is_some());
        assert_eq!(stored.log, "fetching source\n");
    }

    #[tokio::test]
    async fn env_vars_round_trip() {
        let store = MemoryStore::new();
        let app = sample_app("envy");
        let app_id = app.id.clone();
        store.create_app(app).await.unwrap();

        store.set_env_var(&app_id, "DATABASE_URL", "postgres://x").await.unwrap();
        store.set_env_var(&app_id, "DATABASE_URL", "postgres://y").await.unwrap();

        let env = store.env_for_app(&app_id).await.unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env["DATABASE_URL"], "postgres://y");
    }
}
