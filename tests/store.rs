// ABOUTME: Integration tests for the in-memory record store.
// ABOUTME: Covers queries, transcript ordering, domains, and contended reservation.

use berth::records::{
    AppStatus, Application, AttemptStatus, BuildMethod, DeploymentAttempt, DomainRecord,
    DomainVerification, MemoryStore, RecordStore, StoreError,
};
use berth::types::{AppId, OwnerId, Subdomain};
use chrono::Utc;

fn sample_app(subdomain: &str) -> Application {
    Application {
        id: AppId::generate(),
        owner: OwnerId::generate(),
        repo_url: "https://github.com/acme/shop.git".to_string(),
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

mod queries {
    use super::*;

    #[tokio::test]
    async fn find_by_subdomain() {
        let store = MemoryStore::new();
        let app = sample_app("shop");
        store.create_app(app.clone()).await.unwrap();

        let found = store
            .find_app_by_subdomain(&Subdomain::new("shop").unwrap())
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, app.id);

        let missing = store
            .find_app_by_subdomain(&Subdomain::new("ghost").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let store = MemoryStore::new();
        let a = sample_app("one");
        let b = sample_app("two");
        store.create_app(a.clone()).await.unwrap();
        store.create_app(b.clone()).await.unwrap();

        assert_eq!(store.list_apps(None).await.unwrap().len(), 2);
        let mine = store.list_apps(Some(&a.owner)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a.id);
    }

    #[tokio::test]
    async fn update_of_unknown_app_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_app(sample_app("ghost")).await,
            Err(StoreError::NotFound(_))
        ));
    }
}

mod attempts {
    use super::*;

    #[tokio::test]
    async fn transcript_preserves_line_order() {
        let store = MemoryStore::new();
        let app = sample_app("shop");
        store.create_app(app.clone()).await.unwrap();

        let attempt = DeploymentAttempt::new(app.id.clone(), "test".to_string());
        store.create_attempt(attempt.clone()).await.unwrap();

        store
            .append_attempt_log(&attempt.id, "Fetching source")
            .await
            .unwrap();
        store
            .append_attempt_log(&attempt.id, "Building image")
            .await
            .unwrap();

        let loaded = store.get_attempt(&attempt.id).await.unwrap();
        assert_eq!(loaded.log, "Fetching source\nBuilding image\n");
        assert_eq!(loaded.status, AttemptStatus::Pending);
    }

    #[tokio::test]
    async fn attempts_list_in_creation_order() {
        let store = MemoryStore::new();
        let app = sample_app("shop");
        store.create_app(app.clone()).await.unwrap();

        let first = DeploymentAttempt::new(app.id.clone(), "test".to_string());
        let second = DeploymentAttempt::new(app.id.clone(), "test".to_string());
        store.create_attempt(first.clone()).await.unwrap();
        store.create_attempt(second.clone()).await.unwrap();

        let listed = store.list_attempts(&app.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at <= listed[1].created_at);
    }

    #[tokio::test]
    async fn record_commit_sets_hash_and_message() {
        let store = MemoryStore::new();
        let app = sample_app("shop");
        store.create_app(app.clone()).await.unwrap();

        let attempt = DeploymentAttempt::new(app.id.clone(), "test".to_string());
        store.create_attempt(attempt.clone()).await.unwrap();
        store
            .record_commit(&attempt.id, "abc123", "fix checkout flow")
            .await
            .unwrap();

        let loaded = store.get_attempt(&attempt.id).await.unwrap();
        assert_eq!(loaded.commit_hash.as_deref(), Some("abc123"));
        assert_eq!(loaded.commit_message.as_deref(), Some("fix checkout flow"));
    }
}

mod domains {
    use super::*;

    #[tokio::test]
    async fn only_verified_domains_are_returned() {
        let store = MemoryStore::new();
        let app = sample_app("shop");
        store.create_app(app.clone()).await.unwrap();

        store
            .upsert_domain(DomainRecord {
                domain: "shop.example.net".to_string(),
                app_id: app.id.clone(),
                verification: DomainVerification::Unverified,
            })
            .await
            .unwrap();
        assert!(
            store
                .verified_domain_for_app(&app.id)
                .await
                .unwrap()
                .is_none()
        );

        // Upsert with the same domain key flips verification in place.
        store
            .upsert_domain(DomainRecord {
                domain: "shop.example.net".to_string(),
                app_id: app.id.clone(),
                verification: DomainVerification::Verified,
            })
            .await
            .unwrap();
        let verified = store.verified_domain_for_app(&app.id).await.unwrap();
        assert_eq!(verified.unwrap().domain, "shop.example.net");
    }
}

mod reservation {
    use super::*;

    #[tokio::test]
    async fn concurrent_reservation_admits_exactly_one() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .reserve_subdomain(&Subdomain::new("contested").unwrap())
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }
}
