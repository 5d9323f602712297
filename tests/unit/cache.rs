use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tenant_gateway::config::BundleCacheConfig;
use tenant_gateway::db::enums::{IntegrationStatus, SystemType};
use tenant_gateway::gateway::{TenantGateway, WarningReason};
use tenant_gateway::store::{InMemoryStore, StoreOperation};

use crate::{gateway_config, seed_techcorp, seed_tenant};

fn cached_gateway(store: &Arc<InMemoryStore>, ttl: Duration) -> TenantGateway {
    let mut config = gateway_config();
    config.cache = Some(BundleCacheConfig { ttl });
    TenantGateway::new(store.clone(), config)
}

#[tokio::test]
async fn test_cache_hit_skips_credential_reads() {
    let store = Arc::new(InMemoryStore::new());
    seed_tenant(&store, "TechCorp", "techcorp.com");
    let gateway = cached_gateway(&store, Duration::from_secs(60));

    let first = gateway.fetch_credentials("techcorp.com").await.unwrap();
    let second = gateway.fetch_credentials("techcorp.com").await.unwrap();

    assert_eq!(first.credentials(), second.credentials());
    assert_eq!(store.calls(StoreOperation::GetCredential), 2);
    // organization and integration set are still checked on every call
    assert_eq!(store.calls(StoreOperation::ListIntegrations), 2);
    assert_eq!(gateway.cache().map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn test_cache_is_keyed_per_organization() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed_tenant(&store, "TechCorp", "techcorp.com");
    let b = seed_tenant(&store, "StartupIO", "startup.io");
    let gateway = cached_gateway(&store, Duration::from_secs(60));

    gateway.fetch_credentials("techcorp.com").await.unwrap();
    let bundle_b = gateway.fetch_credentials("startup.io").await.unwrap();
    let bundle_a = gateway.fetch_credentials("techcorp.com").await.unwrap();

    assert_eq!(bundle_a.organization_id(), a.organization.id);
    assert_eq!(bundle_b.organization_id(), b.organization.id);
    assert!(bundle_b.credentials().iter().all(|c| c.integration_id != a.jira.id));
}

#[tokio::test]
async fn test_status_change_invalidates_cached_bundle() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    let gateway = cached_gateway(&store, Duration::from_secs(60));

    let before = gateway.fetch_credentials("techcorp.com").await.unwrap();
    assert!(before.credential_for(SystemType::Notion).is_some());

    store.set_integration_status(tenant.notion.id, IntegrationStatus::Disconnected);
    let after = gateway.fetch_credentials("techcorp.com").await.unwrap();

    assert!(after.credential_for(SystemType::Notion).is_none());
    assert_eq!(after.credentials().len(), 1);
    assert_eq!(store.calls(StoreOperation::GetCredential), 3);
}

#[tokio::test]
async fn test_ttl_expiry_refetches() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    let gateway = cached_gateway(&store, Duration::from_millis(50));

    gateway.fetch_credentials("techcorp.com").await.unwrap();
    store.rotate_credential(
        tenant.jira.id,
        "rotated-jira-token",
        Some(Utc::now() + ChronoDuration::hours(2)),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    let bundle = gateway.fetch_credentials("techcorp.com").await.unwrap();
    let jira = bundle.credential_for(SystemType::Jira).unwrap();
    assert_eq!(jira.access_token.expose(), "rotated-jira-token");
}

#[tokio::test]
async fn test_entry_never_outlives_credential_expiry() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("TechCorp", "techcorp.com");
    let jira = store.add_integration(org.id, SystemType::Jira, IntegrationStatus::Connected);
    store.add_credential(
        jira.id,
        "short-lived",
        "cloud",
        "TECH",
        Some(Utc::now() + ChronoDuration::milliseconds(300)),
    );

    let mut config = gateway_config();
    config.expiry_leeway = ChronoDuration::zero();
    config.cache = Some(BundleCacheConfig {
        ttl: Duration::from_secs(60),
    });
    let gateway = TenantGateway::new(store.clone(), config);

    let fresh = gateway.fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(fresh.credentials().len(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let stale = gateway.fetch_credentials("techcorp.com").await.unwrap();
    assert!(stale.is_empty());
    assert_eq!(stale.warnings()[0].reason, WarningReason::Expired);
}

#[tokio::test]
async fn test_bundles_with_warnings_are_not_cached() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    let gateway = cached_gateway(&store, Duration::from_secs(60));

    gateway.fetch_credentials("techcorp.com").await.unwrap();
    gateway.fetch_credentials("techcorp.com").await.unwrap();

    assert_eq!(store.calls(StoreOperation::GetCredential), 4);
    assert_eq!(gateway.cache().map(|c| c.is_empty()), Some(true));
}

#[tokio::test]
async fn test_explicit_invalidation() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    let gateway = cached_gateway(&store, Duration::from_secs(60));

    gateway.fetch_credentials("techcorp.com").await.unwrap();
    gateway.invalidate_cached(tenant.organization.id);
    gateway.fetch_credentials("techcorp.com").await.unwrap();

    assert_eq!(store.calls(StoreOperation::GetCredential), 4);
}

#[tokio::test]
async fn test_out_of_range_ttl_skips_caching() {
    let store = Arc::new(InMemoryStore::new());
    let organization = store.add_organization("Example", "x.com");
    let notion =
        store.add_integration(organization.id, SystemType::Notion, IntegrationStatus::Connected);
    store.add_credential(notion.id, "notion_token_x", "workspace-x", "db-x", None);
    let gateway = cached_gateway(&store, Duration::from_secs(u64::MAX));

    let first = gateway.fetch_credentials("x.com").await.unwrap();
    let second = gateway.fetch_credentials("x.com").await.unwrap();

    assert_eq!(first.credentials(), second.credentials());
    assert_eq!(store.calls(StoreOperation::GetCredential), 2);
    assert_eq!(gateway.cache().map(|c| c.is_empty()), Some(true));
}
