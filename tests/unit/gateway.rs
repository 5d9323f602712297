use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tenant_gateway::db::enums::{IntegrationStatus, OrganizationStatus, SystemType};
use tenant_gateway::gateway::{GatewayError, TenantGateway, WarningReason, resolve_tenant};
use tenant_gateway::store::{InMemoryStore, StoreError, StoreOperation};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use crate::{gateway_config, seed_techcorp, seed_tenant};

fn gateway(store: &Arc<InMemoryStore>) -> TenantGateway {
    TenantGateway::new(store.clone(), gateway_config())
}

#[tokio::test]
async fn test_techcorp_gets_jira_and_expired_notion_warning() {
    let store = Arc::new(InMemoryStore::new());
    let techcorp = seed_techcorp(&store);

    let bundle = assert_ok!(gateway(&store).fetch_credentials("techcorp.com").await);

    assert_eq!(bundle.organization_id(), techcorp.organization.id);
    assert_eq!(bundle.credentials().len(), 1);
    let jira = bundle.credential_for(SystemType::Jira).unwrap();
    assert_eq!(jira.access_token.expose(), "jira_token_for_techcorp_only_12345");
    assert_eq!(jira.scope_id, "cloud-techcorp");
    assert_eq!(jira.workspace_or_project_key, "TECH");

    assert_eq!(bundle.warnings().len(), 1);
    assert_eq!(bundle.warnings()[0].integration_id, techcorp.notion.id);
    assert_eq!(bundle.warnings()[0].reason, WarningReason::Expired);
}

#[tokio::test]
async fn test_tenants_get_disjoint_credentials() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed_tenant(&store, "TechCorp", "techcorp.com");
    let b = seed_tenant(&store, "StartupIO", "startup.io");
    let gateway = gateway(&store);

    let bundle_a = gateway.fetch_credentials("techcorp.com").await.unwrap();
    let bundle_b = gateway.fetch_credentials("startup.io").await.unwrap();

    assert_eq!(bundle_a.organization_id(), a.organization.id);
    assert_eq!(bundle_b.organization_id(), b.organization.id);

    let ids_a: HashSet<_> = bundle_a.credentials().iter().map(|c| c.integration_id).collect();
    let ids_b: HashSet<_> = bundle_b.credentials().iter().map(|c| c.integration_id).collect();
    assert_eq!(ids_a, HashSet::from([a.jira.id, a.notion.id]));
    assert!(ids_a.is_disjoint(&ids_b));

    let tokens_a: HashSet<_> = bundle_a
        .credentials()
        .iter()
        .map(|c| c.access_token.expose().to_string())
        .collect();
    let tokens_b: HashSet<_> = bundle_b
        .credentials()
        .iter()
        .map(|c| c.access_token.expose().to_string())
        .collect();
    assert!(tokens_a.is_disjoint(&tokens_b));
    assert_ne!(bundle_a.tag(), bundle_b.tag());
}

#[tokio::test]
async fn test_identity_and_domain_resolve_identically() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    let gateway = gateway(&store);

    assert_eq!(resolve_tenant("ivan@techcorp.com"), resolve_tenant("  Maria@TECHCORP.com"));

    let by_identity = gateway
        .credentials_for_identity("Ivan@TechCorp.com", &CancellationToken::new())
        .await
        .unwrap();
    let by_domain = gateway.fetch_credentials(" TechCorp.COM ").await.unwrap();
    assert_eq!(by_identity.tag(), by_domain.tag());
    assert_eq!(by_identity.credentials(), by_domain.credentials());
}

#[tokio::test]
async fn test_unknown_domain_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);

    let err = assert_err!(gateway(&store).fetch_credentials("unknown.com").await);
    assert_eq!(
        err,
        GatewayError::OrganizationNotFound {
            domain: "unknown.com".to_string()
        }
    );
    assert_eq!(store.calls(StoreOperation::ListIntegrations), 0);
}

#[tokio::test]
async fn test_malformed_identity_never_reaches_store() {
    let store = Arc::new(InMemoryStore::new());
    let err = gateway(&store)
        .credentials_for_identity("not-an-email", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::MalformedIdentity { .. }));
    assert!(!err.is_retryable());
    assert_eq!(store.calls(StoreOperation::FindOrganization), 0);
}

#[tokio::test]
async fn test_suspended_organization_is_refused() {
    let store = Arc::new(InMemoryStore::new());
    let org =
        store.add_organization_with_status("Dormant", "dormant.io", OrganizationStatus::Suspended);
    let jira = store.add_integration(org.id, SystemType::Jira, IntegrationStatus::Connected);
    store.add_credential(jira.id, "dormant-token", "cloud", "DRM", None);

    let err = gateway(&store).fetch_credentials("dormant.io").await.unwrap_err();
    assert!(matches!(err, GatewayError::OrganizationSuspended { .. }));
    assert_eq!(store.calls(StoreOperation::GetCredential), 0);
}

#[tokio::test]
async fn test_disconnected_integrations_are_skipped_silently() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    store.set_integration_status(tenant.notion.id, IntegrationStatus::Disconnected);

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(bundle.credentials().len(), 1);
    assert_eq!(bundle.credentials()[0].integration_id, tenant.jira.id);
    assert!(bundle.warnings().is_empty());
}

#[tokio::test]
async fn test_missing_credential_becomes_warning() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("TechCorp", "techcorp.com");
    let slack = store.add_integration(org.id, SystemType::Slack, IntegrationStatus::Connected);

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert!(bundle.is_empty());
    assert_eq!(bundle.warnings()[0].integration_id, slack.id);
    assert_eq!(bundle.warnings()[0].reason, WarningReason::Missing);
}

#[tokio::test]
async fn test_credential_inside_leeway_counts_as_expired() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("TechCorp", "techcorp.com");
    let jira = store.add_integration(org.id, SystemType::Jira, IntegrationStatus::Connected);
    store.add_credential(
        jira.id,
        "almost-expired",
        "cloud",
        "TECH",
        Some(Utc::now() + ChronoDuration::seconds(5)),
    );

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert!(bundle.is_empty());
    assert_eq!(bundle.warnings()[0].reason, WarningReason::Expired);
}

#[tokio::test]
async fn test_one_failing_credential_keeps_the_rest() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    store.fail_credential(tenant.notion.id, StoreError::unavailable("replica lag"));

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(bundle.credentials().len(), 1);
    assert_eq!(bundle.credentials()[0].integration_id, tenant.jira.id);
    assert_eq!(bundle.warnings().len(), 1);
    assert_eq!(bundle.warnings()[0].integration_id, tenant.notion.id);
    assert_eq!(bundle.warnings()[0].reason, WarningReason::Unavailable);
}

#[tokio::test]
async fn test_every_credential_read_exhausted_is_store_unavailable() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    store.fail_credential(tenant.jira.id, StoreError::unavailable("replica lag"));
    store.fail_credential(tenant.notion.id, StoreError::unavailable("replica lag"));

    let err = gateway(&store).fetch_credentials("techcorp.com").await.unwrap_err();
    match &err {
        GatewayError::StoreUnavailable { operation, attempts, .. } => {
            assert_eq!(*operation, "get_credential");
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_every_credential_read_rejected_stays_degraded() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    store.fail_credential(tenant.jira.id, StoreError::Query("column does not exist".to_string()));
    store.fail_credential(tenant.notion.id, StoreError::Query("column does not exist".to_string()));

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert!(bundle.is_empty());
    assert_eq!(bundle.warnings().len(), 2);
    assert!(bundle.warnings().iter().all(|w| w.reason == WarningReason::Unavailable));
}

#[tokio::test]
async fn test_transient_failures_within_retry_bound_succeed() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    store.fail_next(StoreOperation::FindOrganization, 2);
    store.fail_next(StoreOperation::ListIntegrations, 1);

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(bundle.credentials().len(), 1);
    assert_eq!(store.calls(StoreOperation::FindOrganization), 3);
    assert_eq!(store.calls(StoreOperation::ListIntegrations), 2);
}

#[tokio::test]
async fn test_failures_beyond_retry_bound_are_store_unavailable() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    store.fail_next(StoreOperation::FindOrganization, 3);

    let err = gateway(&store).fetch_credentials("techcorp.com").await.unwrap_err();
    match &err {
        GatewayError::StoreUnavailable { operation, attempts, .. } => {
            assert_eq!(*operation, "find_organization_by_domain");
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_permanent_store_error_is_not_retried() {
    let store = Arc::new(InMemoryStore::new());
    let tenant = seed_tenant(&store, "TechCorp", "techcorp.com");
    store.fail_credential(tenant.jira.id, StoreError::Query("column does not exist".to_string()));

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(bundle.warnings()[0].reason, WarningReason::Unavailable);
    // one read per integration, no retries for the permanent failure
    assert_eq!(store.calls(StoreOperation::GetCredential), 2);
}

#[tokio::test]
async fn test_cancellation_aborts_resolution() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    store.set_latency(Some(Duration::from_millis(150)));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = gateway(&store)
        .fetch_credentials_with_cancel("techcorp.com", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Cancelled);
}

#[tokio::test]
async fn test_slow_store_hits_resolution_deadline() {
    let store = Arc::new(InMemoryStore::new());
    seed_techcorp(&store);
    store.set_latency(Some(Duration::from_millis(100)));

    let mut config = gateway_config();
    config.resolution_timeout = Duration::from_millis(30);
    let gateway = TenantGateway::new(store.clone(), config);

    let err = gateway.fetch_credentials("techcorp.com").await.unwrap_err();
    assert_eq!(err, GatewayError::DeadlineExceeded { timeout_ms: 30 });
}

#[tokio::test]
async fn test_misrouted_integration_is_never_bundled() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed_tenant(&store, "TechCorp", "techcorp.com");
    let b = seed_tenant(&store, "StartupIO", "startup.io");
    store.misroute_integration(b.jira.id, a.organization.id);

    let bundle = gateway(&store).fetch_credentials("techcorp.com").await.unwrap();

    assert!(bundle.credentials().iter().all(|c| c.integration_id != b.jira.id));
    assert!(
        bundle
            .credentials()
            .iter()
            .all(|c| !c.access_token.expose().contains("startup"))
    );
    let mismatch: Vec<_> = bundle
        .warnings()
        .iter()
        .filter(|w| w.reason == WarningReason::TenantMismatch)
        .collect();
    assert_eq!(mismatch.len(), 1);
    assert_eq!(mismatch[0].integration_id, b.jira.id);
    // the foreign integration's secret is never read
    assert_eq!(store.calls(StoreOperation::GetCredential), 2);
}

#[tokio::test]
async fn test_resolve_organization_mints_matching_tag() {
    let store = Arc::new(InMemoryStore::new());
    let techcorp = seed_techcorp(&store);
    let gateway = gateway(&store);

    let resolved = gateway
        .resolve_organization("alice@techcorp.com", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resolved.tag.organization_id(), techcorp.organization.id);
    assert_eq!(resolved.organization.name, "TechCorp");
    assert_eq!(store.calls(StoreOperation::GetCredential), 0);

    let bundle = gateway.fetch_credentials("techcorp.com").await.unwrap();
    assert_eq!(bundle.tag(), resolved.tag);
}
