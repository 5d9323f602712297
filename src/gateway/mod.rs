//! Tenant credential gateway.
//!
//! Resolves a requester to exactly one organization and returns only that
//! organization's integration credentials, then tags everything derived from
//! them with the organization.

pub mod artifact;
pub mod bundle;
pub mod cache;
pub mod error;
pub mod identity;
mod retry;

pub use artifact::{ScopedArtifact, TenantTag};
pub use bundle::{
    AccessToken, BundledCredential, CredentialBundle, CredentialWarning, WarningReason,
};
pub use cache::BundleCache;
pub use error::GatewayError;
pub use identity::{TenantDomain, resolve_tenant};

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::db::models::{Credential, Integration, Organization, OrganizationInfo};
use crate::store::{CredentialStore, StoreError};
use bundle::BundleBuilder;
use retry::{RetryError, execute_with_retry};

const OP_FIND_ORGANIZATION: &str = "find_organization_by_domain";
const OP_LIST_INTEGRATIONS: &str = "list_connected_integrations";
const OP_GET_CREDENTIAL: &str = "get_credential";

/// Organization a domain resolved to, without any credential material.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    pub tag: TenantTag,
    pub organization: OrganizationInfo,
}

enum CredentialOutcome {
    Found(Credential),
    Foreign,
    Missing,
    Failed(RetryError),
    Cancelled,
}

#[derive(Clone)]
pub struct TenantGateway {
    store: Arc<dyn CredentialStore>,
    config: Arc<GatewayConfig>,
    cache: Option<Arc<BundleCache>>,
}

impl TenantGateway {
    pub fn new(store: Arc<dyn CredentialStore>, config: GatewayConfig) -> Self {
        let cache = config
            .cache
            .as_ref()
            .map(|cache| Arc::new(BundleCache::new(cache.ttl)));
        Self {
            store,
            config: Arc::new(config),
            cache,
        }
    }

    pub fn cache(&self) -> Option<&BundleCache> {
        self.cache.as_deref()
    }

    /// Resolves `domain` to its organization and returns that organization's
    /// usable credentials.
    pub async fn fetch_credentials(&self, domain: &str) -> Result<CredentialBundle, GatewayError> {
        self.fetch_credentials_with_cancel(domain, &CancellationToken::new())
            .await
    }

    /// Like [`fetch_credentials`](Self::fetch_credentials), aborting in-flight
    /// store reads once `cancel` fires or the resolution timeout elapses.
    pub async fn fetch_credentials_with_cancel(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<CredentialBundle, GatewayError> {
        let domain = TenantDomain::parse(domain)?;
        self.with_deadline(self.assemble_bundle(domain, cancel)).await
    }

    /// Identity → domain → bundle in one call.
    pub async fn credentials_for_identity(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<CredentialBundle, GatewayError> {
        let domain = resolve_tenant(identity)?;
        self.with_deadline(self.assemble_bundle(domain, cancel)).await
    }

    /// Resolves the organization for `identity` and mints its tag, without
    /// touching integrations or credentials.
    pub async fn resolve_organization(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolvedTenant, GatewayError> {
        let domain = resolve_tenant(identity)?;
        let organization = self
            .with_deadline(self.find_active_organization(&domain, cancel))
            .await?;
        Ok(ResolvedTenant {
            tag: TenantTag::new(organization.id, domain),
            organization: OrganizationInfo::from(&organization),
        })
    }

    /// Tags an artifact derived from a tenant's credentials.
    ///
    /// This is the only way to obtain a [`ScopedArtifact`]; the tag must come
    /// from this gateway (a bundle or a resolved tenant).
    pub fn scope_derived_artifact<T>(&self, artifact: T, tag: &TenantTag) -> ScopedArtifact<T> {
        ScopedArtifact::new(tag.clone(), artifact)
    }

    /// Drops any cached bundle for the organization.
    pub fn invalidate_cached(&self, organization_id: Uuid) {
        if let Some(cache) = &self.cache {
            cache.invalidate(organization_id);
        }
    }

    pub async fn health(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let limit = self.config.resolution_timeout;
        tokio::time::timeout(limit, fut).await.map_err(|_| {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "Tenant resolution exceeded deadline"
            );
            GatewayError::DeadlineExceeded {
                timeout_ms: limit.as_millis() as u64,
            }
        })?
    }

    async fn find_active_organization(
        &self,
        domain: &TenantDomain,
        cancel: &CancellationToken,
    ) -> Result<Organization, GatewayError> {
        let organization = execute_with_retry(&self.config.retry, cancel, OP_FIND_ORGANIZATION, || {
            self.store.find_organization_by_domain(domain.as_str())
        })
        .await
        .map_err(|e| store_failure(OP_FIND_ORGANIZATION, e))?;

        let Some(organization) = organization else {
            tracing::info!(domain = %domain, "Unknown tenant domain");
            return Err(GatewayError::OrganizationNotFound {
                domain: domain.to_string(),
            });
        };

        if !organization.is_active() {
            tracing::warn!(
                domain = %domain,
                organization_id = %organization.id,
                "Refusing credentials for suspended organization"
            );
            return Err(GatewayError::OrganizationSuspended {
                domain: domain.to_string(),
            });
        }

        Ok(organization)
    }

    async fn assemble_bundle(
        &self,
        domain: TenantDomain,
        cancel: &CancellationToken,
    ) -> Result<CredentialBundle, GatewayError> {
        let organization = self.find_active_organization(&domain, cancel).await?;

        let integrations = execute_with_retry(&self.config.retry, cancel, OP_LIST_INTEGRATIONS, || {
            self.store.list_connected_integrations(organization.id)
        })
        .await
        .map_err(|e| store_failure(OP_LIST_INTEGRATIONS, e))?;

        let connected_ids: Vec<Uuid> = integrations.iter().map(|i| i.id).collect();
        if let Some(cache) = &self.cache {
            if let Some(bundle) = cache.get(organization.id, &connected_ids) {
                tracing::debug!(
                    organization_id = %organization.id,
                    "Serving credential bundle from cache"
                );
                return Ok(bundle);
            }
        }

        let mut builder = BundleBuilder::new(&organization, domain);
        let outcomes = join_all(
            integrations
                .iter()
                .map(|integration| self.fetch_credential(&builder, integration, cancel)),
        )
        .await;

        let now = Utc::now();
        let mut exhausted = None;
        for (integration, outcome) in integrations.iter().zip(outcomes) {
            match outcome {
                CredentialOutcome::Cancelled => return Err(GatewayError::Cancelled),
                CredentialOutcome::Foreign => {
                    tracing::error!(
                        organization_id = %builder.organization_id(),
                        integration_id = %integration.id,
                        owner_id = %integration.organization_id,
                        "Store listed an integration owned by another tenant; dropped"
                    );
                    builder.warn(integration, WarningReason::TenantMismatch);
                }
                CredentialOutcome::Missing => {
                    record_warning(&mut builder, integration, WarningReason::Missing)
                }
                CredentialOutcome::Failed(err) => {
                    if let RetryError::Exhausted { attempts, last } = err {
                        exhausted = Some((attempts, last));
                    }
                    record_warning(&mut builder, integration, WarningReason::Unavailable)
                }
                CredentialOutcome::Found(credential)
                    if credential.is_expired_at(now, self.config.expiry_leeway) =>
                {
                    record_warning(&mut builder, integration, WarningReason::Expired)
                }
                CredentialOutcome::Found(credential) => {
                    if !builder.admit(integration, credential) {
                        tracing::error!(
                            organization_id = %builder.organization_id(),
                            integration_id = %integration.id,
                            owner_id = %integration.organization_id,
                            "Store returned a credential outside the resolved tenant; dropped"
                        );
                    }
                }
            }
        }

        // A partial outage degrades the bundle; a total one is an error.
        if let Some((attempts, last)) = exhausted {
            if builder.is_empty() {
                return Err(store_failure(
                    OP_GET_CREDENTIAL,
                    RetryError::Exhausted { attempts, last },
                ));
            }
        }

        let bundle = builder.build();
        tracing::info!(
            domain = %bundle.domain(),
            organization_id = %bundle.organization_id(),
            credentials = bundle.credentials().len(),
            warnings = bundle.warnings().len(),
            "Resolved tenant credential bundle"
        );
        if bundle.is_empty() && !integrations.is_empty() {
            tracing::warn!(
                organization_id = %bundle.organization_id(),
                "No usable credentials for tenant, serving degraded empty bundle"
            );
        }

        if let Some(cache) = &self.cache {
            if bundle.warnings().is_empty() {
                cache.put(&bundle, &connected_ids, now, self.config.expiry_leeway);
            }
        }

        Ok(bundle)
    }

    async fn fetch_credential(
        &self,
        builder: &BundleBuilder,
        integration: &Integration,
        cancel: &CancellationToken,
    ) -> CredentialOutcome {
        // Never query secrets for an integration listed under another tenant.
        if !builder.owns(integration) {
            return CredentialOutcome::Foreign;
        }

        let result = execute_with_retry(&self.config.retry, cancel, OP_GET_CREDENTIAL, || {
            self.store.get_credential(integration.id)
        })
        .await;

        match result {
            Ok(Some(credential)) => CredentialOutcome::Found(credential),
            Ok(None) => CredentialOutcome::Missing,
            Err(RetryError::Cancelled) => CredentialOutcome::Cancelled,
            Err(err) => {
                tracing::warn!(
                    integration_id = %integration.id,
                    error = ?err,
                    "Credential lookup failed, excluding integration"
                );
                CredentialOutcome::Failed(err)
            }
        }
    }
}

fn record_warning(builder: &mut BundleBuilder, integration: &Integration, reason: WarningReason) {
    tracing::warn!(
        integration_id = %integration.id,
        system_type = %integration.system_type,
        reason = %reason,
        "CredentialUnavailable"
    );
    builder.warn(integration, reason);
}

fn store_failure(operation: &'static str, err: RetryError) -> GatewayError {
    match err {
        RetryError::Cancelled => GatewayError::Cancelled,
        RetryError::Exhausted { attempts, last } => {
            tracing::error!(operation, attempts, error = %last, "Central store unavailable");
            GatewayError::StoreUnavailable {
                operation,
                attempts,
                message: last.to_string(),
            }
        }
        RetryError::Permanent(source) => GatewayError::Store { operation, source },
    }
}
