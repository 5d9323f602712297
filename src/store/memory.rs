use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::db::enums::{IntegrationStatus, OrganizationStatus, SubscriptionPlan, SystemType};
use crate::db::models::{Credential, Integration, Organization};

/// Store operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FindOrganization,
    ListIntegrations,
    GetCredential,
}

#[derive(Default)]
struct Tables {
    organizations: Vec<Organization>,
    integrations: Vec<Integration>,
    credentials: Vec<Credential>,
    // integration id -> organization id it is wrongly listed under
    misrouted: HashMap<Uuid, Uuid>,
}

#[derive(Default)]
struct Faults {
    transient: HashMap<StoreOperation, usize>,
    credential_errors: HashMap<Uuid, StoreError>,
    latency: Option<Duration>,
}

/// In-memory central store for tests, demos and local development.
///
/// Supports failure injection (transient failures, per-credential errors,
/// artificial latency) and counts calls per operation.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    faults: RwLock<Faults>,
    find_calls: AtomicUsize,
    list_calls: AtomicUsize,
    credential_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn faults_mut(&self) -> RwLockWriteGuard<'_, Faults> {
        self.faults.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_organization(&self, name: &str, domain: &str) -> Organization {
        self.add_organization_with_status(name, domain, OrganizationStatus::Active)
    }

    pub fn add_organization_with_status(
        &self,
        name: &str,
        domain: &str,
        status: OrganizationStatus,
    ) -> Organization {
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.to_ascii_lowercase(),
            plan: SubscriptionPlan::Enterprise,
            status,
            created_at: now,
            updated_at: now,
        };
        self.tables_mut().organizations.push(org.clone());
        org
    }

    pub fn add_integration(
        &self,
        organization_id: Uuid,
        system_type: SystemType,
        status: IntegrationStatus,
    ) -> Integration {
        let now = Utc::now();
        let integration = Integration {
            id: Uuid::new_v4(),
            organization_id,
            name: format!("{} integration", system_type),
            system_type,
            status,
            created_at: now,
            updated_at: now,
        };
        self.tables_mut().integrations.push(integration.clone());
        integration
    }

    pub fn add_credential(
        &self,
        integration_id: Uuid,
        access_token: &str,
        scope_id: &str,
        workspace_or_project_key: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Credential {
        let now = Utc::now();
        let credential = Credential {
            id: Uuid::new_v4(),
            integration_id,
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at,
            scope_id: scope_id.to_string(),
            workspace_or_project_key: workspace_or_project_key.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables_mut().credentials.push(credential.clone());
        credential
    }

    /// Changes an integration's status, as the external provisioning process would.
    pub fn set_integration_status(&self, integration_id: Uuid, status: IntegrationStatus) {
        let mut tables = self.tables_mut();
        if let Some(integration) = tables.integrations.iter_mut().find(|i| i.id == integration_id) {
            integration.status = status;
            integration.updated_at = Utc::now();
        }
    }

    /// Replaces an integration's credential, as a token refresh would.
    pub fn rotate_credential(
        &self,
        integration_id: Uuid,
        access_token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let mut tables = self.tables_mut();
        if let Some(credential) = tables
            .credentials
            .iter_mut()
            .find(|c| c.integration_id == integration_id)
        {
            credential.access_token = access_token.to_string();
            credential.expires_at = expires_at;
            credential.updated_at = Utc::now();
        }
    }

    /// Simulates a store bug: `integration_id` is also listed under `organization_id`.
    pub fn misroute_integration(&self, integration_id: Uuid, organization_id: Uuid) {
        self.tables_mut().misrouted.insert(integration_id, organization_id);
    }

    /// The next `count` calls of `operation` fail with a transient error.
    pub fn fail_next(&self, operation: StoreOperation, count: usize) {
        self.faults_mut().transient.insert(operation, count);
    }

    /// Every credential lookup for `integration_id` fails with `error`.
    pub fn fail_credential(&self, integration_id: Uuid, error: StoreError) {
        self.faults_mut().credential_errors.insert(integration_id, error);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults_mut().latency = latency;
    }

    pub fn calls(&self, operation: StoreOperation) -> usize {
        match operation {
            StoreOperation::FindOrganization => self.find_calls.load(Ordering::SeqCst),
            StoreOperation::ListIntegrations => self.list_calls.load(Ordering::SeqCst),
            StoreOperation::GetCredential => self.credential_calls.load(Ordering::SeqCst),
        }
    }

    async fn enter(&self, operation: StoreOperation) -> Result<(), StoreError> {
        let counter = match operation {
            StoreOperation::FindOrganization => &self.find_calls,
            StoreOperation::ListIntegrations => &self.list_calls,
            StoreOperation::GetCredential => &self.credential_calls,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let latency = {
            let mut faults = self.faults_mut();
            if let Some(remaining) = faults.transient.get_mut(&operation) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StoreError::unavailable("injected transient failure"));
                }
            }
            faults.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_organization_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Organization>, StoreError> {
        self.enter(StoreOperation::FindOrganization).await?;
        Ok(self
            .tables()
            .organizations
            .iter()
            .find(|org| org.domain == domain)
            .cloned())
    }

    async fn list_connected_integrations(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Integration>, StoreError> {
        self.enter(StoreOperation::ListIntegrations).await?;
        let tables = self.tables();
        Ok(tables
            .integrations
            .iter()
            .filter(|i| i.is_connected())
            .filter(|i| {
                i.organization_id == organization_id
                    || tables.misrouted.get(&i.id) == Some(&organization_id)
            })
            .cloned()
            .collect())
    }

    async fn get_credential(&self, integration_id: Uuid) -> Result<Option<Credential>, StoreError> {
        self.enter(StoreOperation::GetCredential).await?;
        let injected = self
            .faults
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential_errors
            .get(&integration_id)
            .cloned();
        if let Some(err) = injected {
            return Err(err);
        }
        Ok(self
            .tables()
            .credentials
            .iter()
            .filter(|c| c.integration_id == integration_id)
            .max_by_key(|c| c.updated_at)
            .cloned())
    }
}
