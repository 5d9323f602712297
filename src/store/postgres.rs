use async_trait::async_trait;
use diesel::PgConnection;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::db::DbPool;
use crate::db::models::{Credential, Integration, Organization};
use crate::db::repositories::{CredentialsRepo, IntegrationsRepo, OrganizationsRepo};

/// Central store backed by the DocuMinds Postgres database.
///
/// Diesel is synchronous, so every query runs on the tokio blocking pool.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            query(&mut conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("blocking query task failed: {}", e)))?
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_organization_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Organization>, StoreError> {
        let domain = domain.to_string();
        self.with_conn(move |conn| OrganizationsRepo::find_by_domain(conn, &domain))
            .await
    }

    async fn list_connected_integrations(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Integration>, StoreError> {
        self.with_conn(move |conn| IntegrationsRepo::list_connected(conn, organization_id))
            .await
    }

    async fn get_credential(&self, integration_id: Uuid) -> Result<Option<Credential>, StoreError> {
        self.with_conn(move |conn| CredentialsRepo::find_by_integration(conn, integration_id))
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(OrganizationsRepo::ping).await
    }
}
