//! Read-only access to the central multi-tenant store (organizations,
//! integrations and integration credentials).

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryStore, StoreOperation};
pub use postgres::PgCredentialStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Credential, Integration, Organization};

/// Errors raised by a [`CredentialStore`] backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query timed out")]
    Timeout,

    #[error("store query failed: {0}")]
    Query(String),

    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Transient failures are worth retrying; everything else is surfaced as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            Error::DatabaseError(DatabaseErrorKind::UnableToSendCommand, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            Error::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            Error::BrokenTransactionManager => {
                StoreError::Unavailable("broken transaction manager".to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable(format!("connection pool: {}", err))
    }
}

/// Queryable view of the central store consumed by the gateway.
///
/// Implementations must be read-only and must not filter by anything other
/// than the arguments given; tenant scoping is re-checked by the gateway.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_organization_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Organization>, StoreError>;

    async fn list_connected_integrations(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Integration>, StoreError>;

    async fn get_credential(&self, integration_id: Uuid) -> Result<Option<Credential>, StoreError>;

    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
