use thiserror::Error;

use crate::store::StoreError;

/// Typed outcomes of a tenant resolution. None of them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("malformed identity: {reason}")]
    MalformedIdentity { reason: String },

    #[error("no organization is registered for domain {domain}")]
    OrganizationNotFound { domain: String },

    #[error("organization for domain {domain} is suspended")]
    OrganizationSuspended { domain: String },

    #[error("central store unavailable during {operation} after {attempts} attempts: {message}")]
    StoreUnavailable {
        operation: &'static str,
        attempts: u32,
        message: String,
    },

    #[error("central store rejected {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("resolution cancelled")]
    Cancelled,

    #[error("resolution exceeded {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },
}

impl GatewayError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            reason: reason.into(),
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::StoreUnavailable { .. } | GatewayError::DeadlineExceeded { .. }
        )
    }
}
