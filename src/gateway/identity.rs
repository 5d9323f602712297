use serde::Serialize;
use std::fmt;

use super::GatewayError;

/// Normalized tenant lookup key: the domain part of a user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantDomain(String);

impl TenantDomain {
    /// Trims and ASCII-lowercases `raw`; rejects empty values, whitespace and `@`.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let domain = raw.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(GatewayError::malformed("domain is empty"));
        }
        if domain.contains('@') {
            return Err(GatewayError::malformed("domain must not contain '@'"));
        }
        if domain.chars().any(char::is_whitespace) {
            return Err(GatewayError::malformed("domain must not contain whitespace"));
        }
        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the tenant domain from an email-like identity.
///
/// The domain is everything after the last `@`. Pure and deterministic.
pub fn resolve_tenant(identity: &str) -> Result<TenantDomain, GatewayError> {
    let (local, domain) = identity
        .trim()
        .rsplit_once('@')
        .ok_or_else(|| GatewayError::malformed("identity must contain '@'"))?;
    if local.is_empty() {
        return Err(GatewayError::malformed("identity has an empty local part"));
    }
    TenantDomain::parse(domain)
}
