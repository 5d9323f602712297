use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use super::{TenantDomain, TenantTag};
use crate::db::enums::SystemType;
use crate::db::models::{Credential, Integration, Organization};

/// Access token handed to the caller. `Debug` and `Display` never show it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(sha256:{})", self.fingerprint())
    }
}

impl Serialize for AccessToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundledCredential {
    pub integration_id: Uuid,
    pub system_type: SystemType,
    pub access_token: AccessToken,
    pub scope_id: String,
    pub workspace_or_project_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    /// No credential row exists for the integration.
    Missing,
    /// The credential is past (or within the leeway of) its expiry.
    Expired,
    /// The store failed to return the credential.
    Unavailable,
    /// The store returned a row that is not owned by the resolved organization.
    TenantMismatch,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            WarningReason::Missing => "missing",
            WarningReason::Expired => "expired",
            WarningReason::Unavailable => "unavailable",
            WarningReason::TenantMismatch => "tenant_mismatch",
        };
        f.write_str(reason)
    }
}

/// `CredentialUnavailable` warning recorded against one integration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialWarning {
    pub integration_id: Uuid,
    pub system_type: SystemType,
    pub reason: WarningReason,
}

/// Usable credentials of exactly one organization, built fresh per resolution.
///
/// Fields are private: a bundle can only be assembled by the gateway through
/// [`BundleBuilder`], which checks every entry against the organization id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    organization_id: Uuid,
    organization_name: String,
    domain: TenantDomain,
    credentials: Vec<BundledCredential>,
    warnings: Vec<CredentialWarning>,
}

impl CredentialBundle {
    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }

    pub fn domain(&self) -> &TenantDomain {
        &self.domain
    }

    pub fn credentials(&self) -> &[BundledCredential] {
        &self.credentials
    }

    pub fn warnings(&self) -> &[CredentialWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn credential_for(&self, system_type: SystemType) -> Option<&BundledCredential> {
        self.credentials.iter().find(|c| c.system_type == system_type)
    }

    pub fn tag(&self) -> TenantTag {
        TenantTag::new(self.organization_id, self.domain.clone())
    }

    /// Earliest expiry across the bundled credentials.
    pub fn earliest_expiry(&self) -> Option<DateTime<Utc>> {
        self.credentials.iter().filter_map(|c| c.expires_at).min()
    }
}

pub(crate) struct BundleBuilder {
    bundle: CredentialBundle,
}

impl BundleBuilder {
    pub(crate) fn new(organization: &Organization, domain: TenantDomain) -> Self {
        Self {
            bundle: CredentialBundle {
                organization_id: organization.id,
                organization_name: organization.name.clone(),
                domain,
                credentials: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    pub(crate) fn organization_id(&self) -> Uuid {
        self.bundle.organization_id
    }

    /// No credential admitted so far.
    pub(crate) fn is_empty(&self) -> bool {
        self.bundle.credentials.is_empty()
    }

    /// Whether `integration` belongs to the organization being assembled.
    pub(crate) fn owns(&self, integration: &Integration) -> bool {
        integration.organization_id == self.bundle.organization_id
    }

    /// Adds a credential after checking the integration → organization and
    /// credential → integration links; a broken link becomes a warning instead.
    pub(crate) fn admit(&mut self, integration: &Integration, credential: Credential) -> bool {
        if !self.owns(integration) || credential.integration_id != integration.id {
            self.warn(integration, WarningReason::TenantMismatch);
            return false;
        }
        self.bundle.credentials.push(BundledCredential {
            integration_id: integration.id,
            system_type: integration.system_type,
            access_token: AccessToken(credential.access_token),
            scope_id: credential.scope_id,
            workspace_or_project_key: credential.workspace_or_project_key,
            expires_at: credential.expires_at,
        });
        true
    }

    pub(crate) fn warn(&mut self, integration: &Integration, reason: WarningReason) {
        self.bundle.warnings.push(CredentialWarning {
            integration_id: integration.id,
            system_type: integration.system_type,
            reason,
        });
    }

    pub(crate) fn build(self) -> CredentialBundle {
        self.bundle
    }
}
