use serde::Serialize;
use uuid::Uuid;

use super::TenantDomain;

/// Tenant identity attached to everything derived from a credential bundle.
///
/// Only the gateway can mint a tag; consumers compare tags, they never build them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TenantTag {
    organization_id: Uuid,
    domain: TenantDomain,
}

impl TenantTag {
    pub(crate) fn new(organization_id: Uuid, domain: TenantDomain) -> Self {
        Self {
            organization_id,
            domain,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    pub fn domain(&self) -> &TenantDomain {
        &self.domain
    }
}

/// An artifact (document, vector, answer) bound to the tenant it was derived for.
///
/// The tag cannot be replaced: there is no setter, [`map`](Self::map) carries
/// it over, and the type is not `Deserialize` so a tag can't be forged from
/// request input.
#[derive(Debug, Clone, Serialize)]
pub struct ScopedArtifact<T> {
    tag: TenantTag,
    artifact: T,
}

impl<T> ScopedArtifact<T> {
    pub(crate) fn new(tag: TenantTag, artifact: T) -> Self {
        Self { tag, artifact }
    }

    pub fn tag(&self) -> &TenantTag {
        &self.tag
    }

    pub fn artifact(&self) -> &T {
        &self.artifact
    }

    pub fn into_inner(self) -> T {
        self.artifact
    }

    pub fn belongs_to(&self, tag: &TenantTag) -> bool {
        &self.tag == tag
    }

    /// Derives a new artifact under the same tag.
    pub fn map<U, F>(self, f: F) -> ScopedArtifact<U>
    where
        F: FnOnce(T) -> U,
    {
        ScopedArtifact {
            tag: self.tag,
            artifact: f(self.artifact),
        }
    }
}
