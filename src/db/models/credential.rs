use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use std::fmt;
use uuid::Uuid;

/// Secret material for one integration, as stored in `integration_credentials`.
///
/// Not `Serialize`; credentials leave the gateway only inside a
/// [`CredentialBundle`](crate::gateway::CredentialBundle).
#[derive(Queryable, Selectable, Clone, PartialEq)]
#[diesel(table_name = crate::schema::integration_credentials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Credential {
    pub id: Uuid,
    pub integration_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope_id: String,
    pub workspace_or_project_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// A credential expiring within `leeway` of `now` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + leeway,
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("integration_id", &self.integration_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope_id", &self.scope_id)
            .field("workspace_or_project_key", &self.workspace_or_project_key)
            .finish()
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::integration_credentials)]
pub struct NewCredential {
    pub integration_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope_id: String,
    pub workspace_or_project_key: String,
}
