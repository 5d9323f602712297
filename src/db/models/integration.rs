use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::enums::{IntegrationStatus, SystemType};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = crate::schema::integrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Integration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub system_type: SystemType,
    pub status: IntegrationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Integration {
    pub fn is_connected(&self) -> bool {
        self.status == IntegrationStatus::Connected
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::integrations)]
pub struct NewIntegration {
    pub organization_id: Uuid,
    pub name: String,
    pub system_type: SystemType,
    pub status: IntegrationStatus,
}
