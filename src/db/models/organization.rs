use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::enums::{OrganizationStatus, SubscriptionPlan};

// Organization (tenant) models
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = crate::schema::organizations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub plan: SubscriptionPlan,
    pub status: OrganizationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Organization {
    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::organizations)]
pub struct NewOrganization {
    pub name: String,
    pub domain: String,
    pub plan: SubscriptionPlan,
    pub status: OrganizationStatus,
}

// Organization API DTOs
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrganizationInfo {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub plan: SubscriptionPlan,
}

impl From<&Organization> for OrganizationInfo {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id,
            name: org.name.clone(),
            domain: org.domain.clone(),
            plan: org.plan,
        }
    }
}
