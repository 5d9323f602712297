use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::IntegrationStatus;
use crate::db::models::integration::{Integration, NewIntegration};

pub struct IntegrationsRepo;

impl IntegrationsRepo {
    pub fn insert(
        conn: &mut PgConnection,
        new_integration: &NewIntegration,
    ) -> Result<Integration, diesel::result::Error> {
        diesel::insert_into(crate::schema::integrations::table)
            .values(new_integration)
            .get_result(conn)
    }

    pub fn list_connected(
        conn: &mut PgConnection,
        org_id: Uuid,
    ) -> Result<Vec<Integration>, diesel::result::Error> {
        use crate::schema::integrations::dsl::*;
        integrations
            .filter(organization_id.eq(org_id))
            .filter(status.eq(IntegrationStatus::Connected))
            .order(created_at.asc())
            .select(Integration::as_select())
            .load::<Integration>(conn)
    }
}
