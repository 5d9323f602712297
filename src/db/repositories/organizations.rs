use diesel::prelude::*;

use crate::db::models::organization::{NewOrganization, Organization};

pub struct OrganizationsRepo;

impl OrganizationsRepo {
    pub fn insert(
        conn: &mut PgConnection,
        new_org: &NewOrganization,
    ) -> Result<Organization, diesel::result::Error> {
        diesel::insert_into(crate::schema::organizations::table)
            .values(new_org)
            .get_result(conn)
    }

    pub fn find_by_domain(
        conn: &mut PgConnection,
        org_domain: &str,
    ) -> Result<Option<Organization>, diesel::result::Error> {
        use crate::schema::organizations::dsl::*;
        organizations
            .filter(domain.eq(org_domain))
            .select(Organization::as_select())
            .first::<Organization>(conn)
            .optional()
    }

    pub fn ping(conn: &mut PgConnection) -> Result<(), diesel::result::Error> {
        diesel::sql_query("SELECT 1").execute(conn).map(|_| ())
    }
}
