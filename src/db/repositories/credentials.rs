use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::credential::{Credential, NewCredential};

pub struct CredentialsRepo;

impl CredentialsRepo {
    pub fn insert(
        conn: &mut PgConnection,
        new_credential: &NewCredential,
    ) -> Result<Credential, diesel::result::Error> {
        diesel::insert_into(crate::schema::integration_credentials::table)
            .values(new_credential)
            .get_result(conn)
    }

    /// Latest credential row for an integration; older rows are superseded by refreshes.
    pub fn find_by_integration(
        conn: &mut PgConnection,
        integ_id: Uuid,
    ) -> Result<Option<Credential>, diesel::result::Error> {
        use crate::schema::integration_credentials::dsl::*;
        integration_credentials
            .filter(integration_id.eq(integ_id))
            .order(updated_at.desc())
            .select(Credential::as_select())
            .first::<Credential>(conn)
            .optional()
    }
}
