pub mod credentials;
pub mod integrations;
pub mod organizations;

pub use credentials::CredentialsRepo;
pub use integrations::IntegrationsRepo;
pub use organizations::OrganizationsRepo;
