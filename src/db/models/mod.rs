// Sub-modules organized by functional domain
pub mod api;
pub mod credential;
pub mod integration;
pub mod organization;

// API response structures
pub use api::*;

pub use credential::*;
pub use integration::*;
pub use organization::*;
