//! Business logic services.

pub mod auth;
pub mod prototypes;
pub mod storage;
pub mod users;

pub use auth::configure_routes as configure_auth_routes;
pub use storage::Storage;
