//! API endpoint modules.

pub mod departments;
pub mod health;
pub mod openapi;
pub mod prototypes;
pub mod users;

pub use departments::configure_routes as configure_department_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use prototypes::configure_routes as configure_prototype_routes;
pub use users::configure_routes as configure_user_routes;
