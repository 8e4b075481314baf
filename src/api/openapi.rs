//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prototype Repository Server",
        version = "0.3.0",
        description = "API server for submitting, reviewing and archiving academic prototype projects with report and source-code attachments"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Prototype endpoints
        api::prototypes::list_prototypes,
        api::prototypes::get_prototype,
        api::prototypes::create_prototype,
        api::prototypes::review_prototype,
        api::prototypes::assign_storage,
        api::prototypes::storage_locations,
        api::prototypes::prototype_count,
        api::prototypes::upload_summary_30_days,
        api::prototypes::download_attachment,
        // User endpoints
        api::users::list_users,
        api::users::list_students,
        api::users::list_supervisors,
        api::users::list_general_users,
        api::users::approve_user,
        api::users::provision_user,
        api::users::get_profile,
        api::users::update_profile,
        api::users::change_password,
        // Department endpoints
        api::departments::list_departments,
        api::departments::create_department,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Prototypes
            models::PrototypeStatus,
            models::PrototypeResponse,
            models::AttachmentResponse,
            models::ReviewRequest,
            models::AssignStorageRequest,
            models::ListPrototypesQuery,
            models::PrototypeCountResponse,
            models::WeekdayUploads,
            // Users
            models::Role,
            models::UserResponse,
            models::RegisterRequest,
            models::LoginRequest,
            models::ProvisionUserRequest,
            models::UpdateProfileRequest,
            models::ChangePasswordRequest,
            api::users::ProfileResponse,
            // Departments
            models::DepartmentResponse,
            models::CreateDepartmentRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Prototypes", description = "Prototype submission, review and storage"),
        (name = "Users", description = "Accounts, approval and profiles"),
        (name = "Departments", description = "Department directory")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the bootstrap admin key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Admin-Key"),
                    ),
                ),
            );
        }
    }
}
