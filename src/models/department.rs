//! Department DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Department response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Request to create a department.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
