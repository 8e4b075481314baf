//! Department API handlers. Read and create only; departments are never
//! deleted through this API.

use actix_web::{web, HttpResponse};

use crate::auth::{Action, SessionAuth};
use crate::db::{departments, users, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{CreateDepartmentRequest, DepartmentResponse};

/// List all departments.
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    tag = "Departments",
    responses(
        (status = 200, description = "List of departments", body = [DepartmentResponse]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_departments(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ViewDepartments) {
        return Err(AppError::Forbidden(
            "You are not allowed to view departments".to_string(),
        ));
    }

    let rows = departments::list_all(pool.connection()).await?;
    let responses: Vec<DepartmentResponse> = rows
        .into_iter()
        .map(|d| DepartmentResponse {
            id: d.id,
            name: d.name,
            description: d.description,
        })
        .collect();

    Ok(HttpResponse::Ok().json(responses))
}

/// Create a department.
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    tag = "Departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_department(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    body: web::Json<CreateDepartmentRequest>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::CreateDepartment) {
        return Err(AppError::Forbidden(
            "You are not allowed to create departments".to_string(),
        ));
    }

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Department name is required".to_string(),
        ));
    }

    let created =
        departments::insert(pool.connection(), name, body.description.as_deref()).await?;

    Ok(HttpResponse::Created().json(DepartmentResponse {
        id: created.id,
        name: created.name,
        description: created.description,
    }))
}

/// Configure department routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/departments")
            .route(web::get().to(list_departments))
            .route(web::post().to(create_department)),
    );
}
