//! User management and profile API handlers.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Action, AdminKey, SessionAuth};
use crate::config::ADMIN_KEY_HEADER;
use crate::db::{departments, users, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{
    ChangePasswordRequest, ProvisionUserRequest, Role, UpdateProfileRequest, User, UserResponse,
};
use crate::services::users as user_service;

/// Profile response. Unlike [`UserResponse`], `department` carries the
/// department name, which is what the profile page renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub institution_id: Option<String>,
    pub level: Option<String>,
    pub department: Option<String>,
    pub is_approved: bool,
}

async fn to_profile_response(pool: &DbPool, user: User) -> AppResult<ProfileResponse> {
    let department = match user.department_id {
        Some(id) => departments::find_by_id(pool.connection(), id)
            .await?
            .map(|d| d.name),
        None => None,
    };

    Ok(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        full_name: user.full_name,
        role: user.role,
        phone: user.phone,
        institution_id: user.institution_id,
        level: user.level,
        department,
        is_approved: user.is_approved,
    })
}

/// List users. Admins see everyone; everyone else sees only themselves.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "List of users", body = [UserResponse]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_users(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let list = if actor.role.permits(Action::ManageUsers) {
        users::list_all(pool.connection()).await?
    } else {
        vec![actor]
    };

    let responses: Vec<UserResponse> = list.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// List all student users.
#[utoipa::path(
    get,
    path = "/api/v1/users/students",
    tag = "Users",
    responses(
        (status = 200, description = "List of students", body = [UserResponse]),
    )
)]
pub async fn list_students(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ListStudents) {
        return Err(AppError::Forbidden(
            "You are not allowed to view the student list".to_string(),
        ));
    }

    let list = users::list_by_role(pool.connection(), Role::Student).await?;
    let responses: Vec<UserResponse> = list.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// List staff and admin members who can act as supervisors.
#[utoipa::path(
    get,
    path = "/api/v1/users/supervisors",
    tag = "Users",
    responses(
        (status = 200, description = "List of supervisors", body = [UserResponse]),
    )
)]
pub async fn list_supervisors(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ListSupervisors) {
        return Err(AppError::Forbidden(
            "You are not allowed to view the supervisor list".to_string(),
        ));
    }

    let list = users::list_supervisors(pool.connection()).await?;
    let responses: Vec<UserResponse> = list.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// List all general users (the approval queue). Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/users/general",
    tag = "Users",
    responses(
        (status = 200, description = "List of general users", body = [UserResponse]),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_general_users(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ManageUsers) {
        return Err(AppError::Forbidden(
            "Only admins can view the approval queue".to_string(),
        ));
    }

    let list = users::list_by_role(pool.connection(), Role::GeneralUser).await?;
    let responses: Vec<UserResponse> = list.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// Approve a self-registered general user. Admin only, idempotent.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/approve",
    tag = "Users",
    params(
        ("user_id" = Uuid, Path, description = "User UUID")
    ),
    responses(
        (status = 200, description = "User approved"),
        (status = 400, description = "Target is not a general user", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn approve_user(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let approved =
        user_service::approve_user(pool.connection(), &actor, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("User {} approved", approved.username),
        "user": UserResponse::from(approved),
    })))
}

/// Provision an account with an explicit role.
///
/// Gated by the `X-Admin-Key` bootstrap header rather than a session: this is
/// how staff, admin and student accounts enter the system.
#[utoipa::path(
    post,
    path = "/api/v1/users/provision",
    tag = "Users",
    request_body = ProvisionUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid admin key", body = crate::error::ErrorResponse),
    )
)]
pub async fn provision_user(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    admin_key: web::Data<AdminKey>,
    body: web::Json<ProvisionUserRequest>,
) -> AppResult<HttpResponse> {
    let provided = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {} header", ADMIN_KEY_HEADER))
        })?;

    if !admin_key.verify(provided) {
        return Err(AppError::Unauthorized("Invalid admin key".to_string()));
    }

    let created = user_service::provision_user(pool.connection(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(created)))
}

/// Return the logged-in user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/user/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Profile of the logged-in user", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_profile(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    let profile = to_profile_response(pool.get_ref(), actor).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Update the logged-in user's profile (phone, email).
#[utoipa::path(
    patch,
    path = "/api/v1/user/profile",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_profile(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let updated =
        user_service::update_profile(pool.connection(), &actor, body.into_inner()).await?;
    let profile = to_profile_response(pool.get_ref(), updated).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated successfully",
        "profile": profile,
    })))
}

/// Change the logged-in user's password.
#[utoipa::path(
    post,
    path = "/api/v1/user/change-password",
    tag = "Users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Wrong current password or weak new password", body = crate::error::ErrorResponse),
    )
)]
pub async fn change_password(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    body: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    user_service::change_password(pool.connection(), &actor, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated successfully"
    })))
}

/// Configure user routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/users").route(web::get().to(list_users)))
        .service(web::resource("/users/students").route(web::get().to(list_students)))
        .service(web::resource("/users/supervisors").route(web::get().to(list_supervisors)))
        .service(web::resource("/users/general").route(web::get().to(list_general_users)))
        .service(web::resource("/users/provision").route(web::post().to(provision_user)))
        .service(web::resource("/users/{user_id}/approve").route(web::post().to(approve_user)))
        .service(
            web::resource("/user/profile")
                .route(web::get().to(get_profile))
                .route(web::patch().to(update_profile)),
        )
        .service(web::resource("/user/change-password").route(web::post().to(change_password)));
}
