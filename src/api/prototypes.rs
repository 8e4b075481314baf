//! Prototype API handlers.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::auth::{Action, SessionAuth};
use crate::config::Config;
use crate::db::{departments, prototypes, users, DbPool};
use crate::entity::prototype;
use crate::error::{AppError, AppResult};
use crate::models::{
    AssignStorageRequest, AttachmentResponse, CreatePrototypeFields, DepartmentResponse,
    ListPrototypesQuery, PrototypeCountResponse, PrototypeResponse, PrototypeStatus, ReviewRequest,
    Role, UserResponse,
};
use crate::services::prototypes::{self as workflow, UploadedFile};
use crate::services::Storage;

/// List prototypes with role-aware ordering.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes",
    tag = "Prototypes",
    params(
        ("search" = Option<String>, Query, description = "Search over title, barcode and storage location")
    ),
    responses(
        (status = 200, description = "List of prototypes", body = [PrototypeResponse]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_prototypes(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    query: web::Query<ListPrototypesQuery>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let query = query.into_inner();
    let rows = workflow::list_prototypes(pool.connection(), &actor, &query).await?;
    let responses = build_prototype_responses(pool.get_ref(), rows).await?;

    Ok(HttpResponse::Ok().json(responses))
}

/// Get a single prototype.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes/{prototype_id}",
    tag = "Prototypes",
    params(
        ("prototype_id" = Uuid, Path, description = "Prototype UUID")
    ),
    responses(
        (status = 200, description = "Prototype details", body = PrototypeResponse),
        (status = 404, description = "Prototype not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_prototype(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ViewPrototype) {
        return Err(AppError::Forbidden(
            "You are not allowed to view prototypes".to_string(),
        ));
    }

    let prototype_id = path.into_inner();
    let model = prototypes::find_by_id(pool.connection(), prototype_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prototype {}", prototype_id)))?;

    let mut responses = build_prototype_responses(pool.get_ref(), vec![model]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Database("Failed to assemble prototype response".to_string()))?;

    Ok(HttpResponse::Ok().json(response))
}

/// Submit a new prototype (multipart: scalar fields + report and source files).
#[utoipa::path(
    post,
    path = "/api/v1/prototypes",
    tag = "Prototypes",
    responses(
        (status = 201, description = "Prototype created", body = PrototypeResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_prototype(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    config: web::Data<Config>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let submission = collect_submission(payload, config.max_upload_size).await?;

    let (prototype_row, _attachment) = workflow::create_prototype(
        pool.connection(),
        storage.get_ref(),
        &actor,
        submission.fields,
        submission.report,
        submission.source_code,
    )
    .await?;

    let mut responses = build_prototype_responses(pool.get_ref(), vec![prototype_row]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Database("Failed to assemble prototype response".to_string()))?;

    Ok(HttpResponse::Created().json(response))
}

/// Review a prototype (staff and admin).
#[utoipa::path(
    post,
    path = "/api/v1/prototypes/{prototype_id}/review",
    tag = "Prototypes",
    request_body = ReviewRequest,
    params(
        ("prototype_id" = Uuid, Path, description = "Prototype UUID")
    ),
    responses(
        (status = 200, description = "Prototype reviewed"),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Prototype not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already reviewed", body = crate::error::ErrorResponse),
    )
)]
pub async fn review_prototype(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    workflow::review_prototype(pool.connection(), &actor, path.into_inner(), &body.feedback)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Prototype reviewed successfully"
    })))
}

/// Assign a storage location (admin only).
#[utoipa::path(
    post,
    path = "/api/v1/prototypes/{prototype_id}/assign_storage",
    tag = "Prototypes",
    request_body = AssignStorageRequest,
    params(
        ("prototype_id" = Uuid, Path, description = "Prototype UUID")
    ),
    responses(
        (status = 200, description = "Storage assigned", body = PrototypeResponse),
        (status = 400, description = "No physical prototype or empty location", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Prototype not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn assign_storage(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<AssignStorageRequest>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let updated = workflow::assign_storage(
        pool.connection(),
        &actor,
        path.into_inner(),
        &body.storage_location,
    )
    .await?;

    let mut responses = build_prototype_responses(pool.get_ref(), vec![updated]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Database("Failed to assemble prototype response".to_string()))?;

    Ok(HttpResponse::Ok().json(response))
}

/// All distinct storage locations in use.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes/storage_locations",
    tag = "Prototypes",
    responses(
        (status = 200, description = "Distinct storage locations", body = [String]),
    )
)]
pub async fn storage_locations(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let _actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let locations = prototypes::storage_locations(pool.connection()).await?;
    Ok(HttpResponse::Ok().json(locations))
}

/// Prototype counts shaped by role: students see their own count, staff and
/// admin see the full count twice.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes/count",
    tag = "Prototypes",
    responses(
        (status = 200, description = "Prototype counts", body = PrototypeCountResponse),
    )
)]
pub async fn prototype_count(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let available_count = prototypes::count_all(pool.connection()).await?;
    let your_count = if actor.role == Role::Student {
        prototypes::count_by_student(pool.connection(), actor.id).await?
    } else {
        available_count
    };

    Ok(HttpResponse::Ok().json(PrototypeCountResponse {
        your_count,
        available_count,
    }))
}

/// Upload counts per weekday over the trailing 30 days.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes/summary/30-days",
    tag = "Prototypes",
    responses(
        (status = 200, description = "Uploads per weekday, Monday first"),
    )
)]
pub async fn upload_summary_30_days(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let _actor = users::find_actor(pool.connection(), &auth.claims).await?;

    let dates = prototypes::submission_dates_last_30_days(pool.connection()).await?;
    Ok(HttpResponse::Ok().json(prototypes::bucket_by_weekday(&dates)))
}

/// Path parameters for attachment download.
#[derive(serde::Deserialize)]
pub struct AttachmentPath {
    pub prototype_id: Uuid,
    pub kind: String,
}

/// Download one of the two attachment files.
#[utoipa::path(
    get,
    path = "/api/v1/prototypes/{prototype_id}/attachment/{kind}",
    tag = "Prototypes",
    params(
        ("prototype_id" = Uuid, Path, description = "Prototype UUID"),
        ("kind" = String, Path, description = "Attachment kind: report or source_code")
    ),
    responses(
        (status = 200, description = "Attachment file bytes"),
        (status = 404, description = "Prototype or file not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_attachment(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    path: web::Path<AttachmentPath>,
) -> AppResult<HttpResponse> {
    let actor = users::find_actor(pool.connection(), &auth.claims).await?;
    if !actor.role.permits(Action::ViewPrototype) {
        return Err(AppError::Forbidden(
            "You are not allowed to view prototypes".to_string(),
        ));
    }

    let AttachmentPath { prototype_id, kind } = path.into_inner();

    let attachment = prototypes::attachment_for(pool.connection(), prototype_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prototype {}", prototype_id)))?;

    let key = match kind.as_str() {
        "report" => attachment.report,
        "source_code" => attachment.source_code,
        _ => {
            return Err(AppError::InvalidInput(
                "Attachment kind must be 'report' or 'source_code'".to_string(),
            ));
        }
    };

    let (data, content_type) = storage.get(&key).await?;
    let filename = key.rsplit('/').next().unwrap_or("attachment").to_string();

    Ok(HttpResponse::Ok()
        .content_type(
            content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        )
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(data))
}

// ============================================================================
// Response assembly
// ============================================================================

/// Assemble full responses for a batch of prototype rows.
///
/// Nested student/reviewer/supervisor users, departments and attachments are
/// batch-fetched once and joined in memory.
async fn build_prototype_responses(
    pool: &DbPool,
    rows: Vec<prototype::Model>,
) -> AppResult<Vec<PrototypeResponse>> {
    let db = pool.connection();
    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();

    let supervisors_map = prototypes::supervisors_by_prototype_ids(db, &ids).await?;
    let attachments_map = prototypes::attachments_by_prototype_ids(db, &ids).await?;

    let mut user_ids: Vec<Uuid> = Vec::new();
    for row in &rows {
        user_ids.push(row.student_id);
        if let Some(reviewer_id) = row.reviewer_id {
            user_ids.push(reviewer_id);
        }
    }
    user_ids.extend(supervisors_map.values().flatten().copied());
    user_ids.sort_unstable();
    user_ids.dedup();

    let users_map = users::find_map_by_ids(db, &user_ids).await?;

    let mut department_ids: Vec<Uuid> = rows.iter().map(|p| p.department_id).collect();
    department_ids.sort_unstable();
    department_ids.dedup();
    let departments_map = departments::find_map_by_ids(db, &department_ids).await?;

    let mut responses = Vec::with_capacity(rows.len());
    for row in rows {
        let student = users_map
            .get(&row.student_id)
            .cloned()
            .map(UserResponse::from)
            .ok_or_else(|| {
                AppError::Database(format!("Prototype {} references unknown student", row.id))
            })?;

        let department = departments_map
            .get(&row.department_id)
            .map(|d| DepartmentResponse {
                id: d.id,
                name: d.name.clone(),
                description: d.description.clone(),
            })
            .ok_or_else(|| {
                AppError::Database(format!("Prototype {} references unknown department", row.id))
            })?;

        let attachment = attachments_map
            .get(&row.id)
            .map(|a| AttachmentResponse {
                report: a.report.clone(),
                source_code: a.source_code.clone(),
            })
            .ok_or_else(|| {
                AppError::Database(format!("Prototype {} has no attachment", row.id))
            })?;

        let supervisor_ids = supervisors_map.get(&row.id).cloned().unwrap_or_default();
        let supervisors: Vec<UserResponse> = supervisor_ids
            .iter()
            .filter_map(|id| users_map.get(id).cloned())
            .map(UserResponse::from)
            .collect();

        let reviewer = row
            .reviewer_id
            .and_then(|id| users_map.get(&id).cloned())
            .map(UserResponse::from);

        responses.push(PrototypeResponse {
            id: row.id,
            student,
            title: row.title,
            abstract_text: row.abstract_text,
            department,
            supervisor_ids,
            academic_year: row.academic_year,
            supervisors,
            submission_date: row.submission_date,
            status: PrototypeStatus::parse(&row.status)
                .unwrap_or(PrototypeStatus::SubmittedNotReviewed),
            has_physical_prototype: row.has_physical_prototype,
            barcode: row.barcode,
            storage_location: row.storage_location,
            feedback: row.feedback,
            reviewer,
            attachment,
            research_group: row.research_group,
            project_link: row.project_link,
        });
    }

    Ok(responses)
}

// ============================================================================
// Multipart collection
// ============================================================================

/// A parsed multipart submission.
struct Submission {
    fields: CreatePrototypeFields,
    report: Option<UploadedFile>,
    source_code: Option<UploadedFile>,
}

/// Collect the multipart submission into scalar fields and the two files.
///
/// Text parts use the frontend's form keys; the files arrive as
/// `attachment.report` and `attachment.source_code`.
async fn collect_submission(mut payload: Multipart, max_size: usize) -> AppResult<Submission> {
    let mut fields = CreatePrototypeFields::default();
    let mut report: Option<UploadedFile> = None;
    let mut source_code: Option<UploadedFile> = None;
    let mut total_size: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;

        let name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::InvalidInput("Missing field name".to_string()))?
            .to_string();
        let filename = content_disposition
            .get_filename()
            .map(|f| f.replace('\\', "/"));

        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk_data =
                chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            total_size += chunk_data.len();
            if total_size > max_size {
                return Err(AppError::InvalidInput(format!(
                    "Upload exceeds the {} byte limit",
                    max_size
                )));
            }
            data.extend_from_slice(&chunk_data);
        }

        match (name.as_str(), filename) {
            ("attachment.report", Some(filename)) => {
                if filename.contains("..") || filename.starts_with('/') {
                    return Err(AppError::InvalidInput("Invalid report filename".to_string()));
                }
                report = Some(UploadedFile { filename, data });
            }
            ("attachment.source_code", Some(filename)) => {
                if filename.contains("..") || filename.starts_with('/') {
                    return Err(AppError::InvalidInput(
                        "Invalid source code filename".to_string(),
                    ));
                }
                source_code = Some(UploadedFile { filename, data });
            }
            (name, _) => {
                let value = String::from_utf8(data).map_err(|_| {
                    AppError::InvalidInput(format!("Field '{}' is not valid UTF-8", name))
                })?;
                apply_text_field(&mut fields, name, value.trim())?;
            }
        }
    }

    Ok(Submission {
        fields,
        report,
        source_code,
    })
}

/// Apply one text part onto the submission fields.
///
/// `department` is accepted and discarded: it is always derived from the
/// student server-side. Unknown keys are ignored the way a form parser would.
fn apply_text_field(
    fields: &mut CreatePrototypeFields,
    name: &str,
    value: &str,
) -> AppResult<()> {
    match name {
        "title" => fields.title = value.to_string(),
        "abstract" => fields.abstract_text = value.to_string(),
        "academic_year" => fields.academic_year = value.to_string(),
        "has_physical_prototype" => {
            fields.has_physical_prototype = matches!(value, "true" | "True" | "1" | "on");
        }
        "student" => {
            if !value.is_empty() {
                let id = Uuid::parse_str(value)
                    .map_err(|_| AppError::InvalidInput("Invalid student ID".to_string()))?;
                fields.student = Some(id);
            }
        }
        "supervisor_ids" | "supervisor" => {
            for part in value.split(',').filter(|p| !p.trim().is_empty()) {
                let id = Uuid::parse_str(part.trim())
                    .map_err(|_| AppError::InvalidInput("Invalid supervisor ID".to_string()))?;
                fields.supervisor_ids.push(id);
            }
        }
        "research_group" => {
            if !value.is_empty() {
                fields.research_group = Some(value.to_string());
            }
        }
        "project_link" => {
            if !value.is_empty() {
                fields.project_link = Some(value.to_string());
            }
        }
        _ => {}
    }
    Ok(())
}

/// Configure prototype routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/prototypes")
            .route(web::get().to(list_prototypes))
            .route(web::post().to(create_prototype)),
    )
    .service(web::resource("/prototypes/storage_locations").route(web::get().to(storage_locations)))
    .service(web::resource("/prototypes/count").route(web::get().to(prototype_count)))
    .service(
        web::resource("/prototypes/summary/30-days").route(web::get().to(upload_summary_30_days)),
    )
    .service(web::resource("/prototypes/{prototype_id}").route(web::get().to(get_prototype)))
    .service(
        web::resource("/prototypes/{prototype_id}/review").route(web::post().to(review_prototype)),
    )
    .service(
        web::resource("/prototypes/{prototype_id}/assign_storage")
            .route(web::post().to(assign_storage)),
    )
    .service(
        web::resource("/prototypes/{prototype_id}/attachment/{kind}")
            .route(web::get().to(download_attachment)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_text_field_parses_supervisors() {
        let mut fields = CreatePrototypeFields::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        apply_text_field(&mut fields, "supervisor_ids", &format!("{},{}", a, b)).unwrap();
        assert_eq!(fields.supervisor_ids, vec![a, b]);

        let c = Uuid::new_v4();
        apply_text_field(&mut fields, "supervisor", &c.to_string()).unwrap();
        assert_eq!(fields.supervisor_ids, vec![a, b, c]);
    }

    #[test]
    fn test_apply_text_field_rejects_bad_ids() {
        let mut fields = CreatePrototypeFields::default();
        assert!(apply_text_field(&mut fields, "student", "not-a-uuid").is_err());
        assert!(apply_text_field(&mut fields, "supervisor_ids", "also-bad").is_err());
    }

    #[test]
    fn test_apply_text_field_booleans_and_department_ignored() {
        let mut fields = CreatePrototypeFields::default();
        apply_text_field(&mut fields, "has_physical_prototype", "true").unwrap();
        assert!(fields.has_physical_prototype);

        apply_text_field(&mut fields, "has_physical_prototype", "false").unwrap();
        assert!(!fields.has_physical_prototype);

        // Caller-supplied department is discarded, not an error
        apply_text_field(&mut fields, "department", "anything").unwrap();
    }
}
