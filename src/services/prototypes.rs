//! Prototype workflows: submission, review and storage assignment.
//!
//! Every function takes the acting user explicitly; authorization is decided
//! by the role/action policy table before anything is fetched or mutated.

use tracing::info;
use uuid::Uuid;

use sea_orm::DatabaseConnection;

use crate::auth::Action;
use crate::db::prototypes::{self, NewPrototype};
use crate::db::users;
use crate::entity::{attachment, prototype};
use crate::error::{AppError, AppResult};
use crate::models::{CreatePrototypeFields, ListPrototypesQuery, PrototypeStatus, Role, User};
use crate::services::storage::Storage;

/// Maximum number of supervisors per prototype.
pub const MAX_SUPERVISORS: usize = 5;

/// An uploaded attachment file from the multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Review a prototype: one-shot forward transition recording feedback and
/// the reviewer's identity. This is the only path that ever sets the
/// reviewer.
pub async fn review_prototype(
    db: &DatabaseConnection,
    actor: &User,
    prototype_id: Uuid,
    feedback: &str,
) -> AppResult<prototype::Model> {
    if !actor.role.permits(Action::ReviewPrototype) {
        return Err(AppError::Forbidden(
            "Only staff and admins can review prototypes".to_string(),
        ));
    }

    let model = prototypes::find_by_id(db, prototype_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prototype {}", prototype_id)))?;

    let feedback = validate_feedback(feedback)?;

    if model.status == PrototypeStatus::SubmittedReviewed.as_str() {
        return Err(AppError::Conflict(
            "Prototype has already been reviewed".to_string(),
        ));
    }

    let updated = prototypes::update_review(db, model, feedback, actor.id).await?;

    info!(
        "Prototype reviewed: id={}, reviewer={}",
        prototype_id, actor.username
    );

    Ok(updated)
}

/// Assign a physical storage location. Overwrites any previous assignment;
/// no history is kept.
pub async fn assign_storage(
    db: &DatabaseConnection,
    actor: &User,
    prototype_id: Uuid,
    location: &str,
) -> AppResult<prototype::Model> {
    if !actor.role.permits(Action::AssignStorage) {
        return Err(AppError::Forbidden(
            "Only admins can assign storage locations".to_string(),
        ));
    }

    let model = prototypes::find_by_id(db, prototype_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prototype {}", prototype_id)))?;

    if !model.has_physical_prototype {
        return Err(AppError::InvalidInput(
            "This prototype does not have a physical version".to_string(),
        ));
    }

    let location = location.trim();
    if location.is_empty() {
        return Err(AppError::InvalidInput(
            "Storage location is required".to_string(),
        ));
    }

    let updated = prototypes::update_storage_location(db, model, location).await?;

    info!(
        "Storage assigned: prototype={}, location='{}'",
        prototype_id, location
    );

    Ok(updated)
}

/// List prototypes shaped by the actor's role.
pub async fn list_prototypes(
    db: &DatabaseConnection,
    actor: &User,
    query: &ListPrototypesQuery,
) -> AppResult<Vec<prototype::Model>> {
    if !actor.role.permits(Action::ListPrototypes) {
        return Err(AppError::Forbidden(
            "You are not allowed to view prototypes".to_string(),
        ));
    }

    prototypes::list_for_actor(db, actor, query).await
}

/// Create a prototype with its attachment.
///
/// The attachment blobs are uploaded to S3 first, then the prototype,
/// supervisor links and attachment row are inserted in a single database
/// transaction.
pub async fn create_prototype(
    db: &DatabaseConnection,
    storage: &Storage,
    actor: &User,
    fields: CreatePrototypeFields,
    report: Option<UploadedFile>,
    source_code: Option<UploadedFile>,
) -> AppResult<(prototype::Model, attachment::Model)> {
    if !actor.role.permits(Action::SubmitPrototype) {
        return Err(AppError::Forbidden(
            "Only students and admins can submit prototypes".to_string(),
        ));
    }

    if fields.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }

    let student_id = resolve_student_id(actor, fields.student)?;

    let student = users::find_by_id(db, student_id)
        .await?
        .ok_or_else(|| AppError::InvalidInput("Specified user is not a student".to_string()))?;

    if student.role != Role::Student {
        return Err(AppError::InvalidInput(
            "Specified user is not a student".to_string(),
        ));
    }

    let department_id = student.department_id.ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Student {} has no department assigned",
            student.username
        ))
    })?;

    validate_supervisor_count(fields.supervisor_ids.len())?;

    if !fields.supervisor_ids.is_empty() {
        let known = users::find_map_by_ids(db, &fields.supervisor_ids).await?;
        for id in &fields.supervisor_ids {
            if !known.contains_key(id) {
                return Err(AppError::InvalidInput(format!("Unknown supervisor {}", id)));
            }
        }
    }

    let report = report.ok_or_else(|| {
        AppError::InvalidInput("Attachment report file is required".to_string())
    })?;
    let source_code = source_code.ok_or_else(|| {
        AppError::InvalidInput("Attachment source code file is required".to_string())
    })?;

    // UUIDv7 keeps listing order aligned with submission time
    let id = Uuid::now_v7();
    let id_str = id.to_string();

    let report_key = Storage::attachment_key(&id_str, "report", &report.filename);
    let source_code_key = Storage::attachment_key(&id_str, "source_code", &source_code.filename);

    upload_attachment(storage, &report_key, report).await?;
    upload_attachment(storage, &source_code_key, source_code).await?;

    let new = NewPrototype {
        id,
        student_id,
        title: fields.title.trim().to_string(),
        abstract_text: fields.abstract_text,
        department_id,
        academic_year: fields.academic_year,
        has_physical_prototype: fields.has_physical_prototype,
        barcode: make_barcode(id),
        research_group: fields.research_group,
        project_link: fields.project_link,
        supervisor_ids: fields.supervisor_ids,
        report_key,
        source_code_key,
    };

    let (prototype_row, attachment_row) = prototypes::insert_with_attachment(db, new).await?;

    info!(
        "Prototype submitted: id={}, student={}, barcode={}",
        prototype_row.id, student.username, prototype_row.barcode
    );

    Ok((prototype_row, attachment_row))
}

async fn upload_attachment(storage: &Storage, key: &str, file: UploadedFile) -> AppResult<()> {
    let content_type = file
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| Storage::content_type_for_extension(ext));

    storage.put(key, file.data, content_type).await
}

/// Resolve which student a submission belongs to.
///
/// Students submit for themselves; admins must name the student explicitly.
pub fn resolve_student_id(actor: &User, explicit: Option<Uuid>) -> AppResult<Uuid> {
    match explicit {
        Some(id) => Ok(id),
        None => match actor.role {
            Role::Student => Ok(actor.id),
            Role::Admin => Err(AppError::InvalidInput(
                "Student field is required for admin submissions".to_string(),
            )),
            _ => Err(AppError::InvalidInput("Student is required".to_string())),
        },
    }
}

/// Enforce the supervisor cardinality limit.
pub fn validate_supervisor_count(count: usize) -> AppResult<()> {
    if count > MAX_SUPERVISORS {
        return Err(AppError::InvalidInput(format!(
            "You can assign up to {} supervisors only",
            MAX_SUPERVISORS
        )));
    }
    Ok(())
}

/// Feedback must be non-empty after trimming.
pub fn validate_feedback(feedback: &str) -> AppResult<&str> {
    let trimmed = feedback.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Feedback is required".to_string()));
    }
    Ok(trimmed)
}

/// Barcode derived from the prototype id; read-only after creation.
pub fn make_barcode(id: Uuid) -> String {
    format!("PT-{}", &id.simple().to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_role(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "u@example.edu".to_string(),
            username: "u".to_string(),
            full_name: "U".to_string(),
            role,
            level: None,
            is_staff: matches!(role, Role::Staff | Role::Admin),
            is_active: true,
            is_approved: true,
            department_id: None,
            phone: None,
            institution_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_student_resolves_to_self() {
        let student = user_with_role(Role::Student);
        assert_eq!(resolve_student_id(&student, None).unwrap(), student.id);
    }

    #[test]
    fn test_explicit_student_wins() {
        let admin = user_with_role(Role::Admin);
        let target = Uuid::new_v4();
        assert_eq!(resolve_student_id(&admin, Some(target)).unwrap(), target);
    }

    #[test]
    fn test_admin_must_name_a_student() {
        let admin = user_with_role(Role::Admin);
        assert!(matches!(
            resolve_student_id(&admin, None),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_supervisor_count_limit() {
        assert!(validate_supervisor_count(0).is_ok());
        assert!(validate_supervisor_count(5).is_ok());
        assert!(matches!(
            validate_supervisor_count(6),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_feedback_validation_trims_whitespace() {
        assert_eq!(validate_feedback("  Looks good  ").unwrap(), "Looks good");
        assert!(matches!(
            validate_feedback("   "),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_feedback(""),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_barcode_shape() {
        let id = Uuid::now_v7();
        let barcode = make_barcode(id);
        assert!(barcode.starts_with("PT-"));
        assert_eq!(barcode.len(), 11);
        assert_eq!(make_barcode(id), barcode);
    }
}
