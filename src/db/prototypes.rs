//! Database queries for prototypes.

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::attachment::{self, Entity as Attachment};
use crate::entity::prototype::{self, Entity as Prototype};
use crate::entity::prototype_supervisor::{self, Entity as PrototypeSupervisor};
use crate::error::{AppError, AppResult};
use crate::models::{ListPrototypesQuery, PrototypeStatus, Role, User, WeekdayUploads};

/// Fields of a new prototype submission, already validated by the service
/// layer. Attachment keys point at uploaded S3 objects.
#[derive(Debug, Clone)]
pub struct NewPrototype {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub abstract_text: String,
    pub department_id: Uuid,
    pub academic_year: String,
    pub has_physical_prototype: bool,
    pub barcode: String,
    pub research_group: Option<String>,
    pub project_link: Option<String>,
    pub supervisor_ids: Vec<Uuid>,
    pub report_key: String,
    pub source_code_key: String,
}

/// Insert a prototype, its supervisor links and its attachment atomically.
///
/// All three inserts share one transaction; a failure in any of them leaves
/// no partial record behind.
pub async fn insert_with_attachment(
    db: &DatabaseConnection,
    new: NewPrototype,
) -> AppResult<(prototype::Model, attachment::Model)> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let prototype_model = prototype::ActiveModel {
        id: Set(new.id),
        student_id: Set(new.student_id),
        title: Set(new.title),
        abstract_text: Set(new.abstract_text),
        department_id: Set(new.department_id),
        academic_year: Set(new.academic_year),
        submission_date: Set(now),
        status: Set(PrototypeStatus::SubmittedNotReviewed.as_str().to_string()),
        has_physical_prototype: Set(new.has_physical_prototype),
        barcode: Set(new.barcode),
        storage_location: Set(None),
        feedback: Set(None),
        reviewer_id: Set(None),
        research_group: Set(new.research_group),
        project_link: Set(new.project_link),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = prototype_model
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert prototype: {}", e)))?;

    if !new.supervisor_ids.is_empty() {
        let links: Vec<prototype_supervisor::ActiveModel> = new
            .supervisor_ids
            .iter()
            .map(|user_id| prototype_supervisor::ActiveModel {
                prototype_id: Set(new.id),
                user_id: Set(*user_id),
            })
            .collect();

        PrototypeSupervisor::insert_many(links)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert supervisors: {}", e)))?;
    }

    let attachment_model = attachment::ActiveModel {
        id: Set(Uuid::new_v4()),
        prototype_id: Set(new.id),
        report: Set(new.report_key),
        source_code: Set(new.source_code_key),
        created_at: Set(now),
    };

    let attachment_row = attachment_model
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert attachment: {}", e)))?;

    txn.commit().await?;

    Ok((inserted, attachment_row))
}

/// Get a prototype by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<prototype::Model>> {
    Ok(Prototype::find_by_id(id).one(db).await?)
}

/// List prototypes shaped by the actor's role.
///
/// Students see every prototype with their own submissions first; staff and
/// admin see the same set in plain recency order. Each call runs a fresh
/// query; no cursor state is kept.
pub async fn list_for_actor(
    db: &DatabaseConnection,
    actor: &User,
    query: &ListPrototypesQuery,
) -> AppResult<Vec<prototype::Model>> {
    let mut select = Prototype::find();

    if let Some(ref search) = query.search {
        let term = search.trim();
        if !term.is_empty() {
            select = select.filter(
                Condition::any()
                    .add(prototype::Column::Title.contains(term))
                    .add(prototype::Column::Barcode.contains(term))
                    .add(prototype::Column::StorageLocation.contains(term)),
            );
        }
    }

    if actor.role == Role::Student {
        // Own submissions sort first: priority 0 for own, 1 for everyone else
        select = select.order_by(
            Expr::cust_with_values("CASE WHEN student_id = $1 THEN 0 ELSE 1 END", [actor.id]),
            Order::Asc,
        );
    }

    let rows = select
        .order_by_desc(prototype::Column::SubmissionDate)
        .all(db)
        .await?;

    Ok(rows)
}

/// Persist a review: status transition, feedback and reviewer identity.
pub async fn update_review(
    db: &DatabaseConnection,
    model: prototype::Model,
    feedback: &str,
    reviewer_id: Uuid,
) -> AppResult<prototype::Model> {
    let mut active: prototype::ActiveModel = model.into();
    active.status = Set(PrototypeStatus::SubmittedReviewed.as_str().to_string());
    active.feedback = Set(Some(feedback.to_string()));
    active.reviewer_id = Set(Some(reviewer_id));
    active.updated_at = Set(Utc::now());

    let updated = active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update review: {}", e)))?;

    Ok(updated)
}

/// Persist a storage location assignment. Overwrites any previous value.
pub async fn update_storage_location(
    db: &DatabaseConnection,
    model: prototype::Model,
    location: &str,
) -> AppResult<prototype::Model> {
    let mut active: prototype::ActiveModel = model.into();
    active.storage_location = Set(Some(location.to_string()));
    active.updated_at = Set(Utc::now());

    let updated = active
        .update(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to assign storage: {}", e)))?;

    Ok(updated)
}

/// All distinct non-empty storage locations.
pub async fn storage_locations(db: &DatabaseConnection) -> AppResult<Vec<String>> {
    let locations: Vec<String> = Prototype::find()
        .select_only()
        .column(prototype::Column::StorageLocation)
        .distinct()
        .filter(prototype::Column::StorageLocation.is_not_null())
        .filter(prototype::Column::StorageLocation.ne(""))
        .order_by_asc(prototype::Column::StorageLocation)
        .into_tuple()
        .all(db)
        .await?;

    Ok(locations)
}

/// Count all prototypes.
pub async fn count_all(db: &DatabaseConnection) -> AppResult<u64> {
    Ok(Prototype::find().count(db).await?)
}

/// Count prototypes submitted by one student.
pub async fn count_by_student(db: &DatabaseConnection, student_id: Uuid) -> AppResult<u64> {
    Ok(Prototype::find()
        .filter(prototype::Column::StudentId.eq(student_id))
        .count(db)
        .await?)
}

/// Submission dates within the trailing 30 days.
pub async fn submission_dates_last_30_days(
    db: &DatabaseConnection,
) -> AppResult<Vec<DateTime<Utc>>> {
    let cutoff = Utc::now() - Duration::days(30);

    let dates: Vec<DateTime<Utc>> = Prototype::find()
        .select_only()
        .column(prototype::Column::SubmissionDate)
        .filter(prototype::Column::SubmissionDate.gte(cutoff))
        .into_tuple()
        .all(db)
        .await?;

    Ok(dates)
}

/// Bucket submission dates by weekday, Monday first. Every weekday appears
/// in the output even when its count is zero.
pub fn bucket_by_weekday(dates: &[DateTime<Utc>]) -> Vec<WeekdayUploads> {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let mut counts: HashMap<String, u64> = HashMap::new();
    for date in dates {
        *counts.entry(date.format("%a").to_string()).or_insert(0) += 1;
    }

    DAYS.into_iter()
        .map(|day| WeekdayUploads {
            day,
            uploads: counts.get(day).copied().unwrap_or(0),
        })
        .collect()
}

/// Batch-fetch supervisor links for a set of prototypes.
pub async fn supervisors_by_prototype_ids(
    db: &DatabaseConnection,
    prototype_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    if prototype_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = PrototypeSupervisor::find()
        .filter(prototype_supervisor::Column::PrototypeId.is_in(prototype_ids.iter().copied()))
        .all(db)
        .await?;

    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        map.entry(row.prototype_id).or_default().push(row.user_id);
    }

    Ok(map)
}

/// Batch-fetch attachments for a set of prototypes.
pub async fn attachments_by_prototype_ids(
    db: &DatabaseConnection,
    prototype_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, attachment::Model>> {
    if prototype_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Attachment::find()
        .filter(attachment::Column::PrototypeId.is_in(prototype_ids.iter().copied()))
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|m| (m.prototype_id, m)).collect())
}

/// Get the attachment belonging to one prototype.
pub async fn attachment_for(
    db: &DatabaseConnection,
    prototype_id: Uuid,
) -> AppResult<Option<attachment::Model>> {
    Ok(Attachment::find()
        .filter(attachment::Column::PrototypeId.eq(prototype_id))
        .one(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_by_weekday_covers_all_days() {
        let buckets = bucket_by_weekday(&[]);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].day, "Mon");
        assert_eq!(buckets[6].day, "Sun");
        assert!(buckets.iter().all(|b| b.uploads == 0));
    }

    #[test]
    fn test_bucket_by_weekday_counts() {
        // 2026-08-03 is a Monday
        let monday = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 8, 4, 9, 30, 0).unwrap();
        let another_monday = Utc.with_ymd_and_hms(2026, 7, 27, 16, 45, 0).unwrap();

        let buckets = bucket_by_weekday(&[monday, tuesday, another_monday]);
        assert_eq!(buckets[0].day, "Mon");
        assert_eq!(buckets[0].uploads, 2);
        assert_eq!(buckets[1].day, "Tue");
        assert_eq!(buckets[1].uploads, 1);
        assert_eq!(buckets[2].uploads, 0);
    }
}
