//! Database operations for departments.

use chrono::Utc;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::department::{self, Entity as Department};
use crate::error::{AppError, AppResult};

/// List all departments ordered by name.
pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<department::Model>> {
    Ok(Department::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await?)
}

/// Find a department by ID.
pub async fn find_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> AppResult<Option<department::Model>> {
    Ok(Department::find_by_id(id).one(db).await?)
}

/// Batch-fetch departments by id into a lookup map.
pub async fn find_map_by_ids(
    db: &DatabaseConnection,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, department::Model>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Department::find()
        .filter(department::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|m| (m.id, m)).collect())
}

/// Insert a new department.
pub async fn insert(
    db: &DatabaseConnection,
    name: &str,
    description: Option<&str>,
) -> AppResult<department::Model> {
    let id = Uuid::new_v4();

    let model = department::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(description.map(|s| s.to_string())),
        created_at: Set(Utc::now()),
    };

    Department::insert(model).exec(db).await?;

    Department::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch newly inserted department".to_string()))
}
