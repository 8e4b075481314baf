//! Database operations for users.

use chrono::Utc;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::user::{self, Entity as UserEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Role, SessionClaims, User};

/// Convert a database row into the domain user (password hash dropped).
pub fn model_to_user(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        username: m.username,
        full_name: m.full_name,
        // Role column carries a CHECK constraint; fall back to the least
        // privileged role if the database and code ever disagree.
        role: Role::parse(&m.role).unwrap_or(Role::GeneralUser),
        level: m.level,
        is_staff: m.is_staff,
        is_active: m.is_active,
        is_approved: m.is_approved,
        department_id: m.department_id,
        phone: m.phone,
        institution_id: m.institution_id,
        created_at: m.created_at,
    }
}

/// Find a user by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<User>> {
    let result = UserEntity::find_by_id(id).one(db).await?;
    Ok(result.map(model_to_user))
}

/// Find the raw user row by ID (includes the password hash).
pub async fn find_model_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> AppResult<Option<user::Model>> {
    Ok(UserEntity::find_by_id(id).one(db).await?)
}

/// Find the raw user row by email (includes the password hash).
pub async fn find_model_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> AppResult<Option<user::Model>> {
    let result = UserEntity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    Ok(result)
}

/// Check whether an email or username is already registered.
pub async fn email_or_username_taken(
    db: &DatabaseConnection,
    email: &str,
    username: &str,
) -> AppResult<bool> {
    let count = UserEntity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(email))
                .add(user::Column::Username.eq(username)),
        )
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Insert a new user row and fetch it back.
pub async fn insert(db: &DatabaseConnection, model: user::ActiveModel) -> AppResult<User> {
    let id = match &model.id {
        ActiveValue::Set(id) => *id,
        _ => return Err(AppError::Database("User insert without an id".to_string())),
    };

    UserEntity::insert(model).exec(db).await?;

    let inserted = UserEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch newly inserted user".to_string()))?;

    Ok(model_to_user(inserted))
}

/// List all users.
pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<User>> {
    let rows = UserEntity::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(model_to_user).collect())
}

/// List users holding one specific role.
pub async fn list_by_role(db: &DatabaseConnection, role: Role) -> AppResult<Vec<User>> {
    let rows = UserEntity::find()
        .filter(user::Column::Role.eq(role.as_str()))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(model_to_user).collect())
}

/// List staff and admin members who can act as supervisors.
pub async fn list_supervisors(db: &DatabaseConnection) -> AppResult<Vec<User>> {
    let rows = UserEntity::find()
        .filter(user::Column::Role.is_in([Role::Staff.as_str(), Role::Admin.as_str()]))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(model_to_user).collect())
}

/// Batch-fetch users by id into a lookup map.
pub async fn find_map_by_ids(
    db: &DatabaseConnection,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = UserEntity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|m| (m.id, model_to_user(m)))
        .collect())
}

/// Mark a user as approved. Idempotent.
pub async fn set_approved(db: &DatabaseConnection, id: Uuid) -> AppResult<User> {
    let model = UserEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

    let mut active: user::ActiveModel = model.into();
    active.is_approved = Set(true);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    Ok(model_to_user(updated))
}

/// Update the caller-mutable profile fields.
pub async fn update_profile(
    db: &DatabaseConnection,
    id: Uuid,
    phone: Option<String>,
    email: Option<String>,
) -> AppResult<User> {
    let model = UserEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

    let mut active: user::ActiveModel = model.into();
    if let Some(phone) = phone {
        active.phone = Set(Some(phone));
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    Ok(model_to_user(updated))
}

/// Replace a user's password hash.
pub async fn update_password_hash(
    db: &DatabaseConnection,
    id: Uuid,
    password_hash: String,
) -> AppResult<()> {
    let model = UserEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

    let mut active: user::ActiveModel = model.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;

    Ok(())
}

/// Resolve the acting user from verified session claims.
///
/// The token outliving the account (or the account being deactivated) is an
/// authentication failure, not a 404.
pub async fn find_actor(db: &DatabaseConnection, claims: &SessionClaims) -> AppResult<User> {
    let id = Uuid::parse_str(&claims.user_id)
        .map_err(|_| AppError::Unauthorized("Invalid session subject".to_string()))?;

    let user = find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User account no longer exists".to_string()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized(
            "User account is deactivated".to_string(),
        ));
    }

    Ok(user)
}
