//! User account workflows: registration, provisioning, approval, profile
//! and password changes.

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::Action;
use crate::db::users;
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::models::{
    ChangePasswordRequest, ProvisionUserRequest, RegisterRequest, Role, UpdateProfileRequest, User,
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Self-registration. Always creates an unapproved general user.
pub async fn register_general_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
) -> AppResult<User> {
    let email = req.email.trim();
    let username = req.username.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username is required".to_string()));
    }
    validate_new_password(&req.password)?;

    if users::email_or_username_taken(db, email, username).await? {
        return Err(AppError::InvalidInput(
            "Email or username is already registered".to_string(),
        ));
    }

    let password = SecretString::from(req.password);
    let password_hash = hash_password(&password, None)
        .map_err(|e| AppError::InvalidInput(format!("Password hashing failed: {}", e)))?;

    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(username.to_string()),
        full_name: Set(String::new()),
        role: Set(Role::GeneralUser.as_str().to_string()),
        level: Set(None),
        is_staff: Set(false),
        is_active: Set(true),
        is_approved: Set(false),
        department_id: Set(None),
        phone: Set(req.phone),
        institution_id: Set(None),
        password_hash: Set(password_hash.expose_secret().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    users::insert(db, model).await
}

/// Provision an account with an explicit role. Gated by the bootstrap admin
/// key at the HTTP layer, not by a session role.
pub async fn provision_user(db: &DatabaseConnection, req: ProvisionUserRequest) -> AppResult<User> {
    let email = req.email.trim();
    let username = req.username.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username is required".to_string()));
    }
    validate_new_password(&req.password)?;

    if users::email_or_username_taken(db, email, username).await? {
        return Err(AppError::InvalidInput(
            "Email or username is already registered".to_string(),
        ));
    }

    let password = SecretString::from(req.password);
    let password_hash = hash_password(&password, None)
        .map_err(|e| AppError::InvalidInput(format!("Password hashing failed: {}", e)))?;

    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(username.to_string()),
        full_name: Set(req.full_name),
        role: Set(req.role.as_str().to_string()),
        level: Set(req.level),
        is_staff: Set(matches!(req.role, Role::Staff | Role::Admin)),
        is_active: Set(true),
        // Only self-registered general users go through the approval queue
        is_approved: Set(req.role != Role::GeneralUser),
        department_id: Set(req.department_id),
        phone: Set(req.phone),
        institution_id: Set(req.institution_id),
        password_hash: Set(password_hash.expose_secret().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = users::insert(db, model).await?;
    info!(
        "Account provisioned: '{}' role={}",
        created.username, created.role
    );

    Ok(created)
}

/// Approve a self-registered general user. Idempotent: approving an
/// already-approved general user succeeds without change.
pub async fn approve_user(
    db: &DatabaseConnection,
    actor: &User,
    target_id: Uuid,
) -> AppResult<User> {
    if !actor.role.permits(Action::ApproveUser) {
        return Err(AppError::Forbidden(
            "Only admins can approve users".to_string(),
        ));
    }

    let target = users::find_by_id(db, target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", target_id)))?;

    if target.role != Role::GeneralUser {
        return Err(AppError::InvalidInput(
            "Only general users can be approved".to_string(),
        ));
    }

    let approved = users::set_approved(db, target_id).await?;

    info!("User approved: '{}' by '{}'", approved.username, actor.username);

    Ok(approved)
}

/// Update the caller-mutable profile fields of the acting user.
pub async fn update_profile(
    db: &DatabaseConnection,
    actor: &User,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    if let Some(ref email) = req.email
        && !email.contains('@')
    {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }

    users::update_profile(db, actor.id, req.phone, req.email).await
}

/// Change the acting user's password after verifying the current one.
pub async fn change_password(
    db: &DatabaseConnection,
    actor: &User,
    req: ChangePasswordRequest,
) -> AppResult<()> {
    let model = users::find_model_by_id(db, actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", actor.id)))?;

    let current = SecretString::from(req.current_password);
    if verify_password(&current, &model.password_hash).is_err() {
        return Err(AppError::InvalidInput(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_new_password(&req.new_password)?;

    let new_password = SecretString::from(req.new_password);
    let new_hash = hash_password(&new_password, None)
        .map_err(|e| AppError::InvalidInput(format!("Password hashing failed: {}", e)))?;

    users::update_password_hash(db, actor.id, new_hash.expose_secret().to_string()).await?;

    info!("Password changed for '{}'", actor.username);

    Ok(())
}

/// New passwords must meet the minimum length after trimming.
pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.trim().len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_rule() {
        assert!(validate_new_password("123456").is_ok());
        assert!(validate_new_password("longer password").is_ok());
        assert!(matches!(
            validate_new_password("12345"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_new_password("   123   "),
            Err(AppError::InvalidInput(_))
        ));
    }
}
