//! User models and the closed role enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User roles. Closed set; stored as a checked VARCHAR in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Staff,
    Admin,
    GeneralUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::GeneralUser => "general_user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            "general_user" => Some(Self::GeneralUser),
            _ => None,
        }
    }

    /// Human-readable role name for display fields.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Staff => "Staff",
            Self::Admin => "Admin",
            Self::GeneralUser => "General User",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User stored in database (password hash excluded).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub level: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_approved: bool,
    pub department_id: Option<Uuid>,
    pub phone: Option<String>,
    pub institution_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User info response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub role_display: String,
    pub level: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_approved: bool,
    pub department: Option<Uuid>,
    pub phone: Option<String>,
    pub institution_id: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            role: u.role,
            role_display: u.role.display_name().to_string(),
            level: u.level,
            is_staff: u.is_staff,
            is_active: u.is_active,
            is_approved: u.is_approved,
            department: u.department_id,
            phone: u.phone,
            institution_id: u.institution_id,
        }
    }
}

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub user_id: String,
    pub username: String,
    pub role: String,
}

/// Self-registration request. Always creates an unapproved general user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account provisioning request (bootstrap admin key only).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProvisionUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub institution_id: Option<String>,
}

/// Profile update request. Only phone and email are caller-mutable.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Password change request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::Staff, Role::Admin, Role::GeneralUser] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_role_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::GeneralUser).unwrap(),
            "\"general_user\""
        );
        let parsed: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(parsed, Role::Staff);
    }

    #[test]
    fn test_user_response_department_field_name() {
        let user = User {
            id: Uuid::new_v4(),
            email: "s@example.edu".to_string(),
            username: "student1".to_string(),
            full_name: "Student One".to_string(),
            role: Role::Student,
            level: Some("4".to_string()),
            is_staff: false,
            is_active: true,
            is_approved: false,
            department_id: Some(Uuid::new_v4()),
            phone: None,
            institution_id: Some("218000123".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("department").is_some());
        assert!(json.get("department_id").is_none());
        assert_eq!(json["role_display"], "Student");
    }
}
