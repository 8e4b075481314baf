//! Prototype domain models and DTOs.
//!
//! Response field names are the persisted wire names consumed by the existing
//! frontend: `student`, `supervisors` and `reviewer` carry nested user
//! objects, `supervisor_ids` is accepted on write only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::department::DepartmentResponse;
use super::user::UserResponse;

/// Prototype review status. Forward-only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeStatus {
    SubmittedNotReviewed,
    SubmittedReviewed,
}

impl PrototypeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmittedNotReviewed => "submitted_not_reviewed",
            Self::SubmittedReviewed => "submitted_reviewed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted_not_reviewed" => Some(Self::SubmittedNotReviewed),
            "submitted_reviewed" => Some(Self::SubmittedReviewed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrototypeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attachment file references (S3 object keys).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub report: String,
    pub source_code: String,
}

/// Full prototype response with nested relations resolved on read.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrototypeResponse {
    pub id: Uuid,
    pub student: UserResponse,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub department: DepartmentResponse,
    pub supervisor_ids: Vec<Uuid>,
    pub academic_year: String,
    pub supervisors: Vec<UserResponse>,
    pub submission_date: DateTime<Utc>,
    pub status: PrototypeStatus,
    pub has_physical_prototype: bool,
    pub barcode: String,
    pub storage_location: Option<String>,
    pub feedback: Option<String>,
    pub reviewer: Option<UserResponse>,
    pub attachment: AttachmentResponse,
    pub research_group: Option<String>,
    pub project_link: Option<String>,
}

/// Scalar fields of a prototype submission (multipart text parts).
///
/// `student` is optional: students submit for themselves, admins must name
/// the student explicitly. `department` is never accepted from the caller.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct CreatePrototypeFields {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub academic_year: String,
    #[serde(default)]
    pub student: Option<Uuid>,
    #[serde(default)]
    pub supervisor_ids: Vec<Uuid>,
    #[serde(default)]
    pub has_physical_prototype: bool,
    #[serde(default)]
    pub research_group: Option<String>,
    #[serde(default)]
    pub project_link: Option<String>,
}

/// Review request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub feedback: String,
}

/// Storage assignment request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignStorageRequest {
    pub storage_location: String,
}

/// Query parameters for listing prototypes.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListPrototypesQuery {
    /// Case-insensitive search over title, barcode and storage location.
    #[serde(default)]
    pub search: Option<String>,
}

/// Role-shaped prototype counts.
#[derive(Debug, Serialize, ToSchema)]
pub struct PrototypeCountResponse {
    pub your_count: u64,
    pub available_count: u64,
}

/// Upload count for one weekday in the trailing 30 days.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeekdayUploads {
    pub day: &'static str,
    pub uploads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_user_response() -> UserResponse {
        UserResponse {
            id: Uuid::new_v4(),
            email: "s@example.edu".to_string(),
            username: "student1".to_string(),
            full_name: "Student One".to_string(),
            role: Role::Student,
            role_display: "Student".to_string(),
            level: None,
            is_staff: false,
            is_active: true,
            is_approved: false,
            department: None,
            phone: None,
            institution_id: None,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PrototypeStatus::SubmittedNotReviewed,
            PrototypeStatus::SubmittedReviewed,
        ] {
            assert_eq!(PrototypeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PrototypeStatus::parse("draft"), None);
    }

    #[test]
    fn test_prototype_response_wire_field_names() {
        let response = PrototypeResponse {
            id: Uuid::now_v7(),
            student: sample_user_response(),
            title: "Solar dryer".to_string(),
            abstract_text: "A passive solar crop dryer.".to_string(),
            department: DepartmentResponse {
                id: Uuid::new_v4(),
                name: "Mechanical Engineering".to_string(),
                description: None,
            },
            supervisor_ids: vec![],
            academic_year: "2024/2025".to_string(),
            supervisors: vec![],
            submission_date: Utc::now(),
            status: PrototypeStatus::SubmittedNotReviewed,
            has_physical_prototype: true,
            barcode: "PT-0192ab34".to_string(),
            storage_location: None,
            feedback: None,
            reviewer: None,
            attachment: AttachmentResponse {
                report: "prototypes/x/report/report.pdf".to_string(),
                source_code: "prototypes/x/source_code/src.zip".to_string(),
            },
            research_group: None,
            project_link: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        for field in [
            "id",
            "student",
            "title",
            "abstract",
            "department",
            "supervisor_ids",
            "academic_year",
            "supervisors",
            "submission_date",
            "status",
            "has_physical_prototype",
            "barcode",
            "storage_location",
            "feedback",
            "reviewer",
            "attachment",
            "research_group",
            "project_link",
        ] {
            assert!(json.get(field).is_some(), "missing wire field: {}", field);
        }
        assert_eq!(json["status"], "submitted_not_reviewed");
        assert!(json.get("abstract_text").is_none());
    }
}
