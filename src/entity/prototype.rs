//! Prototype entity for submitted student projects.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "prototypes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    #[sea_orm(column_name = "abstract", column_type = "Text")]
    pub abstract_text: String,
    pub department_id: Uuid,
    pub academic_year: String,
    pub submission_date: DateTimeUtc,
    pub status: String,
    pub has_physical_prototype: bool,
    pub barcode: String,
    pub storage_location: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    pub reviewer_id: Option<Uuid>,
    pub research_group: Option<String>,
    pub project_link: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewerId",
        to = "super::user::Column::Id"
    )]
    Reviewer,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(has_one = "super::attachment::Entity")]
    Attachment,
    #[sea_orm(has_many = "super::prototype_supervisor::Entity")]
    Supervisors,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl Related<super::prototype_supervisor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supervisors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
