//! Create prototypes table.

use sea_orm_migration::prelude::*;

use super::m20250910_000001_create_departments::Departments;
use super::m20250910_000002_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prototypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prototypes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Prototypes::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Prototypes::Title).string().not_null())
                    .col(ColumnDef::new(Prototypes::Abstract).text().not_null())
                    .col(ColumnDef::new(Prototypes::DepartmentId).uuid().not_null())
                    .col(ColumnDef::new(Prototypes::AcademicYear).string().not_null())
                    .col(
                        ColumnDef::new(Prototypes::SubmissionDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Prototypes::Status)
                            .string()
                            .not_null()
                            .default("submitted_not_reviewed")
                            .check(Expr::col(Prototypes::Status).is_in([
                                "submitted_not_reviewed",
                                "submitted_reviewed",
                            ])),
                    )
                    .col(
                        ColumnDef::new(Prototypes::HasPhysicalPrototype)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Prototypes::Barcode).string().not_null())
                    .col(ColumnDef::new(Prototypes::StorageLocation).string())
                    .col(ColumnDef::new(Prototypes::Feedback).text())
                    .col(ColumnDef::new(Prototypes::ReviewerId).uuid())
                    .col(ColumnDef::new(Prototypes::ResearchGroup).string())
                    .col(ColumnDef::new(Prototypes::ProjectLink).string())
                    .col(
                        ColumnDef::new(Prototypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Prototypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prototypes_student")
                            .from(Prototypes::Table, Prototypes::StudentId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prototypes_reviewer")
                            .from(Prototypes::Table, Prototypes::ReviewerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prototypes_department")
                            .from(Prototypes::Table, Prototypes::DepartmentId)
                            .to(Departments::Table, Departments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prototypes_submission_date")
                    .table(Prototypes::Table)
                    .col(Prototypes::SubmissionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prototypes_student_id")
                    .table(Prototypes::Table)
                    .col(Prototypes::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prototypes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Prototypes {
    Table,
    Id,
    StudentId,
    Title,
    Abstract,
    DepartmentId,
    AcademicYear,
    SubmissionDate,
    Status,
    HasPhysicalPrototype,
    Barcode,
    StorageLocation,
    Feedback,
    ReviewerId,
    ResearchGroup,
    ProjectLink,
    CreatedAt,
    UpdatedAt,
}
