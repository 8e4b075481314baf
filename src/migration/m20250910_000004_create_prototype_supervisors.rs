//! Create prototype_supervisors join table.

use sea_orm_migration::prelude::*;

use super::m20250910_000002_create_users::Users;
use super::m20250910_000003_create_prototypes::Prototypes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PrototypeSupervisors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PrototypeSupervisors::PrototypeId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PrototypeSupervisors::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PrototypeSupervisors::PrototypeId)
                            .col(PrototypeSupervisors::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prototype_supervisors_prototype")
                            .from(
                                PrototypeSupervisors::Table,
                                PrototypeSupervisors::PrototypeId,
                            )
                            .to(Prototypes::Table, Prototypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prototype_supervisors_user")
                            .from(PrototypeSupervisors::Table, PrototypeSupervisors::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PrototypeSupervisors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PrototypeSupervisors {
    Table,
    PrototypeId,
    UserId,
}
