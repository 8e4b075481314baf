//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20250910_000001_create_departments;
mod m20250910_000002_create_users;
mod m20250910_000003_create_prototypes;
mod m20250910_000004_create_prototype_supervisors;
mod m20250910_000005_create_attachments;
mod m20250910_000006_create_refresh_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250910_000001_create_departments::Migration),
            Box::new(m20250910_000002_create_users::Migration),
            Box::new(m20250910_000003_create_prototypes::Migration),
            Box::new(m20250910_000004_create_prototype_supervisors::Migration),
            Box::new(m20250910_000005_create_attachments::Migration),
            Box::new(m20250910_000006_create_refresh_tokens::Migration),
        ]
    }
}
