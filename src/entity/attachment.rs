//! Attachment entity. Exactly one per prototype, created atomically with it.
//!
//! The `report` and `source_code` fields are S3 object keys, not blobs.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub prototype_id: Uuid,
    pub report: String,
    pub source_code: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::prototype::Entity",
        from = "Column::PrototypeId",
        to = "super::prototype::Column::Id"
    )]
    Prototype,
}

impl Related<super::prototype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prototype.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
