//! Join table linking prototypes to their supervising staff members.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "prototype_supervisors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub prototype_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::prototype::Entity",
        from = "Column::PrototypeId",
        to = "super::prototype::Column::Id"
    )]
    Prototype,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::prototype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prototype.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
