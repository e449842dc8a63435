use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "revisions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub requested_by: Uuid,
    pub notes: String,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_items::Entity",
        from = "Column::OrderItemId",
        to = "super::order_items::Column::Id"
    )]
    OrderItems,
    #[sea_orm(has_many = "super::revision_images::Entity")]
    RevisionImages,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::revision_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RevisionImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
