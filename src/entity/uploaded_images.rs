use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "uploaded_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub cart_item_id: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub original_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub upload_status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
