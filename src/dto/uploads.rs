use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadQuery {
    /// Attach the uploaded files to this cart row.
    pub cart_item_id: Option<Uuid>,
    /// Attach the uploaded files to this order item.
    pub order_item_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResultDto {
    pub file_name: String,
    /// `uploaded`, `rejected` (validation) or `failed` (storage/db).
    pub status: String,
    pub url: Option<String>,
    pub image_id: Option<Uuid>,
    pub file_size: Option<i64>,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadBatchResponse {
    pub files: Vec<UploadResultDto>,
}
