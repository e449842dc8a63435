use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, Revision};

/// Order- or item-level editor assignment. `editor_id: null` unassigns.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignEditorRequest {
    pub editor_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueItemDto {
    pub item: OrderItem,
    pub order_number: String,
    pub order_status: String,
    pub customer_name: Option<String>,
    pub has_pending_revision: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueList {
    pub items: Vec<QueueItemDto>,
}

/// Result of an editor delivering an image: the updated item and order,
/// plus the revision the delivery resolved, if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct EditedImageResponse {
    pub item: OrderItem,
    pub order: Order,
    pub fulfilled_revision: Option<Revision>,
}
