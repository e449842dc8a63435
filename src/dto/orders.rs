use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, Revision};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevisionRequestBody {
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevisionResponse {
    pub revision: Revision,
    pub order: Order,
}
