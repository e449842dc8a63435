use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ItemSpecifications, PhotoRef, Service};

/// One photo added to the cart. The photo has already been uploaded; this
/// creates the cart row that carries it. One row per photo, quantity is
/// always 1.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub service_id: Uuid,
    pub photo: PhotoRef,
    pub notes: Option<String>,
    /// Uploaded-image record to attach to the new cart row.
    pub uploaded_image_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub service: Service,
    pub quantity: i32,
    pub specifications: ItemSpecifications,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartItemDto>,
    /// Sum of service base prices over all rows, in cents.
    pub total_amount: i64,
}
