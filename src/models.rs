use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role, stored as text in `profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Editor,
    Staff,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "customer" => Some(Role::Customer),
            "editor" => Some(Role::Editor),
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Editor => "editor",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Staff-level access: admins and staff.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }

    /// Editor-level access: anyone who may touch the editing pipeline.
    pub fn is_editor(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff | Role::Editor)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Customer)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    /// Price in cents.
    pub base_price: i64,
    pub turnaround_time: String,
    pub image_url: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub features: sqlx::types::Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One uploaded photo as carried in cart/order item specifications.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub url: String,
    pub path: String,
    pub file_name: String,
    pub file_size: i64,
}

/// Free-form per-photo job description, stored as jsonb on cart and order
/// items. `edited_images` is appended by editors as results are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemSpecifications {
    pub photos: Vec<PhotoRef>,
    pub notes: Option<String>,
    pub edited_images: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    /// Always 1; one cart row per uploaded photo.
    pub quantity: i32,
    #[schema(value_type = ItemSpecifications)]
    pub specifications: sqlx::types::Json<ItemSpecifications>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub total_amount: i64,
    pub payment_status: String,
    pub assigned_editor: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    /// Price in cents, locked at checkout.
    pub price: i64,
    pub status: String,
    #[schema(value_type = ItemSpecifications)]
    pub specifications: sqlx::types::Json<ItemSpecifications>,
    pub assigned_editor: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct UploadedImage {
    pub id: Uuid,
    pub cart_item_id: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub original_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub upload_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Revision {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub requested_by: Uuid,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct RevisionImage {
    pub id: Uuid,
    pub revision_id: Uuid,
    pub image_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}
