use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::dto::cart::{AddToCartRequest, CartItemDto, CartList};
use crate::{
    audit,
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, ItemSpecifications, Service},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

#[derive(FromRow)]
struct CartWithServiceRow {
    cart_id: Uuid,
    quantity: i32,
    specifications: sqlx::types::Json<ItemSpecifications>,
    service_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    base_price: i64,
    turnaround_time: String,
    image_url: Option<String>,
    features: sqlx::types::Json<Vec<String>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub async fn list_cart(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithServiceRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity, ci.specifications,
               s.id AS service_id, s.name, s.description, s.category, s.base_price,
               s.turnaround_time, s.image_url, s.features, s.is_active,
               s.created_at, s.updated_at
        FROM cart_items ci
        JOIN services s ON s.id = ci.service_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    // One row per photo with quantity pinned to 1, so the cart total is a
    // sum over rows rather than a quantity product.
    let totals: (i64, Option<i64>) = sqlx::query_as(
        r#"
        SELECT COUNT(*), SUM(s.base_price * ci.quantity)::bigint
        FROM cart_items ci
        JOIN services s ON s.id = ci.service_id
        WHERE ci.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            service: Service {
                id: row.service_id,
                name: row.name,
                description: row.description,
                category: row.category,
                base_price: row.base_price,
                turnaround_time: row.turnaround_time,
                image_url: row.image_url,
                features: row.features,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            quantity: row.quantity,
            specifications: row.specifications.0,
        })
        .collect();

    let meta = Meta::new(page, limit, totals.0);
    let data = CartList {
        items,
        total_amount: totals.1.unwrap_or(0),
    };
    Ok(ApiResponse::success("OK", data, Some(meta)))
}

/// Add one photo to the cart. Deliberately one row per photo (not per
/// service): each photo carries its own instructions and is priced and
/// tracked independently downstream.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let service: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_active FROM services WHERE id = $1")
            .bind(payload.service_id)
            .fetch_optional(pool)
            .await?;
    match service {
        None => return Err(AppError::BadRequest("service not found".to_string())),
        Some((_, false)) => {
            return Err(AppError::BadRequest("service is not available".to_string()));
        }
        Some((_, true)) => {}
    }

    let specifications = ItemSpecifications {
        photos: vec![payload.photo],
        notes: payload.notes,
        edited_images: Vec::new(),
    };

    let cart_item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, service_id, quantity, specifications)
        VALUES ($1, $2, $3, 1, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.service_id)
    .bind(serde_json::to_value(&specifications).map_err(|e| AppError::Internal(e.into()))?)
    .fetch_one(pool)
    .await?;

    if let Some(image_id) = payload.uploaded_image_id {
        sqlx::query(
            "UPDATE uploaded_images SET cart_item_id = $2 WHERE id = $1",
        )
        .bind(image_id)
        .bind(cart_item.id)
        .execute(pool)
        .await?;
    }

    audit::record(
        pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "cart_item_id": cart_item.id, "service_id": payload.service_id }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    cart_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(cart_item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": cart_item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    audit::record(
        pool,
        Some(user.user_id),
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": result.rows_affected() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
