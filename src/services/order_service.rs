use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, Value,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::dto::orders::{OrderList, OrderWithItems};
use crate::entity::{
    access_policies::{Column as PolicyCol, Entity as AccessPolicies},
    cart_items::{Column as CartCol, Entity as CartItems},
    order_items::{
        ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        Model as OrderItemModel,
    },
    orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    services::{Column as ServiceCol, Entity as Services},
    uploaded_images::{Column as ImageCol, Entity as UploadedImages},
};
use crate::routes::params::{OrderListQuery, SortOrder};
use crate::workflow::OrderStatus;
use crate::{
    audit,
    db::OrmConn,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if ownership_enforced(&state.orm, "orders").await? {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Convert the cart into an order. Runs as one transaction: the order row,
/// its items, the uploaded-image re-pointing and the cart clearing either
/// all land or none do, so a failure cannot leave an order without items or
/// stale cart rows behind.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let cart_rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart_rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let service_ids: Vec<Uuid> = cart_rows.iter().map(|row| row.service_id).collect();
    let prices: HashMap<Uuid, i64> = Services::find()
        .filter(ServiceCol::Id.is_in(service_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.base_price))
        .collect();

    let mut total_amount: i64 = 0;
    for row in &cart_rows {
        let price = prices
            .get(&row.service_id)
            .copied()
            .ok_or_else(|| AppError::BadRequest("cart references a missing service".into()))?;
        total_amount += price * (row.quantity as i64);
    }

    let order_id = Uuid::new_v4();
    let order_number = build_order_number();

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        order_number: Set(order_number),
        status: Set(OrderStatus::Pending.as_str().into()),
        total_amount: Set(total_amount),
        payment_status: Set("pending".into()),
        assigned_editor: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();

    for row in &cart_rows {
        // Specifications are copied verbatim; the price is locked to the
        // service price at this instant.
        let price = prices[&row.service_id];
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            service_id: Set(row.service_id),
            quantity: Set(row.quantity),
            price: Set(price),
            status: Set(OrderStatus::Pending.as_str().into()),
            specifications: Set(row.specifications.clone()),
            assigned_editor: Set(None),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        UploadedImages::update_many()
            .col_expr(ImageCol::OrderItemId, Expr::value(item.id))
            .col_expr(ImageCol::CartItemId, Expr::value(Value::Uuid(None)))
            .filter(ImageCol::CartItemId.eq(row.id))
            .exec(&txn)
            .await?;

        order_items.push(order_item_from_entity(item));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "items": order_items.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if !user.role.is_staff() && ownership_enforced(&state.orm, "orders").await? {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }

    let order = Orders::find().filter(condition).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Ownership-check toggle for a table. Missing rows count as enforced; the
/// escape hatch has to be flipped explicitly.
pub async fn ownership_enforced(orm: &OrmConn, table: &str) -> AppResult<bool> {
    let policy = AccessPolicies::find()
        .filter(PolicyCol::TableName.eq(table))
        .one(orm)
        .await?;
    Ok(policy.map(|p| p.enforced).unwrap_or(true))
}

pub fn build_order_number() -> String {
    format!("ORD-{}", Utc::now().timestamp_millis())
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        status: model.status,
        total_amount: model.total_amount,
        payment_status: model.payment_status,
        assigned_editor: model.assigned_editor,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    let specifications = serde_json::from_value(model.specifications).unwrap_or_default();
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        service_id: model.service_id,
        quantity: model.quantity,
        price: model.price,
        status: model.status,
        specifications: sqlx::types::Json(specifications),
        assigned_editor: model.assigned_editor,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
