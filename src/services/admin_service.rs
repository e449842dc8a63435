use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::dto::orders::OrderWithItems;
use crate::entity::{
    access_policies::{ActiveModel as PolicyActive, Entity as AccessPolicies},
    order_items::{Column as OrderItemCol, Entity as OrderItems},
    orders::Entity as Orders,
    revision_images::{Column as RevisionImageCol, Entity as RevisionImages},
    revisions::{Column as RevisionCol, Entity as Revisions},
    uploaded_images::{Column as ImageCol, Entity as UploadedImages},
};
use crate::routes::admin::{
    AccessPolicyDto, AccessPolicyList, AdminOrderDto, AdminOrderList, CreateUserRequest,
    EditorDto, EditorList, ToggleAccessPolicyRequest, UpdateOrderStatusRequest,
    UpdateUserRequest, UserList, UserListQuery,
};
use crate::services::order_service::{order_from_entity, order_item_from_entity};
use crate::workflow::OrderStatus;
use crate::{
    audit,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{Order, Profile, Role},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::auth_service,
    state::AppState,
};

/// Tables whose ownership checks can be toggled through the escape hatch.
const POLICY_TABLES: [&str; 4] = ["orders", "order_items", "cart_items", "uploaded_images"];

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let role_filter = query.role.as_ref().filter(|r| !r.is_empty());
    let rows: Vec<Profile> = match role_filter {
        Some(role) => {
            sqlx::query_as(
                "SELECT * FROM profiles WHERE role = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            )
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM profiles ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(&state.pool)
                .await?
        }
    };

    let total: (i64,) = match role_filter {
        Some(role) => {
            sqlx::query_as("SELECT COUNT(*) FROM profiles WHERE role = $1")
                .bind(role)
                .fetch_one(&state.pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT COUNT(*) FROM profiles")
                .fetch_one(&state.pool)
                .await?
        }
    };

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Users", UserList { items: rows }, Some(meta)))
}

/// Privileged profile creation: an admin provisions an account with an
/// explicit role, bypassing the public signup default.
pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<Profile>> {
    ensure_admin(user)?;

    let role = Role::parse(&payload.role)
        .ok_or_else(|| AppError::BadRequest("unknown role".into()))?;

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".into()));
    }

    let password_hash = auth_service::hash_password(&payload.password)?;
    let profile: Profile = sqlx::query_as(
        r#"
        INSERT INTO profiles (id, email, password_hash, full_name, role, phone, department)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.email.as_str())
    .bind(password_hash)
    .bind(payload.full_name)
    .bind(role.as_str())
    .bind(payload.phone)
    .bind(payload.department)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_create",
        "profiles",
        serde_json::json!({ "user_id": profile.id, "role": role.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("User created", profile, None))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<Profile>> {
    ensure_admin(user)?;

    let existing: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let role = match payload.role {
        Some(raw) => Role::parse(&raw)
            .ok_or_else(|| AppError::BadRequest("unknown role".into()))?
            .as_str()
            .to_string(),
        None => existing.role,
    };
    let full_name = payload.full_name.or(existing.full_name);
    let phone = payload.phone.or(existing.phone);
    let department = payload.department.or(existing.department);
    let is_active = payload.is_active.unwrap_or(existing.is_active);

    let profile: Profile = sqlx::query_as(
        r#"
        UPDATE profiles
        SET full_name = $2, role = $3, phone = $4, department = $5, is_active = $6,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(full_name)
    .bind(role)
    .bind(phone)
    .bind(department)
    .bind(is_active)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_update",
        "profiles",
        serde_json::json!({ "user_id": id, "role": profile.role, "is_active": profile.is_active }),
    )
    .await;

    Ok(ApiResponse::success("User updated", profile, Some(Meta::empty())))
}

/// "Deleting" a user deactivates the profile; identity rows are never
/// removed.
pub async fn deactivate_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Profile>> {
    ensure_admin(user)?;

    let profile: Option<Profile> = sqlx::query_as(
        "UPDATE profiles SET is_active = false, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_deactivate",
        "profiles",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success("User deactivated", profile, Some(Meta::empty())))
}

pub async fn list_editors(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<EditorList>> {
    ensure_staff(user)?;

    #[derive(FromRow)]
    struct EditorRow {
        id: Uuid,
        email: String,
        full_name: Option<String>,
        role: String,
        department: Option<String>,
    }

    let rows = sqlx::query_as::<_, EditorRow>(
        r#"
        SELECT id, email, full_name, role, department
        FROM profiles
        WHERE role IN ('editor', 'staff', 'admin') AND is_active
        ORDER BY full_name NULLS LAST, email
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| EditorDto {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            department: row.department,
        })
        .collect();

    Ok(ApiResponse::success(
        "Editors",
        EditorList { items },
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct AdminOrderRow {
    id: Uuid,
    user_id: Uuid,
    order_number: String,
    status: String,
    total_amount: i64,
    payment_status: String,
    assigned_editor: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_name: Option<String>,
    customer_email: String,
    editor_name: Option<String>,
}

/// Aggregate order listing with joined customer and editor info.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination.normalize();
    let status_filter = query.status.as_ref().filter(|s| !s.is_empty());

    let rows: Vec<AdminOrderRow> = match status_filter {
        Some(status) => {
            sqlx::query_as(
                r#"
                SELECT o.*, p.full_name AS customer_name, p.email AS customer_email,
                       e.full_name AS editor_name
                FROM orders o
                JOIN profiles p ON p.id = o.user_id
                LEFT JOIN profiles e ON e.id = o.assigned_editor
                WHERE o.status = $1
                ORDER BY o.created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT o.*, p.full_name AS customer_name, p.email AS customer_email,
                       e.full_name AS editor_name
                FROM orders o
                JOIN profiles p ON p.id = o.user_id
                LEFT JOIN profiles e ON e.id = o.assigned_editor
                ORDER BY o.created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?
        }
    };

    let total: (i64,) = match status_filter {
        Some(status) => {
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = $1")
                .bind(status)
                .fetch_one(&state.pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT COUNT(*) FROM orders")
                .fetch_one(&state.pool)
                .await?
        }
    };

    let items = rows
        .into_iter()
        .map(|row| AdminOrderDto {
            order: Order {
                id: row.id,
                user_id: row.user_id,
                order_number: row.order_number,
                status: row.status,
                total_amount: row.total_amount,
                payment_status: row.payment_status,
                assigned_editor: row.assigned_editor,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            editor_name: row.editor_name,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(order_from_entity);
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items: Vec<_> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    // Interrupted checkouts used to leave orders without items; if one
    // slipped through, say so instead of rendering an empty list silently.
    let message = if items.is_empty() {
        "Order found, but it has no items (incomplete checkout?)"
    } else {
        "Order found"
    };

    let data = OrderWithItems { order, items };
    Ok(ApiResponse::success(message, data, Some(Meta::empty())))
}

/// Direct status set: the ops escape hatch. Validated against the known
/// status set but deliberately not against the transition table.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: crate::entity::orders::ActiveModel = existing.into();
    active.status = Set(status.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_override",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Hard delete of an order and everything hanging off it, in one
/// transaction: revision images, revisions, uploaded images, items, order.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id).one(&txn).await?;
    if order.is_none() {
        return Err(AppError::NotFound);
    }

    let item_ids: Vec<Uuid> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();

    let revision_ids: Vec<Uuid> = Revisions::find()
        .filter(RevisionCol::OrderItemId.is_in(item_ids.clone()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|revision| revision.id)
        .collect();

    RevisionImages::delete_many()
        .filter(RevisionImageCol::RevisionId.is_in(revision_ids))
        .exec(&txn)
        .await?;
    Revisions::delete_many()
        .filter(RevisionCol::OrderItemId.is_in(item_ids.clone()))
        .exec(&txn)
        .await?;
    UploadedImages::delete_many()
        .filter(ImageCol::OrderItemId.is_in(item_ids))
        .exec(&txn)
        .await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_access_policies(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AccessPolicyList>> {
    ensure_admin(user)?;

    let policies = AccessPolicies::find().all(&state.orm).await?;
    let items = POLICY_TABLES
        .iter()
        .map(|table| {
            let row = policies.iter().find(|p| p.table_name == *table);
            AccessPolicyDto {
                table_name: (*table).to_string(),
                enforced: row.map(|p| p.enforced).unwrap_or(true),
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Access policies",
        AccessPolicyList { items },
        Some(Meta::empty()),
    ))
}

pub async fn toggle_access_policy(
    state: &AppState,
    user: &AuthUser,
    table: String,
    payload: ToggleAccessPolicyRequest,
) -> AppResult<ApiResponse<AccessPolicyDto>> {
    ensure_admin(user)?;

    if !POLICY_TABLES.contains(&table.as_str()) {
        return Err(AppError::BadRequest("unknown policy table".into()));
    }

    let existing = AccessPolicies::find_by_id(table.clone()).one(&state.orm).await?;
    let policy = match existing {
        Some(row) => {
            let mut active: PolicyActive = row.into();
            active.enforced = Set(payload.enforced);
            active.updated_at = Set(Utc::now().into());
            active.update(&state.orm).await?
        }
        None => PolicyActive {
            table_name: Set(table.clone()),
            enforced: Set(payload.enforced),
            updated_at: NotSet,
        }
        .insert(&state.orm)
        .await?,
    };

    tracing::warn!(
        table = %policy.table_name,
        enforced = policy.enforced,
        "ownership-check policy toggled"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "access_policy_toggle",
        "access_policies",
        serde_json::json!({ "table": policy.table_name, "enforced": policy.enforced }),
    )
    .await;

    Ok(ApiResponse::success(
        "Access policy updated",
        AccessPolicyDto {
            table_name: policy.table_name,
            enforced: policy.enforced,
        },
        Some(Meta::empty()),
    ))
}
