//! Order lifecycle operations: editor assignment, edited-image delivery and
//! the revision cycle. Every mutation locks the order row and goes through
//! the transition table in [`crate::workflow`]; an event that is invalid
//! for the order's current status is rejected with a conflict instead of
//! being written.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::dto::workflow::{AssignEditorRequest, EditedImageResponse, QueueItemDto, QueueList};
use crate::dto::orders::{RevisionRequestBody, RevisionResponse};
use crate::entity::{
    order_items::{ActiveModel as OrderItemActive, Entity as OrderItems},
    orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
    profiles::Entity as Profiles,
    revision_images::ActiveModel as RevisionImageActive,
    revisions::{
        ActiveModel as RevisionActive, Column as RevisionCol, Entity as Revisions,
        Model as RevisionModel,
    },
};
use crate::services::order_service::{order_from_entity, order_item_from_entity};
use crate::workflow::{
    self, OrderEvent, OrderStatus, REVISION_COMPLETED, REVISION_PENDING,
};
use crate::{
    audit,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_editor, ensure_staff},
    models::{ItemSpecifications, Order, OrderItem, Revision, Role},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// An editor delivery that has already been validated and written to
/// storage; what remains is the database side of the workflow.
#[derive(Debug, Clone)]
pub struct DeliveredImage {
    pub url: String,
    pub file_name: String,
    pub file_size: i64,
}

pub async fn assign_editor(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: AssignEditorRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    if let Some(editor_id) = payload.editor_id {
        validate_editor(&txn, editor_id).await?;
    }

    let order = lock_order(&txn, order_id).await?;
    let current = parse_status(&order.status)?;
    let next = workflow::next_status(
        current,
        OrderEvent::EditorAssigned {
            assigned: payload.editor_id.is_some(),
        },
    )?;

    let mut active: OrderActive = order.into();
    active.assigned_editor = Set(payload.editor_id);
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "editor_assign",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "editor_id": payload.editor_id,
            "status": order.status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Editor assignment updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Item-level assignment override. Does not touch the order status; the
/// item-level editor simply wins when the effective editor is resolved.
pub async fn assign_item_editor(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: AssignEditorRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    if let Some(editor_id) = payload.editor_id {
        validate_editor(&txn, editor_id).await?;
    }

    let item = OrderItems::find_by_id(item_id).one(&txn).await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderItemActive = item.into();
    active.assigned_editor = Set(payload.editor_id);
    let item = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "item_editor_assign",
        "order_items",
        serde_json::json!({ "order_item_id": item.id, "editor_id": payload.editor_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Item assignment updated",
        order_item_from_entity(item),
        Some(Meta::empty()),
    ))
}

/// Record an edited image delivered for an order item.
///
/// With no pending revision this is a first delivery: the image lands in
/// `editedImages` and the order completes. With pending revisions the most
/// recently requested one is treated as fulfilled: it is closed, the image
/// is also recorded as a revision image, and the order returns to
/// completed. Older pending revisions are left as they are.
pub async fn record_edited_image(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    delivered: DeliveredImage,
) -> AppResult<ApiResponse<EditedImageResponse>> {
    ensure_editor(user)?;

    let txn = state.orm.begin().await?;

    let item = OrderItems::find_by_id(item_id).one(&txn).await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };
    let order = lock_order(&txn, item.order_id).await?;

    let effective = workflow::effective_editor(item.assigned_editor, order.assigned_editor);
    if let Some(editor_id) = effective {
        if editor_id != user.user_id && !user.role.is_staff() {
            return Err(AppError::Forbidden);
        }
    }

    let pending: Vec<Revision> = Revisions::find()
        .filter(RevisionCol::OrderItemId.eq(item.id))
        .filter(RevisionCol::Status.eq(REVISION_PENDING))
        .order_by_desc(RevisionCol::CreatedAt)
        .all(&txn)
        .await?
        .into_iter()
        .map(revision_from_entity)
        .collect();

    let fulfilled = workflow::latest_pending(&pending).cloned();

    let current = parse_status(&order.status)?;
    let next = workflow::next_status(
        current,
        OrderEvent::EditedImageUploaded {
            fulfills_revision: fulfilled.is_some(),
        },
    )?;

    let fulfilled = match fulfilled {
        Some(revision) => {
            let existing = Revisions::find_by_id(revision.id).one(&txn).await?;
            let existing = existing.ok_or(AppError::NotFound)?;
            let mut active: RevisionActive = existing.into();
            active.status = Set(REVISION_COMPLETED.into());
            active.completed_at = Set(Some(Utc::now().into()));
            let closed = active.update(&txn).await?;

            RevisionImageActive {
                id: Set(Uuid::new_v4()),
                revision_id: Set(closed.id),
                image_url: Set(delivered.url.clone()),
                file_name: Set(delivered.file_name.clone()),
                file_size: Set(delivered.file_size),
                uploaded_by: Set(user.user_id),
                uploaded_at: NotSet,
            }
            .insert(&txn)
            .await?;

            Some(revision_from_entity(closed))
        }
        None => None,
    };

    let mut specifications: ItemSpecifications =
        serde_json::from_value(item.specifications.clone()).unwrap_or_default();
    specifications.edited_images.push(delivered.url.clone());

    let mut item_active: OrderItemActive = item.into();
    item_active.specifications = Set(
        serde_json::to_value(&specifications).map_err(|e| AppError::Internal(e.into()))?,
    );
    item_active.status = Set(OrderStatus::Completed.as_str().into());
    let item = item_active.update(&txn).await?;

    let mut order_active: OrderActive = order.into();
    order_active.status = Set(next.as_str().into());
    order_active.updated_at = Set(Utc::now().into());
    let order = order_active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "edited_image_uploaded",
        "order_items",
        serde_json::json!({
            "order_item_id": item.id,
            "fulfilled_revision": fulfilled.as_ref().map(|r| r.id),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Edited image recorded",
        EditedImageResponse {
            item: order_item_from_entity(item),
            order: order_from_entity(order),
            fulfilled_revision: fulfilled,
        },
        Some(Meta::empty()),
    ))
}

/// Customer asks for a redo on a delivered item. Eligibility is checked
/// inside the transaction, which doubles as the duplicate guard: once a
/// pending revision exists, a repeated request is rejected rather than
/// inserting a second row.
pub async fn request_revision(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: RevisionRequestBody,
) -> AppResult<ApiResponse<RevisionResponse>> {
    let txn = state.orm.begin().await?;

    let item = OrderItems::find_by_id(item_id).one(&txn).await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };
    let order = lock_order(&txn, item.order_id).await?;

    if order.user_id != user.user_id && !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let specifications: ItemSpecifications =
        serde_json::from_value(item.specifications.clone()).unwrap_or_default();
    let has_pending = Revisions::find()
        .filter(RevisionCol::OrderItemId.eq(item.id))
        .filter(RevisionCol::Status.eq(REVISION_PENDING))
        .count(&txn)
        .await?
        > 0;

    let current = parse_status(&order.status)?;
    if !workflow::revision_eligible(current, specifications.edited_images.len(), has_pending) {
        return Err(AppError::BadRequest(
            "order item is not eligible for revision".into(),
        ));
    }

    let next = workflow::next_status(current, OrderEvent::RevisionRequested)?;

    let revision = RevisionActive {
        id: Set(Uuid::new_v4()),
        order_item_id: Set(item.id),
        status: Set(REVISION_PENDING.into()),
        assigned_to: Set(workflow::effective_editor(
            item.assigned_editor,
            order.assigned_editor,
        )),
        requested_by: Set(user.user_id),
        notes: Set(payload.notes),
        created_at: NotSet,
        completed_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let mut item_active: OrderItemActive = item.into();
    item_active.status = Set(OrderStatus::Revision.as_str().into());
    item_active.update(&txn).await?;

    let mut order_active: OrderActive = order.into();
    order_active.status = Set(next.as_str().into());
    order_active.updated_at = Set(Utc::now().into());
    let order = order_active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "revision_requested",
        "revisions",
        serde_json::json!({ "revision_id": revision.id, "order_item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Revision requested",
        RevisionResponse {
            revision: revision_from_entity(revision),
            order: order_from_entity(order),
        },
        Some(Meta::empty()),
    ))
}

/// Staff cancellation. Valid from any live status and irreversible.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;

    let current = parse_status(&order.status)?;
    let next = workflow::next_status(current, OrderEvent::OrderCancelled)?;

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_cancelled",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct QueueRow {
    id: Uuid,
    order_id: Uuid,
    service_id: Uuid,
    quantity: i32,
    price: i64,
    status: String,
    specifications: sqlx::types::Json<ItemSpecifications>,
    assigned_editor: Option<Uuid>,
    created_at: DateTime<Utc>,
    order_number: String,
    order_status: String,
    customer_name: Option<String>,
    has_pending_revision: bool,
}

/// Items the calling editor is responsible for, item-level assignment
/// first, order-level fallback otherwise.
pub async fn editor_queue(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<QueueList>> {
    ensure_editor(user)?;

    let rows = sqlx::query_as::<_, QueueRow>(
        r#"
        SELECT oi.id, oi.order_id, oi.service_id, oi.quantity, oi.price, oi.status,
               oi.specifications, oi.assigned_editor, oi.created_at,
               o.order_number, o.status AS order_status,
               p.full_name AS customer_name,
               EXISTS (
                   SELECT 1 FROM revisions r
                   WHERE r.order_item_id = oi.id AND r.status = 'pending'
               ) AS has_pending_revision
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN profiles p ON p.id = o.user_id
        WHERE COALESCE(oi.assigned_editor, o.assigned_editor) = $1
          AND o.status NOT IN ('cancelled', 'completed')
        ORDER BY o.created_at ASC, oi.created_at ASC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| QueueItemDto {
            item: OrderItem {
                id: row.id,
                order_id: row.order_id,
                service_id: row.service_id,
                quantity: row.quantity,
                price: row.price,
                status: row.status,
                specifications: row.specifications,
                assigned_editor: row.assigned_editor,
                created_at: row.created_at,
            },
            order_number: row.order_number,
            order_status: row.order_status,
            customer_name: row.customer_name,
            has_pending_revision: row.has_pending_revision,
        })
        .collect();

    Ok(ApiResponse::success(
        "Queue",
        QueueList { items },
        Some(Meta::empty()),
    ))
}

async fn lock_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?;
    order.ok_or(AppError::NotFound)
}

async fn validate_editor(txn: &DatabaseTransaction, editor_id: Uuid) -> AppResult<()> {
    let profile = Profiles::find_by_id(editor_id).one(txn).await?;
    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::BadRequest("editor not found".into())),
    };
    if !profile.is_active {
        return Err(AppError::BadRequest("editor account is deactivated".into()));
    }
    let role = Role::parse(&profile.role).unwrap_or(Role::Customer);
    if !role.is_editor() {
        return Err(AppError::BadRequest(
            "assignee does not hold an editor role".into(),
        ));
    }
    Ok(())
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    OrderStatus::parse(raw)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown order status {raw}")))
}

pub fn revision_from_entity(model: RevisionModel) -> Revision {
    Revision {
        id: model.id,
        order_item_id: model.order_item_id,
        status: model.status,
        assigned_to: model.assigned_to,
        requested_by: model.requested_by,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
    }
}
