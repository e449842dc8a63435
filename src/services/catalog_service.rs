use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::dto::catalog::{CreateServiceRequest, ServiceList, UpdateServiceRequest};
use crate::entity::services::{ActiveModel, Column, Entity as Services, Model as ServiceModel};
use crate::routes::params::{ServiceQuery, ServiceSortBy, SortOrder};
use crate::{
    audit,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Service,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Public catalog listing: active services, optional category filter and
/// text search over name/description.
pub async fn list_services(
    state: &AppState,
    query: ServiceQuery,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let sort_by = query.sort_by.unwrap_or(ServiceSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ServiceSortBy::CreatedAt => Column::CreatedAt,
        ServiceSortBy::BasePrice => Column::BasePrice,
        ServiceSortBy::Name => Column::Name,
    };

    let mut finder = Services::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(service_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Services", ServiceList { items }, Some(meta)))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let result = Services::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(service_from_entity);
    let result = match result {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Service", result, None))
}

pub async fn create_service(
    state: &AppState,
    user: &AuthUser,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_staff(user)?;
    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        description: Set(Some(payload.description)),
        category: Set(payload.category),
        base_price: Set(payload.base_price),
        turnaround_time: Set(payload.turnaround_time),
        image_url: Set(payload.image_url),
        features: Set(serde_json::json!(payload.features)),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let service = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "service_create",
        "services",
        serde_json::json!({ "service_id": service.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Service created",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

pub async fn update_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_staff(user)?;
    let existing = Services::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(base_price) = payload.base_price {
        active.base_price = Set(base_price);
    }
    if let Some(turnaround_time) = payload.turnaround_time {
        active.turnaround_time = Set(turnaround_time);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(features) = payload.features {
        active.features = Set(serde_json::json!(features));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let service = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "service_update",
        "services",
        serde_json::json!({ "service_id": service.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Service updated",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

/// Soft delete: the row stays (order items reference it), it just stops
/// being listed.
pub async fn delete_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let existing = Services::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "service_delete",
        "services",
        serde_json::json!({ "service_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Service deactivated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn service_from_entity(model: ServiceModel) -> Service {
    let features: Vec<String> = serde_json::from_value(model.features).unwrap_or_default();
    Service {
        id: model.id,
        name: model.name,
        description: model.description,
        category: model.category,
        base_price: model.base_price,
        turnaround_time: model.turnaround_time,
        image_url: model.image_url,
        features: sqlx::types::Json(features),
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
