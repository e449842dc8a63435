use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::workflow::{EditedImageResponse, QueueList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_editor},
    response::ApiResponse,
    services::workflow_service::{self, DeliveredImage},
    state::AppState,
    storage::EDITED_PREFIX,
    upload::{self, UploadCandidate},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(editor_queue))
        .route("/items/{id}/edited-image", post(upload_edited_image))
}

#[utoipa::path(
    get,
    path = "/api/workflow/queue",
    responses(
        (status = 200, description = "Items assigned to the calling editor", body = ApiResponse<QueueList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Workflow"
)]
pub async fn editor_queue(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<QueueList>>> {
    let resp = workflow_service::editor_queue(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/workflow/items/{id}/edited-image",
    params(
        ("id" = Uuid, Path, description = "Order item ID")
    ),
    responses(
        (status = 200, description = "Edited image recorded", body = ApiResponse<EditedImageResponse>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the item's effective editor"),
        (status = 409, description = "Order not in a deliverable state")
    ),
    security(("bearer_auth" = [])),
    tag = "Workflow"
)]
pub async fn upload_edited_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<EditedImageResponse>>> {
    ensure_editor(&user)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .ok_or_else(|| AppError::BadRequest("missing file field".into()))?;

    let file_name = field
        .file_name()
        .ok_or_else(|| AppError::BadRequest("missing file name".into()))?
        .to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let candidate = UploadCandidate {
        file_name: file_name.clone(),
        content_type,
        size: bytes.len() as u64,
    };
    let issues = upload::validate(&candidate);
    if !issues.is_empty() {
        let joined = issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::BadRequest(joined));
    }

    let key = format!("{}/{}", EDITED_PREFIX, upload::storage_file_name(&file_name));
    let url = state.storage.store(&key, &bytes).await?;

    let delivered = DeliveredImage {
        url,
        file_name: key.rsplit('/').next().unwrap_or(&key).to_string(),
        file_size: bytes.len() as i64,
    };

    let resp = workflow_service::record_edited_image(&state, &user, id, delivered).await?;
    Ok(Json(resp))
}
