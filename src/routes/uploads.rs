use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::uploads::{UploadBatchResponse, UploadQuery},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::upload_service::{self, IncomingFile},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upload_batch))
}

#[utoipa::path(
    post,
    path = "/api/uploads",
    params(
        ("cart_item_id" = Option<Uuid>, Query, description = "Attach uploads to this cart row"),
        ("order_item_id" = Option<Uuid>, Query, description = "Attach uploads to this order item")
    ),
    responses(
        (status = 200, description = "Per-file upload results", body = ApiResponse<UploadBatchResponse>),
        (status = 429, description = "Upload rate limit exceeded")
    ),
    security(("bearer_auth" = [])),
    tag = "Uploads"
)]
pub async fn upload_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Query(attach): Query<UploadQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadBatchResponse>>> {
    let mut files: Vec<IncomingFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        // Only file parts matter; other form fields are ignored.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        files.push(IncomingFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let resp = upload_service::process_batch(&state, &user, attach, files).await?;
    Ok(Json(resp))
}
