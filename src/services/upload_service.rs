use uuid::Uuid;

use crate::dto::uploads::{UploadBatchResponse, UploadQuery, UploadResultDto};
use crate::storage::UPLOADS_PREFIX;
use crate::upload::{self, UploadCandidate};
use crate::{
    audit,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// One file of an upload batch, as read from the multipart body.
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Run a batch through the upload pipeline. Files are handled one after
/// another; a file that fails validation or storage is reported in place
/// and the rest of the batch continues.
pub async fn process_batch(
    state: &AppState,
    user: &AuthUser,
    attach: UploadQuery,
    files: Vec<IncomingFile>,
) -> AppResult<ApiResponse<UploadBatchResponse>> {
    if !state.upload_limiter.try_acquire(user.user_id) {
        return Err(AppError::TooManyRequests);
    }
    if files.is_empty() {
        return Err(AppError::BadRequest("no files in upload batch".into()));
    }

    let mut results: Vec<UploadResultDto> = Vec::with_capacity(files.len());

    for file in &files {
        let candidate = UploadCandidate {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            size: file.bytes.len() as u64,
        };

        let issues = upload::validate(&candidate);
        if !issues.is_empty() {
            results.push(UploadResultDto {
                file_name: file.file_name.clone(),
                status: "rejected".into(),
                url: None,
                image_id: None,
                file_size: None,
                errors: issues.iter().map(|i| i.to_string()).collect(),
            });
            continue;
        }

        let key = format!("{}/{}", UPLOADS_PREFIX, upload::storage_file_name(&file.file_name));
        let url = match state.storage.store(&key, &file.bytes).await {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(error = %err, file_name = %file.file_name, "upload storage failed");
                results.push(UploadResultDto {
                    file_name: file.file_name.clone(),
                    status: "failed".into(),
                    url: None,
                    image_id: None,
                    file_size: None,
                    errors: vec!["storage write failed".into()],
                });
                continue;
            }
        };

        let image_id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"
            INSERT INTO uploaded_images
                (id, cart_item_id, order_item_id, original_url, file_name, file_size,
                 mime_type, upload_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'uploaded')
            "#,
        )
        .bind(image_id)
        .bind(attach.cart_item_id)
        .bind(attach.order_item_id)
        .bind(&url)
        .bind(&file.file_name)
        .bind(file.bytes.len() as i64)
        .bind(&file.content_type)
        .execute(&state.pool)
        .await;

        match inserted {
            Ok(_) => results.push(UploadResultDto {
                file_name: file.file_name.clone(),
                status: "uploaded".into(),
                url: Some(url),
                image_id: Some(image_id),
                file_size: Some(file.bytes.len() as i64),
                errors: Vec::new(),
            }),
            Err(err) => {
                tracing::error!(error = %err, file_name = %file.file_name, "upload metadata insert failed");
                results.push(UploadResultDto {
                    file_name: file.file_name.clone(),
                    status: "failed".into(),
                    url: Some(url),
                    image_id: None,
                    file_size: Some(file.bytes.len() as i64),
                    errors: vec!["metadata insert failed".into()],
                });
            }
        }
    }

    let uploaded = results.iter().filter(|r| r.status == "uploaded").count();
    audit::record(
        &state.pool,
        Some(user.user_id),
        "upload_batch",
        "uploaded_images",
        serde_json::json!({ "files": results.len(), "uploaded": uploaded }),
    )
    .await;

    Ok(ApiResponse::success(
        "Upload processed",
        UploadBatchResponse { files: results },
        Some(Meta::empty()),
    ))
}
