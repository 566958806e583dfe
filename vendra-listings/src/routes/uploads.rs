use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use vendra_shared::clients::storage::{document_extension, image_extension, object_key, Bucket};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::AppState;

pub const MAX_FILES_PER_UPLOAD: usize = 10;
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

/// POST /properties/images
pub async fn upload_property_images(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    upload_many(&user, &state, multipart, Bucket::PropertyImages, image_extension).await
}

/// POST /projects/images
pub async fn upload_project_images(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    upload_many(&user, &state, multipart, Bucket::ProjectImages, image_extension).await
}

/// POST /projects/plans. Plans may be PDFs.
pub async fn upload_project_plans(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    upload_many(&user, &state, multipart, Bucket::ProjectPlans, document_extension).await
}

/// Uploads every file field. On the first failure, files already stored by
/// this request are removed again.
async fn upload_many(
    user: &AuthUser,
    state: &AppState,
    mut multipart: Multipart,
    bucket: Bucket,
    accept: fn(&str) -> Option<&'static str>,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    let mut urls = Vec::new();

    let outcome: AppResult<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("failed to read multipart: {e}")))?
        {
            if urls.len() == MAX_FILES_PER_UPLOAD {
                return Err(AppError::new(
                    ErrorCode::UploadFailed,
                    format!("at most {MAX_FILES_PER_UPLOAD} files per upload"),
                ));
            }

            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            let ext = accept(&content_type).ok_or_else(|| {
                AppError::with_details(
                    ErrorCode::UploadFailed,
                    "unsupported file type",
                    serde_json::json!({ "content_type": content_type }),
                )
            })?;

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("failed to read file data: {e}")))?;
            if data.is_empty() {
                return Err(AppError::new(ErrorCode::UploadFailed, "file is empty"));
            }
            if data.len() > MAX_FILE_BYTES {
                return Err(AppError::new(ErrorCode::PayloadTooLarge, "file exceeds 10 MB"));
            }

            let key = object_key(user.id, ext);
            let url = state.storage.upload(bucket, &key, data.to_vec(), &content_type).await?;
            urls.push(url);
        }
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        state.storage.delete_urls_best_effort(bucket, user.id, &urls).await;
        return Err(e);
    }
    if urls.is_empty() {
        return Err(AppError::new(ErrorCode::UploadFailed, "no file provided"));
    }

    tracing::info!(user_id = %user.id, bucket = bucket.as_str(), count = urls.len(), "listing media uploaded");

    Ok(Json(ApiResponse::ok(UploadResponse { urls })))
}
