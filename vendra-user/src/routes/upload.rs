use axum::extract::Multipart;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};

pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

/// Reads the first file field of a multipart body, rejecting content types
/// `accept` has no extension for.
pub async fn read_single_file(
    multipart: &mut Multipart,
    accept: fn(&str) -> Option<&'static str>,
) -> AppResult<UploadedFile> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("failed to read multipart: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::UploadFailed, "no file provided"))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let extension = accept(&content_type).ok_or_else(|| {
        AppError::with_details(
            ErrorCode::UploadFailed,
            "unsupported file type",
            serde_json::json!({ "content_type": content_type }),
        )
    })?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("failed to read file data: {e}")))?;

    if bytes.is_empty() {
        return Err(AppError::new(ErrorCode::UploadFailed, "file is empty"));
    }

    Ok(UploadedFile { bytes: bytes.to_vec(), content_type, extension })
}
