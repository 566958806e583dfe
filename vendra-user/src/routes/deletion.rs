use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use vendra_shared::errors::{AppError, AppResult};
use vendra_shared::schema::deletion_requests;
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::DeletionRequest;
use crate::services::deletion_service;
use crate::services::user_service;
use crate::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DeletionRequestBody {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// POST /me/deletion
pub async fn request_deletion(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    body: Option<Json<DeletionRequestBody>>,
) -> AppResult<Json<ApiResponse<DeletionRequest>>> {
    let Json(body) = body.unwrap_or_default();
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let me = user_service::upsert_from_claims(&mut conn, &user)?;

    let (request, created) = deletion_service::schedule_deletion(
        &mut conn,
        user.id,
        body.reason.as_deref(),
        state.config.deletion_grace_days,
        Utc::now(),
    )?;

    if created {
        tracing::info!(
            user_id = %user.id,
            request_id = %request.id,
            completes_at = %request.scheduled_completion_at,
            "account deletion scheduled"
        );
        publisher::publish_deletion_scheduled(&state.rabbitmq, request.id, user.id, request.scheduled_completion_at).await;
        if let Some(email) = me.email.as_deref() {
            if let Err(e) = state.email.send_deletion_scheduled(email, request.scheduled_completion_at).await {
                tracing::warn!(error = %e, user_id = %user.id, "failed to send deletion notice");
            }
        }
    }

    Ok(Json(ApiResponse::ok(request)))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// DELETE /me/deletion. Succeeds whether or not anything was pending.
pub async fn cancel_deletion(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<CancelResponse>>> {
    let mut conn = state.db.get()?;

    let cancelled = deletion_service::cancel_pending(&mut conn, user.id, Utc::now())?;

    if cancelled {
        tracing::info!(user_id = %user.id, "account deletion cancelled");
    }

    Ok(Json(ApiResponse::ok(CancelResponse { cancelled })))
}

/// GET /me/deletion
pub async fn get_deletion(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Option<DeletionRequest>>>> {
    let mut conn = state.db.get()?;

    let latest = deletion_requests::table
        .filter(deletion_requests::user_id.eq(user.id))
        .order(deletion_requests::created_at.desc())
        .select(DeletionRequest::as_select())
        .first(&mut conn)
        .optional()?;

    Ok(Json(ApiResponse::ok(latest)))
}
