use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use vendra_shared::errors::AppResult;
use vendra_shared::middleware::InternalCaller;
use vendra_shared::schema::{user_blocks, users};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::models::{BlockedUser, InternalBlockRequest, UserBlock};
use crate::services::blocks::{self, BlockStatus};
use crate::socket::emit_to_user;
use crate::AppState;

/// GET /blocks. Users the caller has blocked.
pub async fn list_blocked(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<BlockedUser>>>> {
    let mut conn = state.db.get()?;

    let rows = user_blocks::table
        .filter(user_blocks::blocker_id.eq(user.id))
        .order(user_blocks::created_at.desc())
        .select(UserBlock::as_select())
        .load(&mut conn)?;

    let ids: Vec<Uuid> = rows.iter().map(|b| b.blocked_id).collect();
    let profiles: HashMap<Uuid, (Option<String>, Option<String>)> = users::table
        .filter(users::id.eq_any(&ids))
        .select((users::id, users::name, users::avatar_url))
        .load::<(Uuid, Option<String>, Option<String>)>(&mut conn)?
        .into_iter()
        .map(|(id, name, avatar)| (id, (name, avatar)))
        .collect();

    let items = rows
        .into_iter()
        .map(|b| {
            let (name, avatar_url) = profiles.get(&b.blocked_id).cloned().unwrap_or_default();
            BlockedUser { user_id: b.blocked_id, name, avatar_url, blocked_at: b.created_at }
        })
        .collect();

    Ok(Json(ApiResponse::ok(items)))
}

/// GET /blocks/:other_id/status
pub async fn block_status(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BlockStatus>>> {
    let mut conn = state.db.get()?;
    let status = blocks::block_status(&mut conn, user.id, other_id)?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /blocks/:other_id. Idempotent.
pub async fn block_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BlockStatus>>> {
    let status = apply_block(&state, user.id, other_id, true)?;
    Ok(Json(ApiResponse::ok(status)))
}

/// DELETE /blocks/:other_id. Idempotent.
pub async fn unblock_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BlockStatus>>> {
    let status = apply_block(&state, user.id, other_id, false)?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /internal/blocks. Block on behalf of `blocker_id`, used by moderation.
pub async fn internal_block(
    _caller: InternalCaller,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InternalBlockRequest>,
) -> AppResult<Json<ApiResponse<BlockStatus>>> {
    let status = apply_block(&state, req.blocker_id, req.blocked_id, true)?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Writes or removes the edge, then answers with the status re-read from the database.
fn apply_block(state: &AppState, me: Uuid, other: Uuid, blocked: bool) -> AppResult<BlockStatus> {
    let mut conn = state.db.get()?;

    let changed = if blocked {
        blocks::block(&mut conn, me, other)?
    } else {
        blocks::unblock(&mut conn, me, other)?
    };
    let status = blocks::block_status(&mut conn, me, other)?;

    if changed {
        tracing::info!(blocker_id = %me, blocked_id = %other, blocked, "block status changed");
        emit_to_user(
            &state.io,
            me,
            "block_status_changed",
            &serde_json::json!({ "user_id": other, "status": status }),
        );
        emit_to_user(
            &state.io,
            other,
            "block_status_changed",
            &serde_json::json!({ "user_id": me, "status": status.mirrored() }),
        );
    }

    Ok(status)
}
