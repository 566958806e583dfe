use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use vendra_shared::domain::thread::{load_thread, Message};
use vendra_shared::errors::AppResult;
use vendra_shared::schema::{conversations, messages};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::event::content_preview;
use vendra_shared::types::pagination::{Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{
    Conversation, ConversationSummary, ReadReceipt, SendMessageRequest, ThreadQuery, UnreadCountResponse,
};
use crate::services::threads;
use crate::socket::emit_to_user;
use crate::AppState;

const PREVIEW_CHARS: usize = 80;

/// GET /conversations. Newest activity first.
pub async fn list_conversations(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ConversationSummary>>>> {
    let mut conn = state.db.get()?;

    let mine = conversations::user_low.eq(user.id).or(conversations::user_high.eq(user.id));
    let total: i64 = conversations::table.filter(mine.clone()).count().get_result(&mut conn)?;
    let rows = conversations::table
        .filter(mine)
        .order(conversations::last_message_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Conversation::as_select())
        .load(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for conv in rows {
        let last = threads::last_message(&mut conn, conv.id)?;
        let unread_count = threads::unread_in(&mut conn, conv.id, user.id)?;
        items.push(ConversationSummary {
            id: conv.id,
            other_user_id: conv.other_participant(user.id),
            conversation_type: conv.conversation_type,
            case_status: conv.case_status,
            last_message_at: conv.last_message_at,
            last_message_preview: last.as_ref().map(|m| content_preview(&m.content, PREVIEW_CHARS)),
            last_sender_id: last.map(|m| m.sender_id),
            unread_count,
        });
    }

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /conversations/with/:other_id/messages. Both directions, oldest first.
pub async fn get_thread(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let mut conn = state.db.get()?;
    let thread = load_thread(&mut conn, user.id, other_id, query.after_seq)?;
    Ok(Json(ApiResponse::ok(thread)))
}

/// POST /conversations/with/:other_id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let content = threads::normalize_content(&req.content)?;

    let mut conn = state.db.get()?;
    let (conversation, message) =
        threads::append_message(&mut conn, user.id, user.is_admin(), other_id, &content)?;
    drop(conn);

    tracing::info!(
        message_id = %message.id,
        seq = message.seq,
        conversation_id = %conversation.id,
        sender_id = %user.id,
        recipient_id = %other_id,
        "message sent"
    );

    for participant in conversation.participants() {
        emit_to_user(&state.io, participant, "new_message", &message);
    }

    publisher::publish_message_sent(&state.rabbitmq, &message).await;

    Ok(Json(ApiResponse::ok(message)))
}

/// POST /conversations/with/:other_id/read. Never fails on the write itself.
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let updated = match state.db.get() {
        Ok(mut conn) => threads::mark_read(&mut conn, user.id, other_id).unwrap_or_else(|e| {
            tracing::warn!(error = %e, reader_id = %user.id, sender_id = %other_id, "failed to mark messages read");
            0
        }),
        Err(e) => {
            tracing::warn!(error = %e, reader_id = %user.id, "no connection to mark messages read");
            0
        }
    };

    if updated > 0 {
        let receipt = ReadReceipt { reader_id: user.id, updated, read_at: Utc::now() };
        emit_to_user(&state.io, other_id, "messages_read", &receipt);
    }

    Ok(Json(ApiResponse::ok(serde_json::json!({ "updated": updated }))))
}

/// GET /unread-count
pub async fn get_unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let mut conn = state.db.get()?;

    let total_unread: i64 = messages::table
        .filter(messages::recipient_id.eq(user.id))
        .filter(messages::read_at.is_null())
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(UnreadCountResponse { total_unread })))
}
