use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::domain::audit::record_admin_action;
use vendra_shared::domain::thread::{load_thread, Message};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::AdminUser;
use vendra_shared::schema::conversations;
use vendra_shared::types::event::content_preview;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{CaseStatus, Conversation, ConversationType};
use crate::services::{cases, threads};
use crate::socket::emit_to_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SupportQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct SupportCase {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message_preview: Option<String>,
    pub last_sender_id: Option<Uuid>,
}

/// GET /admin/messages. Support threads, newest activity first.
pub async fn list_support_conversations(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SupportQuery>,
) -> AppResult<Json<ApiResponse<Paginated<SupportCase>>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<CaseStatus>)
        .transpose()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;
    let params = PaginationParams::new(query.page, query.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = conversations::table
            .filter(conversations::conversation_type.eq(ConversationType::UserToAdmin.as_str()))
            .into_boxed();
        if let Some(status) = status {
            q = q.filter(conversations::case_status.eq(status.as_str()));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let rows = build()
        .order(conversations::last_message_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Conversation::as_select())
        .load(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for conversation in rows {
        let last = threads::last_message(&mut conn, conversation.id)?;
        items.push(SupportCase {
            conversation,
            last_message_preview: last.as_ref().map(|m| content_preview(&m.content, 80)),
            last_sender_id: last.map(|m| m.sender_id),
        });
    }

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /admin/conversations/:id/messages
pub async fn get_conversation_messages(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let mut conn = state.db.get()?;
    let conversation = threads::find_conversation(&mut conn, conversation_id)?;
    let thread = load_thread(&mut conn, conversation.user_low, conversation.user_high, None)?;
    Ok(Json(ApiResponse::ok(thread)))
}

/// POST /admin/conversations/:id/close
pub async fn close_case(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Conversation>>> {
    let conversation = change_case_status(&state, admin.id, conversation_id, CaseStatus::Closed).await?;
    Ok(Json(ApiResponse::ok(conversation)))
}

/// POST /admin/conversations/:id/reopen
pub async fn reopen_case(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Conversation>>> {
    let conversation = change_case_status(&state, admin.id, conversation_id, CaseStatus::Open).await?;
    Ok(Json(ApiResponse::ok(conversation)))
}

async fn change_case_status(
    state: &AppState,
    admin_id: Uuid,
    conversation_id: Uuid,
    to: CaseStatus,
) -> AppResult<Conversation> {
    let mut conn = state.db.get()?;
    let conversation = cases::set_case_status(&mut conn, admin_id, conversation_id, to)?;
    drop(conn);

    tracing::info!(
        conversation_id = %conversation_id,
        admin_id = %admin_id,
        case_status = %to,
        "support case status changed"
    );

    let payload = serde_json::json!({
        "conversation_id": conversation.id,
        "case_status": conversation.case_status,
        "closed_by": conversation.closed_by,
        "closed_at": conversation.closed_at,
    });
    for participant in conversation.participants() {
        emit_to_user(&state.io, participant, "conversation_status", &payload);
    }

    publisher::publish_case_status_changed(&state.rabbitmq, &conversation, admin_id).await;

    Ok(conversation)
}

// --- POST /admin/conversations/:id/escalate ---

#[derive(Debug, Deserialize, Validate)]
pub struct EscalateRequest {
    pub reported_user_id: Uuid,
    #[validate(length(min = 1, max = 30))]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct InternalReportRequest<'a> {
    reporter_id: Uuid,
    reported_user_id: Uuid,
    conversation_id: Uuid,
    reason: &'a str,
    description: Option<&'a str>,
    assigned_admin_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CreatedReport {
    id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EscalationResponse {
    pub conversation_id: Uuid,
    pub report_id: Uuid,
}

pub async fn escalate_to_report(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<EscalateRequest>,
) -> AppResult<Json<ApiResponse<EscalationResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let conversation = threads::find_conversation(&mut conn, conversation_id)?;
    if conversation.escalated_report_id.is_some() {
        return Err(cases::already_escalated());
    }
    let admins = cases::admin_participants(&mut conn, &conversation)?;
    let reporter_id = cases::reporter_for(&conversation, &admins, admin.id);
    cases::ensure_reportable(&conversation, reporter_id, req.reported_user_id)?;
    drop(conn);

    let report: CreatedReport = state
        .moderation
        .post(
            "/internal/reports",
            &InternalReportRequest {
                reporter_id,
                reported_user_id: req.reported_user_id,
                conversation_id,
                reason: &req.reason,
                description: req.description.as_deref(),
                assigned_admin_id: admin.id,
            },
        )
        .await?;

    let mut conn = state.db.get()?;
    conn.transaction::<_, AppError, _>(|conn| {
        cases::attach_report(conn, conversation_id, report.id)?;
        record_admin_action(
            conn,
            admin.id,
            "escalate_to_report",
            Some(req.reported_user_id),
            serde_json::json!({
                "conversation_id": conversation_id,
                "report_id": report.id,
                "reporter_id": reporter_id,
                "reason": req.reason,
            }),
        )
    })
    .inspect_err(|e| {
        tracing::warn!(error = %e, report_id = %report.id, conversation_id = %conversation_id, "report created but not linked to conversation");
    })?;

    tracing::info!(conversation_id = %conversation_id, report_id = %report.id, admin_id = %admin.id, "conversation escalated");

    Ok(Json(ApiResponse::ok(EscalationResponse { conversation_id, report_id: report.id })))
}
