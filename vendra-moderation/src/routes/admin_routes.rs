use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::domain::audit::{record_admin_action, AdminAction};
use vendra_shared::domain::thread::{load_thread, Message};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::AdminUser;
use vendra_shared::schema::{
    admin_actions, contact_forms, conversations, deletion_requests, reports, seller_applications,
};
use vendra_shared::types::api::ApiResponse;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{ContactForm, ContactStatus, Report, ReportChanges, UpdateContactFormRequest, UpdateReportRequest};
use crate::services::report_machine::{self, ReportStatus, UpdatePlan};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct StatusFilterParams {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl StatusFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditLogParams {
    pub admin_id: Option<Uuid>,
    pub action: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub pending_reports: i64,
    pub reviewing_reports: i64,
    pub reports_today: i64,
    pub new_contact_forms: i64,
    pub submitted_applications: i64,
    pub pending_deletion_requests: i64,
    pub open_support_cases: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportConversation {
    pub report: Report,
    pub messages: Vec<Message>,
}

fn find_report(conn: &mut PgConnection, report_id: Uuid) -> AppResult<Report> {
    reports::table
        .find(report_id)
        .select(Report::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))
}

fn parse_filter<T: std::str::FromStr<Err = String>>(raw: Option<&str>) -> AppResult<Option<T>> {
    raw.map(str::parse::<T>)
        .transpose()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e))
}

// --- List reports (paginated, optional status filter) ---

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Report>>>> {
    let status = parse_filter::<ReportStatus>(params.status.as_deref())?;
    let pagination = params.pagination();
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = reports::table.into_boxed();
        if let Some(status) = status {
            q = q.filter(reports::status.eq(status.as_str()));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(reports::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .select(Report::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- Get report details ---

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = state.db.get()?;
    let report = find_report(&mut conn, report_id)?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- Update report status / notes ---

pub async fn update_report(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<Uuid>,
    Json(body): Json<UpdateReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let updated = conn.transaction::<_, AppError, _>(|conn| {
        let report = find_report(conn, report_id)?;
        let from = report.current_status()?;
        let plan = report_machine::plan_update(from, body.status)?;

        let now = Utc::now();
        let mut changes = ReportChanges {
            resolution_notes: body.resolution_notes.clone(),
            updated_at: Some(now),
            ..Default::default()
        };
        if let UpdatePlan::Transition(to) = plan {
            changes.status = Some(to.as_str().to_string());
            if to.is_terminal() {
                changes.resolved_at = Some(now);
            }
            if to == ReportStatus::Reviewing && report.assigned_admin_id.is_none() {
                changes.assigned_admin_id = Some(admin.id);
            }
        }

        // Conditional on the status read above: a concurrent admin gets a conflict.
        let updated = diesel::update(
            reports::table
                .find(report_id)
                .filter(reports::status.eq(from.as_str())),
        )
        .set(&changes)
        .returning(Report::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(report_machine::conflict)?;

        record_admin_action(
            conn,
            admin.id,
            "update_report",
            Some(report.reported_user_id),
            serde_json::json!({
                "report_id": report_id,
                "from": from.as_str(),
                "to": updated.status,
                "notes_updated": body.resolution_notes.is_some(),
            }),
        )?;

        Ok(updated)
    })?;

    tracing::info!(report_id = %report_id, admin_id = %admin.id, status = %updated.status, "report updated");

    publisher::publish_report_updated(&state.rabbitmq, &updated, admin.id).await;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- Assign to me ---

pub async fn assign_report(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = state.db.get()?;
    let updated = conn.transaction::<_, AppError, _>(|conn| {
        let report = find_report(conn, report_id)?;
        let from = report.current_status()?;
        let to = report_machine::plan_assign(from)?;

        let updated = diesel::update(
            reports::table
                .find(report_id)
                .filter(reports::status.eq(from.as_str())),
        )
        .set(&ReportChanges {
            status: Some(to.as_str().to_string()),
            assigned_admin_id: Some(admin.id),
            updated_at: Some(Utc::now()),
            ..Default::default()
        })
        .returning(Report::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(report_machine::conflict)?;

        record_admin_action(
            conn,
            admin.id,
            "assign_report",
            Some(report.reported_user_id),
            serde_json::json!({
                "report_id": report_id,
                "previous_admin_id": report.assigned_admin_id,
            }),
        )?;

        Ok(updated)
    })?;

    tracing::info!(report_id = %report_id, admin_id = %admin.id, "report assigned");

    publisher::publish_report_updated(&state.rabbitmq, &updated, admin.id).await;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- Reported conversation (read only) ---

pub async fn get_report_conversation(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReportConversation>>> {
    let mut conn = state.db.get()?;
    let report = find_report(&mut conn, report_id)?;
    let messages = load_thread(&mut conn, report.reporter_id, report.reported_user_id, None)?;
    Ok(Json(ApiResponse::ok(ReportConversation { report, messages })))
}

// --- Block the reported user for the reporter ---

pub async fn block_reported_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get()?;
    let report = find_report(&mut conn, report_id)?;
    drop(conn);

    let status: serde_json::Value = state
        .messaging
        .post(
            "/internal/blocks",
            &serde_json::json!({
                "blocker_id": report.reporter_id,
                "blocked_id": report.reported_user_id,
            }),
        )
        .await?;

    let mut conn = state.db.get()?;
    record_admin_action(
        &mut conn,
        admin.id,
        "block_reported_user",
        Some(report.reported_user_id),
        serde_json::json!({ "report_id": report_id, "blocker_id": report.reporter_id }),
    )?;

    tracing::info!(
        report_id = %report_id,
        blocker_id = %report.reporter_id,
        blocked_id = %report.reported_user_id,
        "reported user blocked on behalf of reporter"
    );

    Ok(Json(ApiResponse::ok(status)))
}

// --- Dashboard ---

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let mut conn = state.db.get()?;

    let count_reports = |conn: &mut PgConnection, status: ReportStatus| -> QueryResult<i64> {
        reports::table
            .filter(reports::status.eq(status.as_str()))
            .count()
            .get_result(conn)
    };

    let pending_reports = count_reports(&mut conn, ReportStatus::Pending)?;
    let reviewing_reports = count_reports(&mut conn, ReportStatus::Reviewing)?;
    let reports_today: i64 = reports::table
        .filter(reports::created_at.gt(Utc::now() - Duration::hours(24)))
        .count()
        .get_result(&mut conn)?;
    let new_contact_forms: i64 = contact_forms::table
        .filter(contact_forms::status.eq(ContactStatus::New.as_str()))
        .count()
        .get_result(&mut conn)?;
    let submitted_applications: i64 = seller_applications::table
        .filter(seller_applications::status.eq("submitted"))
        .count()
        .get_result(&mut conn)?;
    let pending_deletion_requests: i64 = deletion_requests::table
        .filter(deletion_requests::status.eq("pending"))
        .count()
        .get_result(&mut conn)?;
    let open_support_cases: i64 = conversations::table
        .filter(conversations::conversation_type.eq("user_to_admin"))
        .filter(conversations::case_status.eq("open"))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(DashboardStats {
        pending_reports,
        reviewing_reports,
        reports_today,
        new_contact_forms,
        submitted_applications,
        pending_deletion_requests,
        open_support_cases,
    })))
}

// --- Audit log ---

pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<AuditLogParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminAction>>>> {
    let pagination = PaginationParams::new(params.page, params.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = admin_actions::table.into_boxed();
        if let Some(admin_id) = params.admin_id {
            q = q.filter(admin_actions::admin_id.eq(admin_id));
        }
        if let Some(action) = params.action.as_deref() {
            q = q.filter(admin_actions::action.eq(action.to_string()));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(admin_actions::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .select(AdminAction::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- Contact forms ---

pub async fn list_contact_forms(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<ContactForm>>>> {
    let status = parse_filter::<ContactStatus>(params.status.as_deref())?;
    let pagination = params.pagination();
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = contact_forms::table.into_boxed();
        if let Some(status) = status {
            q = q.filter(contact_forms::status.eq(status.as_str()));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(contact_forms::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .select(ContactForm::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

pub async fn update_contact_form(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(form_id): Path<Uuid>,
    Json(body): Json<UpdateContactFormRequest>,
) -> AppResult<Json<ApiResponse<ContactForm>>> {
    let mut conn = state.db.get()?;

    let form = conn.transaction::<_, AppError, _>(|conn| {
        let form = diesel::update(contact_forms::table.find(form_id))
            .set((
                contact_forms::status.eq(body.status.as_str()),
                contact_forms::updated_at.eq(Utc::now()),
            ))
            .returning(ContactForm::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ContactFormNotFound, "contact form not found"))?;

        record_admin_action(
            conn,
            admin.id,
            "update_contact_form",
            form.user_id,
            serde_json::json!({ "contact_form_id": form_id, "status": body.status.as_str() }),
        )?;

        Ok(form)
    })?;

    Ok(Json(ApiResponse::ok(form)))
}
