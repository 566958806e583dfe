use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::sync::Arc;
use validator::Validate;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::{InternalCaller, OptionalAuthUser};
use vendra_shared::schema::{contact_forms, conversations, reports};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{
    ContactForm, CreateReportRequest, InternalReportRequest, NewContactForm, NewReport, Report,
};
use crate::services::report_machine::ReportStatus;
use crate::AppState;

fn duplicate_report() -> AppError {
    AppError::new(
        ErrorCode::DuplicateReport,
        "you already have a pending report against this user",
    )
}

/// A concurrent report that slipped past the pending check trips `reports_one_pending`.
fn pending_insert_error(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate_report(),
        other => AppError::Database(other),
    }
}

/// POST /reports
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    if auth.id == body.reported_user_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "you cannot report yourself"));
    }

    let mut conn = state.db.get()?;

    if let Some(conversation_id) = body.conversation_id {
        let (low, high): (uuid::Uuid, uuid::Uuid) = conversations::table
            .find(conversation_id)
            .select((conversations::user_low, conversations::user_high))
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))?;
        if low != auth.id && high != auth.id {
            return Err(AppError::new(
                ErrorCode::NotConversationMember,
                "you can only report conversations you take part in",
            ));
        }
    }

    let report = conn.transaction::<_, AppError, _>(|conn| {
        let existing: i64 = reports::table
            .filter(reports::reporter_id.eq(auth.id))
            .filter(reports::reported_user_id.eq(body.reported_user_id))
            .filter(reports::status.eq(ReportStatus::Pending.as_str()))
            .count()
            .get_result(conn)?;

        if existing > 0 {
            return Err(duplicate_report());
        }

        Ok(diesel::insert_into(reports::table)
            .values(&NewReport {
                reporter_id: auth.id,
                reported_user_id: body.reported_user_id,
                conversation_id: body.conversation_id,
                reason: &body.reason,
                description: body.description.as_deref(),
                status: ReportStatus::Pending.as_str(),
                assigned_admin_id: None,
            })
            .returning(Report::as_returning())
            .get_result(conn)
            .map_err(pending_insert_error)?)
    })?;

    tracing::info!(
        report_id = %report.id,
        reporter_id = %report.reporter_id,
        reported_user_id = %report.reported_user_id,
        reason = %report.reason,
        "report created"
    );

    publisher::publish_report_created(&state.rabbitmq, &report).await;

    Ok(Json(ApiResponse::ok(report)))
}

/// POST /internal/reports. Escalation from a support case: filed as `reviewing` and
/// already owned by the escalating admin.
pub async fn create_internal_report(
    State(state): State<Arc<AppState>>,
    _caller: InternalCaller,
    Json(body): Json<InternalReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    if body.reporter_id == body.reported_user_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "reporter and reported user are the same"));
    }

    let mut conn = state.db.get()?;
    let report = diesel::insert_into(reports::table)
        .values(&NewReport {
            reporter_id: body.reporter_id,
            reported_user_id: body.reported_user_id,
            conversation_id: body.conversation_id,
            reason: &body.reason,
            description: body.description.as_deref(),
            status: ReportStatus::Reviewing.as_str(),
            assigned_admin_id: Some(body.assigned_admin_id),
        })
        .returning(Report::as_returning())
        .get_result(&mut conn)?;

    tracing::info!(
        report_id = %report.id,
        conversation_id = ?report.conversation_id,
        assigned_admin_id = %body.assigned_admin_id,
        "report created from escalation"
    );

    publisher::publish_report_created(&state.rabbitmq, &report).await;

    Ok(Json(ApiResponse::ok(report)))
}

/// POST /contact. Open to anonymous visitors; signed-in senders are linked.
pub async fn submit_contact_form(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(mut body): Json<NewContactForm>,
) -> AppResult<Json<ApiResponse<ContactForm>>> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    body.user_id = user.map(|u| u.id);

    let mut conn = state.db.get()?;
    let form = diesel::insert_into(contact_forms::table)
        .values(&body)
        .returning(ContactForm::as_returning())
        .get_result(&mut conn)?;

    tracing::info!(contact_form_id = %form.id, user_id = ?form.user_id, "contact form received");

    Ok(Json(ApiResponse::ok(form)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn racing_duplicate_maps_to_duplicate_report() {
        let err = pending_insert_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key value violates unique constraint \"reports_one_pending\"")),
        ));
        assert_eq!(err.code(), ErrorCode::DuplicateReport);
        assert_eq!(err.code().status_code(), axum::http::StatusCode::CONFLICT);

        let err = pending_insert_error(DieselError::NotFound);
        assert!(matches!(err, AppError::Database(DieselError::NotFound)));
    }
}
