use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use vendra_shared::domain::audit::record_admin_action;
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{conversations, users};
use vendra_shared::types::auth::UserRole;

use crate::models::{CaseStatus, Conversation};
use crate::services::threads::find_conversation;

fn already_in(status: CaseStatus) -> AppError {
    match status {
        CaseStatus::Closed => AppError::new(ErrorCode::CaseAlreadyClosed, "case is already closed"),
        CaseStatus::Open => AppError::new(ErrorCode::CaseAlreadyOpen, "case is already open"),
    }
}

/// Open and closed only ever swap.
pub fn ensure_case_transition(from: CaseStatus, to: CaseStatus) -> AppResult<()> {
    if from == to {
        return Err(already_in(to));
    }
    Ok(())
}

/// Opens or closes a support case. The write is conditional on the state read, so a
/// concurrent admin making the same move gets the "already" error instead of a no-op.
pub fn set_case_status(
    conn: &mut PgConnection,
    admin_id: Uuid,
    conversation_id: Uuid,
    to: CaseStatus,
) -> AppResult<Conversation> {
    conn.transaction::<_, AppError, _>(|conn| {
        let current = find_conversation(conn, conversation_id)?;
        let from = current.case()?;
        ensure_case_transition(from, to)?;

        let (closed_by, closed_at) = match to {
            CaseStatus::Closed => (Some(admin_id), Some(Utc::now())),
            CaseStatus::Open => (None, None),
        };

        let updated = diesel::update(
            conversations::table
                .find(conversation_id)
                .filter(conversations::case_status.eq(from.as_str())),
        )
        .set((
            conversations::case_status.eq(to.as_str()),
            conversations::closed_by.eq(closed_by),
            conversations::closed_at.eq(closed_at),
        ))
        .returning(Conversation::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| already_in(to))?;

        let action = match to {
            CaseStatus::Closed => "close_case",
            CaseStatus::Open => "reopen_case",
        };
        record_admin_action(
            conn,
            admin_id,
            action,
            None,
            serde_json::json!({
                "conversation_id": conversation_id,
                "participants": updated.participants(),
            }),
        )?;

        Ok(updated)
    })
}

/// Participants of the conversation whose stored role is admin.
pub fn admin_participants(conn: &mut PgConnection, conversation: &Conversation) -> AppResult<Vec<Uuid>> {
    Ok(users::table
        .filter(users::id.eq_any(conversation.participants().to_vec()))
        .filter(users::role.eq(UserRole::Admin.as_str()))
        .select(users::id)
        .load(conn)?)
}

/// The participant an escalated report is filed for: the side that is not an admin.
pub fn reporter_for(conversation: &Conversation, admins: &[Uuid], acting_admin: Uuid) -> Uuid {
    conversation
        .participants()
        .into_iter()
        .find(|id| !admins.contains(id))
        .unwrap_or_else(|| conversation.other_participant(acting_admin))
}

/// An escalated report must target the other side of the thread, never the reporter
/// or someone outside it.
pub fn ensure_reportable(conversation: &Conversation, reporter_id: Uuid, reported_user_id: Uuid) -> AppResult<()> {
    if reported_user_id == reporter_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "the reporter cannot be the reported user"));
    }
    if !conversation.includes(reported_user_id) {
        return Err(AppError::with_details(
            ErrorCode::NotConversationMember,
            "reported user is not a participant of this conversation",
            serde_json::json!({
                "conversation_id": conversation.id,
                "reported_user_id": reported_user_id,
            }),
        ));
    }
    Ok(())
}

/// Stores the report id on a conversation that has none yet.
pub fn attach_report(conn: &mut PgConnection, conversation_id: Uuid, report_id: Uuid) -> AppResult<Conversation> {
    diesel::update(
        conversations::table
            .find(conversation_id)
            .filter(conversations::escalated_report_id.is_null()),
    )
    .set(conversations::escalated_report_id.eq(report_id))
    .returning(Conversation::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or_else(already_escalated)
}

pub fn already_escalated() -> AppError {
    AppError::new(ErrorCode::AlreadyEscalated, "conversation has already been escalated to a report")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(low: Uuid, high: Uuid) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: Uuid::now_v7(),
            user_low: low,
            user_high: high,
            conversation_type: "user_to_admin".into(),
            case_status: "open".into(),
            closed_by: None,
            closed_at: None,
            escalated_report_id: None,
            last_message_at: now,
            created_at: now,
        }
    }

    #[test]
    fn repeating_a_transition_is_a_conflict() {
        let err = ensure_case_transition(CaseStatus::Closed, CaseStatus::Closed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CaseAlreadyClosed);
        let err = ensure_case_transition(CaseStatus::Open, CaseStatus::Open).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CaseAlreadyOpen);
    }

    #[test]
    fn close_and_reopen_are_allowed() {
        assert!(ensure_case_transition(CaseStatus::Open, CaseStatus::Closed).is_ok());
        assert!(ensure_case_transition(CaseStatus::Closed, CaseStatus::Open).is_ok());
    }

    #[test]
    fn escalation_targets_the_other_participant() {
        let (user, admin) = (Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation(user.min(admin), user.max(admin));
        let reporter = reporter_for(&conv, &[admin], admin);

        assert!(ensure_reportable(&conv, reporter, admin).is_ok());
        assert_eq!(ensure_reportable(&conv, reporter, user).unwrap_err().code(), ErrorCode::CannotReportSelf);
        assert_eq!(
            ensure_reportable(&conv, reporter, Uuid::now_v7()).unwrap_err().code(),
            ErrorCode::NotConversationMember
        );
    }

    #[test]
    fn reporter_is_the_non_admin_side() {
        let (user, admin) = (Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation(user.min(admin), user.max(admin));
        assert_eq!(reporter_for(&conv, &[admin], admin), user);
        assert_eq!(reporter_for(&conv, &[admin], Uuid::now_v7()), user);
    }

    #[test]
    fn reporter_falls_back_to_the_side_opposite_the_caller() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation(a.min(b), a.max(b));
        assert_eq!(reporter_for(&conv, &[a, b], a), b);
    }
}
