use serde::Deserialize;

use vendra_shared::domain::seller::{ApplicationStatus, RoleChoice};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{ApplicationDraft, SellerApplication};

/// Admin decision on a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestInfo,
}

impl ReviewAction {
    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            ReviewAction::Approve => ApplicationStatus::Approved,
            ReviewAction::Reject => ApplicationStatus::Rejected,
            ReviewAction::RequestInfo => ApplicationStatus::NeedsMoreInfo,
        }
    }
}

pub fn parse_status(raw: &str) -> AppResult<ApplicationStatus> {
    raw.parse()
        .map_err(|e: String| AppError::internal(format!("corrupt application row: {e}")))
}

/// Parses a `?status=` filter supplied by a client.
pub fn parse_status_filter(raw: &str) -> AppResult<ApplicationStatus> {
    raw.parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))
}

pub fn parse_role_choice(raw: &str) -> AppResult<RoleChoice> {
    raw.parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))
}

/// Checks that `from -> to` is an edge of the application graph.
pub fn ensure_transition(from: ApplicationStatus, to: ApplicationStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(AppError::with_details(
        ErrorCode::InvalidApplicationTransition,
        format!("cannot move application from {from} to {to}"),
        serde_json::json!({ "from": from.as_str(), "to": to.as_str() }),
    ))
}

/// Fields still missing before an application may be submitted.
pub fn missing_for_submission(app: &SellerApplication) -> Vec<&'static str> {
    let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
    let mut missing = Vec::new();

    if blank(&app.full_name) {
        missing.push("full_name");
    }
    if blank(&app.document_number) {
        missing.push("document_number");
    }
    if app.kyc_front_key.is_none() {
        missing.push("kyc_front");
    }
    if app.kyc_back_key.is_none() {
        missing.push("kyc_back");
    }
    if app.kyc_selfie_key.is_none() {
        missing.push("kyc_selfie");
    }
    if !app.terms_accepted {
        missing.push("terms_accepted");
    }
    if !app.confirm_truth {
        missing.push("confirm_truth");
    }
    if matches!(app.role_choice.parse::<RoleChoice>(), Ok(c) if c.requires_company()) && blank(&app.company_name) {
        missing.push("company_name");
    }

    missing
}

/// Overlays a draft on a stored row, used to validate a submit that carries last-minute edits.
pub fn apply_draft(mut app: SellerApplication, draft: &ApplicationDraft) -> SellerApplication {
    let draft = draft.clone();
    if let Some(v) = draft.role_choice { app.role_choice = v; }
    if draft.full_name.is_some() { app.full_name = draft.full_name; }
    if draft.phone.is_some() { app.phone = draft.phone; }
    if draft.document_type.is_some() { app.document_type = draft.document_type; }
    if draft.document_number.is_some() { app.document_number = draft.document_number; }
    if draft.company_name.is_some() { app.company_name = draft.company_name; }
    if let Some(v) = draft.terms_accepted { app.terms_accepted = v; }
    if let Some(v) = draft.confirm_truth { app.confirm_truth = v; }
    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn complete_application() -> SellerApplication {
        let now = Utc::now();
        SellerApplication {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            role_choice: "vendedor_particular".into(),
            full_name: Some("Ana Pérez".into()),
            phone: Some("+51 999 888 777".into()),
            document_type: Some("dni".into()),
            document_number: Some("44556677".into()),
            company_name: None,
            kyc_front_key: Some("u/front.jpg".into()),
            kyc_back_key: Some("u/back.jpg".into()),
            kyc_selfie_key: Some("u/selfie.jpg".into()),
            terms_accepted: true,
            confirm_truth: true,
            status: "draft".into(),
            admin_notes: None,
            reviewed_by: None,
            submitted_at: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn complete_application_has_nothing_missing() {
        assert!(missing_for_submission(&complete_application()).is_empty());
    }

    #[test]
    fn unchecked_boxes_and_documents_are_reported() {
        let mut app = complete_application();
        app.terms_accepted = false;
        app.kyc_selfie_key = None;
        app.full_name = Some("   ".into());
        assert_eq!(missing_for_submission(&app), vec!["full_name", "kyc_selfie", "terms_accepted"]);
    }

    #[test]
    fn constructora_needs_company_name() {
        let mut app = complete_application();
        app.role_choice = "empresa_constructora".into();
        assert_eq!(missing_for_submission(&app), vec!["company_name"]);
    }

    #[test]
    fn draft_overlay_fills_last_fields() {
        let mut app = complete_application();
        app.confirm_truth = false;
        let draft = ApplicationDraft { confirm_truth: Some(true), ..Default::default() };
        assert!(missing_for_submission(&apply_draft(app, &draft)).is_empty());
    }

    #[test]
    fn review_actions_map_to_statuses() {
        assert_eq!(ReviewAction::Approve.target_status(), ApplicationStatus::Approved);
        assert_eq!(ReviewAction::RequestInfo.target_status(), ApplicationStatus::NeedsMoreInfo);
        let action: ReviewAction = serde_json::from_str("\"request_info\"").unwrap();
        assert_eq!(action, ReviewAction::RequestInfo);
    }

    #[test]
    fn approving_a_draft_is_rejected() {
        let err = ensure_transition(ApplicationStatus::Draft, ApplicationStatus::Approved).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidApplicationTransition);
        assert!(ensure_transition(ApplicationStatus::Submitted, ApplicationStatus::Rejected).is_ok());
    }
}
