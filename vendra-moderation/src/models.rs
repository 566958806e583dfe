use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use vendra_shared::errors::{AppError, AppResult};
use vendra_shared::schema::{contact_forms, reports};

use crate::services::report_machine::ReportStatus;

pub const REPORT_REASONS: [&str; 6] = [
    "spam",
    "harassment",
    "inappropriate_content",
    "scam",
    "fake_listing",
    "other",
];

pub fn validate_reason(value: &str) -> Result<(), ValidationError> {
    if REPORT_REASONS.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("report_reason"))
    }
}

// --- Report ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub assigned_admin_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn current_status(&self) -> AppResult<ReportStatus> {
        self.status
            .parse()
            .map_err(|e: String| AppError::internal(format!("corrupt report row: {e}")))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport<'a> {
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub reason: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub assigned_admin_id: Option<Uuid>,
}

/// Partial update of a report row; `None` fields are left untouched.
#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = reports)]
pub struct ReportChanges {
    pub status: Option<String>,
    pub assigned_admin_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub reported_user_id: Uuid,
    #[validate(custom = "validate_reason")]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReportRequest {
    pub status: ReportStatus,
    #[validate(length(max = 2000))]
    pub resolution_notes: Option<String>,
}

/// Body of `POST /internal/reports`, sent by messaging when a support case is escalated.
#[derive(Debug, Deserialize, Validate)]
pub struct InternalReportRequest {
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    #[validate(custom = "validate_reason")]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub assigned_admin_id: Uuid,
}

// --- Contact form ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    InProgress,
    Resolved,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::InProgress => "in_progress",
            ContactStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "in_progress" => Ok(ContactStatus::InProgress),
            "resolved" => Ok(ContactStatus::Resolved),
            _ => Err(format!("unknown contact form status: {s}")),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = contact_forms)]
pub struct ContactForm {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize, Validate)]
#[diesel(table_name = contact_forms)]
pub struct NewContactForm {
    #[serde(skip_deserializing)]
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactFormRequest {
    pub status: ContactStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reasons_pass() {
        for reason in REPORT_REASONS {
            assert!(validate_reason(reason).is_ok());
        }
        assert!(validate_reason("rude").is_err());
    }

    #[test]
    fn report_request_checks_reason() {
        let req: CreateReportRequest = serde_json::from_value(serde_json::json!({
            "reported_user_id": Uuid::now_v7(),
            "reason": "fake_listing",
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let req: CreateReportRequest = serde_json::from_value(serde_json::json!({
            "reported_user_id": Uuid::now_v7(),
            "reason": "annoying",
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_rejects_unknown_status() {
        let parsed = serde_json::from_value::<UpdateReportRequest>(serde_json::json!({ "status": "archived" }));
        assert!(parsed.is_err());
        let parsed: UpdateReportRequest =
            serde_json::from_value(serde_json::json!({ "status": "dismissed", "resolution_notes": "spam bot" })).unwrap();
        assert_eq!(parsed.status, ReportStatus::Dismissed);
    }

    #[test]
    fn contact_form_requires_a_valid_email() {
        let form: NewContactForm = serde_json::from_value(serde_json::json!({
            "name": "Lucía",
            "email": "not-an-email",
            "subject": "Consulta",
            "message": "¿Cómo publico un proyecto?",
        }))
        .unwrap();
        assert!(form.validate().is_err());

        let form = NewContactForm { email: "lucia@example.com".into(), ..form };
        assert!(form.validate().is_ok());
        assert!(form.user_id.is_none());
    }

    #[test]
    fn contact_status_parses_snake_case() {
        assert_eq!("in_progress".parse::<ContactStatus>().unwrap(), ContactStatus::InProgress);
        assert!("closed".parse::<ContactStatus>().is_err());
    }
}
