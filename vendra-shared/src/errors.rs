use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E2xxx: User, seller application and account deletion errors
/// - E3xxx: Listing errors
/// - E4xxx: Messaging errors
/// - E6xxx: Moderation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,
    TokenExpired,
    TokenInvalid,
    UploadFailed,

    // User (E2xxx)
    UserNotFound,
    ApplicationNotFound,
    ApplicationNotEditable,
    ApplicationIncomplete,
    InvalidApplicationTransition,
    ApplicationConflict,
    DeletionRequestNotFound,
    DeletionRequestNotPending,
    CannotReviewSelf,
    DuplicateReview,
    AccountDeleted,

    // Listings (E3xxx)
    PropertyNotFound,
    ProjectNotFound,
    NotListingOwner,
    SellerApplicationRequired,
    ProjectRoleRequired,

    // Messaging (E4xxx)
    ConversationNotFound,
    NotConversationMember,
    Blocked,
    CaseClosed,
    CaseAlreadyClosed,
    CaseAlreadyOpen,
    AlreadyEscalated,
    CannotMessageSelf,
    CannotBlockSelf,

    // Moderation (E6xxx)
    ReportNotFound,
    ReportAlreadyReviewed,
    InvalidReportTransition,
    ReportConflict,
    CannotReportSelf,
    DuplicateReport,
    ContactFormNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::TokenExpired => "E0010",
            Self::TokenInvalid => "E0011",
            Self::UploadFailed => "E0012",

            // User
            Self::UserNotFound => "E2001",
            Self::ApplicationNotFound => "E2002",
            Self::ApplicationNotEditable => "E2003",
            Self::ApplicationIncomplete => "E2004",
            Self::InvalidApplicationTransition => "E2005",
            Self::ApplicationConflict => "E2006",
            Self::DeletionRequestNotFound => "E2007",
            Self::DeletionRequestNotPending => "E2008",
            Self::CannotReviewSelf => "E2009",
            Self::DuplicateReview => "E2010",
            Self::AccountDeleted => "E2011",

            // Listings
            Self::PropertyNotFound => "E3001",
            Self::ProjectNotFound => "E3002",
            Self::NotListingOwner => "E3003",
            Self::SellerApplicationRequired => "E3004",
            Self::ProjectRoleRequired => "E3005",

            // Messaging
            Self::ConversationNotFound => "E4001",
            Self::NotConversationMember => "E4002",
            Self::Blocked => "E4003",
            Self::CaseClosed => "E4004",
            Self::CaseAlreadyClosed => "E4005",
            Self::CaseAlreadyOpen => "E4006",
            Self::AlreadyEscalated => "E4007",
            Self::CannotMessageSelf => "E4008",
            Self::CannotBlockSelf => "E4009",

            // Moderation
            Self::ReportNotFound => "E6001",
            Self::ReportAlreadyReviewed => "E6003",
            Self::InvalidReportTransition => "E6004",
            Self::ReportConflict => "E6005",
            Self::CannotReportSelf => "E6006",
            Self::DuplicateReport => "E6007",
            Self::ContactFormNotFound => "E6008",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::UploadFailed
            | Self::ApplicationIncomplete => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AccountDeleted => StatusCode::GONE,
            Self::NotFound | Self::UserNotFound | Self::ApplicationNotFound
            | Self::DeletionRequestNotFound | Self::PropertyNotFound | Self::ProjectNotFound
            | Self::ConversationNotFound | Self::ReportNotFound
            | Self::ContactFormNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotListingOwner | Self::SellerApplicationRequired
            | Self::ProjectRoleRequired | Self::NotConversationMember | Self::Blocked
            | Self::CannotMessageSelf | Self::CannotBlockSelf | Self::CannotReportSelf
            | Self::CannotReviewSelf => StatusCode::FORBIDDEN,
            Self::ApplicationNotEditable | Self::InvalidApplicationTransition
            | Self::ApplicationConflict | Self::DeletionRequestNotPending | Self::DuplicateReview
            | Self::CaseClosed | Self::CaseAlreadyClosed | Self::CaseAlreadyOpen
            | Self::AlreadyEscalated | Self::ReportAlreadyReviewed
            | Self::InvalidReportTransition | Self::ReportConflict
            | Self::DuplicateReport => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        AppError::internal(format!("db pool error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn known_error_renders_code_and_status() {
        let (status, body) = body_json(AppError::new(ErrorCode::Blocked, "blocked")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "E4003");
        assert_eq!(body["error"]["message"], "blocked");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_included_when_present() {
        let err = AppError::with_details(
            ErrorCode::ApplicationIncomplete,
            "missing fields",
            serde_json::json!({ "missing": ["kyc_selfie"] }),
        );
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["missing"][0], "kyc_selfie");
    }

    #[tokio::test]
    async fn database_not_found_maps_to_404() {
        let (status, body) = body_json(AppError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E0003");
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[test]
    fn terminal_state_errors_are_conflicts() {
        for code in [
            ErrorCode::ReportAlreadyReviewed,
            ErrorCode::InvalidApplicationTransition,
            ErrorCode::CaseClosed,
            ErrorCode::DeletionRequestNotPending,
        ] {
            assert_eq!(code.status_code(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn auth_errors_split_401_and_403() {
        assert_eq!(ErrorCode::TokenInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }
}
