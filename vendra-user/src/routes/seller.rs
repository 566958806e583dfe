use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::clients::storage::{document_extension, object_key, Bucket};
use vendra_shared::domain::seller::{self, ApplicationStatus, Eligibility};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{seller_applications, users};
use vendra_shared::types::auth::{AuthUser, UserRole};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{ApplicationDraft, NewSellerApplication, SellerApplication};
use crate::routes::upload::read_single_file;
use crate::services::application_service::{self as apps, apply_draft, missing_for_submission};
use crate::services::user_service;
use crate::AppState;

const ACTIVE_STATUSES: [&str; 3] = ["draft", "submitted", "needs_more_info"];

fn load_latest(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<SellerApplication>> {
    Ok(seller_applications::table
        .filter(seller_applications::user_id.eq(user_id))
        .order(seller_applications::created_at.desc())
        .select(SellerApplication::as_select())
        .first(conn)
        .optional()?)
}

fn load_active_for_update(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<SellerApplication>> {
    Ok(seller_applications::table
        .filter(seller_applications::user_id.eq(user_id))
        .filter(seller_applications::status.eq_any(ACTIVE_STATUSES))
        .select(SellerApplication::as_select())
        .for_update()
        .first(conn)
        .optional()?)
}

fn ensure_editable(app: &SellerApplication) -> AppResult<ApplicationStatus> {
    let status = apps::parse_status(&app.status)?;
    if !status.is_editable() {
        return Err(AppError::with_details(
            ErrorCode::ApplicationNotEditable,
            format!("application is {status} and can no longer be edited"),
            serde_json::json!({ "status": status.as_str() }),
        ));
    }
    Ok(status)
}

fn conflict() -> AppError {
    AppError::new(ErrorCode::ApplicationConflict, "application changed concurrently, reload and retry")
}

// --- GET /seller/application ---

pub async fn get_application(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Option<SellerApplication>>>> {
    let mut conn = state.db.get()?;
    Ok(Json(ApiResponse::ok(load_latest(&mut conn, user.id)?)))
}

// --- PUT /seller/application ---

pub async fn save_draft(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ApplicationDraft>,
) -> AppResult<Json<ApiResponse<SellerApplication>>> {
    draft.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    if let Some(choice) = &draft.role_choice {
        apps::parse_role_choice(choice)?;
    }

    let mut conn = state.db.get()?;
    user_service::upsert_from_claims(&mut conn, &user)?;

    let saved = conn.transaction::<_, AppError, _>(|conn| {
        let app = match load_active_for_update(conn, user.id)? {
            Some(app) => app,
            None => {
                if let Some(latest) = load_latest(conn, user.id)? {
                    if latest.status == ApplicationStatus::Approved.as_str() {
                        return Err(AppError::new(
                            ErrorCode::ApplicationNotEditable,
                            "your seller application is already approved",
                        ));
                    }
                }
                let role_choice = draft.role_choice.clone().ok_or_else(|| {
                    AppError::new(ErrorCode::ValidationError, "role_choice is required to start an application")
                })?;
                diesel::insert_into(seller_applications::table)
                    .values(&NewSellerApplication { user_id: user.id, role_choice })
                    .returning(SellerApplication::as_returning())
                    .get_result(conn)
                    .map_err(|e| match e {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => conflict(),
                        other => AppError::Database(other),
                    })?
            }
        };

        ensure_editable(&app)?;

        diesel::update(
            seller_applications::table
                .find(app.id)
                .filter(seller_applications::status.eq(&app.status)),
        )
        .set((&draft, seller_applications::updated_at.eq(Utc::now())))
        .returning(SellerApplication::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(conflict)
    })?;

    Ok(Json(ApiResponse::ok(saved)))
}

// --- POST /seller/application/submit ---

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub application: SellerApplication,
    pub role: UserRole,
    pub role_promoted: bool,
}

pub async fn submit_application(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ApplicationDraft>,
) -> AppResult<Json<ApiResponse<SubmitResponse>>> {
    draft.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    user_service::upsert_from_claims(&mut conn, &user)?;

    let response = conn.transaction::<_, AppError, _>(|conn| {
        let app = load_active_for_update(conn, user.id)?
            .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "no application to submit"))?;

        let current = apps::parse_status(&app.status)?;
        apps::ensure_transition(current, ApplicationStatus::Submitted)?;

        let merged = apply_draft(app, &draft);
        let missing = missing_for_submission(&merged);
        if !missing.is_empty() {
            return Err(AppError::with_details(
                ErrorCode::ApplicationIncomplete,
                "application is missing required fields",
                serde_json::json!({ "missing": missing }),
            ));
        }
        let choice = apps::parse_role_choice(&merged.role_choice)?;

        let now = Utc::now();
        let application = diesel::update(
            seller_applications::table
                .find(merged.id)
                .filter(seller_applications::status.eq(current.as_str())),
        )
        .set((
            &draft,
            seller_applications::status.eq(ApplicationStatus::Submitted.as_str()),
            seller_applications::submitted_at.eq(now),
            seller_applications::updated_at.eq(now),
        ))
        .returning(SellerApplication::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(conflict)?;

        let stored_role: String = users::table
            .find(user.id)
            .select(users::role)
            .for_update()
            .first(conn)?;
        let stored_role: UserRole = stored_role
            .parse()
            .map_err(|e: String| AppError::internal(format!("corrupt user row: {e}")))?;

        let promoted = seller::promoted_role(stored_role, choice);
        if let Some(role) = promoted {
            diesel::update(users::table.find(user.id))
                .set((users::role.eq(role.as_str()), users::updated_at.eq(now)))
                .execute(conn)?;
        }

        Ok(SubmitResponse {
            application,
            role: promoted.unwrap_or(stored_role),
            role_promoted: promoted.is_some(),
        })
    })?;

    tracing::info!(
        user_id = %user.id,
        application_id = %response.application.id,
        role = %response.role,
        role_promoted = response.role_promoted,
        "seller application submitted"
    );

    publisher::publish_application_submitted(
        &state.rabbitmq,
        response.application.id,
        user.id,
        &response.application.role_choice,
        response.role_promoted,
    )
    .await;

    Ok(Json(ApiResponse::ok(response)))
}

// --- POST /seller/application/documents?kind= ---

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Front,
    Back,
    Selfie,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub kind: DocumentKind,
}

#[derive(Debug, Serialize)]
pub struct DocumentUploadResponse {
    pub kind: &'static str,
    pub uploaded: bool,
}

pub async fn upload_document(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<DocumentUploadResponse>>> {
    let file = read_single_file(&mut multipart, document_extension).await?;

    let app = {
        let mut conn = state.db.get()?;
        let app = seller_applications::table
            .filter(seller_applications::user_id.eq(user.id))
            .filter(seller_applications::status.eq_any(ACTIVE_STATUSES))
            .select(SellerApplication::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "save your application before uploading documents"))?;
        ensure_editable(&app)?;
        app
    };

    let key = object_key(user.id, file.extension);
    state.storage.upload(Bucket::KycDocs, &key, file.bytes, &file.content_type).await?;

    let (label, previous) = match query.kind {
        DocumentKind::Front => ("front", app.kyc_front_key.clone()),
        DocumentKind::Back => ("back", app.kyc_back_key.clone()),
        DocumentKind::Selfie => ("selfie", app.kyc_selfie_key.clone()),
    };

    let written = {
        let mut conn = state.db.get()?;
        let target = seller_applications::table
            .find(app.id)
            .filter(seller_applications::status.eq(&app.status));
        let now = Utc::now();
        match query.kind {
            DocumentKind::Front => diesel::update(target)
                .set((seller_applications::kyc_front_key.eq(&key), seller_applications::updated_at.eq(now)))
                .execute(&mut conn),
            DocumentKind::Back => diesel::update(target)
                .set((seller_applications::kyc_back_key.eq(&key), seller_applications::updated_at.eq(now)))
                .execute(&mut conn),
            DocumentKind::Selfie => diesel::update(target)
                .set((seller_applications::kyc_selfie_key.eq(&key), seller_applications::updated_at.eq(now)))
                .execute(&mut conn),
        }
    };

    let outcome = match written {
        Ok(0) => Err(conflict()),
        Ok(_) => Ok(()),
        Err(e) => Err(AppError::Database(e)),
    };
    if let Err(e) = outcome {
        if let Err(cleanup) = state.storage.delete(Bucket::KycDocs, &key).await {
            tracing::warn!(error = %cleanup, key = %key, "failed to remove orphaned kyc upload");
        }
        return Err(e);
    }

    if let Some(old) = previous {
        if let Err(e) = state.storage.delete(Bucket::KycDocs, &old).await {
            tracing::warn!(error = %e, key = %old, "failed to remove replaced kyc document");
        }
    }

    tracing::info!(user_id = %user.id, application_id = %app.id, kind = label, "kyc document uploaded");

    Ok(Json(ApiResponse::ok(DocumentUploadResponse { kind: label, uploaded: true })))
}

// --- GET /seller/eligibility ---

pub async fn get_eligibility(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Eligibility>>> {
    let mut conn = state.db.get()?;
    let (_, eligibility) = seller::eligibility_for(&mut conn, &user)?;
    Ok(Json(ApiResponse::ok(eligibility)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_parses_from_query() {
        let q: DocumentQuery = serde_json::from_str(r#"{"kind":"selfie"}"#).unwrap();
        assert_eq!(q.kind, DocumentKind::Selfie);
        assert!(serde_json::from_str::<DocumentQuery>(r#"{"kind":"passport"}"#).is_err());
    }

    #[test]
    fn active_statuses_match_editable_or_submitted() {
        for raw in ACTIVE_STATUSES {
            let status: ApplicationStatus = raw.parse().unwrap();
            assert!(!status.is_terminal());
        }
    }
}
