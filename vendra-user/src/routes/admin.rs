use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::clients::storage::Bucket;
use vendra_shared::domain::audit::record_admin_action;
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::AdminUser;
use vendra_shared::schema::{deletion_requests, seller_applications, users};
use vendra_shared::types::auth::UserRole;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{ApplicationReview, DeletionRequest, SellerApplication, User};
use crate::services::application_service::{self as apps, ReviewAction};
use crate::services::deletion_service::{self, OrphanedObjects, STATUS_COMPLETED, STATUS_PENDING, STATUS_REJECTED};
use crate::AppState;

// --- Users ---

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// GET /admin/users?role=&q=
pub async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let params = PaginationParams::new(query.page, query.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = users::table.into_boxed();
        if let Some(role) = query.role {
            q = q.filter(users::role.eq(role.as_str()));
        }
        if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
            q = q.filter(users::name.ilike(pattern.clone()).or(users::email.ilike(pattern)));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(users::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(User::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// PUT /admin/users/:id/role
pub async fn update_user_role(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = state.db.get()?;

    let updated = conn.transaction::<_, AppError, _>(|conn| {
        let updated = diesel::update(users::table.find(user_id))
            .set((users::role.eq(req.role.as_str()), users::updated_at.eq(Utc::now())))
            .returning(User::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        record_admin_action(conn, admin.id, "user.role_changed", Some(user_id), serde_json::json!({ "role": req.role }))?;
        Ok(updated)
    })?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- Seller applications ---

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// GET /admin/applications?status=
pub async fn list_applications(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApplicationListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<ApplicationReview>>>> {
    let params = PaginationParams::new(query.page, query.per_page);
    let status = query.status.as_deref().map(apps::parse_status_filter).transpose()?;

    let (rows, total) = {
        let mut conn = state.db.get()?;
        let build = || {
            let mut q = seller_applications::table
                .inner_join(users::table)
                .into_boxed();
            if let Some(status) = status {
                q = q.filter(seller_applications::status.eq(status.as_str()));
            }
            q
        };

        let total: i64 = build().count().get_result(&mut conn)?;
        let rows: Vec<(SellerApplication, Option<String>)> = build()
            .order(seller_applications::created_at.desc())
            .offset(params.offset() as i64)
            .limit(params.limit() as i64)
            .select((SellerApplication::as_select(), users::email))
            .load(&mut conn)?;
        (rows, total)
    };

    let ttl = state.config.kyc_presign_secs;
    let mut items = Vec::with_capacity(rows.len());
    for (application, applicant_email) in rows {
        let kyc_front_url = presign(&state, application.kyc_front_key.as_deref(), ttl).await;
        let kyc_back_url = presign(&state, application.kyc_back_key.as_deref(), ttl).await;
        let kyc_selfie_url = presign(&state, application.kyc_selfie_key.as_deref(), ttl).await;
        items.push(ApplicationReview {
            application,
            applicant_email,
            kyc_front_url,
            kyc_back_url,
            kyc_selfie_url,
        });
    }

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

async fn presign(state: &AppState, key: Option<&str>, ttl: u64) -> Option<String> {
    let key = key?;
    match state.storage.presigned_url(Bucket::KycDocs, key, ttl).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "failed to presign kyc document");
            None
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateApplicationRequest {
    pub action: ReviewAction,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// PUT /admin/applications/:id
pub async fn update_application(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> AppResult<Json<ApiResponse<SellerApplication>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let target = req.action.target_status();
    let notes = req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let mut conn = state.db.get()?;

    let (updated, applicant_email) = conn.transaction::<_, AppError, _>(|conn| {
        let current: SellerApplication = seller_applications::table
            .find(application_id)
            .select(SellerApplication::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "application not found"))?;

        let from = apps::parse_status(&current.status)?;
        apps::ensure_transition(from, target)?;

        let now = Utc::now();
        let updated = diesel::update(
            seller_applications::table
                .find(application_id)
                .filter(seller_applications::status.eq(from.as_str())),
        )
        .set((
            seller_applications::status.eq(target.as_str()),
            seller_applications::admin_notes.eq(notes),
            seller_applications::reviewed_by.eq(admin.id),
            seller_applications::reviewed_at.eq(now),
            seller_applications::updated_at.eq(now),
        ))
        .returning(SellerApplication::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ApplicationConflict, "application was reviewed concurrently"))?;

        record_admin_action(
            conn,
            admin.id,
            "application.reviewed",
            Some(updated.user_id),
            serde_json::json!({ "application_id": application_id, "from": from.as_str(), "to": target.as_str() }),
        )?;

        let email: Option<String> = users::table
            .find(updated.user_id)
            .select(users::email)
            .first(conn)
            .optional()?
            .flatten();

        Ok((updated, email))
    })?;

    tracing::info!(
        application_id = %application_id,
        admin_id = %admin.id,
        status = %updated.status,
        "seller application reviewed"
    );

    if let Some(email) = applicant_email.as_deref() {
        if let Err(e) = state.email.send_application_decision(email, &updated.status, notes).await {
            tracing::warn!(error = %e, application_id = %application_id, "failed to send application decision email");
        }
    }

    publisher::publish_application_reviewed(&state.rabbitmq, updated.id, updated.user_id, &updated.status, admin.id).await;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- Deletion requests ---

#[derive(Debug, Deserialize)]
pub struct DeletionListQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// GET /admin/deletion-requests?status=
pub async fn list_deletion_requests(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeletionListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<DeletionRequest>>>> {
    let params = PaginationParams::new(query.page, query.per_page);
    if let Some(status) = query.status.as_deref() {
        if ![STATUS_PENDING, STATUS_REJECTED, STATUS_COMPLETED].contains(&status) {
            return Err(AppError::new(ErrorCode::ValidationError, format!("unknown status filter: {status}")));
        }
    }

    let mut conn = state.db.get()?;
    let build = || {
        let mut q = deletion_requests::table.into_boxed();
        if let Some(status) = query.status.as_deref() {
            q = q.filter(deletion_requests::status.eq(status));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(deletion_requests::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(DeletionRequest::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub request: DeletionRequest,
    pub removed: deletion_service::CascadeCounts,
}

/// POST /admin/deletion-requests/:id/approve
pub async fn approve_deletion(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ApprovalResponse>>> {
    let mut conn = state.db.get()?;

    let (request, counts, orphans) = conn.transaction::<_, AppError, _>(|conn| {
        let request = lock_request(conn, request_id)?;
        deletion_service::ensure_pending(&request.status)?;

        let (counts, orphans) = deletion_service::cascade_delete_user(conn, request.user_id)?;

        let request = diesel::update(deletion_requests::table.find(request_id))
            .set((
                deletion_requests::status.eq(STATUS_COMPLETED),
                deletion_requests::reviewed_by.eq(admin.id),
                deletion_requests::reviewed_at.eq(Utc::now()),
            ))
            .returning(DeletionRequest::as_returning())
            .get_result(conn)?;

        record_admin_action(
            conn,
            admin.id,
            "account.deleted",
            Some(request.user_id),
            serde_json::json!({ "request_id": request_id, "removed": &counts }),
        )?;

        Ok((request, counts, orphans))
    })?;

    tracing::info!(request_id = %request_id, user_id = %request.user_id, admin_id = %admin.id, "account deletion approved");

    remove_orphaned_objects(&state, request.user_id, &orphans).await;
    publisher::publish_account_deleted(&state.rabbitmq, request.user_id, request.id, admin.id).await;

    Ok(Json(ApiResponse::ok(ApprovalResponse { request, removed: counts })))
}

/// POST /admin/deletion-requests/:id/reject
pub async fn reject_deletion(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionRequest>>> {
    let mut conn = state.db.get()?;

    let request = conn.transaction::<_, AppError, _>(|conn| {
        let request = lock_request(conn, request_id)?;
        deletion_service::ensure_pending(&request.status)?;

        let now = Utc::now();
        let request = diesel::update(deletion_requests::table.find(request_id))
            .set((
                deletion_requests::status.eq(STATUS_REJECTED),
                deletion_requests::reviewed_by.eq(admin.id),
                deletion_requests::reviewed_at.eq(now),
            ))
            .returning(DeletionRequest::as_returning())
            .get_result(conn)?;

        diesel::update(users::table.find(request.user_id))
            .set((users::deletion_scheduled_at.eq(None::<chrono::DateTime<Utc>>), users::updated_at.eq(now)))
            .execute(conn)?;

        record_admin_action(
            conn,
            admin.id,
            "account.deletion_rejected",
            Some(request.user_id),
            serde_json::json!({ "request_id": request_id }),
        )?;

        Ok(request)
    })?;

    tracing::info!(request_id = %request_id, admin_id = %admin.id, "account deletion rejected");

    Ok(Json(ApiResponse::ok(request)))
}

fn lock_request(conn: &mut diesel::pg::PgConnection, request_id: Uuid) -> AppResult<DeletionRequest> {
    deletion_requests::table
        .find(request_id)
        .select(DeletionRequest::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::DeletionRequestNotFound, "deletion request not found"))
}

async fn remove_orphaned_objects(state: &AppState, owner_id: Uuid, orphans: &OrphanedObjects) {
    state.storage.delete_urls_best_effort(Bucket::PropertyImages, owner_id, &orphans.property_images).await;
    state.storage.delete_urls_best_effort(Bucket::ProjectImages, owner_id, &orphans.project_images).await;
    state.storage.delete_urls_best_effort(Bucket::ProjectPlans, owner_id, &orphans.project_plans).await;
    if let Some(url) = &orphans.avatar_url {
        state.storage.delete_urls_best_effort(Bucket::Avatars, owner_id, std::slice::from_ref(url)).await;
    }
    if let Some(url) = &orphans.banner_url {
        state.storage.delete_urls_best_effort(Bucket::Banners, owner_id, std::slice::from_ref(url)).await;
    }
    for key in &orphans.kyc_keys {
        if let Err(e) = state.storage.delete(Bucket::KycDocs, key).await {
            tracing::warn!(error = %e, key = %key, "failed to remove kyc document of deleted account");
        }
    }
}
