use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::clients::storage::Bucket;
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::OptionalAuthUser;
use vendra_shared::schema::projects;
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{dropped_media, NewProject, Project, UpdateProject};
use crate::services::access;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectSearch {
    pub city: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn find_project(conn: &mut diesel::pg::PgConnection, id: Uuid) -> AppResult<Project> {
    projects::table
        .find(id)
        .select(Project::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProjectNotFound, "project not found"))
}

/// POST /projects
pub async fn create_project(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<NewProject>,
) -> AppResult<Json<ApiResponse<Project>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    state.storage.ensure_owned_urls(Bucket::ProjectImages, user.id, &req.images)?;
    state.storage.ensure_owned_urls(Bucket::ProjectPlans, user.id, &req.plans)?;

    let mut conn = state.db.get()?;
    let role = access::require_listing_eligibility(&mut conn, &user)?;
    access::require_project_role(role)?;

    req.owner_id = user.id;
    let project = diesel::insert_into(projects::table)
        .values(&req)
        .returning(Project::as_returning())
        .get_result(&mut conn)?;

    tracing::info!(project_id = %project.id, owner_id = %user.id, city = %project.city, "project created");

    publisher::publish_project_created(&state.rabbitmq, &project).await;

    Ok(Json(ApiResponse::ok(project)))
}

/// GET /projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(search): Query<ProjectSearch>,
) -> AppResult<Json<ApiResponse<Paginated<Project>>>> {
    let params = PaginationParams::new(search.page, search.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = projects::table
            .filter(projects::is_published.eq(true))
            .into_boxed();
        if let Some(city) = search.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            q = q.filter(projects::city.ilike(city.to_string()));
        }
        if let Some(status) = search.status.as_deref() {
            q = q.filter(projects::status.eq(status.to_string()));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(projects::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Project::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /projects/:id
pub async fn get_project(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Project>>> {
    let mut conn = state.db.get()?;
    let project = find_project(&mut conn, project_id)?;

    let privileged = viewer
        .as_ref()
        .is_some_and(|v| v.is_admin() || v.id == project.owner_id);
    if !project.is_published && !privileged {
        return Err(AppError::new(ErrorCode::ProjectNotFound, "project not found"));
    }

    Ok(Json(ApiResponse::ok(project)))
}

/// PATCH /projects/:id
pub async fn update_project(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProject>,
) -> AppResult<Json<ApiResponse<Project>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let current = find_project(&mut conn, project_id)?;
    access::ensure_owner(current.owner_id, &user)?;
    if let Some(images) = &req.images {
        state.storage.ensure_owned_urls(Bucket::ProjectImages, current.owner_id, images)?;
    }
    if let Some(plans) = &req.plans {
        state.storage.ensure_owned_urls(Bucket::ProjectPlans, current.owner_id, plans)?;
    }

    let updated = diesel::update(projects::table.find(project_id))
        .set((&req, projects::updated_at.eq(Utc::now())))
        .returning(Project::as_returning())
        .get_result(&mut conn)?;

    let images = dropped_media(&current.images, &updated.images);
    state.storage.delete_urls_best_effort(Bucket::ProjectImages, current.owner_id, &images).await;
    let plans = dropped_media(&current.plans, &updated.plans);
    state.storage.delete_urls_best_effort(Bucket::ProjectPlans, current.owner_id, &plans).await;

    Ok(Json(ApiResponse::ok(updated)))
}

/// DELETE /projects/:id
pub async fn delete_project(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get()?;
    let current = find_project(&mut conn, project_id)?;
    access::ensure_owner_or_admin(current.owner_id, &user)?;

    diesel::delete(projects::table.find(project_id)).execute(&mut conn)?;

    tracing::info!(project_id = %project_id, deleted_by = %user.id, "project deleted");

    state.storage.delete_urls_best_effort(Bucket::ProjectImages, current.owner_id, &current.images).await;
    state.storage.delete_urls_best_effort(Bucket::ProjectPlans, current.owner_id, &current.plans).await;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true, "id": project_id }))))
}

/// GET /users/:id/projects
pub async fn list_user_projects(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Project>>>> {
    let include_unpublished = viewer.as_ref().is_some_and(|v| v.id == owner_id || v.is_admin());
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = projects::table
            .filter(projects::owner_id.eq(owner_id))
            .into_boxed();
        if !include_unpublished {
            q = q.filter(projects::is_published.eq(true));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(projects::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Project::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

// --- POST /projects/:id/views ---

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub views: i64,
    pub counted: bool,
}

/// Identity a view is de-duplicated on: the user when signed in, otherwise the
/// client address forwarded by the proxy.
pub fn viewer_identity(viewer: Option<&AuthUser>, headers: &HeaderMap) -> String {
    if let Some(user) = viewer {
        return format!("user:{}", user.id);
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| format!("ip:{ip}"))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub fn view_key(project_id: Uuid, viewer: &str) -> String {
    format!("views:project:{project_id}:{viewer}")
}

/// POST /projects/:id/views. Counts at most one view per viewer per window.
pub async fn increment_project_views(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<ViewResponse>>> {
    let key = view_key(project_id, &viewer_identity(viewer.as_ref(), &headers));

    // Without Redis every view counts.
    let first_view = match state.redis.set_nx(&key, "1", state.config.view_dedup_secs).await {
        Ok(first) => first,
        Err(e) => {
            tracing::warn!(error = %e, project_id = %project_id, "view de-duplication unavailable");
            true
        }
    };

    let mut conn = state.db.get()?;
    let views: i64 = if first_view {
        diesel::update(projects::table.find(project_id))
            .set(projects::views.eq(projects::views + 1))
            .returning(projects::views)
            .get_result(&mut conn)
            .optional()?
    } else {
        projects::table
            .find(project_id)
            .select(projects::views)
            .first(&mut conn)
            .optional()?
    }
    .ok_or_else(|| AppError::new(ErrorCode::ProjectNotFound, "project not found"))?;

    Ok(Json(ApiResponse::ok(ViewResponse { views, counted: first_view })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use vendra_shared::types::auth::UserRole;

    #[test]
    fn signed_in_viewers_are_keyed_by_user() {
        let user = AuthUser { id: Uuid::now_v7(), role: UserRole::Comprador, email: None, name: None };
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        assert_eq!(viewer_identity(Some(&user), &headers), format!("user:{}", user.id));
    }

    #[test]
    fn anonymous_viewers_use_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(viewer_identity(None, &headers), "ip:203.0.113.7");
        assert_eq!(viewer_identity(None, &HeaderMap::new()), "anonymous");
    }

    #[test]
    fn view_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            view_key(id, "user:abc"),
            "views:project:00000000-0000-0000-0000-000000000000:user:abc"
        );
    }
}
