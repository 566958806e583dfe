use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{favorites, properties};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::pagination::{Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::models::{NewFavorite, Property};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub property_id: Uuid,
    pub favorited: bool,
}

/// POST /favorites/:property_id. Idempotent.
pub async fn add_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteState>>> {
    let mut conn = state.db.get()?;

    let exists: i64 = properties::table
        .find(property_id)
        .count()
        .get_result(&mut conn)?;
    if exists == 0 {
        return Err(AppError::new(ErrorCode::PropertyNotFound, "property not found"));
    }

    diesel::insert_into(favorites::table)
        .values(&NewFavorite { user_id: user.id, property_id })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok(FavoriteState { property_id, favorited: true })))
}

/// DELETE /favorites/:property_id. Idempotent.
pub async fn remove_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteState>>> {
    let mut conn = state.db.get()?;

    diesel::delete(
        favorites::table
            .filter(favorites::user_id.eq(user.id))
            .filter(favorites::property_id.eq(property_id)),
    )
    .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok(FavoriteState { property_id, favorited: false })))
}

/// GET /favorites. Most recently saved first.
pub async fn list_favorites(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Property>>>> {
    let mut conn = state.db.get()?;

    let total: i64 = favorites::table
        .filter(favorites::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;

    let items = favorites::table
        .inner_join(properties::table)
        .filter(favorites::user_id.eq(user.id))
        .order(favorites::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Property::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}
