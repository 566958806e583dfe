use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::clients::storage::Bucket;
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::middleware::OptionalAuthUser;
use vendra_shared::schema::properties;
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{dropped_media, NewProperty, Property, UpdateProperty};
use crate::services::access;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PropertySearch {
    pub city: Option<String>,
    pub operation: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_bedrooms: Option<i32>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn find_property(conn: &mut diesel::pg::PgConnection, id: Uuid) -> AppResult<Property> {
    properties::table
        .find(id)
        .select(Property::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PropertyNotFound, "property not found"))
}

/// POST /properties
pub async fn create_property(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<NewProperty>,
) -> AppResult<Json<ApiResponse<Property>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    state.storage.ensure_owned_urls(Bucket::PropertyImages, user.id, &req.images)?;

    let mut conn = state.db.get()?;
    access::require_listing_eligibility(&mut conn, &user)?;

    req.owner_id = user.id;
    let property = diesel::insert_into(properties::table)
        .values(&req)
        .returning(Property::as_returning())
        .get_result(&mut conn)?;

    tracing::info!(property_id = %property.id, owner_id = %user.id, city = %property.city, "property created");

    publisher::publish_property_created(&state.rabbitmq, &property).await;

    Ok(Json(ApiResponse::ok(property)))
}

/// GET /properties. Published listings only.
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(search): Query<PropertySearch>,
) -> AppResult<Json<ApiResponse<Paginated<Property>>>> {
    let params = PaginationParams::new(search.page, search.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = properties::table
            .filter(properties::is_published.eq(true))
            .into_boxed();
        if let Some(city) = search.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            q = q.filter(properties::city.ilike(city.to_string()));
        }
        if let Some(op) = search.operation.as_deref() {
            q = q.filter(properties::operation.eq(op.to_string()));
        }
        if let Some(kind) = search.property_type.as_deref() {
            q = q.filter(properties::property_type.eq(kind.to_string()));
        }
        if let Some(min) = search.min_price {
            q = q.filter(properties::price.ge(min));
        }
        if let Some(max) = search.max_price {
            q = q.filter(properties::price.le(max));
        }
        if let Some(beds) = search.min_bedrooms {
            q = q.filter(properties::bedrooms.ge(beds));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(properties::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Property::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /properties/:id. Unpublished listings are visible to their owner and admins.
pub async fn get_property(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Property>>> {
    let mut conn = state.db.get()?;
    let property = find_property(&mut conn, property_id)?;

    let privileged = viewer
        .as_ref()
        .is_some_and(|v| v.is_admin() || v.id == property.owner_id);
    if !property.is_published && !privileged {
        return Err(AppError::new(ErrorCode::PropertyNotFound, "property not found"));
    }

    Ok(Json(ApiResponse::ok(property)))
}

/// PATCH /properties/:id
pub async fn update_property(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<Uuid>,
    Json(req): Json<UpdateProperty>,
) -> AppResult<Json<ApiResponse<Property>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let current = find_property(&mut conn, property_id)?;
    access::ensure_owner(current.owner_id, &user)?;
    if let Some(images) = &req.images {
        state.storage.ensure_owned_urls(Bucket::PropertyImages, current.owner_id, images)?;
    }

    let updated = diesel::update(properties::table.find(property_id))
        .set((&req, properties::updated_at.eq(Utc::now())))
        .returning(Property::as_returning())
        .get_result(&mut conn)?;

    let removed = dropped_media(&current.images, &updated.images);
    state.storage.delete_urls_best_effort(Bucket::PropertyImages, current.owner_id, &removed).await;

    Ok(Json(ApiResponse::ok(updated)))
}

/// DELETE /properties/:id
pub async fn delete_property(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get()?;
    let current = find_property(&mut conn, property_id)?;
    access::ensure_owner_or_admin(current.owner_id, &user)?;

    diesel::delete(properties::table.find(property_id)).execute(&mut conn)?;

    tracing::info!(property_id = %property_id, deleted_by = %user.id, "property deleted");

    state.storage.delete_urls_best_effort(Bucket::PropertyImages, current.owner_id, &current.images).await;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true, "id": property_id }))))
}

/// GET /users/:id/properties
pub async fn list_user_properties(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Property>>>> {
    let include_unpublished = viewer.as_ref().is_some_and(|v| v.id == owner_id || v.is_admin());
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = properties::table
            .filter(properties::owner_id.eq(owner_id))
            .into_boxed();
        if !include_unpublished {
            q = q.filter(properties::is_published.eq(true));
        }
        q
    };

    let total: i64 = build().count().get_result(&mut conn)?;
    let items = build()
        .order(properties::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Property::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}
