use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use vendra_shared::errors::AppResult;
use vendra_shared::middleware::AdminUser;
use vendra_shared::schema::properties;
use vendra_shared::types::pagination::{default_page, default_per_page, Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::models::Property;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminPropertyQuery {
    pub owner_id: Option<Uuid>,
    pub published: Option<bool>,
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// GET /admin/properties. Includes unpublished listings.
pub async fn list_all_properties(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminPropertyQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Property>>>> {
    let params = PaginationParams::new(query.page, query.per_page);
    let mut conn = state.db.get()?;

    let build = || {
        let mut q = properties::table.into_boxed();
        if let Some(owner) = query.owner_id {
            q = q.filter(properties::owner_id.eq(owner));
        }
        if let Some(published) = query.published {
            q = q.filter(properties::is_published.eq(published));
        }
        if let Some(status) = query.status.as_deref() {
            q = q.filter(properties::status.eq(status.to_string()));
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
