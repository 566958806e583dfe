use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use vendra_shared::errors::{AppError, AppResult};
use vendra_shared::schema::push_subscriptions;
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::models::{NewPushSubscription, PushSubscription};
use crate::services::user_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(url)]
    pub endpoint: String,
    #[validate(length(min = 1))]
    pub p256dh: String,
    #[validate(length(min = 1))]
    pub auth: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// POST /me/push-subscriptions. Re-subscribing a known endpoint moves it to the caller.
pub async fn subscribe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<Json<ApiResponse<PushSubscription>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    user_service::upsert_from_claims(&mut conn, &user)?;

    let subscription = diesel::insert_into(push_subscriptions::table)
        .values(&NewPushSubscription {
            user_id: user.id,
            endpoint: &req.endpoint,
            p256dh: &req.p256dh,
            auth: &req.auth,
        })
        .on_conflict(push_subscriptions::endpoint)
        .do_update()
        .set((
            push_subscriptions::user_id.eq(excluded(push_subscriptions::user_id)),
            push_subscriptions::p256dh.eq(excluded(push_subscriptions::p256dh)),
            push_subscriptions::auth.eq(excluded(push_subscriptions::auth)),
        ))
        .returning(PushSubscription::as_returning())
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(subscription)))
}

/// DELETE /me/push-subscriptions
pub async fn unsubscribe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnsubscribeRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get()?;

    let removed = diesel::delete(
        push_subscriptions::table
            .filter(push_subscriptions::user_id.eq(user.id))
            .filter(push_subscriptions::endpoint.eq(&req.endpoint)),
    )
    .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "removed": removed }))))
}
