use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use vendra_shared::clients::db;
use vendra_shared::types::api::{HealthCheck, HealthResponse};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let checks = vec![
        HealthCheck::from_result("postgres", db::ping(&state.db)),
        HealthCheck::from_result("redis", state.redis.ping().await),
    ];
    Json(HealthResponse::healthy("vendra-messaging", env!("CARGO_PKG_VERSION")).with_checks(checks))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
