use axum::{middleware, routing::{get, post, put}, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod services;

use config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use vendra_shared::clients::db::{create_pool, DbPool};
use vendra_shared::clients::internal::InternalClient;
use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::middleware::InternalTokenSource;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub messaging: InternalClient,
    pub metrics: PrometheusHandle,
}

impl InternalTokenSource for AppState {
    fn internal_token(&self) -> &str {
        &self.config.internal_token
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vendra_shared::middleware::init_tracing("vendra-moderation");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = vendra_shared::middleware::init_metrics()?;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let messaging = InternalClient::new(reqwest::Client::new(), &config.messaging_url, &config.internal_token);

    let state = Arc::new(AppState { db, config, rabbitmq, messaging, metrics });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // User-facing
        .route("/reports", post(routes::user_routes::create_report))
        .route("/contact", post(routes::user_routes::submit_contact_form))
        // Admin: reports
        .route("/admin/reports", get(routes::admin_routes::list_reports))
        .route("/admin/reports/:id", get(routes::admin_routes::get_report).put(routes::admin_routes::update_report))
        .route("/admin/reports/:id/assign", post(routes::admin_routes::assign_report))
        .route("/admin/reports/:id/conversation", get(routes::admin_routes::get_report_conversation))
        .route("/admin/reports/:id/block", post(routes::admin_routes::block_reported_user))
        // Admin: back-office
        .route("/admin/stats", get(routes::admin_routes::get_stats))
        .route("/admin/audit-log", get(routes::admin_routes::get_audit_log))
        .route("/admin/contact-forms", get(routes::admin_routes::list_contact_forms))
        .route("/admin/contact-forms/:id", put(routes::admin_routes::update_contact_form))
        // Service-to-service
        .route("/internal/reports", post(routes::user_routes::create_internal_report))
        .layer(middleware::from_fn(vendra_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vendra-moderation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
