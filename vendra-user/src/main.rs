use axum::{extract::DefaultBodyLimit, middleware, routing::{get, post, put}, Router};
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
use vendra_shared::clients::email::EmailClient;
use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::clients::storage::StorageClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub storage: StorageClient,
    pub email: EmailClient,
    pub metrics: PrometheusHandle,
}

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vendra_shared::middleware::init_tracing("vendra-user");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = vendra_shared::middleware::init_metrics()?;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let storage = StorageClient::new(
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_public_url,
    )
    .await;
    let email = EmailClient::new(
        reqwest::Client::new(),
        &config.resend_api_key,
        &config.from_email,
        &config.from_name,
    );

    let state = Arc::new(AppState { db, config, rabbitmq, storage, email, metrics });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profile
        .route("/me", get(routes::profile::get_me).patch(routes::profile::update_me))
        .route("/me/avatar", post(routes::profile::upload_avatar)
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)))
        .route("/me/banner", post(routes::profile::upload_banner)
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)))
        .route("/me/push-subscriptions", post(routes::push::subscribe).delete(routes::push::unsubscribe))
        .route("/users/:id", get(routes::profile::get_public_profile))
        .route("/users/:id/reviews", get(routes::reviews::list_reviews).post(routes::reviews::create_review))
        // Seller application
        .route("/seller/application", get(routes::seller::get_application).put(routes::seller::save_draft))
        .route("/seller/application/submit", post(routes::seller::submit_application))
        .route("/seller/application/documents", post(routes::seller::upload_document)
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)))
        .route("/seller/eligibility", get(routes::seller::get_eligibility))
        // Account deletion
        .route("/me/deletion", get(routes::deletion::get_deletion)
            .post(routes::deletion::request_deletion)
            .delete(routes::deletion::cancel_deletion))
        // Admin
        .route("/admin/users", get(routes::admin::list_users))
        .route("/admin/users/:id/role", put(routes::admin::update_user_role))
        .route("/admin/applications", get(routes::admin::list_applications))
        .route("/admin/applications/:id", put(routes::admin::update_application))
        .route("/admin/deletion-requests", get(routes::admin::list_deletion_requests))
        .route("/admin/deletion-requests/:id/approve", post(routes::admin::approve_deletion))
        .route("/admin/deletion-requests/:id/reject", post(routes::admin::reject_deletion))
        .layer(middleware::from_fn(vendra_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vendra-user starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
