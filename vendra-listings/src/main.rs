use axum::{extract::DefaultBodyLimit, middleware, routing::{get, post}, Router};
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
use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::clients::redis::RedisClient;
use vendra_shared::clients::storage::StorageClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub storage: StorageClient,
    pub metrics: PrometheusHandle,
}

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vendra_shared::middleware::init_tracing("vendra-listings");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = vendra_shared::middleware::init_metrics()?;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let storage = StorageClient::new(
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_public_url,
    )
    .await;

    let state = Arc::new(AppState { db, config, rabbitmq, redis, storage, metrics });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Properties
        .route("/properties", get(routes::properties::list_properties).post(routes::properties::create_property))
        .route("/properties/images", post(routes::uploads::upload_property_images)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .route("/properties/:id", get(routes::properties::get_property)
            .patch(routes::properties::update_property)
            .delete(routes::properties::delete_property))
        .route("/users/:id/properties", get(routes::properties::list_user_properties))
        // Projects
        .route("/projects", get(routes::projects::list_projects).post(routes::projects::create_project))
        .route("/projects/images", post(routes::uploads::upload_project_images)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .route("/projects/plans", post(routes::uploads::upload_project_plans)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .route("/projects/:id", get(routes::projects::get_project)
            .patch(routes::projects::update_project)
            .delete(routes::projects::delete_project))
        .route("/projects/:id/views", post(routes::projects::increment_project_views))
        .route("/users/:id/projects", get(routes::projects::list_user_projects))
        // Favorites
        .route("/favorites", get(routes::favorites::list_favorites))
        .route("/favorites/:property_id", post(routes::favorites::add_favorite)
            .delete(routes::favorites::remove_favorite))
        // Admin
        .route("/admin/properties", get(routes::admin::list_all_properties))
        .layer(middleware::from_fn(vendra_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vendra-listings starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
