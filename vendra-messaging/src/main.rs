use axum::{middleware, routing::{get, post}, Router};
use socketioxide::SocketIo;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod services;
mod socket;

use config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use vendra_shared::clients::db::{create_pool, DbPool};
use vendra_shared::clients::internal::InternalClient;
use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::middleware::InternalTokenSource;
use vendra_shared::clients::redis::RedisClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub io: SocketIo,
    pub moderation: InternalClient,
    pub metrics: PrometheusHandle,
}

impl InternalTokenSource for AppState {
    fn internal_token(&self) -> &str {
        &self.config.internal_token
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vendra_shared::middleware::init_tracing("vendra-messaging");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = vendra_shared::middleware::init_metrics()?;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let moderation = InternalClient::new(reqwest::Client::new(), &config.moderation_url, &config.internal_token);

    // REST handlers emit through the same io handle the socket layer serves.
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState { db, config, rabbitmq, redis, io: io.clone(), moderation, metrics });

    io.ns("/", {
        let state = state.clone();
        move |socket: socketioxide::extract::SocketRef| {
            let state = state.clone();
            async move {
                socket::handlers::on_connect_with_state(socket, state).await;
            }
        }
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_account_deleted(sub_state).await {
            tracing::error!(error = %e, "account.deleted subscriber failed");
        }
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Threads
        .route("/conversations", get(routes::conversations::list_conversations))
        .route("/conversations/with/:other_id/messages", get(routes::conversations::get_thread)
            .post(routes::conversations::send_message))
        .route("/conversations/with/:other_id/read", post(routes::conversations::mark_read))
        .route("/unread-count", get(routes::conversations::get_unread_count))
        // Blocks
        .route("/blocks", get(routes::blocks::list_blocked))
        .route("/blocks/:other_id", post(routes::blocks::block_user).delete(routes::blocks::unblock_user))
        .route("/blocks/:other_id/status", get(routes::blocks::block_status))
        // Support cases
        .route("/admin/messages", get(routes::admin::list_support_conversations))
        .route("/admin/conversations/:id/messages", get(routes::admin::get_conversation_messages))
        .route("/admin/conversations/:id/close", post(routes::admin::close_case))
        .route("/admin/conversations/:id/reopen", post(routes::admin::reopen_case))
        .route("/admin/conversations/:id/escalate", post(routes::admin::escalate_to_report))
        // Service-to-service
        .route("/internal/blocks", post(routes::blocks::internal_block))
        .layer(sio_layer)
        .layer(middleware::from_fn(vendra_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vendra-messaging starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
