mod ai_client;
mod backend;
mod config;
mod db;
mod errors;
mod interview;
mod models;
mod persistence;
mod prep_plan;
mod registration;
mod resume_match;
mod routes;
mod shortlist;
mod state;
mod video_plan;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::persistence::RedisStore;
use crate::registration::submit::HttpAuthGateway;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        "Starting Hirepath API v{} (dev mode: {})",
        env!("CARGO_PKG_VERSION"),
        config.dev_mode
    );

    let state = build_state(config).await?;
    let addr: SocketAddr = format!("0.0.0.0:{}", state.config.port).parse()?;

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), config.rust_log))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connects every backing service. The Postgres migrations run here too.
async fn build_state(config: Config) -> Result<AppState> {
    let db = db::create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.as_str())?;
    let store = Arc::new(RedisStore::connect(redis, Some(config.store_ttl_secs)).await?);
    info!("Client store ready (ttl {}s)", config.store_ttl_secs);

    let s3 = build_s3_client(&config).await;
    info!("S3 client ready (bucket {})", config.s3_bucket);

    let ai = AiClient::new(config.ai_backend_url.clone())?;
    let backend = BackendClient::new(config.app_backend_url.clone())?;
    info!(
        "Upstreams: ai={} backend={}",
        config.ai_backend_url, config.app_backend_url
    );

    Ok(AppState {
        db,
        store,
        s3,
        ai,
        auth: Arc::new(HttpAuthGateway::new(backend.clone())),
        backend,
        chats: Arc::new(Mutex::new(HashMap::new())),
        config,
    })
}

/// S3 client with static credentials. `S3_ENDPOINT` points at MinIO locally.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hirepath-static",
    );

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&shared)
}
