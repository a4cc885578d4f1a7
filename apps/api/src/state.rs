use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::ai_client::AiClient;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::persistence::ClientStore;
use crate::registration::submit::AuthGateway;
use crate::resume_match::chat::ChatRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Per-user UI state. Redis in production, in-memory in tests.
    pub store: Arc<dyn ClientStore>,
    pub s3: S3Client,
    pub ai: AiClient,
    pub backend: BackendClient,
    /// Auth endpoints used by the registration wizard. Swappable for tests.
    pub auth: Arc<dyn AuthGateway>,
    /// Live resume-match chats. Transcripts are also written to `store`.
    pub chats: ChatRegistry,
    pub config: Config,
}
