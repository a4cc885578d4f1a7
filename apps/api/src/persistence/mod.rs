//! Client persistence service.
//!
//! Small pieces of per-user UI state (auth token, cached parsed skills, the
//! selected video plan, watched set, panel width, chat fallbacks, in-flight
//! wizard and interview sessions) live behind one typed get/set/clear contract.
//!
//! `AppState` holds an `Arc<dyn ClientStore>`. `RedisStore` backs it in
//! production; `MemoryStore` backs tests and local runs without Redis.

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;

pub mod handlers;
pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

const NAMESPACE: &str = "hirepath";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// Every key the service persists. Rendered as `hirepath:<kind>:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AuthToken(String),
    ParsedSkills(String),
    SelectedVideoPlan(String),
    WatchedVideos(String),
    PanelWidth(String),
    ChatSession { user_id: String, context_id: String },
    RegistrationSession(String),
    InterviewSession(String),
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::AuthToken(user) => write!(f, "{NAMESPACE}:auth_token:{user}"),
            StoreKey::ParsedSkills(job) => write!(f, "{NAMESPACE}:parsed_skills:{job}"),
            StoreKey::SelectedVideoPlan(user) => {
                write!(f, "{NAMESPACE}:selected_video_plan:{user}")
            }
            StoreKey::WatchedVideos(user) => write!(f, "{NAMESPACE}:watched_videos:{user}"),
            StoreKey::PanelWidth(user) => write!(f, "{NAMESPACE}:panel_width:{user}"),
            StoreKey::ChatSession { user_id, context_id } => {
                write!(f, "{NAMESPACE}:chat_session:{user_id}:{context_id}")
            }
            StoreKey::RegistrationSession(id) => {
                write!(f, "{NAMESPACE}:registration_session:{id}")
            }
            StoreKey::InterviewSession(id) => write!(f, "{NAMESPACE}:interview_session:{id}"),
        }
    }
}

/// Raw string storage. Typed access goes through the helpers on `dyn ClientStore`.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn get_raw(&self, key: &StoreKey) -> Result<Option<String>, StoreError>;

    async fn set_raw(&self, key: &StoreKey, value: String) -> Result<(), StoreError>;

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError>;

    /// Round-trip to the backing service. In-process stores are always reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl dyn ClientStore {
    /// Reads and deserializes a value.
    ///
    /// A stored value that no longer deserializes is treated as absent so a
    /// stale shape never blocks the page that owns it.
    pub async fn get_json<T: DeserializeOwned + Send>(
        &self,
        key: &StoreKey,
    ) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable value under {key}: {e}");
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize + Sync + ?Sized>(
        &self,
        key: &StoreKey,
        value: &T,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw).await
    }

    pub async fn clear(&self, key: &StoreKey) -> Result<(), StoreError> {
        self.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_store_key_rendering() {
        assert_eq!(
            StoreKey::AuthToken("u1".into()).to_string(),
            "hirepath:auth_token:u1"
        );
        assert_eq!(
            StoreKey::ChatSession {
                user_id: "u1".into(),
                context_id: "abc".into()
            }
            .to_string(),
            "hirepath:chat_session:u1:abc"
        );
    }

    #[tokio::test]
    async fn test_typed_roundtrip_and_clear() {
        let store: Arc<dyn ClientStore> = Arc::new(MemoryStore::new());
        let key = StoreKey::WatchedVideos("u1".into());
        let watched: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();

        store.set_json(&key, &watched).await.unwrap();
        let loaded: Option<BTreeSet<String>> = store.get_json(&key).await.unwrap();
        assert_eq!(loaded, Some(watched));

        store.clear(&key).await.unwrap();
        let loaded: Option<BTreeSet<String>> = store.get_json(&key).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_value_reads_as_absent() {
        let store: Arc<dyn ClientStore> = Arc::new(MemoryStore::new());
        let key = StoreKey::PanelWidth("u1".into());
        store.set_raw(&key, "not json".to_string()).await.unwrap();

        let loaded: Option<u32> = store.get_json(&key).await.unwrap();
        assert!(loaded.is_none());
    }
}
