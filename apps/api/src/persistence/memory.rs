use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ClientStore, StoreError, StoreKey};

/// In-process store. Values never expire.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn get_raw(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(&key.to_string()).cloned())
    }

    async fn set_raw(&self, key: &StoreKey, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        self.entries.write().await.remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_are_isolated_per_user() {
        let store = MemoryStore::new();
        store
            .set_raw(&StoreKey::AuthToken("a".into()), "t-a".into())
            .await
            .unwrap();

        assert_eq!(
            store.get_raw(&StoreKey::AuthToken("a".into())).await.unwrap(),
            Some("t-a".to_string())
        );
        assert_eq!(
            store.get_raw(&StoreKey::AuthToken("b".into())).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store
            .delete(&StoreKey::ParsedSkills("job".into()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_is_always_reachable() {
        assert!(MemoryStore::new().ping().await.is_ok());
    }
}
