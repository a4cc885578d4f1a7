use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use super::{ClientStore, StoreError, StoreKey};

/// Redis-backed store. Every write refreshes the key's TTL when one is set.
///
/// One multiplexed connection is shared by every request and reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    ttl_secs: Option<u64>,
}

impl RedisStore {
    pub async fn connect(client: redis::Client, ttl_secs: Option<u64>) -> Result<Self, StoreError> {
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            ttl_secs: ttl_secs.filter(|ttl| *ttl > 0),
        })
    }
}

#[async_trait]
impl ClientStore for RedisStore {
    async fn get_raw(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &StoreKey, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match self.ttl_secs {
            Some(ttl) => conn.set_ex::<_, _, ()>(key.to_string(), value, ttl).await?,
            None => conn.set::<_, _, ()>(key.to_string(), value).await?,
        }
        debug!("Stored {key}");
        Ok(())
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key.to_string()).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_fails_without_a_server() {
        let client = redis::Client::open("redis://127.0.0.1:9").unwrap();
        assert!(matches!(
            RedisStore::connect(client, Some(60)).await,
            Err(StoreError::Redis(_))
        ));
    }
}
