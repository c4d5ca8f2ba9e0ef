//! Redis-backed cache implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use super::{Cache, CacheError};

/// Cache over a shared Redis connection. `ConnectionManager` multiplexes and
/// reconnects internally, so clones are cheap handles onto one connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to the given Redis URL and verify the connection with a PING.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut manager = client.get_connection_manager().await?;
        let _: String = redis::cmd("PING").query_async(&mut manager).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut con = self.manager.clone();
        Ok(con.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.manager.clone();
        let () = con.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut con = self.manager.clone();
        let deleted: i64 = con.del(key).await?;
        Ok(deleted > 0)
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut con = self.manager.clone();
        let count: i64 = con.incr(key, 1).await?;
        // A fresh key has no expiry yet; later increments keep the window
        // opened by the first one.
        if count == 1 {
            let _: i64 = con.expire(key, ttl.as_secs() as i64).await?;
        }
        Ok(count)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut scan_con = self.manager.clone();
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = scan_con
                .scan_match::<_, String>(format!("{prefix}*"))
                .await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let mut con = self.manager.clone();
        let deleted: u64 = con.del(&keys).await?;
        Ok(deleted)
    }
}
