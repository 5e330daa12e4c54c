use std::time::Duration;

use api_subs::SubscriptionCache;
use common::error::{AppError, Res};
use deadpool_redis::{Connection, Pool, Runtime};
use redis::AsyncCommands;

/// Cache shared between processes through Redis.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        RedisCache { pool }
    }

    pub fn connect(redis_url: &str) -> Res<Self> {
        let cfg = deadpool_redis::Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::Cache(format!("Failed to create Redis pool: {}", e)))?;
        Ok(RedisCache::new(pool))
    }

    async fn connection(&self) -> Res<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to get Redis connection: {}", e)))
    }
}

impl SubscriptionCache for RedisCache {
    async fn get(&self, key: &str) -> Res<Option<bool>> {
        let mut conn = self.connection().await?;
        let value: Option<bool> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: bool, timeout: Option<Duration>) -> Res<()> {
        let mut conn = self.connection().await?;
        match timeout {
            // redis rejects an expiry of zero seconds
            Some(timeout) => {
                let seconds = timeout.as_secs().max(1);
                let _: () = conn.set_ex(key, value, seconds).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }
}
