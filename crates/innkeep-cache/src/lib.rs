//! Redis caching layer for Innkeep
//!
//! Provides a Redis-backed implementation of the `CacheService` trait from
//! innkeep-core, used to cache catalog reads, plus a pub/sub publisher that
//! hands housekeeping requests and guest notifications to other services.
//!
//! Catalog entries are JSON documents with a TTL. The engine never writes
//! the catalog, so entries are only refreshed by expiry.
//!
//! # Example
//!
//! ```no_run
//! use innkeep_cache::{keys, RedisCache};
//! use innkeep_core::{models::Hotel, traits::CacheService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = RedisCache::new("redis://127.0.0.1:6379").await?;
//!     let hotel = Hotel::default();
//!
//!     cache.set(&keys::hotel_key(hotel.id), &hotel, 300).await?;
//!     let cached: Option<Hotel> = cache.get(&keys::hotel_key(hotel.id)).await?;
//!     assert!(cached.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod keys;

pub use events::RedisEventPublisher;

use async_trait::async_trait;
use innkeep_core::error::AppError;
use innkeep_core::traits::CacheService;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

/// Redis cache backed by a multiplexed ConnectionManager
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns `AppError::CacheConnection` if the URL is invalid or the
    /// server cannot be reached.
    pub async fn new(url: &str) -> Result<Self, AppError> {
        debug!("Connecting to Redis at {}", url);

        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AppError::CacheConnection(format!("Invalid Redis URL: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to establish Redis connection: {}", e);
            AppError::CacheConnection(format!("Connection failed: {}", e))
        })?;

        debug!("Redis connection established");
        Ok(Self { manager })
    }

    /// Check connectivity
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    /// Publish a message on a pub/sub channel
    ///
    /// Returns the number of subscribers that received it.
    pub async fn publish(&self, channel: &str, message: &str) -> Result<i64, AppError> {
        debug!("PUBLISH {}", channel);
        let mut conn = self.manager.clone();

        let receivers: i64 = conn
            .publish(channel, message)
            .await
            .map_err(Self::map_redis_error)?;

        Ok(receivers)
    }

    #[cfg(test)]
    async fn flush_db(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    /// Convert RedisError to AppError
    fn map_redis_error(err: RedisError) -> AppError {
        match err.kind() {
            redis::ErrorKind::IoError => {
                error!("Redis I/O error: {}", err);
                AppError::CacheConnection(format!("I/O error: {}", err))
            }
            redis::ErrorKind::TypeError => {
                warn!("Redis type error: {}", err);
                AppError::Cache(format!("Type mismatch: {}", err))
            }
            _ => {
                error!("Redis error: {}", err);
                AppError::Cache(err.to_string())
            }
        }
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await.map_err(Self::map_redis_error)?;

        match raw {
            Some(json) => {
                let value = serde_json::from_str::<T>(&json).map_err(|e| {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    AppError::Serialization(format!("Deserialization failed: {}", e))
                })?;
                debug!("Cache HIT: {}", key);
                Ok(Some(value))
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError> {
        debug!("SET {} (TTL: {}s)", key, ttl_secs);
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Serialization(format!("Serialization failed: {}", e)))?;

        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(key, json, ttl_secs)
            .await
            .map_err(Self::map_redis_error)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        debug!("DEL {}", key);
        let mut conn = self.manager.clone();
        let deleted: i32 = conn.del(key).await.map_err(Self::map_redis_error)?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let exists: bool = conn.exists(key).await.map_err(Self::map_redis_error)?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::models::{Hotel, RoomRate};
    use uuid::Uuid;

    async fn setup_cache() -> RedisCache {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let cache = RedisCache::new(&url).await.expect("Failed to connect to Redis");
        cache.flush_db().await.expect("Failed to flush DB");
        cache
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_ping() {
        let cache = setup_cache().await;
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_hotel_roundtrip() {
        let cache = setup_cache().await;
        let hotel = Hotel {
            name: "Lakeside Inn".to_string(),
            ..Default::default()
        };
        let key = keys::hotel_key(hotel.id);

        cache.set(&key, &hotel, 60).await.unwrap();
        let cached: Option<Hotel> = cache.get(&key).await.unwrap();
        assert_eq!(cached.map(|h| h.name), Some("Lakeside Inn".to_string()));

        assert!(cache.delete(&key).await.unwrap());
        assert!(!cache.exists(&key).await.unwrap());
        assert!(!cache.delete(&key).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_rates_expire() {
        let cache = setup_cache().await;
        let key = keys::rates_key(Uuid::new_v4());

        cache.set(&key, &vec![RoomRate::default()], 1).await.unwrap();
        assert!(cache.exists(&key).await.unwrap());

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
        let cached: Option<Vec<RoomRate>> = cache.get(&key).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_publish_without_subscribers() {
        let cache = setup_cache().await;
        let receivers = cache.publish("innkeep:test", "{}").await.unwrap();
        assert_eq!(receivers, 0);
    }
}
