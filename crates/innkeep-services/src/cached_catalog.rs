//! Read-through cache in front of the catalog
//!
//! Hotels, room types, rates and discount codes change rarely and are read
//! on every search and booking. Entries live for `ttl_secs`; the engine
//! never writes the catalog, so nothing is invalidated here. Cache failures
//! are logged and the read falls through to the repository.

use async_trait::async_trait;
use innkeep_cache::keys;
use innkeep_core::{
    models::{DiscountCode, Hotel, RoomRate, RoomType},
    traits::{CacheService, CatalogRepository},
    AppResult,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Catalog repository decorated with a cache
pub struct CachedCatalog<C: CacheService> {
    inner: Arc<dyn CatalogRepository>,
    cache: Arc<C>,
    ttl_secs: u64,
}

impl<C: CacheService> CachedCatalog<C> {
    pub fn new(inner: Arc<dyn CatalogRepository>, cache: Arc<C>, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache,
            ttl_secs,
        }
    }

    async fn read<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        match self.cache.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache error for {}: {}", key, e);
                None
            }
        }
    }

    async fn write<T: Serialize + Send + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value, self.ttl_secs).await {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}

#[async_trait]
impl<C: CacheService + 'static> CatalogRepository for CachedCatalog<C> {
    #[instrument(skip(self))]
    async fn find_hotel(&self, hotel_id: Uuid) -> AppResult<Option<Hotel>> {
        let key = keys::hotel_key(hotel_id);
        if let Some(hotel) = self.read::<Hotel>(&key).await {
            return Ok(Some(hotel));
        }

        let hotel = self.inner.find_hotel(hotel_id).await?;
        if let Some(hotel) = &hotel {
            self.write(&key, hotel).await;
        }
        Ok(hotel)
    }

    #[instrument(skip(self))]
    async fn list_room_types(&self, hotel_id: Uuid) -> AppResult<Vec<RoomType>> {
        let key = keys::room_types_key(hotel_id);
        if let Some(room_types) = self.read::<Vec<RoomType>>(&key).await {
            return Ok(room_types);
        }

        let room_types = self.inner.list_room_types(hotel_id).await?;
        debug!("Loaded {} room types of hotel {}", room_types.len(), hotel_id);
        self.write(&key, &room_types).await;
        Ok(room_types)
    }

    #[instrument(skip(self))]
    async fn find_room_type(&self, room_type_id: Uuid) -> AppResult<Option<RoomType>> {
        let key = keys::room_type_key(room_type_id);
        if let Some(room_type) = self.read::<RoomType>(&key).await {
            return Ok(Some(room_type));
        }

        let room_type = self.inner.find_room_type(room_type_id).await?;
        if let Some(room_type) = &room_type {
            self.write(&key, room_type).await;
        }
        Ok(room_type)
    }

    #[instrument(skip(self))]
    async fn list_rates(&self, room_type_id: Uuid) -> AppResult<Vec<RoomRate>> {
        let key = keys::rates_key(room_type_id);
        if let Some(rates) = self.read::<Vec<RoomRate>>(&key).await {
            return Ok(rates);
        }

        let rates = self.inner.list_rates(room_type_id).await?;
        self.write(&key, &rates).await;
        Ok(rates)
    }

    #[instrument(skip(self))]
    async fn find_discount_code(
        &self,
        hotel_id: Uuid,
        code: &str,
    ) -> AppResult<Option<DiscountCode>> {
        let key = keys::discount_key(hotel_id, code);
        if let Some(discount) = self.read::<DiscountCode>(&key).await {
            return Ok(Some(discount));
        }

        // Unknown codes are not cached so a newly issued code works at once
        let discount = self.inner.find_discount_code(hotel_id, code).await?;
        if let Some(discount) = &discount {
            self.write(&key, discount).await;
        }
        Ok(discount)
    }
}
