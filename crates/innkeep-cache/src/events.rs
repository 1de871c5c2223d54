//! Redis pub/sub event publisher
//!
//! Delivers housekeeping requests and guest notifications to whichever
//! services subscribe to the channels. Publishing is at-most-once: a message
//! with no subscriber is dropped.

use async_trait::async_trait;
use innkeep_core::error::AppError;
use innkeep_core::traits::{BookingEvent, BookingNotifier, CleaningRequest, HousekeepingNotifier};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::keys;
use crate::RedisCache;

/// Envelope put on the wire
#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a T,
}

/// Publishes engine events on Redis channels
#[derive(Clone)]
pub struct RedisEventPublisher {
    cache: RedisCache,
    housekeeping_channel: String,
    notifications_channel: String,
}

impl RedisEventPublisher {
    /// Create a publisher using channels under `channel_prefix`
    pub fn new(cache: RedisCache, channel_prefix: &str) -> Self {
        Self {
            cache,
            housekeeping_channel: keys::channel(channel_prefix, keys::HOUSEKEEPING_CHANNEL),
            notifications_channel: keys::channel(channel_prefix, keys::NOTIFICATIONS_CHANNEL),
        }
    }

    async fn publish<T: Serialize + Sync>(
        &self,
        channel: &str,
        kind: &str,
        payload: &T,
    ) -> Result<(), AppError> {
        let message = encode(kind, payload)?;
        let receivers = self.cache.publish(channel, &message).await?;
        debug!("Published {} to {} ({} receivers)", kind, channel, receivers);
        Ok(())
    }
}

fn encode<T: Serialize>(kind: &str, payload: &T) -> Result<String, AppError> {
    serde_json::to_string(&Envelope { kind, payload })
        .map_err(|e| AppError::Serialization(format!("Failed to encode {} event: {}", kind, e)))
}

#[async_trait]
impl HousekeepingNotifier for RedisEventPublisher {
    #[instrument(skip(self, request), fields(booking_number = %request.booking_number))]
    async fn rooms_need_cleaning(&self, request: &CleaningRequest) -> Result<(), AppError> {
        self.publish(&self.housekeeping_channel, "rooms_need_cleaning", request)
            .await
    }
}

#[async_trait]
impl BookingNotifier for RedisEventPublisher {
    #[instrument(skip(self, event), fields(booking_number = %event.booking_number))]
    async fn notify(&self, event: &BookingEvent) -> Result<(), AppError> {
        let kind = match event.kind {
            innkeep_core::traits::BookingEventKind::Confirmed => "booking_confirmed",
            innkeep_core::traits::BookingEventKind::Cancelled => "booking_cancelled",
        };
        self.publish(&self.notifications_channel, kind, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_envelope_shape() {
        let request = CleaningRequest {
            hotel_id: Uuid::nil(),
            room_type_id: Uuid::nil(),
            room_type_name: "Deluxe".to_string(),
            quantity: 2,
            room_numbers: vec!["204".to_string()],
            booking_number: "BK-260501-ABCD1234".to_string(),
            requested_at: Utc::now(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&encode("rooms_need_cleaning", &request).unwrap()).unwrap();
        assert_eq!(json["type"], "rooms_need_cleaning");
        assert_eq!(json["payload"]["quantity"], 2);
        assert_eq!(json["payload"]["room_numbers"][0], "204");
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_publish_cleaning_request() {
        let cache = RedisCache::new("redis://127.0.0.1:6379").await.unwrap();
        let publisher = RedisEventPublisher::new(cache, "innkeep:test");

        let request = CleaningRequest {
            hotel_id: Uuid::new_v4(),
            room_type_id: Uuid::new_v4(),
            room_type_name: "Standard".to_string(),
            quantity: 1,
            room_numbers: Vec::new(),
            booking_number: "BK-260501-TEST0001".to_string(),
            requested_at: Utc::now(),
        };
        assert!(publisher.rooms_need_cleaning(&request).await.is_ok());
    }
}
