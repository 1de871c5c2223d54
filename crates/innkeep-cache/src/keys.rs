//! Cache key and channel builders for Innkeep
//!
//! Provides standardized key naming patterns for cached catalog entries and
//! pub/sub channels, keeping names consistent across instances.
//!
//! # Key Patterns
//!
//! - `hotel:{hotel_id}` - Hotel settings
//! - `room_types:{hotel_id}` - Active room types of a hotel
//! - `room_type:{room_type_id}` - A single room type
//! - `rates:{room_type_id}` - Rates of a room type
//! - `discount:{hotel_id}:{code}` - Discount code, code lowercased
//!
//! # Example
//!
//! ```
//! use innkeep_cache::keys;
//! use uuid::Uuid;
//!
//! let id = Uuid::nil();
//! assert_eq!(keys::hotel_key(id), format!("hotel:{}", id));
//! ```

use uuid::Uuid;

/// Prefix for cached hotels
pub const HOTEL_PREFIX: &str = "hotel";

/// Prefix for the active room type list of a hotel
pub const ROOM_TYPES_PREFIX: &str = "room_types";

/// Prefix for a single room type
pub const ROOM_TYPE_PREFIX: &str = "room_type";

/// Prefix for the rate list of a room type
pub const RATES_PREFIX: &str = "rates";

/// Prefix for discount codes
pub const DISCOUNT_PREFIX: &str = "discount";

/// Channel suffix for housekeeping requests
pub const HOUSEKEEPING_CHANNEL: &str = "housekeeping";

/// Channel suffix for guest notifications
pub const NOTIFICATIONS_CHANNEL: &str = "notifications";

pub fn hotel_key(hotel_id: Uuid) -> String {
    format!("{}:{}", HOTEL_PREFIX, hotel_id)
}

pub fn room_types_key(hotel_id: Uuid) -> String {
    format!("{}:{}", ROOM_TYPES_PREFIX, hotel_id)
}

pub fn room_type_key(room_type_id: Uuid) -> String {
    format!("{}:{}", ROOM_TYPE_PREFIX, room_type_id)
}

pub fn rates_key(room_type_id: Uuid) -> String {
    format!("{}:{}", RATES_PREFIX, room_type_id)
}

/// Discount codes are matched case-insensitively, so the key is lowercased
pub fn discount_key(hotel_id: Uuid, code: &str) -> String {
    format!("{}:{}:{}", DISCOUNT_PREFIX, hotel_id, code.trim().to_lowercase())
}

/// Full pub/sub channel name, e.g. `innkeep:events:housekeeping`
pub fn channel(prefix: &str, name: &str) -> String {
    format!("{}:{}", prefix.trim_end_matches(':'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_keys() {
        let id = Uuid::nil();
        assert_eq!(
            room_types_key(id),
            "room_types:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            rates_key(id),
            "rates:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_discount_key_normalized() {
        let id = Uuid::nil();
        assert_eq!(discount_key(id, " Monsoon10 "), discount_key(id, "MONSOON10"));
    }

    #[test]
    fn test_channel() {
        assert_eq!(channel("innkeep:events", HOUSEKEEPING_CHANNEL), "innkeep:events:housekeeping");
        assert_eq!(channel("innkeep:events:", NOTIFICATIONS_CHANNEL), "innkeep:events:notifications");
    }
}
