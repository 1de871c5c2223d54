//! Room type, room rate and discount code models
//!
//! The catalog side of the engine. Rates are priced offers for a room type
//! and are resolved per stay: a rate applies only if it covers every night.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Room type entity
///
/// A category of room sharing capacity and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    /// Unique identifier
    pub id: Uuid,

    /// Owning hotel
    pub hotel_id: Uuid,

    /// Display name (e.g. "Deluxe Suite")
    pub name: String,

    /// Maximum guests per room
    pub max_occupancy: i32,

    /// Bed configuration (e.g. "1 King", "2 Twin")
    pub bed_configuration: String,

    /// Rack rate per night
    pub base_price: Decimal,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Physical rooms of this type
    pub total_rooms: i32,

    /// Rooms currently ready to be handed out
    pub available_rooms: i32,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomType {
    /// Whether `rooms` rooms of this type can hold the party
    #[inline]
    pub fn fits_party(&self, guests: i32, rooms: i32) -> bool {
        self.max_occupancy.max(0) as i64 * rooms.max(0) as i64 >= guests as i64
    }
}

impl Default for RoomType {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id: Uuid::nil(),
            name: String::new(),
            max_occupancy: 2,
            bed_configuration: String::new(),
            base_price: Decimal::ZERO,
            currency: "NPR".to_string(),
            total_rooms: 0,
            available_rooms: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// Rate type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    #[default]
    Standard,
    Weekend,
    Seasonal,
    Promotional,
    Corporate,
    Package,
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateType::Standard => write!(f, "standard"),
            RateType::Weekend => write!(f, "weekend"),
            RateType::Seasonal => write!(f, "seasonal"),
            RateType::Promotional => write!(f, "promotional"),
            RateType::Corporate => write!(f, "corporate"),
            RateType::Package => write!(f, "package"),
        }
    }
}

impl RateType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(RateType::Standard),
            "weekend" => Some(RateType::Weekend),
            "seasonal" => Some(RateType::Seasonal),
            "promotional" => Some(RateType::Promotional),
            "corporate" => Some(RateType::Corporate),
            "package" => Some(RateType::Package),
            _ => None,
        }
    }
}

/// Room rate entity
///
/// A priced nightly offer for a room type under specific conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRate {
    /// Unique identifier
    pub id: Uuid,

    /// Room type this rate prices
    pub room_type_id: Uuid,

    /// Rate name/description
    pub name: String,

    pub rate_type: RateType,

    /// Price per room per night
    pub price: Decimal,

    /// First stay date the rate covers (None = open)
    pub valid_from: Option<NaiveDate>,

    /// Last stay date the rate covers, inclusive (None = open)
    pub valid_to: Option<NaiveDate>,

    /// Weekdays the rate covers (empty = every day)
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,

    pub min_stay: Option<i32>,
    pub max_stay: Option<i32>,

    pub is_active: bool,
}

impl RoomRate {
    /// Check whether the rate covers a single stay date
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        let after_start = self.valid_from.map_or(true, |from| date >= from);
        let before_end = self.valid_to.map_or(true, |to| date <= to);
        let on_weekday =
            self.days_of_week.is_empty() || self.days_of_week.contains(&date.weekday());

        after_start && before_end && on_weekday
    }

    /// Check whether the rate is active and covers every night of a stay
    pub fn applies_to_stay(&self, nights: &[NaiveDate]) -> bool {
        self.is_active && !nights.is_empty() && nights.iter().all(|d| self.covers_date(*d))
    }

    /// Check whether a stay length satisfies the rate's min/max stay
    pub fn admits_stay_length(&self, nights: i64) -> bool {
        self.min_stay.map_or(true, |min| nights >= min as i64)
            && self.max_stay.map_or(true, |max| nights <= max as i64)
    }
}

impl Default for RoomRate {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            room_type_id: Uuid::nil(),
            name: String::new(),
            rate_type: RateType::Standard,
            price: Decimal::ZERO,
            valid_from: None,
            valid_to: None,
            days_of_week: Vec::new(),
            min_stay: None,
            max_stay: None,
            is_active: true,
        }
    }
}

/// Discount kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Fixed amount off
    Flat,
    /// Percentage of the pre-extras subtotal
    Percentage,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Flat => write!(f, "flat"),
            DiscountKind::Percentage => write!(f, "percentage"),
        }
    }
}

impl DiscountKind {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Some(DiscountKind::Flat),
            "percentage" | "percent" => Some(DiscountKind::Percentage),
            _ => None,
        }
    }
}

/// Discount code entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub code: String,
    pub kind: DiscountKind,

    /// Amount off (flat) or percent off (percentage)
    pub value: Decimal,

    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub min_nights: Option<i32>,
    pub is_active: bool,
}

impl DiscountCode {
    /// Whether the code can be redeemed for a stay starting on `check_in`
    pub fn is_redeemable(&self, check_in: NaiveDate, nights: i64) -> bool {
        self.is_active
            && self.valid_from.map_or(true, |from| check_in >= from)
            && self.valid_to.map_or(true, |to| check_in <= to)
            && self.min_nights.map_or(true, |min| nights >= min as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rate_window() {
        let rate = RoomRate {
            price: dec!(9000),
            valid_from: Some(date(2026, 5, 1)),
            valid_to: Some(date(2026, 5, 31)),
            ..Default::default()
        };

        assert!(rate.covers_date(date(2026, 5, 1)));
        assert!(rate.covers_date(date(2026, 5, 31)));
        assert!(!rate.covers_date(date(2026, 6, 1)));
        assert!(!rate.applies_to_stay(&[date(2026, 5, 30), date(2026, 5, 31), date(2026, 6, 1)]));
    }

    #[test]
    fn test_rate_days_of_week() {
        // 2026-05-01 is a Friday
        let weekend = RoomRate {
            rate_type: RateType::Weekend,
            days_of_week: vec![Weekday::Fri, Weekday::Sat],
            ..Default::default()
        };

        assert!(weekend.applies_to_stay(&[date(2026, 5, 1), date(2026, 5, 2)]));
        assert!(!weekend.applies_to_stay(&[date(2026, 5, 2), date(2026, 5, 3)]));
    }

    #[test]
    fn test_inactive_rate_never_applies() {
        let rate = RoomRate {
            is_active: false,
            ..Default::default()
        };
        assert!(!rate.applies_to_stay(&[date(2026, 5, 1)]));
    }

    #[test]
    fn test_stay_length_bounds() {
        let rate = RoomRate {
            min_stay: Some(2),
            max_stay: Some(7),
            ..Default::default()
        };

        assert!(!rate.admits_stay_length(1));
        assert!(rate.admits_stay_length(2));
        assert!(rate.admits_stay_length(7));
        assert!(!rate.admits_stay_length(8));
    }

    #[test]
    fn test_fits_party() {
        let room_type = RoomType {
            max_occupancy: 2,
            ..Default::default()
        };

        assert!(room_type.fits_party(2, 1));
        assert!(!room_type.fits_party(3, 1));
        assert!(room_type.fits_party(3, 2));
    }

    #[test]
    fn test_discount_redeemable() {
        let code = DiscountCode {
            id: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
            code: "MONSOON".to_string(),
            kind: DiscountKind::Percentage,
            value: dec!(10),
            valid_from: Some(date(2026, 6, 1)),
            valid_to: Some(date(2026, 8, 31)),
            min_nights: Some(2),
            is_active: true,
        };

        assert!(code.is_redeemable(date(2026, 7, 1), 2));
        assert!(!code.is_redeemable(date(2026, 7, 1), 1));
        assert!(!code.is_redeemable(date(2026, 9, 1), 3));
    }
}
