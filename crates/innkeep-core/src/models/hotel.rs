//! Hotel model
//!
//! The property a booking belongs to. Carries the tax regime, the local
//! time offset used for every date-relative rule, and the cancellation policy.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cancellation::CancellationPolicy;

/// Hotel entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Currency code (ISO 4217) all prices are quoted in
    pub currency: String,

    /// Tax applied on the room total, in percent (13 = 13%)
    pub tax_percent: Decimal,

    /// Service charge applied on the room total, in percent
    pub service_charge_percent: Decimal,

    /// Offset of the hotel's local time from UTC, in minutes
    pub utc_offset_minutes: i32,

    /// Standard check-in time (local)
    pub check_in_time: NaiveTime,

    /// Standard check-out time (local)
    pub check_out_time: NaiveTime,

    /// Cancellation policy applied to new cancellations
    pub cancellation_policy: CancellationPolicy,
}

impl Hotel {
    /// The hotel's fixed UTC offset, falling back to UTC on an out-of-range value
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date at the hotel for a given instant
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    /// The instant a stay beginning on `date` starts
    pub fn check_in_instant(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_instant(date, self.check_in_time)
    }

    fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        let shift = Duration::seconds(self.offset().local_minus_utc() as i64);
        Utc.from_utc_datetime(&(local - shift))
    }
}

impl Default for Hotel {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            currency: "NPR".to_string(),
            tax_percent: Decimal::from(13),
            service_charge_percent: Decimal::from(10),
            utc_offset_minutes: 345,
            check_in_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
            check_out_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            cancellation_policy: CancellationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_instant_applies_offset() {
        let hotel = Hotel {
            utc_offset_minutes: 345,
            check_in_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();

        // 14:00 at +05:45 is 08:15 UTC
        let expected = Utc.with_ymd_and_hms(2026, 4, 10, 8, 15, 0).unwrap();
        assert_eq!(hotel.check_in_instant(date), expected);
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let hotel = Hotel {
            utc_offset_minutes: 345,
            ..Default::default()
        };

        // 20:00 UTC is already the next day in Kathmandu
        let at = Utc.with_ymd_and_hms(2026, 4, 10, 20, 0, 0).unwrap();
        assert_eq!(
            hotel.local_date(at),
            NaiveDate::from_ymd_opt(2026, 4, 11).unwrap()
        );
    }
}
