//! Availability search DTOs

use chrono::NaiveDate;
use innkeep_services::AvailabilityQuery;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Query string of an availability search
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AvailabilityParams {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,

    #[serde(default = "default_adults")]
    #[validate(range(min = 1, max = 100))]
    pub adults: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub children: i32,

    /// Rooms the party wants; 1 when omitted
    #[validate(range(min = 1, max = 50))]
    pub rooms: Option<i32>,
}

fn default_adults() -> i32 {
    1
}

impl AvailabilityParams {
    pub fn to_query(&self, hotel_id: Uuid) -> AvailabilityQuery {
        AvailabilityQuery {
            hotel_id,
            check_in: self.check_in,
            check_out: self.check_out,
            adults: self.adults,
            children: self.children,
            rooms: self.rooms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_query_string() {
        let params: AvailabilityParams = serde_json::from_value(serde_json::json!({
            "check_in": "2026-05-10",
            "check_out": "2026-05-12"
        }))
        .unwrap();
        assert_eq!(params.adults, 1);
        assert_eq!(params.children, 0);

        let query = params.to_query(Uuid::nil());
        assert_eq!(query.rooms, None);
        assert_eq!(query.hotel_id, Uuid::nil());
    }
}
