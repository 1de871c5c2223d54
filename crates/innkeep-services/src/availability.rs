//! Availability resolver
//!
//! Finds the room types of a hotel that can host a party for every night of
//! a stay, with the rates that apply to those nights. A room type that is
//! free on some nights but not others is left out.

use chrono::NaiveDate;
use futures::future::try_join_all;
use innkeep_core::{
    models::{nights_between, stay_dates, RoomRate, RoomType},
    traits::{CatalogRepository, InventoryStore},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::constants::MAX_STAY_NIGHTS;

/// Search parameters
#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub hotel_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    /// Rooms wanted of one type (defaults to 1)
    pub rooms: Option<i32>,
}

impl AvailabilityQuery {
    fn rooms_wanted(&self) -> i32 {
        self.rooms.unwrap_or(1)
    }

    fn party_size(&self) -> i32 {
        self.adults + self.children
    }
}

/// One available room type
#[derive(Debug, Clone, Serialize)]
pub struct RoomAvailability {
    pub room_type: RoomType,

    /// Rooms free on every night of the stay
    pub available_rooms: i32,

    pub nights: i64,

    /// Active rates covering every night, regardless of stay length limits
    pub applicable_rates: Vec<RoomRate>,

    /// Cheapest applicable rate whose min/max stay admits the stay
    pub lowest_nightly_rate: Option<Decimal>,
    pub lowest_rate_id: Option<Uuid>,
}

/// Availability resolver
pub struct AvailabilityResolver {
    catalog: Arc<dyn CatalogRepository>,
    inventory: Arc<dyn InventoryStore>,
}

impl AvailabilityResolver {
    /// Create a new availability resolver
    pub fn new(catalog: Arc<dyn CatalogRepository>, inventory: Arc<dyn InventoryStore>) -> Self {
        Self { catalog, inventory }
    }

    /// Search free inventory for a stay
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `check_out <= check_in` (`InvalidDateRange`)
    /// - the party or room count is out of range (`Validation`)
    /// - the hotel does not exist (`HotelNotFound`)
    ///
    /// No matching capacity is an empty result, not an error.
    #[instrument(skip(self), fields(hotel_id = %query.hotel_id))]
    pub async fn search(&self, query: &AvailabilityQuery) -> AppResult<Vec<RoomAvailability>> {
        let nights = nights_between(query.check_in, query.check_out)?;
        validate_query(query, nights)?;

        self.catalog
            .find_hotel(query.hotel_id)
            .await?
            .ok_or_else(|| AppError::HotelNotFound(query.hotel_id.to_string()))?;

        let dates = stay_dates(query.check_in, query.check_out);
        let candidates: Vec<RoomType> = self
            .catalog
            .list_room_types(query.hotel_id)
            .await?
            .into_iter()
            .filter(|rt| rt.is_active && rt.fits_party(query.party_size(), query.rooms_wanted()))
            .collect();

        debug!(
            "{} room types fit a party of {} in {} rooms",
            candidates.len(),
            query.party_size(),
            query.rooms_wanted()
        );

        let results = try_join_all(
            candidates
                .into_iter()
                .map(|room_type| self.evaluate(room_type, &dates, nights, query.rooms_wanted())),
        )
        .await?;

        let available: Vec<RoomAvailability> = results.into_iter().flatten().collect();
        debug!(
            "{} room types available {} to {}",
            available.len(),
            query.check_in,
            query.check_out
        );

        Ok(available)
    }

    /// Free rooms across every night of the stay
    pub async fn free_rooms(&self, room_type: &RoomType, dates: &[NaiveDate]) -> AppResult<i32> {
        let daily = self
            .inventory
            .daily_inventory(room_type.id, room_type.total_rooms, dates)
            .await?;

        Ok(daily.iter().map(|d| d.available()).min().unwrap_or(0))
    }

    async fn evaluate(
        &self,
        room_type: RoomType,
        dates: &[NaiveDate],
        nights: i64,
        rooms_wanted: i32,
    ) -> AppResult<Option<RoomAvailability>> {
        let available_rooms = self.free_rooms(&room_type, dates).await?;
        if available_rooms < rooms_wanted.max(1) {
            debug!(
                "{}: {} free, {} wanted",
                room_type.name, available_rooms, rooms_wanted
            );
            return Ok(None);
        }

        let applicable_rates: Vec<RoomRate> = self
            .catalog
            .list_rates(room_type.id)
            .await?
            .into_iter()
            .filter(|rate| rate.applies_to_stay(dates))
            .collect();

        let lowest = applicable_rates
            .iter()
            .filter(|rate| rate.admits_stay_length(nights))
            .min_by(|a, b| a.price.cmp(&b.price));

        Ok(Some(RoomAvailability {
            lowest_nightly_rate: lowest.map(|rate| rate.price),
            lowest_rate_id: lowest.map(|rate| rate.id),
            room_type,
            available_rooms,
            nights,
            applicable_rates,
        }))
    }
}

fn validate_query(query: &AvailabilityQuery, nights: i64) -> AppResult<()> {
    if query.adults < 1 {
        return Err(AppError::Validation("at least one adult is required".to_string()));
    }
    if query.children < 0 {
        return Err(AppError::Validation("children must not be negative".to_string()));
    }
    if query.rooms_wanted() < 1 {
        return Err(AppError::Validation("rooms must be at least 1".to_string()));
    }
    if nights > MAX_STAY_NIGHTS {
        return Err(AppError::Validation(format!(
            "stays are limited to {} nights",
            MAX_STAY_NIGHTS
        )));
    }
    Ok(())
}
