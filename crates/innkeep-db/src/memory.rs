//! In-memory stores
//!
//! Process-local implementations of the catalog, inventory and booking
//! traits, guarded by `parking_lot` locks. Every inventory operation runs
//! under a single mutex, so holds are atomic within one process. Used by
//! tests and for running a single node without PostgreSQL.

use async_trait::async_trait;
use chrono::NaiveDate;
use innkeep_core::{
    models::{Booking, DailyInventory, DiscountCode, Hotel, InventoryHold, RoomOccupancy, RoomRate, RoomType},
    traits::{BookingFilter, BookingRepository, CatalogRepository, InventoryStore, OccupancyChange},
    AppError, AppResult,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::repositories::inventory_store::hold_lines;

/// In-memory catalog
#[derive(Default)]
pub struct MemoryCatalog {
    hotels: RwLock<HashMap<Uuid, Hotel>>,
    room_types: RwLock<HashMap<Uuid, RoomType>>,
    rates: RwLock<HashMap<Uuid, Vec<RoomRate>>>,
    discount_codes: RwLock<Vec<DiscountCode>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_hotel(&self, hotel: Hotel) {
        self.hotels.write().insert(hotel.id, hotel);
    }

    pub fn upsert_room_type(&self, room_type: RoomType) {
        self.room_types.write().insert(room_type.id, room_type);
    }

    /// Add a rate, replacing any rate with the same id
    pub fn upsert_rate(&self, rate: RoomRate) {
        let mut rates = self.rates.write();
        let list = rates.entry(rate.room_type_id).or_default();
        list.retain(|r| r.id != rate.id);
        list.push(rate);
    }

    pub fn upsert_discount_code(&self, code: DiscountCode) {
        let mut codes = self.discount_codes.write();
        codes.retain(|c| c.id != code.id);
        codes.push(code);
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn find_hotel(&self, hotel_id: Uuid) -> AppResult<Option<Hotel>> {
        Ok(self.hotels.read().get(&hotel_id).cloned())
    }

    async fn list_room_types(&self, hotel_id: Uuid) -> AppResult<Vec<RoomType>> {
        let mut types: Vec<RoomType> = self
            .room_types
            .read()
            .values()
            .filter(|rt| rt.hotel_id == hotel_id && rt.is_active)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.base_price.cmp(&b.base_price).then_with(|| a.name.cmp(&b.name)));
        Ok(types)
    }

    async fn find_room_type(&self, room_type_id: Uuid) -> AppResult<Option<RoomType>> {
        Ok(self.room_types.read().get(&room_type_id).cloned())
    }

    async fn list_rates(&self, room_type_id: Uuid) -> AppResult<Vec<RoomRate>> {
        Ok(self
            .rates
            .read()
            .get(&room_type_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_discount_code(&self, hotel_id: Uuid, code: &str) -> AppResult<Option<DiscountCode>> {
        let code = code.trim();
        Ok(self
            .discount_codes
            .read()
            .iter()
            .find(|c| c.hotel_id == hotel_id && c.code.eq_ignore_ascii_case(code))
            .cloned())
    }
}

#[derive(Default)]
struct InventoryState {
    days: HashMap<(Uuid, NaiveDate), DailyInventory>,
    occupancy: HashMap<Uuid, RoomOccupancy>,
    /// Holds that fail with a concurrency conflict before touching counters
    injected_conflicts: u32,
}

/// In-memory inventory store
#[derive(Default)]
pub struct MemoryInventoryStore {
    state: Mutex<InventoryState>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` holds fail with `ConcurrencyConflict`
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().injected_conflicts = count;
    }

    /// Allocated rooms of a room type on a date
    pub fn allocated(&self, room_type_id: Uuid, date: NaiveDate) -> i32 {
        self.state
            .lock()
            .days
            .get(&(room_type_id, date))
            .map_or(0, |d| d.allocated)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn daily_inventory(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        dates: &[NaiveDate],
    ) -> AppResult<Vec<DailyInventory>> {
        let state = self.state.lock();
        Ok(dates
            .iter()
            .map(|date| {
                state
                    .days
                    .get(&(room_type_id, *date))
                    .copied()
                    .unwrap_or(DailyInventory {
                        room_type_id,
                        date: *date,
                        total_rooms,
                        allocated: 0,
                    })
            })
            .collect())
    }

    async fn hold(&self, holds: &[InventoryHold]) -> AppResult<()> {
        let lines = hold_lines(holds);
        let mut state = self.state.lock();

        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(AppError::ConcurrencyConflict(
                "inventory rows locked by another writer".to_string(),
            ));
        }

        // Check every line before allocating any
        for ((room_type_id, date), line) in &lines {
            let day = state.days.get(&(*room_type_id, *date));
            let free = day.map_or(line.total_rooms, |d| d.available());
            if line.quantity > free {
                return Err(AppError::InventoryUnavailable(format!(
                    "room type {} has {} of {} rooms free on {}",
                    room_type_id, free, line.quantity, date
                )));
            }
        }

        for ((room_type_id, date), line) in lines {
            let day = state
                .days
                .entry((room_type_id, date))
                .or_insert(DailyInventory {
                    room_type_id,
                    date,
                    total_rooms: line.total_rooms,
                    allocated: 0,
                });
            day.allocated += line.quantity;
        }
        debug!("Held inventory for {} room types", holds.len());
        Ok(())
    }

    async fn release(&self, holds: &[InventoryHold]) -> AppResult<()> {
        let lines = hold_lines(holds);
        let mut state = self.state.lock();

        for (key, line) in lines {
            if let Some(day) = state.days.get_mut(&key) {
                day.allocated = (day.allocated - line.quantity).max(0);
            }
        }
        Ok(())
    }

    async fn occupancy(&self, room_type_id: Uuid, total_rooms: i32) -> AppResult<RoomOccupancy> {
        Ok(self
            .state
            .lock()
            .occupancy
            .get(&room_type_id)
            .copied()
            .unwrap_or_else(|| RoomOccupancy::new(room_type_id, total_rooms)))
    }

    async fn update_occupancy(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        change: OccupancyChange,
        quantity: i32,
    ) -> AppResult<RoomOccupancy> {
        let mut state = self.state.lock();
        let mut occupancy = state
            .occupancy
            .get(&room_type_id)
            .copied()
            .unwrap_or_else(|| RoomOccupancy::new(room_type_id, total_rooms));

        match change {
            OccupancyChange::Occupy => occupancy.occupy(quantity)?,
            OccupancyChange::Unoccupy => occupancy.unoccupy(quantity),
            OccupancyChange::Vacate => occupancy.vacate(quantity),
            OccupancyChange::MarkClean => occupancy.mark_clean(quantity)?,
        }

        state.occupancy.insert(room_type_id, occupancy);
        Ok(occupancy)
    }
}

/// In-memory booking repository
#[derive(Default)]
pub struct MemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.read().is_empty()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> AppResult<Booking> {
        let mut bookings = self.bookings.write();

        if let Some(key) = &booking.idempotency_key {
            let duplicate = bookings
                .values()
                .any(|b| b.hotel_id == booking.hotel_id && b.idempotency_key.as_ref() == Some(key));
            if duplicate {
                return Err(AppError::AlreadyExists(format!(
                    "booking with idempotency key {}",
                    key
                )));
            }
        }
        if bookings
            .values()
            .any(|b| b.booking_number == booking.booking_number)
        {
            return Err(AppError::AlreadyExists(format!(
                "booking number {}",
                booking.booking_number
            )));
        }

        bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.bookings.read().get(&id).cloned())
    }

    async fn find_by_number(&self, booking_number: &str) -> AppResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .values()
            .find(|b| b.booking_number == booking_number)
            .cloned())
    }

    async fn find_by_idempotency_key(&self, hotel_id: Uuid, key: &str) -> AppResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .values()
            .find(|b| b.hotel_id == hotel_id && b.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn update(&self, booking: &Booking) -> AppResult<Booking> {
        let mut bookings = self.bookings.write();
        let stored = bookings
            .get_mut(&booking.id)
            .ok_or_else(|| AppError::BookingNotFound(booking.id.to_string()))?;

        if stored.version != booking.version {
            return Err(AppError::ConcurrencyConflict(format!(
                "booking {} was modified concurrently",
                booking.booking_number
            )));
        }

        let mut saved = booking.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn list(
        &self,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Booking>, i64)> {
        let mut matching: Vec<Booking> = self
            .bookings
            .read()
            .values()
            .filter(|b| filter.hotel_id.map_or(true, |id| b.hotel_id == id))
            .filter(|b| filter.status.map_or(true, |s| b.status() == s))
            .filter(|b| filter.check_in_from.map_or(true, |d| b.check_in >= d))
            .filter(|b| filter.check_in_to.map_or(true, |d| b.check_in <= d))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn hold(room_type_id: Uuid, total: i32, dates: Vec<NaiveDate>, quantity: i32) -> InventoryHold {
        InventoryHold {
            room_type_id,
            total_rooms: total,
            dates,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_hold_is_all_or_nothing() {
        let store = MemoryInventoryStore::new();
        let room_type = Uuid::new_v4();

        store.hold(&[hold(room_type, 2, vec![date(2)], 2)]).await.unwrap();

        // Night 1 has room, night 2 is full
        let err = store
            .hold(&[hold(room_type, 2, vec![date(1), date(2)], 1)])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "inventory_unavailable");
        assert_eq!(store.allocated(room_type, date(1)), 0);
        assert_eq!(store.allocated(room_type, date(2)), 2);
    }

    #[tokio::test]
    async fn test_release_never_goes_negative() {
        let store = MemoryInventoryStore::new();
        let room_type = Uuid::new_v4();

        store.hold(&[hold(room_type, 3, vec![date(1)], 1)]).await.unwrap();
        store.release(&[hold(room_type, 3, vec![date(1)], 2)]).await.unwrap();
        assert_eq!(store.allocated(room_type, date(1)), 0);

        let days = store.daily_inventory(room_type, 3, &[date(1), date(5)]).await.unwrap();
        assert_eq!(days[0].available(), 3);
        assert_eq!(days[1].available(), 3);
    }

    #[tokio::test]
    async fn test_last_room_race_single_winner() {
        let store = Arc::new(MemoryInventoryStore::new());
        let room_type = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.hold(&[hold(room_type, 1, vec![date(1)], 1)]).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.allocated(room_type, date(1)), 1);
    }

    #[tokio::test]
    async fn test_injected_conflict() {
        let store = MemoryInventoryStore::new();
        let room_type = Uuid::new_v4();
        store.inject_conflicts(1);

        let first = store.hold(&[hold(room_type, 1, vec![date(1)], 1)]).await;
        assert!(first.unwrap_err().is_retryable());
        assert!(store.hold(&[hold(room_type, 1, vec![date(1)], 1)]).await.is_ok());
    }

    #[tokio::test]
    async fn test_occupancy_changes() {
        let store = MemoryInventoryStore::new();
        let room_type = Uuid::new_v4();

        store
            .update_occupancy(room_type, 2, OccupancyChange::Occupy, 2)
            .await
            .unwrap();
        let occ = store
            .update_occupancy(room_type, 2, OccupancyChange::Vacate, 2)
            .await
            .unwrap();
        assert_eq!((occ.ready, occ.occupied, occ.cleaning), (0, 0, 2));

        let err = store
            .update_occupancy(room_type, 2, OccupancyChange::Occupy, 1)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "inventory_unavailable");

        let occ = store
            .update_occupancy(room_type, 2, OccupancyChange::MarkClean, 1)
            .await
            .unwrap();
        assert_eq!(occ.ready, 1);
    }

    #[tokio::test]
    async fn test_discount_lookup_case_insensitive() {
        let catalog = MemoryCatalog::new();
        let hotel_id = Uuid::new_v4();
        catalog.upsert_discount_code(DiscountCode {
            id: Uuid::new_v4(),
            hotel_id,
            code: "Monsoon10".to_string(),
            kind: innkeep_core::models::DiscountKind::Percentage,
            value: rust_decimal::Decimal::TEN,
            valid_from: None,
            valid_to: None,
            min_nights: None,
            is_active: true,
        });

        assert!(catalog.find_discount_code(hotel_id, " MONSOON10 ").await.unwrap().is_some());
        assert!(catalog.find_discount_code(Uuid::new_v4(), "monsoon10").await.unwrap().is_none());
    }
}
