//! Room inventory models
//!
//! Two kinds of counters exist per room type:
//! - date inventory: rooms sold per stay date (`allocated` out of `total_rooms`)
//! - physical occupancy: rooms ready, occupied, or waiting for housekeeping

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppResult;

/// Inventory for one room type on one stay date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyInventory {
    pub room_type_id: Uuid,
    pub date: NaiveDate,
    pub total_rooms: i32,
    pub allocated: i32,
}

impl DailyInventory {
    /// Unallocated rooms, never negative
    #[inline]
    pub fn available(&self) -> i32 {
        (self.total_rooms - self.allocated).max(0)
    }
}

/// A request to hold (or release) `quantity` rooms on each of `dates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryHold {
    pub room_type_id: Uuid,

    /// Room count used when a date row does not exist yet
    pub total_rooms: i32,

    pub dates: Vec<NaiveDate>,
    pub quantity: i32,
}

/// Expand `[check_in, check_out)` into its stay dates
pub fn stay_dates(check_in: NaiveDate, check_out: NaiveDate) -> Vec<NaiveDate> {
    check_in
        .iter_days()
        .take_while(|d| *d < check_out)
        .collect()
}

/// Physical room state counters for a room type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RoomOccupancy {
    pub room_type_id: Uuid,
    pub ready: i32,
    pub occupied: i32,
    pub cleaning: i32,
}

impl RoomOccupancy {
    pub fn new(room_type_id: Uuid, total_rooms: i32) -> Self {
        Self {
            room_type_id,
            ready: total_rooms.max(0),
            occupied: 0,
            cleaning: 0,
        }
    }

    /// Guests take `quantity` ready rooms
    pub fn occupy(&mut self, quantity: i32) -> AppResult<()> {
        if quantity > self.ready {
            return Err(AppError::InventoryUnavailable(format!(
                "{} ready rooms requested, {} ready",
                quantity, self.ready
            )));
        }
        self.ready -= quantity;
        self.occupied += quantity;
        Ok(())
    }

    /// Undo an `occupy` whose check-in was not saved
    pub fn unoccupy(&mut self, quantity: i32) {
        let moved = quantity.min(self.occupied);
        self.occupied -= moved;
        self.ready += moved;
    }

    /// Guests leave; the rooms wait for housekeeping
    pub fn vacate(&mut self, quantity: i32) {
        let moved = quantity.min(self.occupied);
        self.occupied -= moved;
        self.cleaning += moved;
    }

    /// Housekeeping returns cleaned rooms
    pub fn mark_clean(&mut self, quantity: i32) -> AppResult<()> {
        if quantity > self.cleaning {
            return Err(AppError::Validation(format!(
                "{} rooms marked clean, only {} in cleaning",
                quantity, self.cleaning
            )));
        }
        self.cleaning -= quantity;
        self.ready += quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stay_dates_excludes_check_out() {
        let check_in = NaiveDate::from_ymd_opt(2026, 12, 30).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        let dates = stay_dates(check_in, check_out);

        assert_eq!(dates.len(), 3);
        assert_eq!(dates[0], check_in);
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn test_stay_dates_empty_range() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(stay_dates(day, day).is_empty());
    }

    #[test]
    fn test_daily_available_clamped() {
        let inv = DailyInventory {
            room_type_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            total_rooms: 3,
            allocated: 5,
        };
        assert_eq!(inv.available(), 0);
    }

    #[test]
    fn test_occupancy_cycle() {
        let mut occ = RoomOccupancy::new(Uuid::new_v4(), 3);

        occ.occupy(2).unwrap();
        assert_eq!((occ.ready, occ.occupied, occ.cleaning), (1, 2, 0));

        assert!(occ.occupy(2).is_err());

        occ.vacate(2);
        assert_eq!((occ.ready, occ.occupied, occ.cleaning), (1, 0, 2));

        occ.mark_clean(1).unwrap();
        assert_eq!((occ.ready, occ.occupied, occ.cleaning), (2, 0, 1));

        assert!(occ.mark_clean(2).is_err());
    }

    #[test]
    fn test_unoccupy_returns_rooms_to_ready() {
        let mut occ = RoomOccupancy::new(Uuid::new_v4(), 2);
        occ.occupy(2).unwrap();
        occ.unoccupy(3);
        assert_eq!((occ.ready, occ.occupied, occ.cleaning), (2, 0, 0));
    }
}
