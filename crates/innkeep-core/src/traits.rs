//! Common traits for repositories, stores and collaborators
//!
//! Defines abstractions for persistence, inventory locking and the external
//! services the booking engine calls.

use crate::error::AppError;
use crate::models::{
    Booking, BookingStatus, DailyInventory, DiscountCode, Hotel, InventoryHold, RoomOccupancy,
    RoomRate, RoomType,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Read-only access to hotels, room types, rates and discount codes
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Find hotel by ID
    async fn find_hotel(&self, hotel_id: Uuid) -> Result<Option<Hotel>, AppError>;

    /// Active room types of a hotel
    async fn list_room_types(&self, hotel_id: Uuid) -> Result<Vec<RoomType>, AppError>;

    /// Find room type by ID (active or not)
    async fn find_room_type(&self, room_type_id: Uuid) -> Result<Option<RoomType>, AppError>;

    /// Every rate of a room type, inactive ones included
    async fn list_rates(&self, room_type_id: Uuid) -> Result<Vec<RoomRate>, AppError>;

    /// Find discount code by hotel and code (case-insensitive)
    async fn find_discount_code(
        &self,
        hotel_id: Uuid,
        code: &str,
    ) -> Result<Option<DiscountCode>, AppError>;
}

/// Change applied to a room type's physical occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyChange {
    /// Guests check in
    Occupy,
    /// A check-in that was occupied but never saved
    Unoccupy,
    /// Guests check out; rooms go to housekeeping
    Vacate,
    /// Housekeeping finished
    MarkClean,
}

/// Per-date inventory counters and physical occupancy
///
/// Implementations must make `hold` atomic across every date and room type
/// it touches: either all counters move or none do.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inventory for each of `dates`; missing rows report `total_rooms` free
    async fn daily_inventory(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        dates: &[NaiveDate],
    ) -> Result<Vec<DailyInventory>, AppError>;

    /// Allocate every hold or fail with `InventoryUnavailable`
    ///
    /// May fail with `ConcurrencyConflict` when the store detects a
    /// conflicting concurrent writer; callers may retry.
    async fn hold(&self, holds: &[InventoryHold]) -> Result<(), AppError>;

    /// Give held rooms back (never drops `allocated` below zero)
    async fn release(&self, holds: &[InventoryHold]) -> Result<(), AppError>;

    /// Current physical occupancy
    async fn occupancy(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
    ) -> Result<RoomOccupancy, AppError>;

    /// Apply an occupancy change atomically
    async fn update_occupancy(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        change: OccupancyChange,
        quantity: i32,
    ) -> Result<RoomOccupancy, AppError>;
}

/// Booking listing filter
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub hotel_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub check_in_from: Option<NaiveDate>,
    pub check_in_to: Option<NaiveDate>,
}

/// Booking repository
///
/// Bookings are never deleted.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a new booking
    ///
    /// Fails with `AlreadyExists` when the hotel already has a booking with
    /// the same idempotency key.
    async fn insert(&self, booking: &Booking) -> Result<Booking, AppError>;

    /// Find booking by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Find booking by booking number
    async fn find_by_number(&self, booking_number: &str) -> Result<Option<Booking>, AppError>;

    /// Find booking created with an idempotency key
    async fn find_by_idempotency_key(
        &self,
        hotel_id: Uuid,
        key: &str,
    ) -> Result<Option<Booking>, AppError>;

    /// Save a mutated booking if nobody else saved it since it was read
    ///
    /// Compares `booking.version` with the stored version and fails with
    /// `ConcurrencyConflict` on mismatch. Returns the booking with the
    /// bumped version.
    async fn update(&self, booking: &Booking) -> Result<Booking, AppError>;

    /// List bookings with filtering, newest first
    async fn list(
        &self,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Booking>, i64), AppError>;
}

/// Gateway-side status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Completed,
    Pending,
    Failed,
}

/// Verification result from the payment gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub status: GatewayPaymentStatus,
    pub amount: Decimal,
    /// Gateway transaction reference
    pub reference: Option<String>,
}

/// Payment gateway collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment and return the URL the guest is redirected to
    async fn initiate_payment(&self, amount: Decimal, booking_ref: &str)
        -> Result<String, AppError>;

    /// Check the outcome of a payment by its gateway token
    async fn verify_payment(&self, token: &str) -> Result<PaymentVerification, AppError>;
}

/// Rooms that need housekeeping after a check-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningRequest {
    pub hotel_id: Uuid,
    pub room_type_id: Uuid,
    pub room_type_name: String,
    pub quantity: i32,
    #[serde(default)]
    pub room_numbers: Vec<String>,
    pub booking_number: String,
    pub requested_at: DateTime<Utc>,
}

/// Housekeeping collaborator, notified fire-and-forget
#[async_trait]
pub trait HousekeepingNotifier: Send + Sync {
    async fn rooms_need_cleaning(&self, request: &CleaningRequest) -> Result<(), AppError>;
}

/// Booking events guests are told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Confirmed,
    Cancelled,
}

/// Payload sent to the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: Uuid,
    pub booking_number: String,
    pub hotel_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Refund owed to the guest, for cancellations
    pub refund_amount: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Notification/email collaborator
///
/// A failure here must never fail the booking operation.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn notify(&self, event: &BookingEvent) -> Result<(), AppError>;
}

/// Cache service trait
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete value from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000);
        assert_eq!(p.per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        assert_eq!(PaginationMeta::new(95, 1, 10).total_pages, 10);
        assert_eq!(PaginationMeta::new(101, 1, 10).total_pages, 11);
        assert_eq!(PaginationMeta::new(0, 1, 10).total_pages, 0);
    }
}
