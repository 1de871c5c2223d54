//! Domain models for Innkeep
//!
//! This module contains all the core domain models used throughout the application.

pub mod booking;
pub mod cancellation;
pub mod hotel;
pub mod inventory;
pub mod pricing;
pub mod room;

pub use booking::{
    nights_between, BookedRoom, Booking, BookingSource, BookingState, BookingStatus,
    CheckInDetails, CheckInRecord, CheckOutDetails, CheckOutRecord, Confirmation, GuestDetails,
    NewBooking, NoShowRecord, PaymentMethod, PaymentOutcome, PaymentRecord, PaymentStatus,
    RoomTypeSnapshot,
};
pub use cancellation::{
    BookingCancellation, CancellationPolicy, CancellationPolicyType, RefundStatus,
};
pub use hotel::Hotel;
pub use inventory::{stay_dates, DailyInventory, InventoryHold, RoomOccupancy};
pub use pricing::{BookingPricing, ExtraCharge, ExtraChargeCategory, NewExtraCharge};
pub use room::{DiscountCode, DiscountKind, RateType, RoomRate, RoomType};
