//! Booking lifecycle and pricing services for Innkeep
//!
//! This crate holds the business logic that turns a room search into a
//! priced, stateful booking and carries it through its lifecycle.
//!
//! # Architecture
//!
//! Services are composable and testable:
//! - Each service owns its dependencies behind `Arc`
//! - Persistence and collaborators are reached through the traits in
//!   `innkeep_core::traits`
//! - All mutating operations are instrumented with tracing
//!
//! # Services
//!
//! - `AvailabilityResolver` - Free inventory and applicable rates for a stay
//! - `PricingCalculator` - Room, tax, service charge and discount breakdown
//! - `CancellationResolver` - Refund owed under a hotel's cancellation policy
//! - `BookingService` - Booking state machine, ledger and payments
//! - `CachedCatalog` - Redis read-through decorator for catalog lookups
//! - `HttpPaymentGateway` - REST adapter for the payment gateway
//! - `LogNotifier` - Logging stand-in for the pub/sub collaborators

pub mod availability;
pub mod booking_service;
pub mod cached_catalog;
pub mod cancellation;
pub mod notifiers;
pub mod payment_gateway;
pub mod pricing;

pub use availability::{AvailabilityQuery, AvailabilityResolver, RoomAvailability};
pub use booking_service::{
    BookingService, CancelRequest, Collaborators, CreateBookingRequest, PaymentInitiation,
    PaymentRequest, RoomSelection, StatusUpdate, Stores,
};
pub use cached_catalog::CachedCatalog;
pub use cancellation::CancellationResolver;
pub use notifiers::LogNotifier;
pub use payment_gateway::HttpPaymentGateway;
pub use pricing::{PricedSelection, PricingCalculator, PricingQuote};

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Random characters at the end of a booking number
    pub const BOOKING_NUMBER_SUFFIX_LEN: usize = 8;

    /// Inserts tried with a freshly drawn number before a collision is reported
    pub const BOOKING_NUMBER_ATTEMPTS: u32 = 2;

    /// Longest stay accepted in a single booking
    pub const MAX_STAY_NIGHTS: i64 = 365;

    /// Most rooms of one type in a single selection
    pub const MAX_ROOMS_PER_SELECTION: i32 = 50;

    /// Upper bound for percentage discounts
    pub const MAX_DISCOUNT_PERCENT: Decimal = dec!(100);

    /// Default page size for booking listings
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
}
