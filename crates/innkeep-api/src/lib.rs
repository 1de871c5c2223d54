//! API layer for Innkeep
//!
//! HTTP handlers for availability search, the booking lifecycle,
//! payments and housekeeping.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod dto;
pub mod handlers;

pub use dto::{ApiResponse, PaginationParams};

pub use handlers::{
    configure_availability, configure_bookings, configure_health, configure_housekeeping,
    configure_routes,
};
