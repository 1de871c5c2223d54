//! Innkeep Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Innkeep booking engine. It includes:
//!
//! - Domain models (Hotel, RoomType, RoomRate, Booking, etc.)
//! - The booking state machine and the pricing/ledger arithmetic
//! - Repository and collaborator traits consumed by the services
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod traits;

pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
