//! Unified error handling for Innkeep
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the booking engine, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    // ==================== Cache Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    // ==================== Booking Errors ====================
    #[error("Invalid date range: check-out {check_out} must be after check-in {check_in}")]
    InvalidDateRange { check_in: String, check_out: String },

    #[error("Inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Rate not applicable: {0}")]
    RateNotApplicable(String),

    #[error("Invalid discount code: {0}")]
    InvalidDiscountCode(String),

    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Check-in not allowed before {check_in}")]
    PrematureCheckIn { check_in: String },

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Hotel not found: {0}")]
    HotelNotFound(String),

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ==================== External Service Errors ====================
    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_)
            | AppError::MissingField(_)
            | AppError::InvalidDateRange { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::BookingNotFound(_)
            | AppError::HotelNotFound(_)
            | AppError::RoomTypeNotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::InventoryUnavailable(_)
            | AppError::InvalidTransition { .. }
            | AppError::ConcurrencyConflict(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::RateNotApplicable(_)
            | AppError::InvalidDiscountCode(_)
            | AppError::PolicyViolation(_)
            | AppError::PrematureCheckIn { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 502 Bad Gateway
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::ConcurrencyConflict(_) => "concurrency_conflict",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::InvalidDateRange { .. } => "invalid_date_range",
            AppError::InventoryUnavailable(_) => "inventory_unavailable",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::RateNotApplicable(_) => "rate_not_applicable",
            AppError::InvalidDiscountCode(_) => "invalid_discount_code",
            AppError::PolicyViolation(_) => "policy_violation",
            AppError::PrematureCheckIn { .. } => "premature_check_in",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::HotelNotFound(_) => "hotel_not_found",
            AppError::RoomTypeNotFound(_) => "room_type_not_found",
            AppError::Validation(_) => "validation_error",
            AppError::MissingField(_) => "missing_field",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Gateway(_) => "gateway_error",
        }
    }

    /// Whether a single internal retry may resolve this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InventoryUnavailable("deluxe".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::BookingNotFound("123".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidDateRange {
                check_in: "2026-01-02".to_string(),
                check_out: "2026-01-01".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RateNotApplicable("min stay 2".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidTransition {
                from: "pending".to_string(),
                to: "checked-in".to_string()
            }
            .error_code(),
            "invalid_transition"
        );
        assert_eq!(
            AppError::InvalidDiscountCode("SUMMER".to_string()).error_code(),
            "invalid_discount_code"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(AppError::ConcurrencyConflict("version".to_string()).is_retryable());
        assert!(!AppError::InventoryUnavailable("deluxe".to_string()).is_retryable());
    }
}
