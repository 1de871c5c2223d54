//! Repository implementations
//!
//! This module contains concrete implementations of the repository and
//! store traits defined in innkeep-core, using sqlx for PostgreSQL access.

pub mod booking_repo;
pub mod catalog_repo;
pub mod inventory_store;

pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgCatalogRepository;
pub use inventory_store::PgInventoryStore;

use innkeep_core::AppError;
use tracing::{error, warn};

/// serialization_failure
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// deadlock_detected
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";
/// unique_violation
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// Map a sqlx error, surfacing lock conflicts as retryable
pub(crate) fn map_db_error(context: &str, err: sqlx::Error) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        Some(SQLSTATE_SERIALIZATION_FAILURE) | Some(SQLSTATE_DEADLOCK_DETECTED) => {
            warn!("Concurrency conflict while trying to {}: {}", context, err);
            AppError::ConcurrencyConflict(format!("Failed to {}: {}", context, err))
        }
        _ => {
            error!("Database error while trying to {}: {}", context, err);
            AppError::Database(format!("Failed to {}: {}", context, err))
        }
    }
}

/// Whether the error is a unique constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == SQLSTATE_UNIQUE_VIOLATION)
}

/// Constraint name of a database error, if any
pub(crate) fn constraint_name(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_string)
}
