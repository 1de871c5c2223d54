//! Innkeep Database Layer
//!
//! This crate provides PostgreSQL access and store implementations for the
//! Innkeep booking engine. It includes:
//!
//! - Connection pool management and migrations with sqlx
//! - Catalog and booking repositories
//! - A row-locking inventory store for race-free holds
//! - In-memory stores for tests and single-node runs

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::{MemoryBookingRepository, MemoryCatalog, MemoryInventoryStore};
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use innkeep_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
