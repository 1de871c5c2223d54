//! Booking repository implementation
//!
//! Bookings are stored as scalar columns for lookup and filtering plus JSONB
//! documents for the nested snapshot (guest, rooms, pricing, payments and
//! lifecycle state). Updates compare-and-swap on `version`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{
        BookedRoom, Booking, BookingPricing, BookingSource, BookingState, GuestDetails,
        PaymentRecord, PaymentStatus,
    },
    traits::{BookingFilter, BookingRepository},
    AppError, AppResult,
};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{constraint_name, is_unique_violation, map_db_error};

const BOOKING_COLUMNS: &str = r#"
    id, hotel_id, booking_number, idempotency_key, source, payment_status,
    guest, adults, children, check_in, check_out, nights,
    rooms, pricing, payments, state, version, created_at, updated_at
"#;

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert database source string to enum
    fn parse_source(s: &str) -> BookingSource {
        match s {
            "walk_in" => BookingSource::WalkIn,
            "phone" => BookingSource::Phone,
            "ota" => BookingSource::Ota,
            "corporate" => BookingSource::Corporate,
            _ => BookingSource::Direct,
        }
    }

    /// Convert database payment status string to enum
    fn parse_payment_status(s: &str) -> PaymentStatus {
        PaymentStatus::from_str(s).unwrap_or_default()
    }

    async fn fetch_one_where(&self, clause: &str, bind: FetchKey<'_>) -> AppResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE {}", BOOKING_COLUMNS, clause);
        let query = sqlx::query_as::<sqlx::Postgres, BookingRow>(&sql);
        let query = match bind {
            FetchKey::Id(id) => query.bind(id),
            FetchKey::Number(number) => query.bind(number.to_string()),
            FetchKey::Idempotency(hotel_id, key) => query.bind(hotel_id).bind(key.to_string()),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find booking", e))?;

        Ok(row.map(Into::into))
    }
}

enum FetchKey<'a> {
    Id(Uuid),
    Number(&'a str),
    Idempotency(Uuid, &'a str),
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self, booking), fields(booking_number = %booking.booking_number))]
    async fn insert(&self, booking: &Booking) -> AppResult<Booking> {
        debug!("Inserting booking {}", booking.booking_number);

        let sql = format!(
            r#"
            INSERT INTO bookings (
                id, hotel_id, booking_number, idempotency_key, source, status, payment_status,
                guest, adults, children, check_in, check_out, nights,
                rooms, pricing, payments, state, grand_total, amount_paid,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(&sql)
            .bind(booking.id)
            .bind(booking.hotel_id)
            .bind(&booking.booking_number)
            .bind(&booking.idempotency_key)
            .bind(booking.source.to_string())
            .bind(booking.status().to_string())
            .bind(booking.payment_status.to_string())
            .bind(Json(&booking.guest))
            .bind(booking.adults)
            .bind(booking.children)
            .bind(booking.check_in)
            .bind(booking.check_out)
            .bind(booking.nights as i32)
            .bind(Json(&booking.rooms))
            .bind(Json(&booking.pricing))
            .bind(Json(&booking.payments))
            .bind(Json(&booking.state))
            .bind(booking.pricing.grand_total)
            .bind(booking.pricing.amount_paid)
            .bind(booking.version)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => {
                info!("Booking {} stored", booking.booking_number);
                Ok(row.into())
            }
            Err(e) if is_unique_violation(&e) => {
                let constraint = constraint_name(&e).unwrap_or_default();
                warn!(
                    "Duplicate booking {} ({})",
                    booking.booking_number, constraint
                );
                if constraint.contains("idempotency") {
                    Err(AppError::AlreadyExists(format!(
                        "booking with idempotency key {}",
                        booking.idempotency_key.as_deref().unwrap_or_default()
                    )))
                } else {
                    Err(AppError::AlreadyExists(format!(
                        "booking number {}",
                        booking.booking_number
                    )))
                }
            }
            Err(e) => Err(map_db_error("insert booking", e)),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        self.fetch_one_where("id = $1", FetchKey::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn find_by_number(&self, booking_number: &str) -> AppResult<Option<Booking>> {
        self.fetch_one_where("booking_number = $1", FetchKey::Number(booking_number))
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_idempotency_key(&self, hotel_id: Uuid, key: &str) -> AppResult<Option<Booking>> {
        self.fetch_one_where(
            "hotel_id = $1 AND idempotency_key = $2",
            FetchKey::Idempotency(hotel_id, key),
        )
        .await
    }

    #[instrument(skip(self, booking), fields(booking_number = %booking.booking_number))]
    async fn update(&self, booking: &Booking) -> AppResult<Booking> {
        debug!(
            "Updating booking {} at version {}",
            booking.booking_number, booking.version
        );

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_status = $4,
                guest = $5,
                pricing = $6,
                payments = $7,
                state = $8,
                grand_total = $9,
                amount_paid = $10,
                updated_at = $11,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(&sql)
            .bind(booking.id)
            .bind(booking.version)
            .bind(booking.status().to_string())
            .bind(booking.payment_status.to_string())
            .bind(Json(&booking.guest))
            .bind(Json(&booking.pricing))
            .bind(Json(&booking.payments))
            .bind(Json(&booking.state))
            .bind(booking.pricing.grand_total)
            .bind(booking.pricing.amount_paid)
            .bind(booking.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("update booking", e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let exists: Option<(i32,)> =
                    sqlx::query_as("SELECT version FROM bookings WHERE id = $1")
                        .bind(booking.id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| map_db_error("check booking version", e))?;

                match exists {
                    Some((current,)) => {
                        warn!(
                            "Stale update of booking {}: version {} but stored {}",
                            booking.booking_number, booking.version, current
                        );
                        Err(AppError::ConcurrencyConflict(format!(
                            "booking {} was modified concurrently",
                            booking.booking_number
                        )))
                    }
                    None => Err(AppError::BookingNotFound(booking.id.to_string())),
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Booking>, i64)> {
        const WHERE: &str = r#"
            ($1::uuid IS NULL OR hotel_id = $1)
            AND ($2::text IS NULL OR status = $2)
            AND ($3::date IS NULL OR check_in >= $3)
            AND ($4::date IS NULL OR check_in <= $4)
        "#;

        let status = filter.status.map(|s| s.to_string());

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM bookings WHERE {}", WHERE))
            .bind(filter.hotel_id)
            .bind(&status)
            .bind(filter.check_in_from)
            .bind(filter.check_in_to)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("count bookings", e))?;

        let sql = format!(
            "SELECT {} FROM bookings WHERE {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            BOOKING_COLUMNS, WHERE
        );
        let rows = sqlx::query_as::<sqlx::Postgres, BookingRow>(&sql)
            .bind(filter.hotel_id)
            .bind(&status)
            .bind(filter.check_in_from)
            .bind(filter.check_in_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("list bookings", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    hotel_id: Uuid,
    booking_number: String,
    idempotency_key: Option<String>,
    source: String,
    payment_status: String,
    guest: Json<GuestDetails>,
    adults: i32,
    children: i32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    nights: i32,
    rooms: Json<Vec<BookedRoom>>,
    pricing: Json<BookingPricing>,
    payments: Json<Vec<PaymentRecord>>,
    state: Json<BookingState>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            hotel_id: row.hotel_id,
            booking_number: row.booking_number,
            idempotency_key: row.idempotency_key,
            source: PgBookingRepository::parse_source(&row.source),
            guest: row.guest.0,
            adults: row.adults,
            children: row.children,
            check_in: row.check_in,
            check_out: row.check_out,
            nights: row.nights as i64,
            rooms: row.rooms.0,
            pricing: row.pricing.0,
            payment_status: PgBookingRepository::parse_payment_status(&row.payment_status),
            payments: row.payments.0,
            state: row.state.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_roundtrip() {
        for source in [
            BookingSource::Direct,
            BookingSource::WalkIn,
            BookingSource::Phone,
            BookingSource::Ota,
            BookingSource::Corporate,
        ] {
            assert_eq!(PgBookingRepository::parse_source(&source.to_string()), source);
        }
    }

    #[test]
    fn test_parse_payment_status_defaults_to_pending() {
        assert_eq!(
            PgBookingRepository::parse_payment_status("refunded"),
            PaymentStatus::Refunded
        );
        assert_eq!(
            PgBookingRepository::parse_payment_status("weird"),
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_find_missing_booking() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgBookingRepository::new(pool);

        assert!(repo.find_by_number("BK-000000-NOTHERE").await.unwrap().is_none());
    }
}
