//! Catalog repository implementation
//!
//! PostgreSQL-backed reads of hotels, room types, rates and discount codes.
//! The booking engine never writes the catalog.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use innkeep_core::{
    models::{
        CancellationPolicy, DiscountCode, DiscountKind, Hotel, RateType, RoomRate, RoomType,
    },
    traits::CatalogRepository,
    AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::map_db_error;

/// PostgreSQL implementation of CatalogRepository
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert database rate type string to enum
    fn parse_rate_type(s: &str) -> RateType {
        RateType::from_str(s).unwrap_or_default()
    }

    /// Parse stored weekday abbreviations, skipping anything unknown
    fn parse_days(days: &[String]) -> Vec<Weekday> {
        days.iter()
            .filter_map(|d| match d.parse::<Weekday>() {
                Ok(day) => Some(day),
                Err(_) => {
                    warn!("Ignoring unknown weekday '{}' in room rate", d);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    #[instrument(skip(self))]
    async fn find_hotel(&self, hotel_id: Uuid) -> AppResult<Option<Hotel>> {
        debug!("Finding hotel by id: {}", hotel_id);

        let row = sqlx::query_as::<sqlx::Postgres, HotelRow>(
            r#"
            SELECT
                id, name, currency, tax_percent, service_charge_percent,
                utc_offset_minutes, check_in_time, check_out_time, cancellation_policy
            FROM hotels
            WHERE id = $1
            "#,
        )
        .bind(hotel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find hotel", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_room_types(&self, hotel_id: Uuid) -> AppResult<Vec<RoomType>> {
        debug!("Listing room types for hotel {}", hotel_id);

        let rows = sqlx::query_as::<sqlx::Postgres, RoomTypeRow>(
            r#"
            SELECT
                id, hotel_id, name, max_occupancy, bed_configuration,
                base_price, currency, total_rooms, available_rooms, is_active,
                created_at, updated_at
            FROM room_types
            WHERE hotel_id = $1 AND is_active
            ORDER BY base_price, name
            "#,
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list room types", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_room_type(&self, room_type_id: Uuid) -> AppResult<Option<RoomType>> {
        let row = sqlx::query_as::<sqlx::Postgres, RoomTypeRow>(
            r#"
            SELECT
                id, hotel_id, name, max_occupancy, bed_configuration,
                base_price, currency, total_rooms, available_rooms, is_active,
                created_at, updated_at
            FROM room_types
            WHERE id = $1
            "#,
        )
        .bind(room_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find room type", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_rates(&self, room_type_id: Uuid) -> AppResult<Vec<RoomRate>> {
        let rows = sqlx::query_as::<sqlx::Postgres, RoomRateRow>(
            r#"
            SELECT
                id, room_type_id, name, rate_type, price,
                valid_from, valid_to, days_of_week, min_stay, max_stay, is_active
            FROM room_rates
            WHERE room_type_id = $1
            ORDER BY price, id
            "#,
        )
        .bind(room_type_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list room rates", e))?;

        debug!("Found {} rates for room type {}", rows.len(), room_type_id);
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_discount_code(&self, hotel_id: Uuid, code: &str) -> AppResult<Option<DiscountCode>> {
        let row = sqlx::query_as::<sqlx::Postgres, DiscountCodeRow>(
            r#"
            SELECT
                id, hotel_id, code, kind, value,
                valid_from, valid_to, min_nights, is_active
            FROM discount_codes
            WHERE hotel_id = $1 AND LOWER(code) = LOWER($2)
            "#,
        )
        .bind(hotel_id)
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find discount code", e))?;

        Ok(row.and_then(|r| {
            let kind = DiscountKind::from_str(&r.kind);
            if kind.is_none() {
                warn!("Discount code {} has unknown kind '{}'", r.code, r.kind);
            }
            kind.map(|kind| r.into_model(kind))
        }))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct HotelRow {
    id: Uuid,
    name: String,
    currency: String,
    tax_percent: Decimal,
    service_charge_percent: Decimal,
    utc_offset_minutes: i32,
    check_in_time: NaiveTime,
    check_out_time: NaiveTime,
    cancellation_policy: Json<CancellationPolicy>,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            currency: row.currency,
            tax_percent: row.tax_percent,
            service_charge_percent: row.service_charge_percent,
            utc_offset_minutes: row.utc_offset_minutes,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            cancellation_policy: row.cancellation_policy.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomTypeRow {
    id: Uuid,
    hotel_id: Uuid,
    name: String,
    max_occupancy: i32,
    bed_configuration: String,
    base_price: Decimal,
    currency: String,
    total_rooms: i32,
    available_rooms: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomTypeRow> for RoomType {
    fn from(row: RoomTypeRow) -> Self {
        Self {
            id: row.id,
            hotel_id: row.hotel_id,
            name: row.name,
            max_occupancy: row.max_occupancy,
            bed_configuration: row.bed_configuration,
            base_price: row.base_price,
            currency: row.currency,
            total_rooms: row.total_rooms,
            available_rooms: row.available_rooms,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomRateRow {
    id: Uuid,
    room_type_id: Uuid,
    name: String,
    rate_type: String,
    price: Decimal,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    days_of_week: Vec<String>,
    min_stay: Option<i32>,
    max_stay: Option<i32>,
    is_active: bool,
}

impl From<RoomRateRow> for RoomRate {
    fn from(row: RoomRateRow) -> Self {
        Self {
            id: row.id,
            room_type_id: row.room_type_id,
            name: row.name,
            rate_type: PgCatalogRepository::parse_rate_type(&row.rate_type),
            price: row.price,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            days_of_week: PgCatalogRepository::parse_days(&row.days_of_week),
            min_stay: row.min_stay,
            max_stay: row.max_stay,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DiscountCodeRow {
    id: Uuid,
    hotel_id: Uuid,
    code: String,
    kind: String,
    value: Decimal,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    min_nights: Option<i32>,
    is_active: bool,
}

impl DiscountCodeRow {
    fn into_model(self, kind: DiscountKind) -> DiscountCode {
        DiscountCode {
            id: self.id,
            hotel_id: self.hotel_id,
            code: self.code,
            kind,
            value: self.value,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            min_nights: self.min_nights,
            is_active: self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        let days = vec!["Mon".to_string(), "saturday".to_string(), "noday".to_string()];
        assert_eq!(
            PgCatalogRepository::parse_days(&days),
            vec![Weekday::Mon, Weekday::Sat]
        );
    }

    #[test]
    fn test_parse_rate_type_falls_back_to_standard() {
        assert_eq!(PgCatalogRepository::parse_rate_type("Weekend"), RateType::Weekend);
        assert_eq!(PgCatalogRepository::parse_rate_type("mystery"), RateType::Standard);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_find_missing_hotel() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgCatalogRepository::new(pool);

        assert!(repo.find_hotel(Uuid::new_v4()).await.unwrap().is_none());
    }
}
