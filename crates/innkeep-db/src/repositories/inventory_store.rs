//! Inventory store implementation
//!
//! Date inventory lives in `room_inventory`, one row per room type and stay
//! date, created lazily from the room type's room count. Holds lock every
//! affected row with `SELECT ... FOR UPDATE` in `(room_type_id, stay_date)`
//! order inside one transaction, so two bookings racing for the last room
//! serialize on the row lock and concurrent multi-date holds cannot deadlock.

use async_trait::async_trait;
use chrono::NaiveDate;
use innkeep_core::{
    models::{DailyInventory, InventoryHold, RoomOccupancy},
    traits::{InventoryStore, OccupancyChange},
    AppError, AppResult,
};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::map_db_error;

/// One `(room type, date)` counter touched by a set of holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HoldLine {
    pub total_rooms: i32,
    pub quantity: i32,
}

/// Flatten holds into per-date lines, summing duplicate dates
///
/// The map is ordered by `(room_type_id, date)`, which is also the lock order.
pub(crate) fn hold_lines(holds: &[InventoryHold]) -> BTreeMap<(Uuid, NaiveDate), HoldLine> {
    let mut lines = BTreeMap::new();
    for hold in holds.iter().filter(|h| h.quantity > 0) {
        for date in &hold.dates {
            let line = lines
                .entry((hold.room_type_id, *date))
                .or_insert(HoldLine {
                    total_rooms: hold.total_rooms,
                    quantity: 0,
                });
            line.quantity += hold.quantity;
        }
    }
    lines
}

/// PostgreSQL implementation of InventoryStore
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    /// Create a new inventory store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            warn!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| map_db_error("commit inventory transaction", e))
    }

    /// Create missing rows, then lock every row in key order
    async fn lock_rows(
        tx: &mut Transaction<'static, Postgres>,
        lines: &BTreeMap<(Uuid, NaiveDate), HoldLine>,
    ) -> AppResult<Vec<InventoryRow>> {
        let ids: Vec<Uuid> = lines.keys().map(|(id, _)| *id).collect();
        let dates: Vec<NaiveDate> = lines.keys().map(|(_, d)| *d).collect();
        let totals: Vec<i32> = lines.values().map(|l| l.total_rooms).collect();

        sqlx::query(
            r#"
            INSERT INTO room_inventory (room_type_id, stay_date, total_rooms, allocated)
            SELECT v.room_type_id, v.stay_date, v.total_rooms, 0
            FROM UNNEST($1::uuid[], $2::date[], $3::int[]) AS v(room_type_id, stay_date, total_rooms)
            ON CONFLICT (room_type_id, stay_date) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&dates)
        .bind(&totals)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_db_error("create inventory rows", e))?;

        sqlx::query_as::<sqlx::Postgres, InventoryRow>(
            r#"
            SELECT ri.room_type_id, ri.stay_date, ri.total_rooms, ri.allocated
            FROM room_inventory ri
            JOIN UNNEST($1::uuid[], $2::date[]) AS v(room_type_id, stay_date)
              ON ri.room_type_id = v.room_type_id AND ri.stay_date = v.stay_date
            ORDER BY ri.room_type_id, ri.stay_date
            FOR UPDATE OF ri
            "#,
        )
        .bind(&ids)
        .bind(&dates)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_db_error("lock inventory rows", e))
    }

    /// Add `sign × quantity` to every line's `allocated`, never below zero
    async fn apply_lines(
        tx: &mut Transaction<'static, Postgres>,
        lines: &BTreeMap<(Uuid, NaiveDate), HoldLine>,
        sign: i32,
    ) -> AppResult<()> {
        let ids: Vec<Uuid> = lines.keys().map(|(id, _)| *id).collect();
        let dates: Vec<NaiveDate> = lines.keys().map(|(_, d)| *d).collect();
        let deltas: Vec<i32> = lines.values().map(|l| sign * l.quantity).collect();

        sqlx::query(
            r#"
            UPDATE room_inventory AS ri
            SET allocated = GREATEST(ri.allocated + v.delta, 0),
                updated_at = NOW()
            FROM UNNEST($1::uuid[], $2::date[], $3::int[]) AS v(room_type_id, stay_date, delta)
            WHERE ri.room_type_id = v.room_type_id AND ri.stay_date = v.stay_date
            "#,
        )
        .bind(&ids)
        .bind(&dates)
        .bind(&deltas)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_db_error("update inventory rows", e))?;

        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    #[instrument(skip(self, dates))]
    async fn daily_inventory(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        dates: &[NaiveDate],
    ) -> AppResult<Vec<DailyInventory>> {
        let rows = sqlx::query_as::<sqlx::Postgres, InventoryRow>(
            r#"
            SELECT room_type_id, stay_date, total_rooms, allocated
            FROM room_inventory
            WHERE room_type_id = $1 AND stay_date = ANY($2::date[])
            "#,
        )
        .bind(room_type_id)
        .bind(dates)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("read daily inventory", e))?;

        let stored: BTreeMap<NaiveDate, InventoryRow> =
            rows.into_iter().map(|r| (r.stay_date, r)).collect();

        Ok(dates
            .iter()
            .map(|date| match stored.get(date) {
                Some(row) => (*row).into(),
                None => DailyInventory {
                    room_type_id,
                    date: *date,
                    total_rooms,
                    allocated: 0,
                },
            })
            .collect())
    }

    #[instrument(skip(self, holds))]
    async fn hold(&self, holds: &[InventoryHold]) -> AppResult<()> {
        let lines = hold_lines(holds);
        if lines.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;
        let rows = Self::lock_rows(&mut tx, &lines).await?;

        for row in &rows {
            let requested = lines
                .get(&(row.room_type_id, row.stay_date))
                .map_or(0, |l| l.quantity);
            let free = (row.total_rooms - row.allocated).max(0);
            if requested > free {
                debug!(
                    "Hold refused for room type {} on {}: {} requested, {} free",
                    row.room_type_id, row.stay_date, requested, free
                );
                // Dropping the transaction rolls it back
                return Err(AppError::InventoryUnavailable(format!(
                    "room type {} has {} of {} rooms free on {}",
                    row.room_type_id, free, requested, row.stay_date
                )));
            }
        }

        Self::apply_lines(&mut tx, &lines, 1).await?;
        Self::commit(tx).await?;

        info!("Held {} room-nights across {} dates", lines.values().map(|l| l.quantity).sum::<i32>(), lines.len());
        Ok(())
    }

    #[instrument(skip(self, holds))]
    async fn release(&self, holds: &[InventoryHold]) -> AppResult<()> {
        let lines = hold_lines(holds);
        if lines.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;
        Self::lock_rows(&mut tx, &lines).await?;
        Self::apply_lines(&mut tx, &lines, -1).await?;
        Self::commit(tx).await?;

        info!("Released inventory on {} room-type dates", lines.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn occupancy(&self, room_type_id: Uuid, total_rooms: i32) -> AppResult<RoomOccupancy> {
        let row = sqlx::query_as::<sqlx::Postgres, OccupancyRow>(
            "SELECT room_type_id, ready, occupied, cleaning FROM room_occupancy WHERE room_type_id = $1",
        )
        .bind(room_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("read occupancy", e))?;

        Ok(row
            .map(Into::into)
            .unwrap_or_else(|| RoomOccupancy::new(room_type_id, total_rooms)))
    }

    #[instrument(skip(self))]
    async fn update_occupancy(
        &self,
        room_type_id: Uuid,
        total_rooms: i32,
        change: OccupancyChange,
        quantity: i32,
    ) -> AppResult<RoomOccupancy> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO room_occupancy (room_type_id, ready, occupied, cleaning)
            VALUES ($1, GREATEST($2, 0), 0, 0)
            ON CONFLICT (room_type_id) DO NOTHING
            "#,
        )
        .bind(room_type_id)
        .bind(total_rooms)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("create occupancy row", e))?;

        let row = sqlx::query_as::<sqlx::Postgres, OccupancyRow>(
            r#"
            SELECT room_type_id, ready, occupied, cleaning
            FROM room_occupancy
            WHERE room_type_id = $1
            FOR UPDATE
            "#,
        )
        .bind(room_type_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error("lock occupancy row", e))?;

        let mut occupancy: RoomOccupancy = row.into();
        match change {
            OccupancyChange::Occupy => occupancy.occupy(quantity)?,
            OccupancyChange::Unoccupy => occupancy.unoccupy(quantity),
            OccupancyChange::Vacate => occupancy.vacate(quantity),
            OccupancyChange::MarkClean => occupancy.mark_clean(quantity)?,
        }

        sqlx::query(
            r#"
            UPDATE room_occupancy
            SET ready = $2, occupied = $3, cleaning = $4, updated_at = NOW()
            WHERE room_type_id = $1
            "#,
        )
        .bind(room_type_id)
        .bind(occupancy.ready)
        .bind(occupancy.occupied)
        .bind(occupancy.cleaning)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("update occupancy", e))?;

        Self::commit(tx).await?;

        debug!(
            "Occupancy of room type {} after {:?}: ready={} occupied={} cleaning={}",
            room_type_id, change, occupancy.ready, occupancy.occupied, occupancy.cleaning
        );
        Ok(occupancy)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
struct InventoryRow {
    room_type_id: Uuid,
    stay_date: NaiveDate,
    total_rooms: i32,
    allocated: i32,
}

impl From<InventoryRow> for DailyInventory {
    fn from(row: InventoryRow) -> Self {
        Self {
            room_type_id: row.room_type_id,
            date: row.stay_date,
            total_rooms: row.total_rooms,
            allocated: row.allocated,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OccupancyRow {
    room_type_id: Uuid,
    ready: i32,
    occupied: i32,
    cleaning: i32,
}

impl From<OccupancyRow> for RoomOccupancy {
    fn from(row: OccupancyRow) -> Self {
        Self {
            room_type_id: row.room_type_id,
            ready: row.ready,
            occupied: row.occupied,
            cleaning: row.cleaning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn test_hold_lines_merge_and_order() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let holds = vec![
            InventoryHold {
                room_type_id: b,
                total_rooms: 4,
                dates: vec![date(2), date(1)],
                quantity: 1,
            },
            InventoryHold {
                room_type_id: a,
                total_rooms: 3,
                dates: vec![date(1)],
                quantity: 2,
            },
            InventoryHold {
                room_type_id: b,
                total_rooms: 4,
                dates: vec![date(2)],
                quantity: 1,
            },
        ];

        let lines = hold_lines(&holds);
        let keys: Vec<_> = lines.keys().copied().collect();
        assert_eq!(keys, vec![(a, date(1)), (b, date(1)), (b, date(2))]);
        assert_eq!(lines[&(b, date(2))].quantity, 2);
        assert_eq!(lines[&(a, date(1))].total_rooms, 3);
    }

    #[test]
    fn test_hold_lines_skip_empty_quantities() {
        let holds = vec![InventoryHold {
            room_type_id: Uuid::new_v4(),
            total_rooms: 2,
            dates: vec![date(1)],
            quantity: 0,
        }];
        assert!(hold_lines(&holds).is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires database with a seeded room type
    async fn test_last_room_race() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let room_type_id: Uuid = std::env::var("INNKEEP_TEST_ROOM_TYPE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Uuid::new_v4);

        let pool = PgPool::connect(&url).await.unwrap();
        let store = std::sync::Arc::new(PgInventoryStore::new(pool));
        let hold = vec![InventoryHold {
            room_type_id,
            total_rooms: 1,
            dates: vec![NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()],
            quantity: 1,
        }];

        let (first, second) = tokio::join!(
            {
                let store = store.clone();
                let hold = hold.clone();
                async move { store.hold(&hold).await }
            },
            {
                let store = store.clone();
                let hold = hold.clone();
                async move { store.hold(&hold).await }
            }
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        store.release(&hold).await.unwrap();
    }
}
