use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{SeatClaim, Store, StoreError, StoreResult};
use crate::database::Database;
use crate::models::booking::total_amount;
use crate::models::{
    Booking, BookingDraft, BookingFilter, Pagination, Screen, Seat, SeatAvailabilityUpdate,
    SeatLayout, SeatTier, Theater, UserProfile,
};

const SEAT_COLUMNS: &str =
    "id, position, row_label, seat_number, seat_type, price, is_available, is_booked";

#[derive(FromRow)]
struct SeatLayoutRow {
    id: Uuid,
    screen_id: Uuid,
    theater_id: Uuid,
    rows: i32,
    cols: i32,
    default_regular_price: f64,
    tiers: Json<Vec<SeatTier>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SeatLayoutRow {
    fn with_seats(self, seats: Vec<Seat>) -> SeatLayout {
        SeatLayout {
            id: self.id,
            screen_id: self.screen_id,
            theater_id: self.theater_id,
            rows: self.rows,
            cols: self.cols,
            default_regular_price: self.default_regular_price,
            tiers: self.tiers.0,
            seats,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SeatRow {
    id: Uuid,
    #[allow(dead_code)]
    position: i32,
    row_label: String,
    seat_number: i32,
    seat_type: String,
    price: f64,
    is_available: bool,
    is_booked: bool,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: row.id,
            row: row.row_label,
            seat_number: row.seat_number,
            seat_type: row.seat_type.parse().map_err(StoreError::Corrupt)?,
            price: row.price,
            is_available: row.is_available,
            is_booked: row.is_booked,
        })
    }
}

fn into_seats(rows: Vec<SeatRow>) -> StoreResult<Vec<Seat>> {
    rows.into_iter().map(Seat::try_from).collect()
}

/// Maps a unique violation (SQLSTATE 23505) to `Conflict`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

/// Postgres-backed store. Seats live in their own table keyed by id.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    async fn load_layout(&self, layout_id: Uuid) -> StoreResult<Option<SeatLayout>> {
        let row: Option<SeatLayoutRow> = sqlx::query_as(
            "SELECT id, screen_id, theater_id, rows, cols, default_regular_price, tiers,
                    created_at, updated_at
             FROM seat_layouts
             WHERE id = $1",
        )
        .bind(layout_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let seats: Vec<SeatRow> = sqlx::query_as(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE seat_layout_id = $1 ORDER BY position"
        ))
        .bind(layout_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.with_seats(into_seats(seats)?)))
    }

    async fn insert_seats(
        tx: &mut Transaction<'_, Postgres>,
        layout_id: Uuid,
        seats: &[Seat],
    ) -> StoreResult<()> {
        let ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
        let positions: Vec<i32> = (0..seats.len() as i32).collect();
        let rows: Vec<String> = seats.iter().map(|s| s.row.clone()).collect();
        let numbers: Vec<i32> = seats.iter().map(|s| s.seat_number).collect();
        let types: Vec<String> = seats.iter().map(|s| s.seat_type.to_string()).collect();
        let prices: Vec<f64> = seats.iter().map(|s| s.price).collect();
        let available: Vec<bool> = seats.iter().map(|s| s.is_available).collect();
        let booked: Vec<bool> = seats.iter().map(|s| s.is_booked).collect();

        sqlx::query(
            r#"
            INSERT INTO seats
                (id, seat_layout_id, position, row_label, seat_number, seat_type, price,
                 is_available, is_booked)
            SELECT u.id, $1, u.position, u.row_label, u.seat_number, u.seat_type, u.price,
                   u.is_available, u.is_booked
            FROM UNNEST($2::uuid[], $3::int4[], $4::text[], $5::int4[], $6::text[],
                        $7::float8[], $8::bool[], $9::bool[])
                 AS u(id, position, row_label, seat_number, seat_type, price,
                      is_available, is_booked)
            "#,
        )
        .bind(layout_id)
        .bind(&ids)
        .bind(&positions)
        .bind(&rows)
        .bind(&numbers)
        .bind(&types)
        .bind(&prices)
        .bind(&available)
        .bind(&booked)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_screen(&self, screen_id: Uuid) -> StoreResult<Option<Screen>> {
        let screen = sqlx::query_as::<_, Screen>(
            "SELECT id, theater_id, name, total_seats, is_active, is_complete, seat_layout_id
             FROM screens
             WHERE id = $1 AND is_removed = FALSE",
        )
        .bind(screen_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(screen)
    }

    async fn find_theater(&self, theater_id: Uuid) -> StoreResult<Option<Theater>> {
        let theater = sqlx::query_as::<_, Theater>(
            "SELECT id, name, location, city FROM theaters WHERE id = $1",
        )
        .bind(theater_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(theater)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, name, email, role FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<SeatLayout>> {
        self.load_layout(layout_id).await
    }

    async fn find_seat_layout_by_screen(
        &self,
        screen_id: Uuid,
    ) -> StoreResult<Option<SeatLayout>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM seat_layouts WHERE screen_id = $1")
                .bind(screen_id)
                .fetch_optional(&self.pool)
                .await?;
        match id {
            Some(id) => self.load_layout(id).await,
            None => Ok(None),
        }
    }

    async fn find_seat_layout_by_seats(
        &self,
        seat_ids: &[Uuid],
    ) -> StoreResult<Option<SeatLayout>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT seat_layout_id FROM seats WHERE id = ANY($1) LIMIT 1")
                .bind(seat_ids)
                .fetch_optional(&self.pool)
                .await?;
        match id {
            Some(id) => self.load_layout(id).await,
            None => Ok(None),
        }
    }

    async fn insert_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO seat_layouts
                (id, screen_id, theater_id, rows, cols, default_regular_price, tiers,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(layout.id)
        .bind(layout.screen_id)
        .bind(layout.theater_id)
        .bind(layout.rows)
        .bind(layout.cols)
        .bind(layout.default_regular_price)
        .bind(Json(&layout.tiers))
        .bind(layout.created_at)
        .bind(layout.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                "Seat layout already exists for this screen. Please update the existing layout instead.",
            )
        })?;

        Self::insert_seats(&mut tx, layout.id, &layout.seats).await?;

        sqlx::query(
            "UPDATE screens
             SET seat_layout_id = $2, total_seats = $3, is_complete = TRUE
             WHERE id = $1",
        )
        .bind(layout.screen_id)
        .bind(layout.id)
        .bind(layout.total_seats())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn replace_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE seat_layouts
             SET rows = $2, cols = $3, default_regular_price = $4, tiers = $5, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(layout.id)
        .bind(layout.rows)
        .bind(layout.cols)
        .bind(layout.default_regular_price)
        .bind(Json(&layout.tiers))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(StoreError::Corrupt(format!(
                "seat layout {} vanished during update",
                layout.id
            )));
        }

        sqlx::query("DELETE FROM seats WHERE seat_layout_id = $1")
            .bind(layout.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_seats(&mut tx, layout.id, &layout.seats).await?;

        sqlx::query("UPDATE screens SET total_seats = $2 WHERE id = $1")
            .bind(layout.screen_id)
            .bind(layout.total_seats())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_seat_availability(
        &self,
        layout_id: Uuid,
        updates: &[SeatAvailabilityUpdate],
    ) -> StoreResult<Option<SeatLayout>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM seat_layouts WHERE id = $1 FOR UPDATE")
                .bind(layout_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let rows: Vec<String> = updates.iter().map(|u| u.row.clone()).collect();
        let numbers: Vec<i32> = updates.iter().map(|u| u.seat_number).collect();
        let flags: Vec<bool> = updates.iter().map(|u| u.is_available).collect();

        sqlx::query(
            r#"
            UPDATE seats AS s
            SET is_available = u.is_available
            FROM UNNEST($2::text[], $3::int4[], $4::bool[])
                 AS u(row_label, seat_number, is_available)
            WHERE s.seat_layout_id = $1
              AND s.row_label = u.row_label
              AND s.seat_number = u.seat_number
            "#,
        )
        .bind(layout_id)
        .bind(&rows)
        .bind(&numbers)
        .bind(&flags)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE seat_layouts SET updated_at = NOW() WHERE id = $1")
            .bind(layout_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.load_layout(layout_id).await
    }

    async fn delete_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let screen_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM seat_layouts WHERE id = $1 RETURNING screen_id")
                .bind(layout_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(screen_id) = screen_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE screens SET seat_layout_id = NULL, is_complete = FALSE WHERE id = $1",
        )
        .bind(screen_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(screen_id))
    }

    async fn claim_seats(&self, draft: BookingDraft) -> StoreResult<SeatClaim> {
        let mut tx = self.pool.begin().await?;

        // Lock in id order so overlapping claims queue instead of deadlocking.
        let _locked: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM seats
             WHERE seat_layout_id = $1 AND id = ANY($2)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(draft.seat_layout_id)
        .bind(&draft.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        let claimed: Vec<SeatRow> = sqlx::query_as(&format!(
            "UPDATE seats
             SET is_booked = TRUE
             WHERE seat_layout_id = $1 AND id = ANY($2) AND is_available AND NOT is_booked
             RETURNING {SEAT_COLUMNS}"
        ))
        .bind(draft.seat_layout_id)
        .bind(&draft.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        if claimed.len() != draft.seat_ids.len() {
            tx.rollback().await?;
            return Ok(SeatClaim::Unavailable);
        }

        let mut by_id: HashMap<Uuid, Seat> = into_seats(claimed)?
            .into_iter()
            .map(|seat| (seat.id, seat))
            .collect();
        let seats: Vec<Seat> = draft
            .seat_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        let booking = draft.into_booking(total_amount(&seats));
        sqlx::query(
            "INSERT INTO bookings
                (id, user_id, screen_id, theater_id, seat_layout_id, show_id, seat_ids,
                 total_amount, booked_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.screen_id)
        .bind(booking.theater_id)
        .bind(booking.seat_layout_id)
        .bind(booking.show_id)
        .bind(&booking.seat_ids)
        .bind(booking.total_amount)
        .bind(booking.booked_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SeatClaim::Claimed { booking, seats })
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT id, user_id, screen_id, theater_id, seat_layout_id, show_id, seat_ids,
                    total_amount, booked_at
             FROM bookings
             WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Booking>, i64)> {
        const FILTER: &str = "($1::uuid IS NULL OR user_id = $1)
             AND ($2::uuid IS NULL OR theater_id = $2)
             AND ($3::uuid IS NULL OR screen_id = $3)";

        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT id, user_id, screen_id, theater_id, seat_layout_id, show_id, seat_ids,
                    total_amount, booked_at
             FROM bookings
             WHERE {FILTER}
             ORDER BY booked_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.user_id)
        .bind(filter.theater_id)
        .bind(filter.screen_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM bookings WHERE {FILTER}"))
            .bind(filter.user_id)
            .bind(filter.theater_id)
            .bind(filter.screen_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((bookings, total))
    }

    async fn find_seats(&self, layout_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats
             WHERE seat_layout_id = $1 AND id = ANY($2)
             ORDER BY position"
        ))
        .bind(layout_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await?;
        into_seats(rows)
    }
}
