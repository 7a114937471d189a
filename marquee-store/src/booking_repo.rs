use async_trait::async_trait;
use chrono::Utc;
use marquee_domain::repository::BookingStore;
use marquee_domain::{Booking, BookingStatus, StoreError};
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::{is_unique_violation, map_db_err};

/// Booking persistence backed by Postgres.
///
/// The double-booking guarantee does not live in this code: it lives in the
/// partial unique index on (show_id, seat_number) WHERE status = 'BOOKED'.
/// `insert_active` merely converts that constraint violation into
/// `SeatConflict`, which makes concurrent inserts for one seat serialize in
/// the database regardless of how many API workers race.
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    show_id: Uuid,
    seat_number: i32,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, StoreError> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Unavailable(format!("bad status code: {}", row.status)))?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            show_id: row.show_id,
            seat_number: row.seat_number.max(0) as u32,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert_active(&self, booking: &Booking) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, show_id, seat_number, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.show_id)
        .bind(booking.seat_number as i32)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::SeatConflict),
            Err(e) => Err(map_db_err(e)),
        }
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, show_id, seat_number, status, created_at, updated_at
            FROM bookings WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn mark_cancelled(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        // Compare-and-swap on status: the WHERE clause makes a lost race
        // return no row instead of a second successful cancel.
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'CANCELLED', updated_at = $2
            WHERE id = $1 AND status = 'BOOKED'
            RETURNING id, user_id, show_id, seat_number, status, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn count_active(&self, show_id: Uuid) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings WHERE show_id = $1 AND status = 'BOOKED'
            "#,
        )
        .bind(show_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(count.max(0) as u32)
    }

    async fn active_seats(&self, show_id: Uuid) -> Result<BTreeSet<u32>, StoreError> {
        let seats: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT seat_number FROM bookings WHERE show_id = $1 AND status = 'BOOKED'
            "#,
        )
        .bind(show_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(seats.into_iter().map(|s| s.max(0) as u32).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, show_id, seat_number, status, created_at, updated_at
            FROM bookings WHERE user_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn active_starting_within(
        &self,
        from: chrono::DateTime<Utc>,
        until: chrono::DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.id, b.user_id, b.show_id, b.seat_number, b.status,
                   b.created_at, b.updated_at
            FROM bookings b
            JOIN shows s ON s.id = b.show_id
            WHERE b.status = 'BOOKED' AND s.starts_at >= $1 AND s.starts_at < $2
            ORDER BY s.starts_at
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
