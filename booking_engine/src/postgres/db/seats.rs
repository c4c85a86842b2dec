use log::trace;
use sqlx::PgConnection;

use crate::db_types::{Seat, SeatStatus};

/// Row-locks the requested seats, keeping only those that belong to the event and are still
/// AVAILABLE. The `ORDER BY id` gives every competing reservation the same lock acquisition
/// order, so transactions with intersecting seat sets queue instead of deadlocking.
///
/// Returns the locked seat ids. The caller compares the count against the request to decide
/// whether the reservation can proceed.
pub async fn lock_available_seats(
    seat_ids: &[i64],
    event_id: i64,
    conn: &mut PgConnection,
) -> Result<Vec<i64>, sqlx::Error> {
    let locked: Vec<i64> = sqlx::query_scalar(
        r#"
            SELECT id FROM event.seats
            WHERE id = ANY($1) AND event_id = $2 AND status = 'AVAILABLE'
            ORDER BY id
            FOR UPDATE;
        "#,
    )
    .bind(seat_ids)
    .bind(event_id)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ Locked {} of {} requested seats for event {event_id}", locked.len(), seat_ids.len());
    Ok(locked)
}

pub async fn set_status_for_seats(
    seat_ids: &[i64],
    status: SeatStatus,
    conn: &mut PgConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE event.seats SET status = $1 WHERE id = ANY($2)")
        .bind(status)
        .bind(seat_ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Updates every seat linked to the booking in one statement.
pub async fn set_status_for_booking_seats(
    booking_id: i64,
    status: SeatStatus,
    conn: &mut PgConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE event.seats SET status = $1
            WHERE id IN (SELECT seat_id FROM booking.booking_seats WHERE booking_id = $2);
        "#,
    )
    .bind(status)
    .bind(booking_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_seats_for_booking(
    booking_id: i64,
    conn: &mut PgConnection,
) -> Result<Vec<Seat>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, event_id, status FROM event.seats
            WHERE id IN (SELECT seat_id FROM booking.booking_seats WHERE booking_id = $1)
            ORDER BY id;
        "#,
    )
    .bind(booking_id)
    .fetch_all(conn)
    .await
}

pub async fn fetch_seats_for_event(event_id: i64, conn: &mut PgConnection) -> Result<Vec<Seat>, sqlx::Error> {
    sqlx::query_as("SELECT id, event_id, status FROM event.seats WHERE event_id = $1 ORDER BY id")
        .bind(event_id)
        .fetch_all(conn)
        .await
}
