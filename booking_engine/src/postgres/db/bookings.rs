use log::debug;
use sqlx::PgConnection;

use crate::db_types::{Booking, BookingStatus};

pub async fn insert_booking(user_id: i64, event_id: i64, conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    let booking_id: i64 = sqlx::query_scalar(
        "INSERT INTO booking.bookings (user_id, event_id, status) VALUES ($1, $2, 'PENDING') RETURNING id",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Booking {booking_id} created for user {user_id} on event {event_id}");
    Ok(booking_id)
}

pub async fn link_seats_to_booking(
    booking_id: i64,
    seat_ids: &[i64],
    conn: &mut PgConnection,
) -> Result<(), sqlx::Error> {
    // unnest keeps this a single round-trip however many seats the booking holds
    sqlx::query("INSERT INTO booking.booking_seats (booking_id, seat_id) SELECT $1, unnest($2::bigint[])")
        .bind(booking_id)
        .bind(seat_ids)
        .execute(conn)
        .await?;
    Ok(())
}

/// The status-guarded terminal transition. Only a PENDING booking matches, so concurrent
/// confirm/cancel/expire calls are serialized by the database and at most one of them wins.
///
/// Returns the number of rows changed: 1 if this call performed the transition, 0 if the
/// booking was already terminal (or does not exist).
pub async fn transition_from_pending(
    booking_id: i64,
    new_status: BookingStatus,
    conn: &mut PgConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE booking.bookings SET status = $1, updated_at = NOW() WHERE id = $2 AND status = 'PENDING'",
    )
    .bind(new_status)
    .bind(booking_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_booking(booking_id: i64, conn: &mut PgConnection) -> Result<Option<Booking>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, event_id, status, created_at, updated_at FROM booking.bookings WHERE id = $1",
    )
    .bind(booking_id)
    .fetch_optional(conn)
    .await
}
