//! Postgres-backed tests of the store invariants.
//!
//! These run against a real database and skip themselves when `TBS_TEST_DATABASE_URL` is not
//! set. Every test seeds its own event and seats, so the suite is safe to run in parallel
//! against one shared instance.

use booking_engine::{
    db_types::{BookingStatus, SeatStatus},
    test_utils::{prepare_test_env, seed_event_with_seats},
    traits::{BookingDatabase, BookingDatabaseError, EventCatalog},
    wire,
    PostgresDatabase,
};
use futures::future::join_all;

async fn booking_status(db: &PostgresDatabase, booking_id: i64) -> BookingStatus {
    db.fetch_booking(booking_id).await.expect("fetch_booking failed").expect("booking missing").status
}

async fn outbox_rows_for(db: &PostgresDatabase, booking_id: i64, routing_key: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM booking.outbox_messages WHERE routing_key = $1 AND (payload ->> 'booking_id')::bigint = $2",
    )
    .bind(routing_key)
    .bind(booking_id)
    .fetch_one(db.pool())
    .await
    .expect("outbox count query failed")
}

#[tokio::test]
async fn reservation_is_atomic_and_writes_the_outbox_row() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 2_500, 2).await;

    let booking_id = db.create_booking(1, event_id, &seat_ids).await.expect("create_booking failed");

    assert_eq!(booking_status(&db, booking_id).await, BookingStatus::Pending);
    let seats = db.seats_for_booking(booking_id).await.expect("seats_for_booking failed");
    assert_eq!(seats.len(), 2);
    assert!(seats.iter().all(|s| s.status == SeatStatus::Reserved));
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_CREATED).await, 1);
}

#[tokio::test]
async fn a_failed_reservation_leaves_nothing_behind() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, mut seat_ids) = seed_event_with_seats(&db, 1, 2_500, 1).await;
    seat_ids.push(seat_ids[0] + 1_000_000); // a seat that does not exist

    let err = db.create_booking(1, event_id, &seat_ids).await.expect_err("reservation must fail");
    assert!(matches!(err, BookingDatabaseError::SeatNotAvailable));

    let seats = db.seats_for_event(event_id).await.expect("seats_for_event failed");
    assert!(seats.iter().all(|s| s.status == SeatStatus::Available), "no partial reservation may survive");
}

#[tokio::test]
async fn overlapping_concurrent_reservations_sell_each_seat_once() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 2_500, 3).await;
    // Both bookings want the middle seat.
    let first = vec![seat_ids[0], seat_ids[1]];
    let second = vec![seat_ids[1], seat_ids[2]];

    let tasks = [first, second].map(|seats| {
        let db = db.clone();
        tokio::spawn(async move { db.create_booking(1, event_id, &seats).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.expect("task panicked")).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one of the conflicting reservations may win");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, BookingDatabaseError::SeatNotAvailable)));

    let contested: SeatStatus = db
        .seats_for_event(event_id)
        .await
        .expect("seats_for_event failed")
        .into_iter()
        .find(|s| s.id == seat_ids[1])
        .expect("contested seat missing")
        .status;
    assert_eq!(contested, SeatStatus::Reserved);
}

#[tokio::test]
async fn confirmation_books_the_seats_and_is_single_shot() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 2_500, 1).await;
    let booking_id = db.create_booking(1, event_id, &seat_ids).await.expect("create_booking failed");

    db.confirm_booking(booking_id).await.expect("confirm_booking failed");
    assert_eq!(booking_status(&db, booking_id).await, BookingStatus::Confirmed);
    let seats = db.seats_for_booking(booking_id).await.expect("seats_for_booking failed");
    assert!(seats.iter().all(|s| s.status == SeatStatus::Booked));
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_CONFIRMED).await, 1);

    // A second confirm loses the status guard and emits nothing new.
    let err = db.confirm_booking(booking_id).await.expect_err("second confirm must report no change");
    assert!(matches!(err, BookingDatabaseError::BookingCannotBeChanged(id) if id == booking_id));
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_CONFIRMED).await, 1);
}

#[tokio::test]
async fn cancellation_releases_seats_and_duplicates_are_noops() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 2_500, 2).await;
    let booking_id = db.create_booking(1, event_id, &seat_ids).await.expect("create_booking failed");

    db.cancel_booking(booking_id).await.expect("cancel_booking failed");
    assert_eq!(booking_status(&db, booking_id).await, BookingStatus::Cancelled);
    let seats = db.seats_for_booking(booking_id).await.expect("seats_for_booking failed");
    assert!(seats.iter().all(|s| s.status == SeatStatus::Available));
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_CANCELLED).await, 1);

    // Redelivery of the cancel, and a racing expiry, both commit without effect.
    db.cancel_booking(booking_id).await.expect("duplicate cancel must be a no-op");
    db.expire_booking(booking_id).await.expect("expire after cancel must be a no-op");
    assert_eq!(booking_status(&db, booking_id).await, BookingStatus::Cancelled);
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_CANCELLED).await, 1);
    assert_eq!(outbox_rows_for(&db, booking_id, wire::BOOKING_EXPIRED).await, 0);
}

#[tokio::test]
async fn expiry_carries_its_reason_in_the_payload() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 2_500, 1).await;
    let booking_id = db.create_booking(1, event_id, &seat_ids).await.expect("create_booking failed");

    db.expire_booking(booking_id).await.expect("expire_booking failed");
    assert_eq!(booking_status(&db, booking_id).await, BookingStatus::Expired);

    let payload: serde_json::Value = sqlx::query_scalar(
        "SELECT payload FROM booking.outbox_messages WHERE routing_key = $1 AND (payload ->> 'booking_id')::bigint = $2",
    )
    .bind(wire::BOOKING_EXPIRED)
    .bind(booking_id)
    .fetch_one(db.pool())
    .await
    .expect("expired outbox row missing");
    assert_eq!(payload["reason"], "EXPIRED");
}
