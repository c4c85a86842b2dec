//! Postgres-backed tests of the outbox claim/mark queries the relay is built on.

use booking_engine::{
    postgres::db::outbox,
    test_utils::{prepare_test_env, seed_event_with_seats},
    traits::BookingDatabase,
    wire,
};

#[tokio::test]
async fn claimed_rows_are_invisible_to_a_competing_relay() {
    let Some(db) = prepare_test_env().await else { return };
    let (event_id, seat_ids) = seed_event_with_seats(&db, 1, 1_000, 1).await;
    let booking_id = db.create_booking(1, event_id, &seat_ids).await.expect("create_booking failed");

    let mut tx = db.pool().begin().await.expect("begin failed");
    let batch = outbox::fetch_unprocessed_batch(100, &mut tx).await.expect("fetch batch failed");
    let ours = batch
        .iter()
        .find(|m| m.payload["booking_id"] == booking_id && m.routing_key == wire::BOOKING_CREATED)
        .expect("our outbox row must be claimable");
    assert_eq!(ours.exchange, wire::BOOKINGS_EXCHANGE);
    assert!(ours.processed_at.is_none());

    // A second relay must skip rows locked by the first, not block on them.
    let mut peer_tx = db.pool().begin().await.expect("begin failed");
    let peer_batch = outbox::fetch_unprocessed_batch(100, &mut peer_tx).await.expect("peer fetch failed");
    assert!(
        peer_batch.iter().all(|m| m.id != ours.id),
        "a row claimed by an open transaction must be skipped by peers"
    );
    drop(peer_tx);

    let marked = outbox::mark_processed(&[ours.id], &mut tx).await.expect("mark_processed failed");
    assert_eq!(marked, 1);
    tx.commit().await.expect("commit failed");

    // Once marked, the row never comes back.
    let mut tx = db.pool().begin().await.expect("begin failed");
    let batch = outbox::fetch_unprocessed_batch(100, &mut tx).await.expect("fetch batch failed");
    assert!(batch.iter().all(|m| m.id != ours.id));
}
