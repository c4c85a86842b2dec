use log::trace;
use sqlx::PgConnection;

use crate::db_types::{NewOutboxMessage, OutboxMessage};

/// Queues a domain event for delivery. Must be called on the same connection (transaction)
/// as the state change the event describes.
pub async fn insert_message(msg: NewOutboxMessage, conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO booking.outbox_messages (exchange, routing_key, payload) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(msg.exchange)
    .bind(&msg.routing_key)
    .bind(msg.payload)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Outbox message {id} queued with routing key {}", msg.routing_key);
    Ok(id)
}

/// Claims up to `limit` undelivered messages, oldest first.
///
/// `FOR UPDATE SKIP LOCKED` lets several relay instances drain the table concurrently
/// without ever publishing the same row twice in the same instant: rows claimed by a peer's
/// open transaction are skipped, not waited on.
pub async fn fetch_unprocessed_batch(limit: i64, conn: &mut PgConnection) -> Result<Vec<OutboxMessage>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, exchange, routing_key, payload, created_at, processed_at
            FROM booking.outbox_messages
            WHERE processed_at IS NULL
            ORDER BY created_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED;
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// Marks the given messages as delivered. Call only after the broker has acknowledged every
/// id in the set.
pub async fn mark_processed(ids: &[i64], conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE booking.outbox_messages SET processed_at = NOW() WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
